//! Line-oriented state machine over a bestiary document.
//!
//! A monster block opens on a heading such as `### **Slime** (Lvl 1-5)` and runs
//! until the next monster heading or the end of the document. Inside it,
//! `**Niveau N:**` (or `**Phase X:**` for bosses) opens a stat sub-block and
//! `- **Compétences:**` opens a list of skill references.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::text::{as_number, as_pair, fold_key, is_pure_number, strip_list_marker, strip_md, unique_key};
use super::ParseWarning;
use crate::model::{LevelRange, LevelStats, MonsterDefinition};

static TIER_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*#{1,4}.*PALIER\s*(?P<tier>\d+)\b").expect("tier heading regex")
});

static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(PALIER\s*\d+|BOSS|DONJON|STATISTIQUES|L[EÉ]GENDE|SYMBOL(?:ES)?|TYPES\s+DE\s+ZONES)",
    )
    .expect("section heading regex")
});

static BOSS_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bBOSS").expect("boss section regex"));

static MONSTER_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*#{2,4}\s*(?:[^\w*]*\s*)?\*\*(?P<name>.+?)\*\*\s*(?:\((?P<range>[^)]+)\))?\s*(?P<crown>👑)?\s*(?:\*.*\*)?\s*$",
    )
    .expect("monster heading regex")
});

static ANY_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#{1,6}\s").expect("heading regex"));

static LEVEL_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:lvl|lv|niv(?:eau)?)\.?\s*(?P<min>\d+)(?:\s*(?:-|–|—|à)\s*(?P<max>\d+))?")
        .expect("level range regex")
});

static LEVEL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*\*\*\s*Niveau\s*(?P<lvl>\d+)\s*(?:\([^)]*\))?\s*:\s*\*\*\s*$")
        .expect("level marker regex")
});

static PHASE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*\*\*\s*(?P<label>(?:Phase|Version)\s*[^:*]+?)\s*:\s*\*\*\s*$")
        .expect("phase marker regex")
});

/// Any standalone `**Something:**` line.
static BOLD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\*\*[^*]+\*\*\s*:?\s*$").expect("bold marker regex"));

/// `- **Key:** value` (the colon may also sit outside the bold).
static KV_BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[-*+]\s*\*\*(?P<k>[^*:]+?)\s*(?::\s*\*\*|\*\*\s*:)\s*(?P<v>.*?)\s*$")
        .expect("key/value bullet regex")
});

static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,})\s*$").expect("rule regex"));

const CORE_STATS: [&str; 5] = ["STR", "AGI", "INT", "DEX", "VIT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    OutsideBlock,
    InMonsterBlock,
    InLevelSubBlock,
    InSkillList { in_level: bool },
}

/// What a bold bullet key means inside a monster block.
enum Field {
    Hp,
    Mp,
    BaseAttack,
    Drop,
    Zone,
    Skills,
    Stat(String),
    Other(String),
}

fn classify_key(raw_key: &str) -> Field {
    let key = fold_key(raw_key);
    match key.as_str() {
        "hp" | "pv" => Field::Hp,
        "mp" | "pm" => Field::Mp,
        "attaque de base" | "base attack" => Field::BaseAttack,
        "drop" | "drops" => Field::Drop,
        "zone" => Field::Zone,
        "competences" | "competence" | "skills" => Field::Skills,
        _ => match CORE_STATS.iter().find(|s| s.eq_ignore_ascii_case(&key)) {
            Some(stat) => Field::Stat((*stat).to_string()),
            None => Field::Other(strip_md(raw_key)),
        },
    }
}

fn parse_range(raw: &str) -> Option<LevelRange> {
    let caps = LEVEL_RANGE.captures(raw)?;
    let min: i32 = caps.name("min")?.as_str().parse().ok()?;
    let max = caps
        .name("max")
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(min);
    Some(LevelRange::new(min, max))
}

struct LevelDraft {
    stats: LevelStats,
    phase: bool,
    line: usize,
    saw_hp: bool,
    saw_mp: bool,
}

struct MonsterDraft {
    def: MonsterDefinition,
    line: usize,
    range_declared: bool,
    level: Option<LevelDraft>,
    warnings: Vec<ParseWarning>,
}

impl MonsterDraft {
    fn warn(&mut self, document: &str, line: usize, level: Option<i32>, message: impl Into<String>) {
        let w = ParseWarning {
            document: document.to_string(),
            entry: self.def.name.clone(),
            level,
            line,
            message: message.into(),
        };
        warn!(%w, "bestiary entry");
        self.warnings.push(w);
    }
}

/// Monsters and warnings found in one bestiary document.
#[derive(Debug, Default)]
pub struct BestiaryParse {
    pub monsters: IndexMap<String, MonsterDefinition>,
    pub warnings: Vec<ParseWarning>,
    pub headings: usize,
}

pub struct BestiaryParser<'a> {
    document: &'a str,
    tier: Option<String>,
    boss_section: bool,
    state: State,
    current: Option<MonsterDraft>,
    out: BestiaryParse,
}

impl<'a> BestiaryParser<'a> {
    pub fn new(document: &'a str) -> Self {
        Self {
            document,
            tier: None,
            boss_section: false,
            state: State::OutsideBlock,
            current: None,
            out: BestiaryParse::default(),
        }
    }

    /// Parse a whole document into `into`, continuing its key space so
    /// duplicate names across documents are numbered too.
    pub fn parse_into(mut self, text: &str, into: &mut BestiaryParse) {
        self.out = std::mem::take(into);
        for (i, raw) in text.lines().enumerate() {
            self.line(i + 1, raw);
        }
        self.finish_monster();
        *into = self.out;
    }

    pub fn parse(self, text: &str) -> BestiaryParse {
        let mut out = BestiaryParse::default();
        self.parse_into(text, &mut out);
        out
    }

    fn line(&mut self, n: usize, line: &str) {
        if ANY_HEADING.is_match(line) {
            self.heading(n, line);
            return;
        }

        match self.state {
            State::OutsideBlock => {}
            State::InSkillList { in_level } => self.skill_list_line(n, line, in_level),
            State::InMonsterBlock | State::InLevelSubBlock => self.block_line(n, line),
        }
    }

    fn heading(&mut self, n: usize, line: &str) {
        if let Some(caps) = TIER_HEADING.captures(line) {
            self.finish_monster();
            self.tier = Some(format!("Palier {}", &caps["tier"]));
            self.boss_section = false;
            debug!(line = n, tier = ?self.tier, "tier heading");
            return;
        }

        if let Some(caps) = MONSTER_HEADING.captures(line) {
            if !SECTION_HEADING.is_match(&caps["name"]) {
                let name = strip_md(&caps["name"]);
                let range = caps.name("range").and_then(|m| parse_range(m.as_str()));
                let crowned = caps.name("crown").is_some();
                self.start_monster(n, name, range, crowned);
                return;
            }
        }

        // any other heading closes the block; boss sections mark what follows
        self.finish_monster();
        self.boss_section = BOSS_SECTION.is_match(line) || (self.boss_section && !SECTION_HEADING.is_match(line));
        debug!(line = n, boss_section = self.boss_section, "section heading");
    }

    fn start_monster(&mut self, n: usize, name: String, range: Option<LevelRange>, crowned: bool) {
        self.finish_monster();
        self.out.headings += 1;

        let mut def = MonsterDefinition::new(name, range.unwrap_or(LevelRange::single(1)));
        def.tier = self.tier.clone();
        def.boss = crowned || self.boss_section;
        debug!(line = n, monster = %def.name, ?range, boss = def.boss, "monster heading");

        let mut draft = MonsterDraft {
            def,
            line: n,
            range_declared: range.is_some(),
            level: None,
            warnings: Vec::new(),
        };
        if range.is_none() {
            draft.warn(self.document, n, None, "missing level range");
        }
        self.current = Some(draft);
        self.state = State::InMonsterBlock;
    }

    fn block_line(&mut self, n: usize, line: &str) {
        if let Some(caps) = LEVEL_MARKER.captures(line) {
            match caps["lvl"].parse::<i32>() {
                Ok(level) => self.open_level(n, level, None),
                Err(_) => self.warn_current(n, None, format!("unreadable level marker '{}'", line.trim())),
            }
            return;
        }
        if let Some(caps) = PHASE_MARKER.captures(line) {
            let label = strip_md(&caps["label"]);
            let level = self.current.as_ref().map_or(1, |d| d.def.level_range.min);
            self.open_level(n, level, Some(label));
            return;
        }
        if RULE.is_match(line) {
            return;
        }

        let Some(caps) = KV_BULLET.captures(line) else {
            return;
        };
        let value = caps["v"].to_string();
        match classify_key(&caps["k"]) {
            Field::Skills => {
                let in_level = self.state == State::InLevelSubBlock;
                self.state = State::InSkillList { in_level };
                // an inline list on the same line is accepted as well
                for name in value.split([',', ';']).map(strip_md).filter(|s| !s.is_empty()) {
                    self.add_skill(name, None);
                }
            }
            Field::Drop => {
                if let Some(d) = self.current.as_mut() {
                    let drops: Vec<String> = strip_md(&value)
                        .split([',', ';', '/'])
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect();
                    if !drops.is_empty() {
                        d.def.drops = drops;
                    }
                }
            }
            Field::Zone => {
                let zone = strip_md(&value);
                if zone.is_empty() {
                    return;
                }
                if let Some(d) = self.current.as_mut() {
                    d.def.zone = Some(zone);
                }
            }
            field => self.level_field(n, field, &value),
        }
    }

    fn level_field(&mut self, n: usize, field: Field, value: &str) {
        if self.state == State::InMonsterBlock {
            // stats straight under the heading describe the lowest level
            let level = self.current.as_ref().map_or(1, |d| d.def.level_range.min);
            self.open_level(n, level, None);
        }
        let document = self.document;
        let Some(draft) = self.current.as_mut() else {
            return;
        };
        let Some(lvl) = draft.level.as_mut() else {
            return;
        };
        let level = lvl.stats.level;

        match field {
            Field::Hp | Field::Mp => {
                let is_hp = matches!(field, Field::Hp);
                match as_pair(value) {
                    Some((cur, max)) => {
                        if is_hp {
                            lvl.stats.hp = cur;
                            lvl.stats.hp_max = max;
                            lvl.saw_hp = true;
                        } else {
                            lvl.stats.mp = cur;
                            lvl.stats.mp_max = max;
                            lvl.saw_mp = true;
                        }
                    }
                    None => {
                        let what = if is_hp { "HP" } else { "MP" };
                        draft.warn(document, n, Some(level), format!("unreadable {what} value '{}'", value.trim()));
                    }
                }
            }
            Field::BaseAttack => {
                let v = strip_md(value);
                if !v.is_empty() {
                    lvl.stats.base_attack = Some(v);
                }
            }
            Field::Stat(key) => match as_number(value) {
                Some(v) => {
                    lvl.stats.other_stats.insert(key, v);
                }
                None => debug!(line = n, stat = %key, "stat without a numeric value ignored"),
            },
            Field::Other(key) => {
                if is_pure_number(value) {
                    if let Some(v) = as_number(value) {
                        lvl.stats.other_stats.insert(key, v);
                    }
                } else {
                    lvl.stats.extra.insert(key, strip_md(value));
                }
            }
            Field::Drop | Field::Zone | Field::Skills => {}
        }
    }

    fn skill_list_line(&mut self, n: usize, line: &str, in_level: bool) {
        if line.trim().is_empty() {
            return;
        }
        let resume = if in_level { State::InLevelSubBlock } else { State::InMonsterBlock };

        if RULE.is_match(line) || BOLD_MARKER.is_match(line) {
            self.state = resume;
            self.block_line(n, line);
            return;
        }
        if let Some(caps) = KV_BULLET.captures(line) {
            match classify_key(&caps["k"]) {
                Field::Other(name) => {
                    let note = strip_md(&caps["v"]);
                    self.add_skill(name, (!note.is_empty()).then_some(note));
                }
                _ => {
                    // a stat bullet means the list is over
                    self.state = resume;
                    self.block_line(n, line);
                }
            }
            return;
        }

        let name = strip_md(strip_list_marker(line));
        let name = name.trim_end_matches(':').trim().to_string();
        if !name.is_empty() {
            self.add_skill(name, None);
        }
    }

    fn add_skill(&mut self, name: String, note: Option<String>) {
        if let Some(d) = self.current.as_mut() {
            if let Some(note) = note {
                d.def.skill_notes.insert(name.clone(), note);
            }
            d.def.skills.insert(name);
        }
    }

    fn open_level(&mut self, n: usize, level: i32, label: Option<String>) {
        self.finish_level();
        if let Some(d) = self.current.as_mut() {
            let mut stats = LevelStats::empty(level);
            let phase = label.is_some();
            stats.label = label;
            d.level = Some(LevelDraft {
                stats,
                phase,
                line: n,
                saw_hp: false,
                saw_mp: false,
            });
            self.state = State::InLevelSubBlock;
        }
    }

    fn finish_level(&mut self) {
        let document = self.document;
        let Some(d) = self.current.as_mut() else {
            return;
        };
        let Some(mut lvl) = d.level.take() else {
            return;
        };
        let level = lvl.stats.level;

        if !lvl.saw_hp && !lvl.saw_mp {
            d.warn(document, lvl.line, Some(level), "level has neither HP nor MP");
        }
        if lvl.stats.hp > lvl.stats.hp_max {
            d.warn(document, lvl.line, Some(level), format!("HP {} above max {}", lvl.stats.hp, lvl.stats.hp_max));
            lvl.stats.hp = lvl.stats.hp_max;
        }
        if lvl.stats.mp > lvl.stats.mp_max {
            d.warn(document, lvl.line, Some(level), format!("MP {} above max {}", lvl.stats.mp, lvl.stats.mp_max));
            lvl.stats.mp = lvl.stats.mp_max;
        }

        if lvl.phase {
            d.def.phases.push(lvl.stats);
        } else {
            if d.def.level(level).is_some() {
                d.warn(document, lvl.line, Some(level), "level defined twice; keeping the later block");
            }
            d.def.upsert_level(lvl.stats);
        }
    }

    fn finish_monster(&mut self) {
        self.finish_level();
        let document = self.document;
        let Some(mut d) = self.current.take() else {
            self.state = State::OutsideBlock;
            return;
        };

        if !d.range_declared {
            if let (Some(first), Some(last)) = (d.def.levels.first(), d.def.levels.last()) {
                d.def.level_range = LevelRange::new(first.level, last.level);
            }
        } else {
            let outside: Vec<i32> = d
                .def
                .levels
                .iter()
                .map(|s| s.level)
                .filter(|l| !d.def.level_range.contains(*l))
                .collect();
            for level in outside {
                d.warn(document, d.line, Some(level), "level outside the declared range; range widened");
                d.def.level_range.widen(level);
            }
        }

        let key = unique_key(&d.def.name, |k| self.out.monsters.contains_key(k));
        if key != d.def.name {
            d.warn(document, d.line, None, format!("duplicate monster name; stored as '{key}'"));
            d.def.name = key.clone();
            for w in &mut d.warnings {
                w.entry = key.clone();
            }
        }

        d.def.warnings = d.warnings.iter().map(|w| w.to_string()).collect();
        self.out.warnings.append(&mut d.warnings);
        self.out.monsters.insert(key, d.def);
        self.state = State::OutsideBlock;
    }

    fn warn_current(&mut self, n: usize, level: Option<i32>, message: String) {
        let document = self.document;
        if let Some(d) = self.current.as_mut() {
            d.warn(document, n, level, message);
        }
    }
}

/// Convenience wrapper over a single document.
pub fn parse_bestiary(document: &str, text: &str) -> BestiaryParse {
    BestiaryParser::new(document).parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIME: &str = "\
## 🌲 PALIER 1

### **Slime** (Lvl 1-3)

**Niveau 1:**
- **HP:** 6/6
- **MP:** 1/1
- **STR:** 2
- **Attaque de base:** 3

**Niveau 3:**
- **HP:** 10/10
- **MP:** 2/2
- **VIT:** 4
- **Rareté:** Commun
- **Compétences:**
  - Absorption
  - **Acide:** ronge l'armure

- **Drop:** Gelée, Noyau
- **Zone:** Plaine
";

    #[test]
    fn parses_levels_stats_and_metadata() {
        let out = parse_bestiary("Bestiaire.md", SLIME);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        let slime = &out.monsters["Slime"];
        assert_eq!(slime.tier.as_deref(), Some("Palier 1"));
        assert_eq!(slime.level_range, LevelRange::new(1, 3));
        assert_eq!(slime.levels.len(), 2);
        let l3 = slime.level(3).unwrap();
        assert_eq!((l3.hp, l3.hp_max, l3.mp, l3.mp_max), (10, 10, 2, 2));
        assert_eq!(l3.stat("VIT"), 4.0);
        assert_eq!(l3.extra.get("Rareté").map(String::as_str), Some("Commun"));
        assert_eq!(slime.level(1).unwrap().base_attack.as_deref(), Some("3"));
        assert_eq!(slime.skills.iter().collect::<Vec<_>>(), vec!["Absorption", "Acide"]);
        assert_eq!(slime.skill_notes["Acide"], "ronge l'armure");
        assert_eq!(slime.drops, vec!["Gelée", "Noyau"]);
        assert_eq!(slime.zone.as_deref(), Some("Plaine"));
    }

    #[test]
    fn section_headings_are_not_monsters() {
        let text = "## **BOSS DU PALIER**\n### **Hydre** (Lvl 15) 👑\n**Niveau 15:**\n- **HP:** 1500/1500\n";
        let out = parse_bestiary("b.md", text);
        assert_eq!(out.monsters.len(), 1);
        assert!(out.monsters["Hydre"].boss);
    }

    #[test]
    fn boss_section_marks_following_monsters() {
        let text = "\
## BOSS
### **Golem** (Lvl 10)
- **HP:** 300/300
## PALIER 2
### **Rat** (Lvl 10)
- **HP:** 5/5
";
        let out = parse_bestiary("b.md", text);
        assert!(out.monsters["Golem"].boss);
        assert!(!out.monsters["Rat"].boss);
        // stats right under the heading land on the lowest level
        assert_eq!(out.monsters["Golem"].level(10).map(|s| s.hp_max), Some(300));
    }

    #[test]
    fn phases_are_kept_apart_from_levels() {
        let text = "\
### **Hydre** (Lvl 15) 👑
**Phase 1:**
- **HP:** 1500/1500
- **MP:** 200/200
**Phase 2 (enragée):**
- **HP:** 800/800
- **MP:** 100/100
";
        let out = parse_bestiary("b.md", text);
        let hydra = &out.monsters["Hydre"];
        assert!(hydra.levels.is_empty());
        assert_eq!(hydra.phases.len(), 2);
        assert_eq!(hydra.phase("phase 1").map(|p| p.hp_max), Some(1500));
    }

    #[test]
    fn missing_range_and_empty_level_are_warnings() {
        let text = "\
### **Ombre**
**Niveau 4:**
- **STR:** 7
**Niveau 6:**
- **HP:** 20/20
";
        let out = parse_bestiary("b.md", text);
        let ombre = &out.monsters["Ombre"];
        assert_eq!(ombre.level_range, LevelRange::new(4, 6));
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].message.contains("missing level range"));
        assert_eq!(out.warnings[1].level, Some(4));
        assert_eq!(ombre.warnings.len(), 2);
    }

    #[test]
    fn duplicates_get_numbered_keys() {
        let text = "### **Loup** (Lvl 1)\n- **HP:** 5\n### **Loup** (Lvl 2)\n- **HP:** 9\n";
        let out = parse_bestiary("b.md", text);
        assert!(out.monsters.contains_key("Loup"));
        assert_eq!(out.monsters["Loup (2)"].name, "Loup (2)");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn skill_list_ends_at_next_level_marker() {
        let text = "\
### **Loup** (Lvl 1-2)
**Niveau 1:**
- **HP:** 5/5
- **Compétences:**
- Morsure
- Hurlement
**Niveau 2:**
- **HP:** 9/9
";
        let out = parse_bestiary("b.md", text);
        let wolf = &out.monsters["Loup"];
        assert_eq!(wolf.skills.len(), 2);
        assert_eq!(wolf.level(2).map(|s| s.hp_max), Some(9));
    }
}
