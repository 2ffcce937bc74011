use std::path::{Path, PathBuf};

use palier::parser::{parse_bestiary, parse_documents, Document, DocumentRole, DocumentSet};
use palier::{Compendium, ParseError, SkillMerge};
use proptest::prelude::*;

fn docs_dir() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.parent().expect("workspace root").join("docs")
}

#[test]
fn sample_documents_import_cleanly_apart_from_the_skill_collision() {
    let report = palier::parser::import_dir(&docs_dir(), SkillMerge::LastWins).expect("import ran");
    let c = &report.compendium;
    assert_eq!(c.monsters.keys().collect::<Vec<_>>(), vec!["Slime", "Loup gris", "Hydre"]);

    let slime = &c.monsters["Slime"];
    assert_eq!(slime.level_range.min, 1);
    assert_eq!(slime.level_range.max, 5);
    assert_eq!(slime.zone.as_deref(), Some("Plaine verte"));
    assert!(c.monsters["Hydre"].boss);
    assert_eq!(c.monsters["Hydre"].phases.len(), 2);

    // Morsure appears in both tier files; the later tier wins
    assert_eq!(report.warnings.len(), 1, "{:?}", report.warnings);
    assert!(c.skills["Morsure"].description.contains("saigner"));
    assert_eq!(c.skills["Boule de feu"].cost.as_deref(), Some("10"));
}

#[test]
fn first_wins_keeps_the_earlier_tier() {
    let report = palier::parser::import_dir(&docs_dir(), SkillMerge::FirstWins).expect("import ran");
    assert!(report.compendium.skills["Morsure"].description.contains("corps à corps"));
}

#[test]
fn skill_list_with_trailing_blank_line_has_three_entries() {
    let text = "\
### **Rat** (Lvl 1)
**Niveau 1:**
- **HP:** 4/4
- **Compétences:**
  - Morsure
  - Fuite
  - Couinement

- **Drop:** Queue
";
    let out = parse_bestiary("b.md", text);
    let rat = &out.monsters["Rat"];
    assert_eq!(rat.skills.len(), 3);
    assert_eq!(rat.drops, vec!["Queue"]);
    assert!(out.warnings.is_empty());
}

#[test]
fn one_malformed_block_among_three_is_a_warning_not_a_failure() {
    let text = "\
### **Rat** (Lvl 1)
- **HP:** 4/4
### **Chauve-souris** (Lvl 2)
**Niveau 2:**
- **HP:** beaucoup
### **Araignée** (Lvl 3)
- **HP:** 9/9
- **MP:** 3/3
### **Gobelin** (Lvl 4)
- **HP:** 12/12
";
    let out = parse_bestiary("b.md", text);
    assert_eq!(out.monsters.len(), 4);
    for name in ["Rat", "Araignée", "Gobelin"] {
        assert!(out.monsters[name].warnings.is_empty(), "{name}");
    }
    let bat = &out.monsters["Chauve-souris"];
    assert!(!bat.warnings.is_empty());
    assert!(out.warnings.iter().all(|w| w.entry == "Chauve-souris"));
    assert_eq!(out.warnings[0].line, 5);
}

#[test]
fn document_without_monster_headings_is_an_error() {
    let mut set = DocumentSet::default();
    set.add(DocumentRole::Bestiary, Document::new("Bestiaire.md", "# Notes\nrien ici\n"));
    let err = parse_documents(&set, SkillMerge::default()).unwrap_err();
    assert!(matches!(err, ParseError::NoMonsterHeadings { .. }));
}

#[test]
fn missing_bestiary_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("palier_1.md"), "### Soin\n").unwrap();
    let err = palier::parser::import_dir(dir.path(), SkillMerge::default()).unwrap_err();
    assert!(matches!(err, ParseError::NoBestiary { .. }));
}

#[test]
fn all_skills_document_takes_priority_over_tiers() {
    let mut set = DocumentSet::default();
    set.add(DocumentRole::Bestiary, Document::new("Bestiaire.md", "### **Rat** (Lvl 1)\n- **HP:** 4/4\n"));
    set.add(DocumentRole::Tier(1), Document::new("palier_1.md", "### Morsure\n- **Description:** tier\n"));
    set.add(DocumentRole::AllSkills, Document::new("skills.md", "### Fuite\n- **Description:** all\n"));
    let report = parse_documents(&set, SkillMerge::default()).unwrap();
    assert_eq!(report.compendium.skills.keys().collect::<Vec<_>>(), vec!["Fuite"]);
}

fn level_tuple() -> impl Strategy<Value = (i32, i32, i32, i32)> {
    (1..500i32, 0..200i32).prop_flat_map(|(hp_max, mp_max)| (0..=hp_max, Just(hp_max), 0..=mp_max, Just(mp_max)))
}

proptest! {
    #[test]
    fn level_blocks_survive_parse_and_store_round_trip(
        min in 1..20i32,
        stats in prop::collection::vec(level_tuple(), 1..5),
    ) {
        let max = min + stats.len() as i32 - 1;
        let mut text = format!("### **Golem** (Lvl {min}-{max})\n");
        let mut expected = Vec::new();
        for (i, (hp, hp_max, mp, mp_max)) in stats.iter().copied().enumerate() {
            let level = min + i as i32;
            text.push_str(&format!("**Niveau {level}:**\n- **HP:** {hp}/{hp_max}\n- **MP:** {mp}/{mp_max}\n"));
            expected.push((level, hp, hp_max, mp, mp_max));
        }

        let out = parse_bestiary("b.md", &text);
        prop_assert!(out.warnings.is_empty());
        let compendium = Compendium { monsters: out.monsters, skills: Default::default() };
        let json = serde_json::to_string(&compendium).unwrap();
        let reloaded: Compendium = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&reloaded, &compendium);

        let got: Vec<_> = reloaded.monsters["Golem"]
            .levels
            .iter()
            .map(|s| (s.level, s.hp, s.hp_max, s.mp, s.mp_max))
            .collect();
        prop_assert_eq!(got, expected);
    }
}
