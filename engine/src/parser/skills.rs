//! Skill documents: `##` category headings, `###`/`####` skill headings and
//! `- **Key:** value` bullets underneath.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::text::{fold_key, norm, strip_list_marker, strip_md, unique_key};
use super::ParseWarning;
use crate::model::SkillDefinition;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<hashes>#{1,6})\s+(?P<title>.+?)\s*#*\s*$").expect("heading regex")
});

static TIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PALIER\s*(?P<tier>\d+)\b").expect("tier regex"));

static KV_BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[-*+]\s*\*\*(?P<k>[^*:]+?)\s*(?::\s*\*\*|\*\*\s*:)\s*(?P<v>.*?)\s*$")
        .expect("key/value bullet regex")
});

static LEADING_SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\w(]+").expect("leading symbols regex"));

/// Precedence when two skill sources define the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillMerge {
    /// The later definition replaces the earlier one.
    #[default]
    LastWins,
    /// The first definition is kept; later ones are dropped.
    FirstWins,
    /// Both are kept; the later one is stored as `Name (2)`.
    KeepBoth,
}

impl fmt::Display for SkillMerge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkillMerge::LastWins => "last_wins",
            SkillMerge::FirstWins => "first_wins",
            SkillMerge::KeepBoth => "keep_both",
        })
    }
}

impl FromStr for SkillMerge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "last_wins" | "last" => Ok(SkillMerge::LastWins),
            "first_wins" | "first" => Ok(SkillMerge::FirstWins),
            "keep_both" | "both" => Ok(SkillMerge::KeepBoth),
            other => Err(format!("unknown skill merge policy '{other}'")),
        }
    }
}

/// Skills in document order. Names may repeat; merging decides what survives.
pub fn parse_skills(text: &str) -> Vec<SkillDefinition> {
    let mut skills = Vec::new();
    let mut tier: Option<String> = None;
    let mut category: Option<String> = None;
    let mut current: Option<SkillDefinition> = None;
    let mut prose: Vec<String> = Vec::new();

    let mut flush = |current: &mut Option<SkillDefinition>, prose: &mut Vec<String>| {
        if let Some(mut skill) = current.take() {
            if skill.description.is_empty() && !prose.is_empty() {
                skill.description = prose.join(" ");
            }
            skills.push(skill);
        }
        prose.clear();
    };

    for (i, line) in text.lines().enumerate() {
        if let Some(caps) = HEADING.captures(line) {
            let depth = caps["hashes"].len();
            let title = strip_md(&caps["title"]);
            if let Some(t) = TIER.captures(&title) {
                flush(&mut current, &mut prose);
                tier = Some(format!("Palier {}", &t["tier"]));
                category = None;
                continue;
            }
            match depth {
                1 => flush(&mut current, &mut prose),
                2 => {
                    flush(&mut current, &mut prose);
                    category = Some(LEADING_SYMBOLS.replace(&title, "").trim().to_string())
                        .filter(|c| !c.is_empty());
                }
                _ => {
                    flush(&mut current, &mut prose);
                    debug!(line = i + 1, skill = %title, "skill heading");
                    let mut skill = SkillDefinition::new(title);
                    skill.category = category.clone();
                    skill.tier = tier.clone();
                    current = Some(skill);
                }
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed == "---" {
            flush(&mut current, &mut prose);
            continue;
        }
        let Some(skill) = current.as_mut() else {
            continue;
        };

        if let Some(caps) = KV_BULLET.captures(line) {
            let key = fold_key(&caps["k"]);
            let value = strip_md(&caps["v"]);
            match key.as_str() {
                "description" => skill.description = value,
                "cout mp" | "cout pm" | "cout" | "cost" | "mp cost" => skill.cost = Some(value),
                "cooldown" | "recharge" | "temps de recharge" => skill.cooldown = Some(value),
                "condition" => skill.condition = Some(value),
                _ => {
                    skill.extra.insert(key, value);
                }
            }
        } else if !trimmed.is_empty() {
            prose.push(norm(&strip_md(strip_list_marker(trimmed))));
        }
    }
    flush(&mut current, &mut prose);
    skills
}

/// Insert `skill` under the merge policy, recording and logging any collision.
pub fn merge_skill(
    into: &mut IndexMap<String, SkillDefinition>,
    mut skill: SkillDefinition,
    policy: SkillMerge,
    document: &str,
    warnings: &mut Vec<ParseWarning>,
) {
    if !into.contains_key(&skill.name) {
        into.insert(skill.name.clone(), skill);
        return;
    }

    let message = match policy {
        SkillMerge::LastWins => {
            let name = skill.name.clone();
            into.insert(name, skill.clone());
            "skill redefined; later definition replaces the earlier one".to_string()
        }
        SkillMerge::FirstWins => "skill redefined; earlier definition kept".to_string(),
        SkillMerge::KeepBoth => {
            let key = unique_key(&skill.name, |k| into.contains_key(k));
            let msg = format!("skill redefined; stored as '{key}'");
            skill.name = key.clone();
            into.insert(key, skill.clone());
            msg
        }
    };
    let w = ParseWarning {
        document: document.to_string(),
        entry: skill.name.clone(),
        level: None,
        line: 0,
        message,
    };
    warn!(%w, %policy, "skill name collision");
    warnings.push(w);
}
