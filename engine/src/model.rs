//! Compendium records: monster and skill definitions as parsed from the documents.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, UnknownDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRange {
    pub min: i32,
    pub max: i32,
}

impl LevelRange {
    /// Builds a range with its bounds in order.
    pub fn new(a: i32, b: i32) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn single(level: i32) -> Self {
        Self { min: level, max: level }
    }

    pub fn contains(&self, level: i32) -> bool {
        (self.min..=self.max).contains(&level)
    }

    /// Grow the range so that it covers `level`.
    pub fn widen(&mut self, level: i32) {
        self.min = self.min.min(level);
        self.max = self.max.max(level);
    }
}

/// Stats for one level (or one labelled boss phase) of a monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LevelStats {
    pub level: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub hp: i32,
    pub hp_max: i32,
    pub mp: i32,
    pub mp_max: i32,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub other_stats: IndexMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_attack: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl LevelStats {
    pub fn empty(level: i32) -> Self {
        Self {
            level,
            label: None,
            hp: 0,
            hp_max: 0,
            mp: 0,
            mp_max: 0,
            other_stats: IndexMap::new(),
            base_attack: None,
            extra: IndexMap::new(),
        }
    }

    pub fn stat(&self, key: &str) -> f64 {
        self.other_stats.get(key).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonsterDefinition {
    pub name: String,
    pub level_range: LevelRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default)]
    pub boss: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drops: Vec<String>,
    /// Sorted by level, at most one entry per level.
    #[serde(default)]
    pub levels: Vec<LevelStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<LevelStats>,
    #[serde(default)]
    pub skills: IndexSet<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub skill_notes: IndexMap<String, String>,
    /// Problems found while parsing this entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MonsterDefinition {
    pub fn new(name: impl Into<String>, level_range: LevelRange) -> Self {
        Self {
            name: name.into(),
            level_range,
            tier: None,
            boss: false,
            zone: None,
            drops: Vec::new(),
            levels: Vec::new(),
            phases: Vec::new(),
            skills: IndexSet::new(),
            skill_notes: IndexMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn level(&self, level: i32) -> Option<&LevelStats> {
        self.levels.iter().find(|s| s.level == level)
    }

    pub fn phase(&self, label: &str) -> Option<&LevelStats> {
        let wanted = label.to_lowercase();
        self.phases
            .iter()
            .find(|p| p.label.as_deref().is_some_and(|l| l.to_lowercase() == wanted))
    }

    /// Insert or replace the stats for `stats.level`, keeping `levels` sorted.
    pub fn upsert_level(&mut self, stats: LevelStats) {
        match self.levels.binary_search_by_key(&stats.level, |s| s.level) {
            Ok(i) => self.levels[i] = stats,
            Err(i) => self.levels.insert(i, stats),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SkillDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl SkillDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            cost: None,
            cooldown: None,
            condition: None,
            category: None,
            tier: None,
            extra: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compendium {
    #[serde(default)]
    pub monsters: IndexMap<String, MonsterDefinition>,
    #[serde(default)]
    pub skills: IndexMap<String, SkillDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    Monster(&'a MonsterDefinition),
    Skill(&'a SkillDefinition),
}

impl Compendium {
    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty() && self.skills.is_empty()
    }

    /// Exact name first, then a case-insensitive match.
    pub fn find_monster(&self, name: &str) -> Option<&MonsterDefinition> {
        self.monsters.get(name).or_else(|| {
            self.monsters
                .iter()
                .find(|(k, _)| k.to_lowercase() == name.to_lowercase())
                .map(|(_, m)| m)
        })
    }

    pub fn find_skill(&self, name: &str) -> Option<&SkillDefinition> {
        self.skills.get(name).or_else(|| {
            self.skills
                .iter()
                .find(|(k, _)| k.to_lowercase() == name.to_lowercase())
                .map(|(_, s)| s)
        })
    }

    pub fn monster(&self, name: &str) -> Result<&MonsterDefinition, UnknownDefinition> {
        self.find_monster(name).ok_or_else(|| UnknownDefinition {
            name: name.to_string(),
        })
    }

    /// Monsters are searched before skills.
    pub fn lookup(&self, name: &str) -> Result<Entry<'_>, StoreError> {
        if let Some(m) = self.find_monster(name) {
            return Ok(Entry::Monster(m));
        }
        self.find_skill(name)
            .map(Entry::Skill)
            .ok_or_else(|| StoreError::MissingKey(name.to_string()))
    }
}
