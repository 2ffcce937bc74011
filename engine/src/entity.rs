use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::UnknownDefinition;
use crate::model::{Compendium, LevelStats, MonsterDefinition};
use crate::scaling::stats_for_level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Monster,
    Boss,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Player => "player",
            EntityKind::Monster => "monster",
            EntityKind::Boss => "boss",
        };
        f.write_str(s)
    }
}

/// Fresh: HP/MP at max since creation or the last reset. Modified: anything after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Fresh,
    #[default]
    Modified,
}

/// A live participant in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "RawInstance")]
pub struct EntityInstance {
    pub kind: EntityKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    pub current_hp: i32,
    pub max_hp: i32,
    pub current_mp: i32,
    pub max_mp: i32,
    /// Lookup key into the compendium; may dangle after a re-import.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_ref: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub stats: IndexMap<String, f64>,
    pub state: InstanceState,
}

#[derive(Deserialize)]
struct RawInstance {
    #[serde(default = "default_kind")]
    kind: EntityKind,
    name: String,
    #[serde(default)]
    level: Option<i32>,
    #[serde(default)]
    current_hp: Option<i32>,
    #[serde(default)]
    max_hp: i32,
    #[serde(default)]
    current_mp: Option<i32>,
    #[serde(default)]
    max_mp: i32,
    #[serde(default)]
    definition_ref: Option<String>,
    #[serde(default)]
    stats: IndexMap<String, f64>,
    #[serde(default)]
    state: Option<InstanceState>,
}

fn default_kind() -> EntityKind {
    EntityKind::Player
}

impl From<RawInstance> for EntityInstance {
    fn from(raw: RawInstance) -> Self {
        let max_hp = raw.max_hp.max(0);
        let max_mp = raw.max_mp.max(0);
        // A missing current value means the participant is untouched.
        let current_hp = raw.current_hp.unwrap_or(max_hp).clamp(0, max_hp);
        let current_mp = raw.current_mp.unwrap_or(max_mp).clamp(0, max_mp);
        let state = raw.state.unwrap_or(if current_hp == max_hp && current_mp == max_mp {
            InstanceState::Fresh
        } else {
            InstanceState::Modified
        });
        Self {
            kind: raw.kind,
            name: raw.name,
            level: raw.level,
            current_hp,
            max_hp,
            current_mp,
            max_mp,
            definition_ref: raw.definition_ref,
            stats: raw.stats,
            state,
        }
    }
}

/// Field-by-field edit of an instance. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub level: Option<i32>,
    pub max_hp: Option<i32>,
    pub max_mp: Option<i32>,
    pub current_hp: Option<i32>,
    pub current_mp: Option<i32>,
    pub stats: IndexMap<String, f64>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntityPatch::default()
    }
}

/// Result of resolving an instance's `definition_ref` against the compendium.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition<'a> {
    Known(&'a MonsterDefinition),
    Unknown(UnknownDefinition),
    /// Players carry no definition.
    None,
}

impl EntityInstance {
    pub fn player(name: impl Into<String>, max_hp: i32, max_mp: i32) -> Self {
        let max_hp = max_hp.max(0);
        let max_mp = max_mp.max(0);
        Self {
            kind: EntityKind::Player,
            name: name.into(),
            level: None,
            current_hp: max_hp,
            max_hp,
            current_mp: max_mp,
            max_mp,
            definition_ref: None,
            stats: IndexMap::new(),
            state: InstanceState::Fresh,
        }
    }

    /// A fresh monster (or boss) built from one set of level stats.
    pub fn from_stats(def: &MonsterDefinition, stats: &LevelStats) -> Self {
        let name = match &stats.label {
            Some(label) => format!("{} ({})", def.name, label),
            None => def.name.clone(),
        };
        Self {
            kind: if def.boss { EntityKind::Boss } else { EntityKind::Monster },
            name,
            level: Some(stats.level),
            current_hp: stats.hp_max.max(0),
            max_hp: stats.hp_max.max(0),
            current_mp: stats.mp_max.max(0),
            max_mp: stats.mp_max.max(0),
            definition_ref: Some(def.name.clone()),
            stats: stats.other_stats.clone(),
            state: InstanceState::Fresh,
        }
    }

    pub fn with_stat(mut self, key: impl Into<String>, value: f64) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    pub fn stat(&self, key: &str) -> f64 {
        self.stats.get(key).copied().unwrap_or(0.0)
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    pub fn is_fresh(&self) -> bool {
        self.state == InstanceState::Fresh
    }

    pub fn is_down(&self) -> bool {
        self.current_hp == 0
    }

    /// Back to max HP/MP; the only way a player becomes Fresh again.
    pub fn reset(&mut self) {
        self.current_hp = self.max_hp;
        self.current_mp = self.max_mp;
        self.state = InstanceState::Fresh;
    }

    /// Apply `patch`. Maxima floor at zero and current values are clamped to
    /// the new maxima. Any applied edit marks the instance Modified.
    pub fn apply_patch(&mut self, patch: EntityPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(level) = patch.level {
            self.level = Some(level);
        }
        if let Some(max_hp) = patch.max_hp {
            self.max_hp = max_hp.max(0);
        }
        if let Some(max_mp) = patch.max_mp {
            self.max_mp = max_mp.max(0);
        }
        self.current_hp = patch.current_hp.unwrap_or(self.current_hp).clamp(0, self.max_hp);
        self.current_mp = patch.current_mp.unwrap_or(self.current_mp).clamp(0, self.max_mp);
        self.stats.extend(patch.stats);
        self.state = InstanceState::Modified;
    }

    pub fn definition<'a>(&self, compendium: &'a Compendium) -> Definition<'a> {
        match &self.definition_ref {
            None => Definition::None,
            Some(name) => match compendium.monster(name) {
                Ok(def) => Definition::Known(def),
                Err(unknown) => Definition::Unknown(unknown),
            },
        }
    }

    pub fn status_line(&self) -> String {
        let level = self.level.map(|l| format!(" lvl {l}")).unwrap_or_default();
        format!(
            "{} [{}{}] HP {}/{} MP {}/{}",
            self.name, self.kind, level, self.current_hp, self.max_hp, self.current_mp, self.max_mp
        )
    }
}

/// Fresh instance of `name` at `level`; never persisted by this call.
pub fn instantiate_monster(
    compendium: &Compendium,
    name: &str,
    level: i32,
) -> Result<EntityInstance, UnknownDefinition> {
    let def = compendium.monster(name)?;
    let stats = stats_for_level(def, level);
    Ok(EntityInstance::from_stats(def, &stats))
}

/// Set every player's current HP/MP back to max.
pub fn reset_all(players: &mut [EntityInstance]) {
    for p in players.iter_mut() {
        p.reset();
    }
}
