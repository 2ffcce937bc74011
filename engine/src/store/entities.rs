use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{JsonFile, ENTITIES_FILE};
use crate::entity::{self, EntityInstance, EntityKind};
use crate::error::{StoreError, UnknownDefinition};
use crate::model::Compendium;

/// On-disk layout of the entity file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityFile {
    #[serde(default)]
    pub players: Vec<EntityInstance>,
    /// Monsters the user chose to keep; none by default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kept_monsters: Vec<EntityInstance>,
}

pub struct EntityStore {
    file: JsonFile,
}

impl EntityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { file: JsonFile::new(path) }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(ENTITIES_FILE))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn load(&self) -> Result<EntityFile, StoreError> {
        self.file.read()
    }

    /// Persisted players, in file order. Non-player entries are skipped.
    pub fn load_players(&self) -> Result<Vec<EntityInstance>, StoreError> {
        let file = self.load()?;
        Ok(file
            .players
            .into_iter()
            .filter(|p| {
                let keep = p.kind == EntityKind::Player;
                if !keep {
                    warn!(name = %p.name, kind = %p.kind, "non-player entry in the player list ignored");
                }
                keep
            })
            .collect())
    }

    pub fn save(&self, file: &EntityFile, force: bool) -> Result<(), StoreError> {
        self.file.write(file, force)?;
        info!(
            path = %self.path().display(),
            players = file.players.len(),
            kept_monsters = file.kept_monsters.len(),
            "entities saved"
        );
        Ok(())
    }

    /// Replace the player list, keeping whatever monsters were kept before.
    pub fn save_players(&self, players: &[EntityInstance], force: bool) -> Result<(), StoreError> {
        let kept_monsters = match self.load() {
            Ok(existing) => existing.kept_monsters,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        let file = EntityFile {
            players: players.iter().filter(|p| p.is_player()).cloned().collect(),
            kept_monsters,
        };
        self.save(&file, force)
    }

    /// Fresh monster from the compendium; the store itself is not touched.
    pub fn instantiate_monster(
        &self,
        compendium: &Compendium,
        name: &str,
        level: i32,
    ) -> Result<EntityInstance, UnknownDefinition> {
        entity::instantiate_monster(compendium, name, level)
    }

    /// Back to max HP/MP for every player. The caller persists the result.
    pub fn reset_all(&self, players: &mut [EntityInstance]) {
        entity::reset_all(players);
    }
}
