use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{JsonFile, COMPENDIUM_FILE};
use crate::error::StoreError;
use crate::model::{Compendium, Entry};

pub struct CompendiumStore {
    file: JsonFile,
}

impl CompendiumStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { file: JsonFile::new(path) }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(COMPENDIUM_FILE))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// `NotFound` when nothing was ever imported.
    pub fn load(&self) -> Result<Compendium, StoreError> {
        self.file.read()
    }

    /// An empty compendium when the file is missing or corrupt.
    pub fn load_or_empty(&self) -> Compendium {
        match self.load() {
            Ok(c) => c,
            Err(StoreError::NotFound { .. }) => {
                info!(path = %self.path().display(), "no compendium imported yet");
                Compendium::default()
            }
            Err(e) => {
                warn!(error = %e, "compendium unusable; starting empty");
                Compendium::default()
            }
        }
    }

    /// Replace the whole compendium in one rename.
    pub fn save(&self, compendium: &Compendium, force: bool) -> Result<(), StoreError> {
        self.file.write(compendium, force)?;
        info!(
            path = %self.path().display(),
            monsters = compendium.monsters.len(),
            skills = compendium.skills.len(),
            "compendium saved"
        );
        Ok(())
    }

    /// Load and look `name` up. The entry is cloned out of the loaded file.
    pub fn lookup(&self, name: &str) -> Result<OwnedEntry, StoreError> {
        let compendium = self.load()?;
        let entry = match compendium.lookup(name)? {
            Entry::Monster(m) => OwnedEntry::Monster(m.clone()),
            Entry::Skill(s) => OwnedEntry::Skill(s.clone()),
        };
        Ok(entry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OwnedEntry {
    Monster(crate::model::MonsterDefinition),
    Skill(crate::model::SkillDefinition),
}
