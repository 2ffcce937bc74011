//! One game-master session: the loaded stores plus the current encounter.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::entity::{Definition, EntityInstance, EntityPatch};
use crate::error::{SessionError, StoreError};
use crate::life::{apply_damage, heal, restore_mp, spend_mp};
use crate::model::Compendium;
use crate::parser::{import_dir, ImportReport, SkillMerge};
use crate::rules::{resolve_attack, DuelOptions, DuelOutcome};
use crate::store::{CompendiumStore, EntityFile, EntityStore, SettingsStore};
use crate::{Rolls, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Player(usize),
    Kept(usize),
    Encounter(usize),
}

/// A participant with its definition resolved at view time.
#[derive(Debug, Clone)]
pub struct ParticipantView<'a> {
    pub instance: &'a EntityInstance,
    pub definition: Definition<'a>,
    pub persisted: bool,
}

impl ParticipantView<'_> {
    pub fn definition_label(&self) -> String {
        match &self.definition {
            Definition::Known(def) => format!(
                "{} (lvl {}-{})",
                def.name, def.level_range.min, def.level_range.max
            ),
            Definition::Unknown(unknown) => format!("unknown definition '{}'", unknown.name),
            Definition::None => "-".to_string(),
        }
    }
}

pub struct Session {
    settings_store: SettingsStore,
    compendium_store: CompendiumStore,
    entity_store: EntityStore,
    settings: Settings,
    compendium: Compendium,
    players: Vec<EntityInstance>,
    kept_monsters: Vec<EntityInstance>,
    encounter: Vec<EntityInstance>,
    log: Vec<String>,
    force: bool,
}

impl Session {
    /// Load everything under `data_dir`. Missing or corrupt files start empty.
    pub fn open(data_dir: &Path) -> Self {
        let settings_store = SettingsStore::in_dir(data_dir);
        let compendium_store = CompendiumStore::in_dir(data_dir);
        let entity_store = EntityStore::in_dir(data_dir);

        let settings = settings_store.load();
        let compendium = compendium_store.load_or_empty();
        let file = match entity_store.load() {
            Ok(file) => file,
            Err(StoreError::NotFound { .. }) => EntityFile::default(),
            Err(e) => {
                warn!(error = %e, "entity file unusable; starting with no players");
                EntityFile::default()
            }
        };
        let players: Vec<EntityInstance> =
            file.players.into_iter().filter(|p| p.is_player()).collect();

        info!(
            data_dir = %data_dir.display(),
            players = players.len(),
            monsters = compendium.monsters.len(),
            "session opened"
        );
        Self {
            settings_store,
            compendium_store,
            entity_store,
            settings,
            compendium,
            players,
            kept_monsters: file.kept_monsters,
            encounter: Vec::new(),
            log: Vec::new(),
            force: false,
        }
    }

    /// Allow writes over store files that fail to parse (they are moved aside first).
    pub fn set_force(&mut self, force: bool) {
        self.force = force;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn compendium(&self) -> &Compendium {
        &self.compendium
    }

    pub fn players(&self) -> &[EntityInstance] {
        &self.players
    }

    pub fn kept_monsters(&self) -> &[EntityInstance] {
        &self.kept_monsters
    }

    pub fn encounter(&self) -> &[EntityInstance] {
        &self.encounter
    }

    pub fn combat_log(&self) -> &[String] {
        &self.log
    }

    pub fn reload_settings(&mut self) {
        self.settings = self.settings_store.load();
    }

    pub fn save_settings(&self) -> Result<(), SessionError> {
        self.settings_store.save(&self.settings, self.force)?;
        Ok(())
    }

    /// Parse the documents and commit the new compendium. On any error the
    /// current compendium stays in place.
    pub fn import_documents(
        &mut self,
        dir: Option<&Path>,
        merge: Option<SkillMerge>,
    ) -> Result<ImportReport, SessionError> {
        let dir: PathBuf = dir.map(Path::to_path_buf).unwrap_or_else(|| self.settings.docs_dir());
        let merge = merge.unwrap_or_else(|| self.settings.skill_merge());
        let report = import_dir(&dir, merge)?;
        self.compendium_store.save(&report.compendium, self.force)?;
        self.compendium = report.compendium.clone();
        Ok(report)
    }

    /// Persist players and kept monsters.
    pub fn save(&self) -> Result<(), SessionError> {
        let file = EntityFile {
            players: self.players.clone(),
            kept_monsters: self.kept_monsters.clone(),
        };
        self.entity_store.save(&file, self.force)?;
        Ok(())
    }

    /// Every player back to max HP/MP, persisted immediately.
    pub fn reset_hp_mp(&mut self) -> Result<(), SessionError> {
        self.entity_store.reset_all(&mut self.players);
        self.push_log("[RESET] all players back to full HP/MP".to_string());
        self.save()
    }

    pub fn add_player(&mut self, player: EntityInstance) -> Result<(), SessionError> {
        if self.find(&player.name).is_some() {
            return Err(SessionError::DuplicateEntity(player.name));
        }
        self.players.push(player);
        Ok(())
    }

    pub fn remove_player(&mut self, name: &str) -> Result<EntityInstance, SessionError> {
        match self.find(name) {
            Some(Slot::Player(i)) => Ok(self.players.remove(i)),
            _ => Err(SessionError::UnknownEntity(name.to_string())),
        }
    }

    /// Edit a player in place. A rename may not clash with another participant.
    pub fn edit_player(&mut self, name: &str, patch: EntityPatch) -> Result<&EntityInstance, SessionError> {
        let i = match self.find(name) {
            Some(Slot::Player(i)) => i,
            _ => return Err(SessionError::UnknownEntity(name.to_string())),
        };
        if let Some(new_name) = &patch.name {
            match self.find(new_name) {
                Some(Slot::Player(j)) if j == i => {}
                Some(_) => return Err(SessionError::DuplicateEntity(new_name.clone())),
                None => {}
            }
        }
        let player = &mut self.players[i];
        player.apply_patch(patch);
        info!(name = %player.name, "player edited");
        Ok(&self.players[i])
    }

    /// A fresh monster joins the encounter; it is not persisted.
    pub fn spawn(&mut self, monster: &str, level: i32) -> Result<&EntityInstance, SessionError> {
        let instance = self.entity_store.instantiate_monster(&self.compendium, monster, level)?;
        Ok(self.join_encounter(instance))
    }

    pub fn spawn_phase(&mut self, monster: &str, phase: &str) -> Result<&EntityInstance, SessionError> {
        let def = self.compendium.monster(monster)?;
        let stats = def
            .phase(phase)
            .ok_or_else(|| SessionError::UnknownPhase(def.name.clone(), phase.to_string()))?;
        let instance = EntityInstance::from_stats(def, stats);
        Ok(self.join_encounter(instance))
    }

    fn join_encounter(&mut self, mut instance: EntityInstance) -> &EntityInstance {
        let base = instance.name.clone();
        let mut n = 2;
        while self.find(&instance.name).is_some() {
            instance.name = format!("{base} #{n}");
            n += 1;
        }
        self.push_log(format!("[SPAWN] {}", instance.status_line()));
        self.encounter.push(instance);
        &self.encounter[self.encounter.len() - 1]
    }

    /// Move an encounter monster into the persisted kept list.
    pub fn keep(&mut self, name: &str) -> Result<(), SessionError> {
        match self.find(name) {
            Some(Slot::Encounter(i)) => {
                let m = self.encounter.remove(i);
                info!(name = %m.name, "monster kept");
                self.kept_monsters.push(m);
                Ok(())
            }
            Some(Slot::Kept(_)) => Ok(()),
            _ => Err(SessionError::UnknownEntity(name.to_string())),
        }
    }

    pub fn participant(&self, name: &str) -> Option<&EntityInstance> {
        self.find(name).map(|slot| match slot {
            Slot::Player(i) => &self.players[i],
            Slot::Kept(i) => &self.kept_monsters[i],
            Slot::Encounter(i) => &self.encounter[i],
        })
    }

    pub fn damage(&mut self, name: &str, amount: i32) -> Result<bool, SessionError> {
        let mut lines = Vec::new();
        let dropped = apply_damage(self.slot_mut(name)?, amount, |l| lines.push(l));
        self.extend_log(lines);
        Ok(dropped)
    }

    pub fn heal(&mut self, name: &str, amount: i32) -> Result<(), SessionError> {
        let mut lines = Vec::new();
        heal(self.slot_mut(name)?, amount, |l| lines.push(l));
        self.extend_log(lines);
        Ok(())
    }

    pub fn spend_mp(&mut self, name: &str, cost: i32) -> Result<bool, SessionError> {
        let mut lines = Vec::new();
        let paid = spend_mp(self.slot_mut(name)?, cost, |l| lines.push(l));
        self.extend_log(lines);
        Ok(paid)
    }

    pub fn restore_mp(&mut self, name: &str, amount: i32) -> Result<(), SessionError> {
        let mut lines = Vec::new();
        restore_mp(self.slot_mut(name)?, amount, |l| lines.push(l));
        self.extend_log(lines);
        Ok(())
    }

    pub fn resolve_attack(
        &mut self,
        attacker: &str,
        defender: &str,
        rolls: Rolls,
        pierce_armor: bool,
    ) -> Result<DuelOutcome, SessionError> {
        let a = self
            .find(attacker)
            .ok_or_else(|| SessionError::UnknownEntity(attacker.to_string()))?;
        let d = self
            .find(defender)
            .ok_or_else(|| SessionError::UnknownEntity(defender.to_string()))?;
        if a == d {
            return Err(SessionError::SameParticipant(attacker.to_string()));
        }

        let mut atk = self.slot(a).clone();
        let mut def = self.slot(d).clone();
        let opts = DuelOptions {
            pierce_armor,
            vit_divisor: self.settings.vit_divisor(),
        };
        let mut lines = Vec::new();
        lines.push(format!(
            "[DUEL] {} ({}) vs {} ({})",
            atk.name, rolls.attacker, def.name, rolls.defender
        ));
        let outcome = resolve_attack(&mut atk, &mut def, rolls, opts, |l| lines.push(l));
        *self.slot_at(a) = atk;
        *self.slot_at(d) = def;
        self.extend_log(lines);
        Ok(outcome)
    }

    /// Every participant, definitions resolved against the current compendium.
    pub fn view(&self) -> Vec<ParticipantView<'_>> {
        let persisted = self.players.iter().chain(&self.kept_monsters).map(|p| (p, true));
        let transient = self.encounter.iter().map(|p| (p, false));
        persisted
            .chain(transient)
            .map(|(instance, persisted)| ParticipantView {
                instance,
                definition: instance.definition(&self.compendium),
                persisted,
            })
            .collect()
    }

    fn find(&self, name: &str) -> Option<Slot> {
        let wanted = name.to_lowercase();
        let matches = |e: &EntityInstance| e.name.to_lowercase() == wanted;
        if let Some(i) = self.players.iter().position(matches) {
            return Some(Slot::Player(i));
        }
        if let Some(i) = self.kept_monsters.iter().position(matches) {
            return Some(Slot::Kept(i));
        }
        self.encounter.iter().position(matches).map(Slot::Encounter)
    }

    fn slot(&self, slot: Slot) -> &EntityInstance {
        match slot {
            Slot::Player(i) => &self.players[i],
            Slot::Kept(i) => &self.kept_monsters[i],
            Slot::Encounter(i) => &self.encounter[i],
        }
    }

    fn slot_at(&mut self, slot: Slot) -> &mut EntityInstance {
        match slot {
            Slot::Player(i) => &mut self.players[i],
            Slot::Kept(i) => &mut self.kept_monsters[i],
            Slot::Encounter(i) => &mut self.encounter[i],
        }
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut EntityInstance, SessionError> {
        let slot = self
            .find(name)
            .ok_or_else(|| SessionError::UnknownEntity(name.to_string()))?;
        Ok(self.slot_at(slot))
    }

    fn push_log(&mut self, line: String) {
        self.extend_log(vec![line]);
    }

    fn extend_log(&mut self, lines: Vec<String>) {
        self.log.extend(lines);
        let limit = self.settings.combat_log_limit();
        if self.log.len() > limit {
            let excess = self.log.len() - limit;
            self.log.drain(..excess);
        }
    }
}
