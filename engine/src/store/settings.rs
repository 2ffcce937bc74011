//! Process-wide settings: built-in defaults overlaid with the saved file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{JsonFile, SETTINGS_FILE};
use crate::error::StoreError;
use crate::parser::SkillMerge;

pub const VIT_DIVISOR: &str = "vit_divisor";
pub const SKILL_MERGE: &str = "skill_merge";
pub const MAX_ROLL: &str = "max_roll";
pub const DOCS_DIR: &str = "docs_dir";
pub const COMBAT_LOG_LIMIT: &str = "combat_log_limit";

/// One settings value. Numbers keep their JSON spelling and anything that is
/// not a flag, number or string is carried as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    Raw(serde_json::Value),
}

impl SettingValue {
    /// Numbers, booleans, then text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(n) = raw.parse::<serde_json::Number>() {
            return SettingValue::Number(n);
        }
        match raw {
            "true" => SettingValue::Flag(true),
            "false" => SettingValue::Flag(false),
            _ => SettingValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Flag(b) => write!(f, "{b}"),
            SettingValue::Number(n) => write!(f, "{n}"),
            SettingValue::Text(s) => f.write_str(s),
            SettingValue::Raw(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Default for Settings {
    fn default() -> Self {
        let values = BTreeMap::from([
            (VIT_DIVISOR.to_string(), SettingValue::Number(100.into())),
            (SKILL_MERGE.to_string(), SettingValue::Text(SkillMerge::default().to_string())),
            (MAX_ROLL.to_string(), SettingValue::Number(100.into())),
            (DOCS_DIR.to_string(), SettingValue::Text("docs".to_string())),
            (COMBAT_LOG_LIMIT.to_string(), SettingValue::Number(40.into())),
        ]);
        Self { values }
    }
}

impl Settings {
    /// Defaults with every key of `overrides` laid on top.
    pub fn with_overrides(overrides: Settings) -> Self {
        let mut settings = Settings::default();
        settings.values.extend(overrides.values);
        settings
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.values.iter()
    }

    /// Set from user text. Known keys are validated; unknown keys are kept as given.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), StoreError> {
        let value = SettingValue::parse(raw);
        let invalid = || StoreError::InvalidSetting {
            key: key.to_string(),
            value: raw.to_string(),
        };
        match key {
            VIT_DIVISOR => {
                value.as_number().filter(|n| *n > 0.0).ok_or_else(invalid)?;
            }
            MAX_ROLL | COMBAT_LOG_LIMIT => {
                value.as_number().filter(|n| *n >= 1.0).ok_or_else(invalid)?;
            }
            SKILL_MERGE => {
                raw.parse::<SkillMerge>().map_err(|_| invalid())?;
            }
            _ => {}
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn number_or_default(&self, key: &str, valid: impl Fn(f64) -> bool) -> f64 {
        let fallback = Settings::default()
            .get(key)
            .and_then(SettingValue::as_number)
            .unwrap_or_default();
        match self.get(key) {
            Some(v) => match v.as_number().filter(|n| valid(*n)) {
                Some(n) => n,
                None => {
                    warn!(key, value = %v, fallback, "invalid setting; using default");
                    fallback
                }
            },
            None => fallback,
        }
    }

    pub fn vit_divisor(&self) -> f64 {
        self.number_or_default(VIT_DIVISOR, |n| n > 0.0)
    }

    pub fn max_roll(&self) -> u32 {
        self.number_or_default(MAX_ROLL, |n| n >= 1.0) as u32
    }

    pub fn combat_log_limit(&self) -> usize {
        self.number_or_default(COMBAT_LOG_LIMIT, |n| n >= 1.0) as usize
    }

    fn text_or_default<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        match self.get(key) {
            Some(SettingValue::Text(s)) => s,
            Some(v) => {
                warn!(key, value = %v, fallback, "invalid setting; using default");
                fallback
            }
            None => fallback,
        }
    }

    pub fn skill_merge(&self) -> SkillMerge {
        let default = SkillMerge::default().to_string();
        self.text_or_default(SKILL_MERGE, &default).parse().unwrap_or_else(|e| {
            warn!(error = %e, "invalid skill_merge setting; using default");
            SkillMerge::default()
        })
    }

    pub fn docs_dir(&self) -> PathBuf {
        PathBuf::from(self.text_or_default(DOCS_DIR, "docs"))
    }
}

pub struct SettingsStore {
    file: JsonFile,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { file: JsonFile::new(path) }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Never fails: a missing or corrupt file yields the defaults.
    pub fn load(&self) -> Settings {
        match self.file.read::<Settings>() {
            Ok(overrides) => Settings::with_overrides(overrides),
            Err(StoreError::NotFound { .. }) => Settings::default(),
            Err(e) => {
                warn!(error = %e, "settings unusable; using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings, force: bool) -> Result<(), StoreError> {
        self.file.write(settings, force)?;
        info!(path = %self.path().display(), "settings saved");
        Ok(())
    }
}
