//! Markdown documents → [`Compendium`].

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ParseError;
use crate::model::Compendium;

pub mod bestiary;
pub mod documents;
pub mod skills;
pub mod text;

pub use bestiary::{parse_bestiary, BestiaryParse, BestiaryParser};
pub use documents::{Document, DocumentRole, DocumentSet};
pub use skills::{merge_skill, parse_skills, SkillMerge};

/// A malformed entry that did not stop the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub document: String,
    /// Monster or skill name the warning belongs to.
    pub entry: String,
    pub level: Option<i32>,
    /// 1-based; 0 when the warning is not tied to a line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.document)?;
        if self.line > 0 {
            write!(f, ":{}", self.line)?;
        }
        write!(f, " {}", self.entry)?;
        if let Some(level) = self.level {
            write!(f, " (level {level})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// A parsed compendium not yet committed to the store.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub compendium: Compendium,
    pub warnings: Vec<ParseWarning>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn parse_documents(set: &DocumentSet, merge: SkillMerge) -> Result<ImportReport, ParseError> {
    let mut parsed = BestiaryParse::default();
    for doc in &set.bestiaries {
        let before = parsed.headings;
        BestiaryParser::new(&doc.name).parse_into(&doc.text, &mut parsed);
        debug!(document = %doc.name, monsters = parsed.headings - before, "bestiary parsed");
    }
    if parsed.headings == 0 {
        let section = set
            .bestiaries
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ParseError::NoMonsterHeadings { section });
    }

    let mut warnings = parsed.warnings;
    let mut skills = IndexMap::new();
    for doc in set.skill_sources() {
        for skill in parse_skills(&doc.text) {
            merge_skill(&mut skills, skill, merge, &doc.name, &mut warnings);
        }
    }

    for monster in parsed.monsters.values() {
        for name in monster.skills.iter().filter(|s| !skills.contains_key(*s)) {
            debug!(monster = %monster.name, skill = %name, "skill reference without a definition");
        }
    }

    info!(
        monsters = parsed.monsters.len(),
        skills = skills.len(),
        warnings = warnings.len(),
        "documents parsed"
    );
    Ok(ImportReport {
        compendium: Compendium {
            monsters: parsed.monsters,
            skills,
        },
        warnings,
    })
}

/// Discover the documents in `dir` and parse them.
pub fn import_dir(dir: &Path, merge: SkillMerge) -> Result<ImportReport, ParseError> {
    let set = DocumentSet::discover(dir)?;
    parse_documents(&set, merge)
}
