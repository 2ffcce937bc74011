use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::{debug, info};

use crate::error::ParseError;

/// What a markdown file is used for, decided from its file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    Bestiary,
    AllSkills,
    Tier(u32),
}

const ALL_SKILLS_STEMS: [&str; 4] = ["skills", "all_skills", "competences", "toutes_competences"];

impl DocumentRole {
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if ext != "md" && ext != "markdown" {
            return None;
        }
        let stem = path
            .file_stem()?
            .to_str()?
            .to_lowercase()
            .replace(['é', 'è'], "e")
            .replace([' ', '-'], "_");

        if stem.starts_with("bestiaire") || stem.starts_with("bestiary") {
            return Some(DocumentRole::Bestiary);
        }
        if ALL_SKILLS_STEMS.contains(&stem.as_str()) {
            return Some(DocumentRole::AllSkills);
        }
        ["palier", "tier"].iter().find_map(|prefix| {
            stem.strip_prefix(prefix)
                .map(|rest| rest.trim_start_matches('_'))
                .and_then(|n| n.parse().ok())
                .map(DocumentRole::Tier)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

/// The markdown inputs of one import.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    pub bestiaries: Vec<Document>,
    pub all_skills: Option<Document>,
    /// Sorted by tier number.
    pub tiers: Vec<(u32, Document)>,
}

impl DocumentSet {
    pub fn add(&mut self, role: DocumentRole, doc: Document) {
        match role {
            DocumentRole::Bestiary => self.bestiaries.push(doc),
            DocumentRole::AllSkills => self.all_skills = Some(doc),
            DocumentRole::Tier(n) => {
                let at = self.tiers.partition_point(|(t, _)| *t <= n);
                self.tiers.insert(at, (n, doc));
            }
        }
    }

    /// Read every recognised markdown file in `dir`.
    pub fn discover(dir: &Path) -> Result<Self, ParseError> {
        let unreadable = |source| ParseError::Unreadable { path: dir.to_path_buf(), source };
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(unreadable)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let mut set = DocumentSet::default();
        for path in paths {
            let Some(role) = DocumentRole::classify(&path) else {
                debug!(path = %path.display(), "ignoring unrecognised file");
                continue;
            };
            let text = read_text_auto(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!(document = %name, ?role, "document found");
            set.add(role, Document::new(name, text));
        }

        if set.bestiaries.is_empty() {
            return Err(ParseError::NoBestiary { dir: dir.to_path_buf() });
        }
        info!(
            dir = %dir.display(),
            bestiaries = set.bestiaries.len(),
            all_skills = set.all_skills.is_some(),
            tiers = set.tiers.len(),
            "document set discovered"
        );
        Ok(set)
    }

    /// The skill documents actually used: the all-skills file when present,
    /// otherwise every tier file in ascending order.
    pub fn skill_sources(&self) -> Vec<&Document> {
        match &self.all_skills {
            Some(doc) => vec![doc],
            None => self.tiers.iter().map(|(_, d)| d).collect(),
        }
    }
}

/// Read a text file, honouring a UTF-8/UTF-16 byte-order mark.
pub fn read_text_auto(path: &Path) -> Result<String, ParseError> {
    let bytes = fs::read(path).map_err(|source| ParseError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        String::from_utf8(bytes).map_err(|_| ParseError::InvalidEncoding {
            path: path.to_path_buf(),
        })
    }
}
