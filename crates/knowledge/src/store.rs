//! Knowledge store: the fixed term → definition table.
//!
//! Loaded once at startup from a JSON object (`{"budget": "...", ...}`).
//! When the file does not exist yet it is seeded with a default set of
//! personal-finance terms and written to disk. The store is immutable after
//! load and preserves the file's term order.

use ledgerwise_core::error::KnowledgeError;
use ledgerwise_core::knowledge::KnowledgeEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Default entries written when no knowledge file exists.
const DEFAULT_TERMS: &[(&str, &str)] = &[
    (
        "budget",
        "A plan for your money that helps you track income and expenses. Think of it as a roadmap for your finances.",
    ),
    (
        "saving",
        "Setting aside money for future use instead of spending it now. Like storing nuts for winter!",
    ),
    (
        "investing",
        "Putting money into assets (like stocks or property) with the hope they'll grow in value over time.",
    ),
    (
        "compound interest",
        "When you earn interest not just on your initial money, but also on the interest you've already earned. It's like a snowball that keeps growing as it rolls downhill.",
    ),
    (
        "credit score",
        "A number that tells lenders how reliable you are with money. Higher scores mean you're seen as more trustworthy.",
    ),
    (
        "debt",
        "Money you owe to someone else. Think of it as 'borrowed money' that you need to pay back, usually with interest.",
    ),
    (
        "401k",
        "A retirement account offered by employers where you can save money from your paycheck before taxes. Many employers match part of what you contribute - that's free money!",
    ),
    (
        "stock",
        "A small piece of ownership in a company. When you buy stock, you're buying a tiny fraction of that business.",
    ),
    (
        "bond",
        "A loan you give to a company or government that they promise to pay back with interest. It's generally safer than stocks but offers lower returns.",
    ),
    (
        "etf",
        "Similar to mutual funds, but traded like stocks throughout the day. ETFs (Exchange-Traded Funds) often have lower fees than mutual funds.",
    ),
    (
        "mortgage",
        "A loan specifically for buying property. You pay it back over many years, and the property serves as collateral.",
    ),
];

/// On-disk shape of the knowledge file.
#[derive(Serialize, Deserialize)]
struct KnowledgeFile(
    #[serde(
        serialize_with = "crate::ordered::serialize",
        deserialize_with = "crate::ordered::deserialize"
    )]
    Vec<(String, String)>,
);

/// An insertion-ordered, immutable term → definition table.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    entries: Vec<KnowledgeEntry>,
    positions: HashMap<String, usize>,
}

impl KnowledgeStore {
    /// Build a store from entries. A repeated term keeps its first position
    /// and takes the later definition.
    pub fn new(entries: impl IntoIterator<Item = KnowledgeEntry>) -> Self {
        let mut store = Self::default();
        for entry in entries {
            match store.positions.get(&entry.term) {
                Some(&pos) => {
                    warn!(term = %entry.term, "Duplicate knowledge term, keeping last definition");
                    store.entries[pos].definition = entry.definition;
                }
                None => {
                    store.positions.insert(entry.term.clone(), store.entries.len());
                    store.entries.push(entry);
                }
            }
        }
        store
    }

    /// The built-in personal-finance glossary.
    pub fn defaults() -> Self {
        Self::new(
            DEFAULT_TERMS
                .iter()
                .map(|(term, definition)| KnowledgeEntry::new(*term, *definition)),
        )
    }

    /// Parse a JSON object of term → definition.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: KnowledgeFile = serde_json::from_str(json)?;
        Ok(Self::new(
            file.0
                .into_iter()
                .map(|(term, definition)| KnowledgeEntry { term, definition }),
        ))
    }

    /// Render as a pretty-printed JSON object in store order.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let file = KnowledgeFile(
            self.entries
                .iter()
                .map(|e| (e.term.clone(), e.definition.clone()))
                .collect(),
        );
        serde_json::to_string_pretty(&file)
    }

    /// Load the knowledge file at `path`.
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let content = std::fs::read_to_string(path).map_err(|e| KnowledgeError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| KnowledgeError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load the knowledge file, seeding it with [`KnowledgeStore::defaults`]
    /// when it does not exist.
    pub fn load_or_seed(path: &Path) -> Result<Self, KnowledgeError> {
        if path.exists() {
            let store = Self::load(path)?;
            info!(path = %path.display(), terms = store.len(), "Knowledge store loaded");
            return Ok(store);
        }

        let store = Self::defaults();
        store.save(path)?;
        info!(path = %path.display(), terms = store.len(), "Knowledge file not found, seeded defaults");
        Ok(store)
    }

    /// Write the store to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), KnowledgeError> {
        let json = self
            .to_json_pretty()
            .map_err(|e| KnowledgeError::Storage(format!("Failed to serialize knowledge: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                KnowledgeError::Storage(format!("Failed to create knowledge directory: {e}"))
            })?;
        }

        std::fs::write(path, json)
            .map_err(|e| KnowledgeError::Storage(format!("Failed to write knowledge file: {e}")))
    }

    /// Look up a term's definition.
    pub fn definition(&self, term: &str) -> Option<&str> {
        self.positions
            .get(term)
            .map(|&pos| self.entries[pos].definition.as_str())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.positions.contains_key(term)
    }

    /// Entries in load order.
    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_glossary() {
        let store = KnowledgeStore::defaults();
        assert_eq!(store.len(), 11);
        assert_eq!(store.entries()[0].term, "budget");
        assert_eq!(store.entries()[10].term, "mortgage");
        assert!(store.definition("compound interest").unwrap().contains("snowball"));
    }

    #[test]
    fn from_json_preserves_file_order() {
        let store = KnowledgeStore::from_json(
            r#"{"saving": "Set money aside.", "budget": "A plan.", "debt": "Money owed."}"#,
        )
        .unwrap();
        let terms: Vec<&str> = store.entries().iter().map(|e| e.term.as_str()).collect();
        assert_eq!(terms, vec!["saving", "budget", "debt"]);
        assert_eq!(store.definition("budget"), Some("A plan."));
        assert!(store.definition("etf").is_none());
    }

    #[test]
    fn duplicate_terms_keep_position_and_last_definition() {
        let store = KnowledgeStore::new(vec![
            KnowledgeEntry::new("a", "first"),
            KnowledgeEntry::new("b", "bee"),
            KnowledgeEntry::new("a", "second"),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].term, "a");
        assert_eq!(store.definition("a"), Some("second"));
    }

    #[test]
    fn load_or_seed_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb").join("financial_knowledge.json");

        let store = KnowledgeStore::load_or_seed(&path).unwrap();
        assert_eq!(store.len(), 11);
        assert!(path.exists());

        let reloaded = KnowledgeStore::load(&path).unwrap();
        assert_eq!(reloaded.entries(), store.entries());
    }

    #[test]
    fn load_or_seed_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, r#"{"budget": "b", "saving": "s"}"#).unwrap();

        let store = KnowledgeStore::load_or_seed(&path).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn malformed_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, "not json").unwrap();

        let err = KnowledgeStore::load_or_seed(&path).unwrap_err();
        assert!(matches!(err, KnowledgeError::Load { .. }));
    }

    #[test]
    fn pretty_json_round_trips() {
        let store = KnowledgeStore::defaults();
        let json = store.to_json_pretty().unwrap();
        assert!(json.starts_with("{\n"));
        let parsed = KnowledgeStore::from_json(&json).unwrap();
        assert_eq!(parsed.entries(), store.entries());
    }
}
