//! The knowledge index: one vector per knowledge term, in store order.
//!
//! Serialized as a JSON object of term → vector so the cached file stays
//! readable and round-trips exactly (`f32` values survive serde_json).

use ledgerwise_core::error::KnowledgeError;
use ledgerwise_core::knowledge::Vector;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Term → vector mapping, ordered by insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeIndex {
    entries: Vec<(String, Vector)>,
}

impl KnowledgeIndex {
    pub fn new(entries: Vec<(String, Vector)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, Vector)] {
        &self.entries
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(term, _)| term.as_str())
    }

    pub fn get(&self, term: &str) -> Option<&Vector> {
        self.entries
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, vector)| vector)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every vector must have exactly `dimension` components.
    pub fn validate(&self, dimension: usize) -> Result<(), KnowledgeError> {
        match self.entries.iter().find(|(_, v)| v.len() != dimension) {
            Some((term, vector)) => Err(KnowledgeError::Corrupt(format!(
                "Vector for '{term}' has {} components, expected {dimension}",
                vector.len()
            ))),
            None => Ok(()),
        }
    }
}

impl Serialize for KnowledgeIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::ordered::serialize(&self.entries, serializer)
    }
}

impl<'de> Deserialize<'de> for KnowledgeIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::ordered::deserialize(deserializer).map(|entries| Self { entries })
    }
}
