//! Topic / set / term catalog model.
//!
//! # Invariants
//! - `Topic::sets` is filled by the live sets layer only; a topic decoded
//!   from a topics snapshot always starts with no sets.
//! - `StudySet::terms` stays empty in the live mirror; terms are loaded on
//!   demand.
//! - Absent descriptions decode as empty strings.

use crate::store::DocumentSnapshot;
use serde::{Deserialize, Serialize};

/// Store-generated topic identifier.
pub type TopicId = String;
/// Store-generated set identifier.
pub type SetId = String;
/// Store-generated term identifier.
pub type TermId = String;

/// Named group of study sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub emoji: String,
    pub description: String,
    /// Ordered as reported by the store.
    pub sets: Vec<StudySet>,
}

/// Flashcard set under one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySet {
    pub id: SetId,
    pub name: String,
    pub description: String,
    pub terms: Vec<Term>,
}

/// One flashcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub id: TermId,
    pub term: String,
    pub definition: String,
}

/// Wire fields of a topic document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TopicFields {
    pub name: String,
    pub emoji: String,
    #[serde(default)]
    pub description: String,
}

/// Wire fields of a set document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SetFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Wire fields of a term document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TermFields {
    pub term: String,
    pub definition: String,
}

impl Topic {
    pub(crate) fn from_snapshot(doc: &DocumentSnapshot) -> Result<Self, serde_json::Error> {
        let fields: TopicFields = super::decode(&doc.data)?;
        Ok(Self {
            id: doc.id.clone(),
            name: fields.name,
            emoji: fields.emoji,
            description: fields.description,
            sets: Vec::new(),
        })
    }

    pub fn find_set(&self, set_id: &str) -> Option<&StudySet> {
        self.sets.iter().find(|set| set.id == set_id)
    }
}

impl StudySet {
    pub(crate) fn from_snapshot(doc: &DocumentSnapshot) -> Result<Self, serde_json::Error> {
        let fields: SetFields = super::decode(&doc.data)?;
        Ok(Self {
            id: doc.id.clone(),
            name: fields.name,
            description: fields.description,
            terms: Vec::new(),
        })
    }
}

impl Term {
    pub(crate) fn from_snapshot(doc: &DocumentSnapshot) -> Result<Self, serde_json::Error> {
        let fields: TermFields = super::decode(&doc.data)?;
        Ok(Self {
            id: doc.id.clone(),
            term: fields.term,
            definition: fields.definition,
        })
    }
}
