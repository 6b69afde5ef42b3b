//! Word/translation/sentence entities and insert payloads.
//!
//! # Invariants
//! - `Word::polish` is unique across all words.
//! - `Translation::english` is unique per owning word.
//! - `Sentence::sentence` is unique per owning translation.

use serde::{Deserialize, Serialize};

/// Surrogate row identifier generated by the store.
pub type RowId = i64;

/// Source-language entry; root of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: RowId,
    /// Natural key.
    pub polish: String,
    pub translations: Vec<Translation>,
}

/// Target-language rendering of a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: RowId,
    pub word_id: RowId,
    pub english: String,
    pub sentences: Vec<Sentence>,
}

/// Example usage attached to a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: RowId,
    pub translation_id: RowId,
    pub sentence: String,
}

impl Word {
    /// Finds an attached translation by exact english text.
    pub fn translation(&self, english: &str) -> Option<&Translation> {
        self.translations
            .iter()
            .find(|translation| translation.english == english)
    }
}

impl Translation {
    /// Returns whether a sentence with exactly this text is attached.
    pub fn has_sentence(&self, text: &str) -> bool {
        self.sentences.iter().any(|sentence| sentence.sentence == text)
    }
}

/// Translation payload: english text plus example sentences.
///
/// This is also the shape callers submit for create/merge requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTranslation {
    pub english: String,
    pub sentences: Vec<String>,
}

impl NewTranslation {
    pub fn new<S: Into<String>>(
        english: impl Into<String>,
        sentences: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            english: english.into(),
            sentences: sentences.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns sentences with repeated texts removed, first occurrence wins.
    pub fn distinct_sentences(&self) -> Vec<String> {
        distinct(self.sentences.iter().map(String::as_str))
    }
}

/// Word payload with nested translations, inserted as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWord {
    pub polish: String,
    pub translations: Vec<NewTranslation>,
}

impl NewWord {
    /// Builds a word payload holding a single translation.
    pub fn with_translation(polish: impl Into<String>, translation: NewTranslation) -> Self {
        Self {
            polish: polish.into(),
            translations: vec![translation],
        }
    }
}

/// Order-preserving de-duplication of sentence texts.
pub(crate) fn distinct<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    texts
        .into_iter()
        .filter(|text| seen.insert(*text))
        .map(str::to_string)
        .collect()
}
