//! External representation of dictionary entries.
//!
//! Pure mappings from loaded entities to the response shape consumed by the
//! API layer. Surrogate ids are not exposed.

use crate::model::entry::{Sentence, Translation, Word};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordView {
    pub polish: String,
    pub translations: Vec<TranslationView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationView {
    pub english: String,
    pub sentences: Vec<SentenceView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceView {
    pub sentence: String,
}

impl From<&Sentence> for SentenceView {
    fn from(value: &Sentence) -> Self {
        Self {
            sentence: value.sentence.clone(),
        }
    }
}

impl From<&Translation> for TranslationView {
    fn from(value: &Translation) -> Self {
        Self {
            english: value.english.clone(),
            sentences: value.sentences.iter().map(SentenceView::from).collect(),
        }
    }
}

impl From<&Word> for WordView {
    fn from(value: &Word) -> Self {
        Self {
            polish: value.polish.clone(),
            translations: value
                .translations
                .iter()
                .map(TranslationView::from)
                .collect(),
        }
    }
}
