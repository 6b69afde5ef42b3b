//! Scripted repository stand-in for service tests.
//!
//! Responses are queued up front and consumed in call order. Every call is
//! journaled and, when configured, passed to a verification callback before
//! the response is handed out. Nothing touches a real store; transactions run
//! the callback against the same scripted repository.

use crate::error::{DictionaryError, DictionaryResult};
use crate::model::entry::{NewTranslation, NewWord, RowId, Sentence, Translation, Word};
use crate::repo::dictionary_repo::{
    DictionaryRepository, TransactionalRepository, TranslationRemoval, TxMode,
};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One call observed by [`ScriptedRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    Transaction(TxMode),
    GetWord {
        polish: String,
    },
    GetTranslation {
        polish: String,
        english: String,
    },
    GetSentence {
        polish: String,
        english: String,
        sentence: String,
    },
    AddWord(NewWord),
    AddTranslation {
        word_id: RowId,
        translation: NewTranslation,
    },
    AddSentences {
        translation_id: RowId,
        sentences: Vec<String>,
    },
    DeleteWord {
        polish: String,
    },
    DeleteTranslation {
        translation_id: RowId,
    },
    DeleteSentence {
        sentence_id: RowId,
    },
    UpdateWord {
        word_id: RowId,
        new_polish: String,
    },
    UpdateTranslation {
        translation_id: RowId,
        new_english: String,
    },
    UpdateSentence {
        sentence_id: RowId,
        new_sentence: String,
    },
}

/// Predetermined response to the next non-transaction call.
#[derive(Debug)]
pub enum Scripted {
    Word(Word),
    Translation(Translation),
    Sentence(Sentence),
    Sentences(Vec<Sentence>),
    /// Affected row count for deletes and updates.
    Rows(usize),
    Removal(TranslationRemoval),
    Fail(DictionaryError),
}

type Verifier = Box<dyn Fn(&RepoCall) + Send + Sync>;

#[derive(Default)]
pub struct ScriptedRepository {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RepoCall>>,
    verifier: Option<Verifier>,
}

impl ScriptedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the response for the next call.
    #[must_use]
    pub fn respond(self, response: Scripted) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Installs a callback invoked with every call, transactions included.
    #[must_use]
    pub fn with_verifier(
        mut self,
        verifier: impl Fn(&RepoCall) + Send + Sync + 'static,
    ) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of queued responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn record(&self, call: &RepoCall) {
        if let Some(verifier) = &self.verifier {
            verifier(call);
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());
    }

    fn next(&self, call: RepoCall) -> DictionaryResult<Scripted> {
        self.record(&call);
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match response {
            Some(Scripted::Fail(err)) => Err(err),
            Some(response) => Ok(response),
            None => Err(DictionaryError::InvalidData(format!(
                "no scripted response left for {call:?}"
            ))),
        }
    }
}

fn mismatch(expected: &str, got: Scripted) -> DictionaryError {
    DictionaryError::InvalidData(format!(
        "scripted response mismatch: expected {expected}, got {got:?}"
    ))
}

impl DictionaryRepository for ScriptedRepository {
    fn get_word(&self, polish: &str) -> DictionaryResult<Word> {
        match self.next(RepoCall::GetWord {
            polish: polish.to_string(),
        })? {
            Scripted::Word(word) => Ok(word),
            other => Err(mismatch("word", other)),
        }
    }

    fn get_translation(&self, polish: &str, english: &str) -> DictionaryResult<Translation> {
        match self.next(RepoCall::GetTranslation {
            polish: polish.to_string(),
            english: english.to_string(),
        })? {
            Scripted::Translation(translation) => Ok(translation),
            other => Err(mismatch("translation", other)),
        }
    }

    fn get_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &str,
    ) -> DictionaryResult<Sentence> {
        match self.next(RepoCall::GetSentence {
            polish: polish.to_string(),
            english: english.to_string(),
            sentence: sentence.to_string(),
        })? {
            Scripted::Sentence(sentence) => Ok(sentence),
            other => Err(mismatch("sentence", other)),
        }
    }

    fn add_word(&self, word: &NewWord) -> DictionaryResult<Word> {
        match self.next(RepoCall::AddWord(word.clone()))? {
            Scripted::Word(word) => Ok(word),
            other => Err(mismatch("word", other)),
        }
    }

    fn add_translation(
        &self,
        word: &Word,
        translation: &NewTranslation,
    ) -> DictionaryResult<Translation> {
        match self.next(RepoCall::AddTranslation {
            word_id: word.id,
            translation: translation.clone(),
        })? {
            Scripted::Translation(translation) => Ok(translation),
            other => Err(mismatch("translation", other)),
        }
    }

    fn add_sentences(
        &self,
        _polish: &str,
        translation: &Translation,
        sentences: &[String],
    ) -> DictionaryResult<Vec<Sentence>> {
        match self.next(RepoCall::AddSentences {
            translation_id: translation.id,
            sentences: sentences.to_vec(),
        })? {
            Scripted::Sentences(sentences) => Ok(sentences),
            other => Err(mismatch("sentences", other)),
        }
    }

    fn delete_word(&self, polish: &str) -> DictionaryResult<usize> {
        match self.next(RepoCall::DeleteWord {
            polish: polish.to_string(),
        })? {
            Scripted::Rows(rows) => Ok(rows),
            other => Err(mismatch("rows", other)),
        }
    }

    fn delete_translation(
        &self,
        translation: &Translation,
    ) -> DictionaryResult<TranslationRemoval> {
        match self.next(RepoCall::DeleteTranslation {
            translation_id: translation.id,
        })? {
            Scripted::Removal(removal) => Ok(removal),
            other => Err(mismatch("removal", other)),
        }
    }

    fn delete_sentence(&self, sentence: &Sentence) -> DictionaryResult<usize> {
        match self.next(RepoCall::DeleteSentence {
            sentence_id: sentence.id,
        })? {
            Scripted::Rows(rows) => Ok(rows),
            other => Err(mismatch("rows", other)),
        }
    }

    fn update_word(&self, word: &Word, new_polish: &str) -> DictionaryResult<usize> {
        match self.next(RepoCall::UpdateWord {
            word_id: word.id,
            new_polish: new_polish.to_string(),
        })? {
            Scripted::Rows(rows) => Ok(rows),
            other => Err(mismatch("rows", other)),
        }
    }

    fn update_translation(
        &self,
        _polish: &str,
        translation: &Translation,
        new_english: &str,
    ) -> DictionaryResult<usize> {
        match self.next(RepoCall::UpdateTranslation {
            translation_id: translation.id,
            new_english: new_english.to_string(),
        })? {
            Scripted::Rows(rows) => Ok(rows),
            other => Err(mismatch("rows", other)),
        }
    }

    fn update_sentence(
        &self,
        _polish: &str,
        _english: &str,
        sentence: &Sentence,
        new_sentence: &str,
    ) -> DictionaryResult<usize> {
        match self.next(RepoCall::UpdateSentence {
            sentence_id: sentence.id,
            new_sentence: new_sentence.to_string(),
        })? {
            Scripted::Rows(rows) => Ok(rows),
            other => Err(mismatch("rows", other)),
        }
    }
}

impl TransactionalRepository for ScriptedRepository {
    fn with_transaction<T, F>(&self, mode: TxMode, f: F) -> DictionaryResult<T>
    where
        F: FnOnce(&dyn DictionaryRepository) -> DictionaryResult<T>,
    {
        self.record(&RepoCall::Transaction(mode));
        f(self)
    }
}
