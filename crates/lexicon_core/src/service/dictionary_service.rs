//! Dictionary use-case service.
//!
//! # Responsibility
//! - Implement create-or-merge, create, delete, update and select use cases.
//! - Choose the transaction mode for each use case.
//! - Apply the idempotent-delete policy.
//!
//! # Invariants
//! - Every public method runs exactly one transaction and never retries.
//! - Concurrent merges of the same word serialize on exclusive table locks,
//!   so their effects accumulate instead of colliding.
//! - Deletes of missing rows succeed as no-ops; updates of missing rows fail
//!   with `*NotExists`.
//! - Service layer remains storage-agnostic.

use crate::error::{DictionaryError, DictionaryResult, EntityKey};
use crate::model::entry::{NewTranslation, NewWord, Word};
use crate::repo::dictionary_repo::{TableLocks, TransactionalRepository, TxMode};
use log::{debug, error, info, warn};
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// What a create-or-merge call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The word did not exist and was inserted with the translation.
    CreatedWord,
    /// The word existed; the translation was attached to it.
    CreatedTranslation,
    /// Both existed; this many new sentences were attached.
    AddedSentences(usize),
    /// Everything requested was already present.
    Unchanged,
}

impl Display for MergeOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreatedWord => write!(f, "created_word"),
            Self::CreatedTranslation => write!(f, "created_translation"),
            Self::AddedSentences(count) => write!(f, "added_sentences:{count}"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Use-case facade over a transactional dictionary repository.
///
/// A call's deadline is the store's connection acquire timeout plus its lock
/// busy timeout; expiry rolls back and returns `Timeout`.
pub struct DictionaryService<R: TransactionalRepository> {
    repo: R,
}

impl<R: TransactionalRepository> DictionaryService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates `polish` with `translation`, or folds the request into what
    /// already exists.
    ///
    /// # Contract
    /// - Runs under exclusive locks on the word and translation tables.
    /// - Missing word: inserts word, translation and all sentences.
    /// - Missing translation: attaches it with all sentences.
    /// - Both present: inserts only sentences not attached yet.
    /// - Repeated sentences in the request are collapsed first.
    pub fn merge_word(
        &self,
        polish: &str,
        translation: &NewTranslation,
    ) -> DictionaryResult<MergeOutcome> {
        let started_at = Instant::now();
        let requested = NewTranslation {
            english: translation.english.clone(),
            sentences: translation.distinct_sentences(),
        };

        let result = self
            .repo
            .with_transaction(TxMode::Locked(TableLocks::ALL), |tx| {
                let word = match tx.get_word(polish) {
                    Ok(word) => word,
                    Err(DictionaryError::WordNotExists { .. }) => {
                        tx.add_word(&NewWord::with_translation(polish, requested.clone()))?;
                        return Ok(MergeOutcome::CreatedWord);
                    }
                    Err(err) => return Err(err),
                };

                match tx.get_translation(polish, requested.english.as_str()) {
                    Ok(existing) => {
                        let missing: Vec<String> = requested
                            .sentences
                            .iter()
                            .filter(|text| !existing.has_sentence(text))
                            .cloned()
                            .collect();
                        if missing.is_empty() {
                            return Ok(MergeOutcome::Unchanged);
                        }
                        tx.add_sentences(polish, &existing, &missing)?;
                        Ok(MergeOutcome::AddedSentences(missing.len()))
                    }
                    Err(DictionaryError::TranslationNotExists { .. }) => {
                        tx.add_translation(&word, &requested)?;
                        Ok(MergeOutcome::CreatedTranslation)
                    }
                    Err(err) => Err(err),
                }
            });

        if let Ok(outcome) = &result {
            debug!(
                "event=word_merge module=service status=ok outcome={} requested_sentences={}",
                outcome,
                requested.sentences.len()
            );
        }
        finish("word_merge", started_at, result)
    }

    /// Create-or-merge returning only whether the transaction committed.
    pub fn create_word(
        &self,
        polish: &str,
        translation: &NewTranslation,
    ) -> DictionaryResult<bool> {
        self.merge_word(polish, translation).map(|_| true)
    }

    /// Attaches a new translation to an existing word.
    ///
    /// Fails with `WordNotExists` or `TranslationAlreadyExists`; never merges.
    pub fn create_translation(
        &self,
        polish: &str,
        translation: &NewTranslation,
    ) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let requested = NewTranslation {
            english: translation.english.clone(),
            sentences: translation.distinct_sentences(),
        };
        let result = self.repo.with_transaction(TxMode::ReadWrite, |tx| {
            let word = tx.get_word(polish)?;
            tx.add_translation(&word, &requested)?;
            Ok(true)
        });
        finish("translation_create", started_at, result)
    }

    /// Attaches one example sentence to an existing translation.
    pub fn create_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &str,
    ) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let result = self.repo.with_transaction(TxMode::ReadWrite, |tx| {
            let translation = tx.get_translation(polish, english)?;
            tx.add_sentence(polish, &translation, sentence)?;
            Ok(true)
        });
        finish("sentence_create", started_at, result)
    }

    /// Deletes a word with its whole subtree. Missing words are a no-op.
    pub fn delete_word(&self, polish: &str) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let result = self
            .repo
            .with_transaction(TxMode::ReadWrite, |tx| tx.delete_word(polish));

        let result = result.map(|rows| {
            if rows == 0 {
                debug!("event=word_delete module=service status=noop");
            }
            true
        });
        finish("word_delete", started_at, result)
    }

    /// Deletes a translation; removes the word too when it was the last one.
    ///
    /// A missing word or translation, or a row removed concurrently between
    /// lookup and delete, is a no-op.
    pub fn delete_translation(&self, polish: &str, english: &str) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let result = self.repo.with_transaction(TxMode::ReadWrite, |tx| {
            let translation = match tx.get_translation(polish, english) {
                Ok(translation) => translation,
                Err(err) if err.is_not_exists() => return Ok(None),
                Err(err) => return Err(err),
            };
            tx.delete_translation(&translation).map(Some)
        });

        let result = result.map(|removal| {
            match removal {
                Some(removal) if removal.translation_deleted => debug!(
                    "event=translation_delete module=service status=ok word_deleted={}",
                    removal.word_deleted
                ),
                _ => debug!("event=translation_delete module=service status=noop"),
            }
            true
        });
        finish("translation_delete", started_at, result)
    }

    /// Deletes one example sentence. Missing sentences are a no-op.
    pub fn delete_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &str,
    ) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let result = self.repo.with_transaction(TxMode::ReadWrite, |tx| {
            let found = match tx.get_sentence(polish, english, sentence) {
                Ok(found) => found,
                Err(err) if err.is_not_exists() => return Ok(0),
                Err(err) => return Err(err),
            };
            tx.delete_sentence(&found)
        });

        let result = result.map(|rows| {
            if rows == 0 {
                debug!("event=sentence_delete module=service status=noop");
            }
            true
        });
        finish("sentence_delete", started_at, result)
    }

    /// Renames a word.
    ///
    /// # Errors
    /// - `WordNotExists` when `polish` is missing.
    /// - `WordAlreadyExists { polish: new_polish }` on collision.
    pub fn update_word(&self, polish: &str, new_polish: &str) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let result = self.repo.with_transaction(TxMode::ReadWrite, |tx| {
            let word = tx.get_word(polish)?;
            require_row(tx.update_word(&word, new_polish)?, EntityKey::Word { polish })
        });
        finish("word_update", started_at, result)
    }

    /// Renames the english text of a translation.
    pub fn update_translation(
        &self,
        polish: &str,
        english: &str,
        new_english: &str,
    ) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let result = self.repo.with_transaction(TxMode::ReadWrite, |tx| {
            let translation = tx.get_translation(polish, english)?;
            require_row(
                tx.update_translation(polish, &translation, new_english)?,
                EntityKey::Translation { polish, english },
            )
        });
        finish("translation_update", started_at, result)
    }

    /// Rewrites one example sentence.
    pub fn update_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &str,
        new_sentence: &str,
    ) -> DictionaryResult<bool> {
        let started_at = Instant::now();
        let result = self.repo.with_transaction(TxMode::ReadWrite, |tx| {
            let found = tx.get_sentence(polish, english, sentence)?;
            require_row(
                tx.update_sentence(polish, english, &found, new_sentence)?,
                EntityKey::Sentence {
                    polish,
                    english,
                    sentence,
                },
            )
        });
        finish("sentence_update", started_at, result)
    }

    /// Loads a word with its full translation/sentence subtree.
    pub fn select_word(&self, polish: &str) -> DictionaryResult<Word> {
        let started_at = Instant::now();
        let result = self
            .repo
            .with_transaction(TxMode::ReadOnly, |tx| tx.get_word(polish));
        finish("word_select", started_at, result)
    }
}

// The row was found by the lookup but vanished before the update ran.
fn require_row(changed: usize, key: EntityKey<'_>) -> DictionaryResult<bool> {
    if changed == 0 {
        return Err(key.not_exists());
    }
    Ok(true)
}

fn finish<T>(
    event: &'static str,
    started_at: Instant,
    result: DictionaryResult<T>,
) -> DictionaryResult<T> {
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event={event} module=service status=ok duration_ms={duration_ms}"),
        Err(err) if err.is_not_exists() || err.is_already_exists() => info!(
            "event={event} module=service status=rejected duration_ms={duration_ms} error_code={}",
            err.code()
        ),
        Err(err @ DictionaryError::Timeout(_)) => warn!(
            "event={event} module=service status=timeout duration_ms={duration_ms} error_code={}",
            err.code()
        ),
        Err(err) => error!(
            "event={event} module=service status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
    result
}
