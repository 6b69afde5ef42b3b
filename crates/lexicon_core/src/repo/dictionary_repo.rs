//! Dictionary repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Point lookups by natural key, with the full subtree for words.
//! - Inserts, single-field renames and deletes for all three levels.
//! - Transaction execution with the locking discipline requested by callers.
//!
//! # Invariants
//! - Lookup misses are reported as the most specific `*NotExists` variant.
//! - Removing the last translation of a word removes the word in the same
//!   transaction.
//! - Zero affected rows are reported as counts, not errors; the caller
//!   decides whether that is a lost race or a miss.

use crate::db::ConnectionPool;
use crate::error::{translate_write_error, DictionaryError, DictionaryResult, EntityKey};
use crate::model::entry::{NewTranslation, NewWord, RowId, Sentence, Translation, Word};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Tables a locked transaction takes an exclusive lock on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableLocks {
    pub word: bool,
    pub translation: bool,
}

impl TableLocks {
    pub const ALL: Self = Self::new(true, true);

    pub const fn new(word: bool, translation: bool) -> Self {
        Self { word, translation }
    }
}

impl Display for TableLocks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.word, self.translation) {
            (true, true) => write!(f, "words,translations"),
            (true, false) => write!(f, "words"),
            (false, true) => write!(f, "translations"),
            (false, false) => write!(f, "none"),
        }
    }
}

/// Locking discipline of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Lookups only.
    ReadOnly,
    /// Lookup-then-mutate of existing rows; relies on the engine's own write
    /// locking for the touched rows.
    ReadWrite,
    /// Exclusive lock on whole tables for the transaction's duration, for
    /// paths that must guard rows which may not exist yet.
    Locked(TableLocks),
}

impl TxMode {
    /// SQLite has no table or row locks. Any transaction that may write takes
    /// the database writer lock up front; a deferred read-then-write upgrade
    /// fails with `SQLITE_BUSY` instead of waiting when it races.
    fn behavior(self) -> TransactionBehavior {
        match self {
            Self::ReadOnly => TransactionBehavior::Deferred,
            Self::ReadWrite | Self::Locked(_) => TransactionBehavior::Immediate,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
            Self::Locked(_) => "locked",
        }
    }
}

/// Result of removing one translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationRemoval {
    /// `false` when another transaction removed the row first.
    pub translation_deleted: bool,
    /// `true` when the owning word had no translations left and was removed.
    pub word_deleted: bool,
}

/// Natural-key data access used inside one transaction.
pub trait DictionaryRepository {
    /// Loads a word with all translations and their sentences.
    fn get_word(&self, polish: &str) -> DictionaryResult<Word>;
    /// Loads one translation (with sentences) by word and english text.
    fn get_translation(&self, polish: &str, english: &str) -> DictionaryResult<Translation>;
    fn get_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &str,
    ) -> DictionaryResult<Sentence>;

    /// Inserts a word together with its nested translations and sentences.
    fn add_word(&self, word: &NewWord) -> DictionaryResult<Word>;
    /// Inserts a translation (and its sentences) under an existing word.
    fn add_translation(
        &self,
        word: &Word,
        translation: &NewTranslation,
    ) -> DictionaryResult<Translation>;
    /// Batch-inserts sentences under an existing translation.
    fn add_sentences(
        &self,
        polish: &str,
        translation: &Translation,
        sentences: &[String],
    ) -> DictionaryResult<Vec<Sentence>>;

    fn add_sentence(
        &self,
        polish: &str,
        translation: &Translation,
        sentence: &str,
    ) -> DictionaryResult<Sentence> {
        self.add_sentences(polish, translation, &[sentence.to_string()])?
            .pop()
            .ok_or_else(|| DictionaryError::InvalidData("sentence insert returned no row".into()))
    }

    /// Deletes a word and, by cascade, its subtree. Returns affected rows.
    fn delete_word(&self, polish: &str) -> DictionaryResult<usize>;
    /// Deletes a translation and removes its word if it was the last one.
    fn delete_translation(&self, translation: &Translation)
        -> DictionaryResult<TranslationRemoval>;
    fn delete_sentence(&self, sentence: &Sentence) -> DictionaryResult<usize>;

    /// Renames a word. Collisions report the new text.
    fn update_word(&self, word: &Word, new_polish: &str) -> DictionaryResult<usize>;
    fn update_translation(
        &self,
        polish: &str,
        translation: &Translation,
        new_english: &str,
    ) -> DictionaryResult<usize>;
    fn update_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &Sentence,
        new_sentence: &str,
    ) -> DictionaryResult<usize>;
}

/// Runs repository calls inside a transaction.
pub trait TransactionalRepository {
    /// Executes `f` against a fresh transactional repository.
    ///
    /// # Contract
    /// - `Ok` from `f` commits; `Err` rolls back and is returned unchanged.
    /// - A panic inside `f` rolls back before it propagates.
    /// - `TxMode::Locked` acquires the table locks before `f` runs.
    /// - Lock waits end at the connection's busy timeout (`lock_timeout`),
    ///   which fails the call with `Timeout(Lock)`.
    fn with_transaction<T, F>(&self, mode: TxMode, f: F) -> DictionaryResult<T>
    where
        F: FnOnce(&dyn DictionaryRepository) -> DictionaryResult<T>;
}

/// SQLite-backed repository bound to one connection or open transaction.
pub struct SqliteDictionaryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDictionaryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Works out which level of a missed joined lookup is absent.
    fn missing(&self, key: EntityKey<'_>) -> DictionaryError {
        self.locate_missing(key).unwrap_or_else(|err| err)
    }

    fn locate_missing(&self, key: EntityKey<'_>) -> DictionaryResult<DictionaryError> {
        let (polish, english) = match key {
            EntityKey::Word { .. } => return Ok(key.not_exists()),
            EntityKey::Translation { polish, english } => (polish, english),
            EntityKey::Sentence {
                polish, english, ..
            } => (polish, english),
        };

        let Some(word_id) = find_word_id(self.conn, polish)? else {
            return Ok(EntityKey::Word { polish }.not_exists());
        };

        let translation_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM translations WHERE word_id = ?1 AND english = ?2
            );",
            params![word_id, english],
            |row| row.get(0),
        )?;
        if translation_exists == 0 {
            return Ok(EntityKey::Translation { polish, english }.not_exists());
        }

        Ok(key.not_exists())
    }

    fn insert_translation(
        &self,
        polish: &str,
        word_id: RowId,
        translation: &NewTranslation,
    ) -> DictionaryResult<Translation> {
        let key = EntityKey::Translation {
            polish,
            english: translation.english.as_str(),
        };
        self.conn
            .execute(
                "INSERT INTO translations (word_id, english) VALUES (?1, ?2);",
                params![word_id, translation.english.as_str()],
            )
            .map_err(|err| translate_write_error(key, err))?;

        let mut inserted = Translation {
            id: self.conn.last_insert_rowid(),
            word_id,
            english: translation.english.clone(),
            sentences: Vec::new(),
        };
        inserted.sentences =
            self.insert_sentences(polish, &inserted, &translation.sentences)?;
        Ok(inserted)
    }

    fn insert_sentences(
        &self,
        polish: &str,
        translation: &Translation,
        sentences: &[String],
    ) -> DictionaryResult<Vec<Sentence>> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO sentences (translation_id, sentence) VALUES (?1, ?2);")?;
        let mut inserted = Vec::with_capacity(sentences.len());
        for text in sentences {
            let key = EntityKey::Sentence {
                polish,
                english: translation.english.as_str(),
                sentence: text.as_str(),
            };
            stmt.execute(params![translation.id, text.as_str()])
                .map_err(|err| translate_write_error(key, err))?;
            inserted.push(Sentence {
                id: self.conn.last_insert_rowid(),
                translation_id: translation.id,
                sentence: text.clone(),
            });
        }
        Ok(inserted)
    }
}

impl DictionaryRepository for SqliteDictionaryRepository<'_> {
    fn get_word(&self, polish: &str) -> DictionaryResult<Word> {
        let word = self
            .conn
            .query_row(
                "SELECT id, polish FROM words WHERE polish = ?1;",
                [polish],
                |row| {
                    Ok(Word {
                        id: row.get("id")?,
                        polish: row.get("polish")?,
                        translations: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut word) = word else {
            return Err(EntityKey::Word { polish }.not_exists());
        };
        word.translations = load_translations(self.conn, word.id)?;
        Ok(word)
    }

    fn get_translation(&self, polish: &str, english: &str) -> DictionaryResult<Translation> {
        let translation = self
            .conn
            .query_row(
                "SELECT t.id AS id, t.word_id AS word_id, t.english AS english
                 FROM translations t
                 INNER JOIN words w ON w.id = t.word_id
                 WHERE w.polish = ?1
                   AND t.english = ?2;",
                params![polish, english],
                parse_translation_row,
            )
            .optional()?;

        let Some(mut translation) = translation else {
            return Err(self.missing(EntityKey::Translation { polish, english }));
        };
        translation.sentences = load_sentences(self.conn, translation.id)?;
        Ok(translation)
    }

    fn get_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &str,
    ) -> DictionaryResult<Sentence> {
        let found = self
            .conn
            .query_row(
                "SELECT s.id AS id, s.translation_id AS translation_id, s.sentence AS sentence
                 FROM sentences s
                 INNER JOIN translations t ON t.id = s.translation_id
                 INNER JOIN words w ON w.id = t.word_id
                 WHERE w.polish = ?1
                   AND t.english = ?2
                   AND s.sentence = ?3;",
                params![polish, english, sentence],
                parse_sentence_row,
            )
            .optional()?;

        found.ok_or_else(|| {
            self.missing(EntityKey::Sentence {
                polish,
                english,
                sentence,
            })
        })
    }

    fn add_word(&self, word: &NewWord) -> DictionaryResult<Word> {
        let polish = word.polish.as_str();
        self.conn
            .execute("INSERT INTO words (polish) VALUES (?1);", [polish])
            .map_err(|err| translate_write_error(EntityKey::Word { polish }, err))?;
        let word_id = self.conn.last_insert_rowid();

        let mut translations = Vec::with_capacity(word.translations.len());
        for translation in &word.translations {
            translations.push(self.insert_translation(polish, word_id, translation)?);
        }

        Ok(Word {
            id: word_id,
            polish: word.polish.clone(),
            translations,
        })
    }

    fn add_translation(
        &self,
        word: &Word,
        translation: &NewTranslation,
    ) -> DictionaryResult<Translation> {
        self.insert_translation(word.polish.as_str(), word.id, translation)
    }

    fn add_sentences(
        &self,
        polish: &str,
        translation: &Translation,
        sentences: &[String],
    ) -> DictionaryResult<Vec<Sentence>> {
        self.insert_sentences(polish, translation, sentences)
    }

    fn delete_word(&self, polish: &str) -> DictionaryResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM words WHERE polish = ?1;", [polish])?;
        Ok(changed)
    }

    fn delete_translation(
        &self,
        translation: &Translation,
    ) -> DictionaryResult<TranslationRemoval> {
        let changed = self
            .conn
            .execute("DELETE FROM translations WHERE id = ?1;", [translation.id])?;

        let remaining: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM translations WHERE word_id = ?1;",
            [translation.word_id],
            |row| row.get(0),
        )?;

        let mut word_deleted = false;
        if remaining == 0 {
            word_deleted = self
                .conn
                .execute("DELETE FROM words WHERE id = ?1;", [translation.word_id])?
                > 0;
        }

        Ok(TranslationRemoval {
            translation_deleted: changed > 0,
            word_deleted,
        })
    }

    fn delete_sentence(&self, sentence: &Sentence) -> DictionaryResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM sentences WHERE id = ?1;", [sentence.id])?;
        Ok(changed)
    }

    fn update_word(&self, word: &Word, new_polish: &str) -> DictionaryResult<usize> {
        self.conn
            .execute(
                "UPDATE words SET polish = ?2 WHERE id = ?1;",
                params![word.id, new_polish],
            )
            .map_err(|err| translate_write_error(EntityKey::Word { polish: new_polish }, err))
    }

    fn update_translation(
        &self,
        polish: &str,
        translation: &Translation,
        new_english: &str,
    ) -> DictionaryResult<usize> {
        let key = EntityKey::Translation {
            polish,
            english: new_english,
        };
        self.conn
            .execute(
                "UPDATE translations SET english = ?2 WHERE id = ?1;",
                params![translation.id, new_english],
            )
            .map_err(|err| translate_write_error(key, err))
    }

    fn update_sentence(
        &self,
        polish: &str,
        english: &str,
        sentence: &Sentence,
        new_sentence: &str,
    ) -> DictionaryResult<usize> {
        let key = EntityKey::Sentence {
            polish,
            english,
            sentence: new_sentence,
        };
        self.conn
            .execute(
                "UPDATE sentences SET sentence = ?2 WHERE id = ?1;",
                params![sentence.id, new_sentence],
            )
            .map_err(|err| translate_write_error(key, err))
    }
}

/// Transactional SQLite store: one pooled connection per transaction.
pub struct SqliteDictionaryStore {
    pool: ConnectionPool,
}

impl SqliteDictionaryStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl TransactionalRepository for SqliteDictionaryStore {
    fn with_transaction<T, F>(&self, mode: TxMode, f: F) -> DictionaryResult<T>
    where
        F: FnOnce(&dyn DictionaryRepository) -> DictionaryResult<T>,
    {
        let started_at = Instant::now();
        let mut conn = self.pool.acquire()?;

        // Dropping `tx` on any early return or unwind rolls it back.
        let tx = conn
            .transaction_with_behavior(mode.behavior())
            .map_err(|err| {
                warn!(
                    "event=tx_begin module=repo status=error mode={} waited_ms={} error={}",
                    mode.label(),
                    started_at.elapsed().as_millis(),
                    err
                );
                DictionaryError::from(err)
            })?;
        if let TxMode::Locked(locks) = mode {
            debug!(
                "event=table_lock module=repo status=ok tables={} waited_ms={}",
                locks,
                started_at.elapsed().as_millis()
            );
        }

        let outcome = f(&SqliteDictionaryRepository::new(&tx));
        match outcome {
            Ok(value) => {
                tx.commit()?;
                debug!(
                    "event=tx_commit module=repo status=ok mode={} duration_ms={}",
                    mode.label(),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=tx_rollback module=repo status=error mode={} error={}",
                        mode.label(),
                        rollback_err
                    );
                }
                debug!(
                    "event=tx_rollback module=repo status=ok mode={} duration_ms={}",
                    mode.label(),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}

fn find_word_id(conn: &Connection, polish: &str) -> DictionaryResult<Option<RowId>> {
    let id = conn
        .query_row("SELECT id FROM words WHERE polish = ?1;", [polish], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}

fn load_translations(conn: &Connection, word_id: RowId) -> DictionaryResult<Vec<Translation>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, word_id, english
         FROM translations
         WHERE word_id = ?1
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([word_id])?;
    let mut translations = Vec::new();
    while let Some(row) = rows.next()? {
        translations.push(parse_translation_row(row)?);
    }

    for translation in &mut translations {
        translation.sentences = load_sentences(conn, translation.id)?;
    }
    Ok(translations)
}

fn load_sentences(conn: &Connection, translation_id: RowId) -> DictionaryResult<Vec<Sentence>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, translation_id, sentence
         FROM sentences
         WHERE translation_id = ?1
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([translation_id])?;
    let mut sentences = Vec::new();
    while let Some(row) = rows.next()? {
        sentences.push(parse_sentence_row(row)?);
    }
    Ok(sentences)
}

fn parse_translation_row(row: &Row<'_>) -> rusqlite::Result<Translation> {
    Ok(Translation {
        id: row.get("id")?,
        word_id: row.get("word_id")?,
        english: row.get("english")?,
        sentences: Vec::new(),
    })
}

fn parse_sentence_row(row: &Row<'_>) -> rusqlite::Result<Sentence> {
    Ok(Sentence {
        id: row.get("id")?,
        translation_id: row.get("translation_id")?,
        sentence: row.get("sentence")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{TableLocks, TxMode};
    use rusqlite::TransactionBehavior;

    #[test]
    fn table_locks_name_the_locked_tables() {
        assert_eq!(TableLocks::ALL.to_string(), "words,translations");
        assert_eq!(TableLocks::new(true, false).to_string(), "words");
        assert_eq!(TableLocks::default().to_string(), "none");
    }

    #[test]
    fn only_read_only_transactions_begin_deferred() {
        assert!(matches!(
            TxMode::ReadOnly.behavior(),
            TransactionBehavior::Deferred
        ));
        assert!(matches!(
            TxMode::ReadWrite.behavior(),
            TransactionBehavior::Immediate
        ));
        assert!(matches!(
            TxMode::Locked(TableLocks::ALL).behavior(),
            TransactionBehavior::Immediate
        ));
    }
}
