//! Dictionary error taxonomy.
//!
//! # Responsibility
//! - Name every lookup miss and uniqueness violation per entity kind.
//! - Translate low-level SQLite signals into those domain errors.
//!
//! # Invariants
//! - Lookup misses become `*NotExists` at the point of lookup.
//! - Uniqueness violations become `*AlreadyExists` carrying the attempted
//!   (target) value, never the value being replaced.
//! - Anything unrecognized stays opaque in `Db`.

use crate::db::DbError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DictionaryResult<T> = Result<T, DictionaryError>;

/// Which wait ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStage {
    /// Waiting for a pooled connection.
    Connection,
    /// Waiting for a storage lock held by another transaction.
    Lock,
}

#[derive(Debug)]
pub enum DictionaryError {
    WordNotExists {
        polish: String,
    },
    TranslationNotExists {
        polish: String,
        english: String,
    },
    SentenceNotExists {
        polish: String,
        english: String,
        sentence: String,
    },
    WordAlreadyExists {
        polish: String,
    },
    TranslationAlreadyExists {
        polish: String,
        english: String,
    },
    SentenceAlreadyExists {
        polish: String,
        english: String,
        sentence: String,
    },
    /// The operation was aborted and rolled back after waiting too long.
    Timeout(TimeoutStage),
    /// Persisted or scripted data could not be turned into entities.
    InvalidData(String),
    Db(DbError),
}

impl DictionaryError {
    /// Returns `true` for any of the `*NotExists` variants.
    pub fn is_not_exists(&self) -> bool {
        matches!(
            self,
            Self::WordNotExists { .. }
                | Self::TranslationNotExists { .. }
                | Self::SentenceNotExists { .. }
        )
    }

    /// Returns `true` for any of the `*AlreadyExists` variants.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::WordAlreadyExists { .. }
                | Self::TranslationAlreadyExists { .. }
                | Self::SentenceAlreadyExists { .. }
        )
    }

    /// Stable identifier used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WordNotExists { .. } => "word_not_exists",
            Self::TranslationNotExists { .. } => "translation_not_exists",
            Self::SentenceNotExists { .. } => "sentence_not_exists",
            Self::WordAlreadyExists { .. } => "word_already_exists",
            Self::TranslationAlreadyExists { .. } => "translation_already_exists",
            Self::SentenceAlreadyExists { .. } => "sentence_already_exists",
            Self::Timeout(TimeoutStage::Connection) => "connection_timeout",
            Self::Timeout(TimeoutStage::Lock) => "lock_timeout",
            Self::InvalidData(_) => "invalid_data",
            Self::Db(_) => "db_error",
        }
    }

    /// Message suitable for end users.
    ///
    /// Domain errors name the word/translation/sentence involved; storage
    /// failures collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(_) => "The dictionary is busy, please try again".to_string(),
            Self::InvalidData(_) | Self::Db(_) => {
                "The dictionary could not complete the request".to_string()
            }
            domain => domain.to_string(),
        }
    }
}

impl Display for DictionaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WordNotExists { polish } => {
                write!(f, "word `{polish}` is not in the dictionary")
            }
            Self::TranslationNotExists { polish, english } => write!(
                f,
                "translation `{english}` of word `{polish}` is not in the dictionary"
            ),
            Self::SentenceNotExists {
                polish,
                english,
                sentence,
            } => write!(
                f,
                "sentence `{sentence}` for translation `{english}` of word `{polish}` is not in the dictionary"
            ),
            Self::WordAlreadyExists { polish } => {
                write!(f, "word `{polish}` is already in the dictionary")
            }
            Self::TranslationAlreadyExists { polish, english } => write!(
                f,
                "translation `{english}` is already attached to word `{polish}`"
            ),
            Self::SentenceAlreadyExists {
                polish,
                english,
                sentence,
            } => write!(
                f,
                "sentence `{sentence}` is already attached to translation `{english}` of word `{polish}`"
            ),
            Self::Timeout(TimeoutStage::Connection) => {
                write!(f, "timed out waiting for a database connection")
            }
            Self::Timeout(TimeoutStage::Lock) => {
                write!(f, "timed out waiting for a database lock")
            }
            Self::InvalidData(message) => write!(f, "invalid dictionary data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DictionaryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for DictionaryError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::PoolTimeout { .. } => Self::Timeout(TimeoutStage::Connection),
            DbError::Sqlite(err) if is_busy(&err) => Self::Timeout(TimeoutStage::Lock),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for DictionaryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

/// Natural-key path of the entity a read or write was attempted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKey<'a> {
    Word {
        polish: &'a str,
    },
    Translation {
        polish: &'a str,
        english: &'a str,
    },
    Sentence {
        polish: &'a str,
        english: &'a str,
        sentence: &'a str,
    },
}

impl EntityKey<'_> {
    pub fn not_exists(self) -> DictionaryError {
        match self {
            Self::Word { polish } => DictionaryError::WordNotExists {
                polish: polish.to_string(),
            },
            Self::Translation { polish, english } => DictionaryError::TranslationNotExists {
                polish: polish.to_string(),
                english: english.to_string(),
            },
            Self::Sentence {
                polish,
                english,
                sentence,
            } => DictionaryError::SentenceNotExists {
                polish: polish.to_string(),
                english: english.to_string(),
                sentence: sentence.to_string(),
            },
        }
    }

    pub fn already_exists(self) -> DictionaryError {
        match self {
            Self::Word { polish } => DictionaryError::WordAlreadyExists {
                polish: polish.to_string(),
            },
            Self::Translation { polish, english } => {
                DictionaryError::TranslationAlreadyExists {
                    polish: polish.to_string(),
                    english: english.to_string(),
                }
            }
            Self::Sentence {
                polish,
                english,
                sentence,
            } => DictionaryError::SentenceAlreadyExists {
                polish: polish.to_string(),
                english: english.to_string(),
                sentence: sentence.to_string(),
            },
        }
    }
}

/// Translates a failed insert/update of `key` into the domain taxonomy.
///
/// A uniqueness violation becomes the `AlreadyExists` variant for `key`;
/// lock waits become `Timeout(Lock)`; everything else is returned as `Db`.
pub fn translate_write_error(key: EntityKey<'_>, err: rusqlite::Error) -> DictionaryError {
    if is_unique_violation(&err) {
        return key.already_exists();
    }
    DictionaryError::from(err)
}

/// Returns whether `err` is SQLite rejecting a duplicate key.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
