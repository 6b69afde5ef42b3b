//! Transactional Polish-English dictionary store.
//! Words own translations, translations own example sentences, and every
//! service operation runs as one database transaction.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DictionaryConfig};
pub use db::{ConnectionPool, DbError, PoolConfig};
pub use error::{DictionaryError, DictionaryResult, TimeoutStage};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entry::{NewTranslation, NewWord, RowId, Sentence, Translation, Word};
pub use model::view::{SentenceView, TranslationView, WordView};
pub use repo::dictionary_repo::{
    DictionaryRepository, SqliteDictionaryRepository, SqliteDictionaryStore, TableLocks,
    TransactionalRepository, TranslationRemoval, TxMode,
};
pub use repo::scripted_repo::{RepoCall, Scripted, ScriptedRepository};
pub use service::dictionary_service::{DictionaryService, MergeOutcome};

use log::info;

/// Builds the pool, store and service described by `config`.
///
/// A file path yields a pool of up to `pool_size` connections. Without a
/// path the service runs on a single private in-memory connection.
pub fn open_service(
    config: &DictionaryConfig,
) -> DictionaryResult<DictionaryService<SqliteDictionaryStore>> {
    let pool = match &config.db_path {
        Some(path) => ConnectionPool::open(path, config.pool_config())?,
        None => ConnectionPool::in_memory_with(config.pool_config())?,
    };
    info!(
        "event=service_open module=core status=ok file_backed={} pool_size={}",
        pool.is_file_backed(),
        pool.config().max_size
    );
    Ok(DictionaryService::new(SqliteDictionaryStore::new(pool)))
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
