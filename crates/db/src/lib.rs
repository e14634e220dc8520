// SPDX-License-Identifier: MIT

//! Transactional storage of the governance state machine
//!
//! A thin layer over `redb` (through `redb-bincode`) which runs every state
//! transition inside a closure executed in a single read or write
//! transaction. Write transactions are exclusive, which is what gives the
//! state machine its strictly sequential, deterministic semantics.

pub mod ctx;
pub mod error;

use std::path::PathBuf;
use std::sync::Arc;

use comgov_util_error::fmt::FmtCompact as _;
use ctx::WriteTransactionCtx;
use error::{
    BeginSnafu, CommitSnafu, CreateDirSnafu, DbError, DbResult, DbTxError, DbTxResult,
    InMemorySnafu, InvalidPathSnafu, OpenSnafu,
};
use redb_bincode::{ReadTransaction, redb};
use snafu::{OptionExt as _, ResultExt as _};
use tracing::{debug, instrument, warn};

const LOG_TARGET: &str = "comgov::db";

#[derive(Debug)]
pub struct Database {
    inner: redb_bincode::Database,
    hook_order: Arc<std::sync::Mutex<()>>,
    ephemeral: bool,
}

impl Database {
    pub async fn new_in_memory() -> DbResult<Database> {
        debug!(target: LOG_TARGET, "Opening in-memory database");
        let inner = redb::Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .context(InMemorySnafu)?;
        Self::open_inner(inner, true).await
    }

    pub async fn open(path: impl Into<PathBuf>) -> DbResult<Database> {
        let path = path.into();
        let dir = path.parent().context(InvalidPathSnafu { path: &path })?;
        tokio::fs::create_dir_all(dir)
            .await
            .context(CreateDirSnafu { dir })?;
        debug!(target: LOG_TARGET, path = %path.display(), "Opening database…");

        let inner = tokio::task::block_in_place(|| {
            let mut db = redb::Database::create(&path)?;
            let _ = db.compact().inspect_err(|err| {
                warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Failed to compact database");
            });
            Ok::<_, redb::DatabaseError>(db)
        })
        .context(OpenSnafu { path: &path })?;

        Self::open_inner(inner, false).await
    }

    #[instrument(skip_all)]
    async fn open_inner(inner: redb::Database, ephemeral: bool) -> DbResult<Database> {
        Ok(Self {
            inner: redb_bincode::Database::from(inner),
            hook_order: Arc::new(std::sync::Mutex::new(())),
            ephemeral,
        })
    }

    fn write_with_inner<T, E>(
        &self,
        f: impl FnOnce(&'_ WriteTransactionCtx) -> DbTxResult<T, E>,
    ) -> DbTxResult<T, E>
    where
        E: snafu::Error + 'static,
    {
        tokio::task::block_in_place(|| {
            let dbtx = WriteTransactionCtx::new(
                self.inner.begin_write().context(BeginSnafu)?,
                self.hook_order.clone(),
            );
            // On error `dbtx` is dropped here, which aborts the transaction
            let res = f(&dbtx)?;
            dbtx.commit().context(CommitSnafu)?;

            Ok(res)
        })
    }

    fn read_with_inner<T, E>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> DbTxResult<T, E>,
    ) -> DbTxResult<T, E>
    where
        E: snafu::Error + 'static,
    {
        tokio::task::block_in_place(|| {
            let dbtx = self.inner.begin_read().context(BeginSnafu)?;
            f(&dbtx)
        })
    }

    pub async fn write_with<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransactionCtx) -> DbResult<T>,
    ) -> DbResult<T> {
        self.write_with_inner::<T, DbError>(|dbtx| Ok(f(dbtx)?))
            .map_err(flatten_db_error)
    }

    /// Do a writeable database transaction that can fail for logical reasons
    ///
    /// Logical failures (`E`) abort the transaction and are returned.
    /// Internal database errors panic: a replicated state machine that
    /// can't persist state must not continue.
    pub async fn write_with_expect_falliable<T, E>(
        &self,
        f: impl FnOnce(&'_ WriteTransactionCtx) -> DbTxResult<T, E>,
    ) -> Result<T, E>
    where
        E: snafu::Error + 'static,
    {
        expect_db(self.write_with_inner(f))
    }

    /// Do a writeable database transaction and panic on internal db errors
    ///
    /// If the handler `f` can fail for logical reasons, use
    /// [`Self::write_with_expect_falliable`]
    pub async fn write_with_expect<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransactionCtx) -> DbResult<T>,
    ) -> T {
        self.write_with(f).await.expect("Fatal database error")
    }

    pub async fn read_with<T>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        self.read_with_inner::<T, DbError>(|dbtx| Ok(f(dbtx)?))
            .map_err(flatten_db_error)
    }

    pub async fn read_with_expect_falliable<T, E>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> DbTxResult<T, E>,
    ) -> Result<T, E>
    where
        E: snafu::Error + 'static,
    {
        expect_db(self.read_with_inner(f))
    }

    pub async fn read_with_expect<T>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> DbResult<T>,
    ) -> T {
        self.read_with(f).await.expect("Fatal database error")
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

fn flatten_db_error(err: DbTxError<DbError>) -> DbError {
    match err {
        DbTxError::DbError { source, .. } | DbTxError::TxError { source, .. } => source,
    }
}

fn expect_db<T, E>(res: DbTxResult<T, E>) -> Result<T, E>
where
    E: snafu::Error + 'static,
{
    match res {
        Ok(o) => Ok(o),
        Err(DbTxError::DbError { source, location }) => {
            panic!("Database error: {} at {location}", source.fmt_compact())
        }
        Err(DbTxError::TxError {
            source,
            location: _,
        }) => Err(source),
    }
}
