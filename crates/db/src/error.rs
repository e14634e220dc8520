//! Errors of the storage layer

use std::io;
use std::path::PathBuf;

use redb_bincode::redb;
use snafu::{Location, Snafu};

/// Failure of the storage itself
///
/// Never a logical failure of a state transition; for the state machine
/// these are fatal.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DbError {
    #[snafu(display("Failed to open database at {}", path.display()))]
    Open {
        path: PathBuf,
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Failed to create in-memory database"))]
    InMemory {
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Database path {} has no parent directory", path.display()))]
    InvalidPath {
        path: PathBuf,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Failed to create directory {}", dir.display()))]
    CreateDir {
        dir: PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Failed to begin transaction"))]
    Begin {
        source: redb::TransactionError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Failed to commit transaction"))]
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type DbResult<T> = std::result::Result<T, DbError>;

/// Error of a state transition running in a database transaction
///
/// `DbError` is the storage failing underneath; `TxError` is the transition
/// itself refusing to proceed with `E` (a rejected citem, a failed proposal
/// execution). Either way nothing of the transaction is committed.
///
/// Nested transition functions with different `E` are glued together with
/// [`DbTxError::map`] or [`DbTxError::tx_into`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DbTxError<E>
where
    E: snafu::Error + 'static,
{
    #[snafu(transparent)]
    DbError {
        source: DbError,

        #[snafu(implicit)]
        location: Location,
    },
    TxError {
        source: E,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type DbTxResult<T, E> = std::result::Result<T, DbTxError<E>>;

impl<E> From<redb::TableError> for DbTxError<E>
where
    E: snafu::Error,
{
    fn from(value: redb::TableError) -> Self {
        DbError::from(value).into()
    }
}

impl<E> From<redb::StorageError> for DbTxError<E>
where
    E: snafu::Error,
{
    fn from(value: redb::StorageError) -> Self {
        DbError::from(value).into()
    }
}

impl<E> DbTxError<E>
where
    E: snafu::Error,
{
    pub fn map<E2>(self, f: impl FnOnce(E) -> E2) -> DbTxError<E2>
    where
        E2: snafu::Error,
    {
        match self {
            DbTxError::DbError { source, location } => DbTxError::DbError { source, location },
            DbTxError::TxError { source, location } => DbTxError::TxError {
                source: f(source),
                location,
            },
        }
    }

    pub fn tx_into<E2>(self) -> DbTxError<E2>
    where
        E2: From<E> + snafu::Error,
    {
        self.map(E2::from)
    }
}
