use std::sync::Arc;

use comgov_core::module::ModuleId;
use comgov_db::Database;
use comgov_db::ctx::WriteTransactionCtx;
pub use comgov_db::error::{DbError, DbResult, DbTxError, DbTxResult};
use redb_bincode::redb::{TableError, TableHandle as _};
use redb_bincode::{ReadOnlyTable, ReadTransaction, ReadableTable, Table, TableDefinition};

/// Access to the part of the [`Database`] owned by one module instance
///
/// Every table a module opens is transparently renamed to
/// `module_{module_id}_{name}`, so two instances of the same module kind
/// never see each other's state.
#[derive(Clone)]
pub struct ModuleDatabase {
    module_id: ModuleId,
    inner: Arc<Database>,
}

fn module_table_name(module_id: ModuleId, name: &str) -> String {
    format!("module_{module_id}_{name}")
}

impl ModuleDatabase {
    pub fn new(module_id: ModuleId, db: Arc<Database>) -> Self {
        Self {
            module_id,
            inner: db,
        }
    }

    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    fn scope_write<'s>(&self, ctx: &'s WriteTransactionCtx) -> ModuleWriteTransactionCtx<'s> {
        ModuleWriteTransactionCtx::new(self.module_id, ctx)
    }

    pub async fn write_with<T>(
        &self,
        f: impl FnOnce(&'_ ModuleWriteTransactionCtx) -> DbResult<T>,
    ) -> DbResult<T> {
        self.inner.write_with(|ctx| f(&self.scope_write(ctx))).await
    }

    /// Like [`Database::write_with_expect_falliable`], scoped to the module
    pub async fn write_with_expect_falliable<T, E>(
        &self,
        f: impl FnOnce(&'_ ModuleWriteTransactionCtx) -> DbTxResult<T, E>,
    ) -> Result<T, E>
    where
        E: snafu::Error + 'static,
    {
        self.inner
            .write_with_expect_falliable(|ctx| f(&self.scope_write(ctx)))
            .await
    }

    pub async fn write_with_expect<T>(
        &self,
        f: impl FnOnce(&'_ ModuleWriteTransactionCtx) -> DbResult<T>,
    ) -> T {
        self.inner
            .write_with_expect(|ctx| f(&self.scope_write(ctx)))
            .await
    }

    pub async fn read_with_expect<T>(
        &self,
        f: impl FnOnce(&'_ ModuleReadTransaction) -> DbResult<T>,
    ) -> T {
        let module_id = self.module_id;
        self.inner
            .read_with_expect(|ctx| f(&ModuleReadTransaction::new(module_id, ctx)))
            .await
    }
}

pub struct ModuleWriteTransactionCtx<'a> {
    module_id: ModuleId,
    inner: &'a WriteTransactionCtx,
}

impl<'s> ModuleWriteTransactionCtx<'s> {
    pub fn new(module_id: ModuleId, inner: &'s WriteTransactionCtx) -> Self {
        Self { module_id, inner }
    }

    pub fn open_table<K, V>(
        &self,
        table_def: &TableDefinition<'_, K, V>,
    ) -> Result<Table<'s, K, V>, TableError>
    where
        K: bincode::Encode + bincode::Decode<()>,
        V: bincode::Encode + bincode::Decode<()>,
    {
        self.inner.open_table(&TableDefinition::new(&module_table_name(
            self.module_id,
            table_def.as_raw().name(),
        )))
    }

    pub fn on_commit(&self, f: impl FnOnce() + 'static) {
        self.inner.on_commit(f);
    }

    /// The whole transaction, not scoped to this module
    ///
    /// Needed to hand the transaction over to code of other modules, e.g.
    /// proposal execution handlers.
    pub fn raw(&self) -> &'s WriteTransactionCtx {
        self.inner
    }
}

pub struct ModuleReadTransaction<'a> {
    module_id: ModuleId,
    inner: &'a ReadTransaction,
}

impl<'s> ModuleReadTransaction<'s> {
    pub fn new(module_id: ModuleId, inner: &'s ReadTransaction) -> Self {
        Self { module_id, inner }
    }
}

/// Read access shared by read and write transactions
///
/// Query helpers are written against this, so they can be used both to
/// serve reads and inside state transitions.
pub trait ModuleReadableTransaction<'s> {
    type Table<K, V>: ReadableTable<K, V>
    where
        K: bincode::Encode + bincode::Decode<()>,
        V: bincode::Encode + bincode::Decode<()>;

    fn open_table<K, V>(
        &self,
        table_def: &TableDefinition<'_, K, V>,
    ) -> Result<Self::Table<K, V>, TableError>
    where
        K: bincode::Encode + bincode::Decode<()>,
        V: bincode::Encode + bincode::Decode<()>;
}

impl<'s> ModuleReadableTransaction<'s> for ModuleReadTransaction<'s> {
    type Table<K, V>
        = ReadOnlyTable<K, V>
    where
        K: bincode::Encode + bincode::Decode<()>,
        V: bincode::Encode + bincode::Decode<()>;

    fn open_table<K, V>(
        &self,
        table_def: &TableDefinition<'_, K, V>,
    ) -> Result<ReadOnlyTable<K, V>, TableError>
    where
        K: bincode::Encode + bincode::Decode<()>,
        V: bincode::Encode + bincode::Decode<()>,
    {
        self.inner.open_table(&TableDefinition::new(&module_table_name(
            self.module_id,
            table_def.as_raw().name(),
        )))
    }
}

impl<'s> ModuleReadableTransaction<'s> for ModuleWriteTransactionCtx<'s> {
    type Table<K, V>
        = Table<'s, K, V>
    where
        K: bincode::Encode + bincode::Decode<()>,
        V: bincode::Encode + bincode::Decode<()>;

    fn open_table<K, V>(
        &self,
        table_def: &TableDefinition<'_, K, V>,
    ) -> Result<Table<'s, K, V>, TableError>
    where
        K: bincode::Encode + bincode::Decode<()>,
        V: bincode::Encode + bincode::Decode<()>,
    {
        ModuleWriteTransactionCtx::open_table(self, table_def)
    }
}
