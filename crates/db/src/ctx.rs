use std::cell::RefCell;
use std::ops;
use std::sync::{Arc, Mutex};

use redb_bincode::{WriteTransaction, redb};

type CommitHook = Box<dyn FnOnce() + 'static>;

/// Write transaction that can schedule work for after it commits
///
/// Anything that must only become observable once the state change is
/// durable (notifying subscribers, updating in-memory mirrors of stored
/// state) goes into [`WriteTransactionCtx::on_commit`]. Hooks of a
/// transaction that gets dropped instead are discarded with it.
pub struct WriteTransactionCtx {
    dbtx: WriteTransaction,
    hooks: RefCell<Vec<CommitHook>>,
    /// Shared by all write transactions of a database
    hook_order: Arc<Mutex<()>>,
}

impl WriteTransactionCtx {
    pub(crate) fn new(dbtx: WriteTransaction, hook_order: Arc<Mutex<()>>) -> Self {
        Self {
            dbtx,
            hooks: RefCell::new(vec![]),
            hook_order,
        }
    }

    /// Run `f` after the transaction commits, in registration order
    pub fn on_commit(&self, f: impl FnOnce() + 'static) {
        self.hooks.borrow_mut().push(Box::new(f));
    }

    pub(crate) fn commit(self) -> Result<(), redb::CommitError> {
        let Self {
            dbtx,
            hooks,
            hook_order,
        } = self;

        // The next write transaction can start as soon as this one commits;
        // holding the lock until our hooks are done keeps hooks in
        // transaction order.
        let _guard = hook_order.lock().expect("Locking failed");

        dbtx.commit()?;

        for hook in hooks.into_inner() {
            hook();
        }
        Ok(())
    }
}

impl ops::Deref for WriteTransactionCtx {
    type Target = WriteTransaction;

    fn deref(&self) -> &Self::Target {
        &self.dbtx
    }
}
