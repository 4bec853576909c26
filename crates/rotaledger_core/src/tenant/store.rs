//! One open tenant store and the handle callers pass around.
//!
//! # Responsibility
//! - Own the writer connection (and optional read-only connection) of a
//!   single tenant database.
//! - Run every mutation inside one `BEGIN IMMEDIATE` transaction under the
//!   tenant's writer lock.
//! - Retry transient `SQLITE_BUSY` / `SQLITE_LOCKED` failures with backoff.
//!
//! # Invariants
//! - Writes for one tenant are serialized by `writer`; tenants never share
//!   a lock or a connection.
//! - Lock waiters queue and are handed the lock in turn, so a busy writer
//!   cannot keep another one out past `lock_timeout`.
//! - A failed write closure leaves the store unchanged (the transaction is
//!   dropped, which rolls back).
//! - Reads run in a deferred transaction, so one closure sees one committed
//!   snapshot.

use crate::db::{open_db, open_db_in_memory, open_db_reader, ConnectionOptions, DbError};
use crate::error::{LedgerError, LedgerResult};
use crate::tenant::principal::TenantId;
use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Backoff schedule for transient contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling from `base_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

/// Settings applied when a tenant store is opened.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub connection: ConnectionOptions,
    /// Longest wait for the tenant writer lock.
    pub lock_timeout: Duration,
    pub retry: RetryPolicy,
    /// Open a separate read-only connection for file stores.
    pub read_connection: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            connection: ConnectionOptions::default(),
            lock_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            read_connection: true,
        }
    }
}

/// Open connections for one tenant.
pub struct TenantStore {
    tenant_id: TenantId,
    path: Option<PathBuf>,
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
    lock_timeout: Duration,
    retry: RetryPolicy,
}

impl TenantStore {
    /// Opens (provisioning when missing) the tenant file at `path`.
    pub fn open_file(
        tenant_id: TenantId,
        path: &Path,
        options: &StoreOptions,
    ) -> LedgerResult<Self> {
        let writer = open_db(path, &options.connection)?;
        let reader = if options.read_connection && options.connection.wal {
            Some(Mutex::new(open_db_reader(path, &options.connection)?))
        } else {
            None
        };
        Ok(Self {
            tenant_id,
            path: Some(path.to_path_buf()),
            writer: Mutex::new(writer),
            reader,
            lock_timeout: options.lock_timeout,
            retry: options.retry,
        })
    }

    /// Opens a private in-memory store. Its data lives as long as the store.
    pub fn open_in_memory(tenant_id: TenantId, options: &StoreOptions) -> LedgerResult<Self> {
        let writer = open_db_in_memory(&options.connection)?;
        Ok(Self {
            tenant_id,
            path: None,
            writer: Mutex::new(writer),
            reader: None,
            lock_timeout: options.lock_timeout,
            retry: options.retry,
        })
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Backing file, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock<'a>(&self, mutex: &'a Mutex<Connection>) -> LedgerResult<MutexGuard<'a, Connection>> {
        let started_at = Instant::now();
        match mutex.try_lock_for(self.lock_timeout) {
            Some(guard) => Ok(guard),
            None => {
                let waited = started_at.elapsed();
                warn!(
                    "event=store_lock module=tenant status=timeout tenant={} waited_ms={}",
                    self.tenant_id,
                    waited.as_millis()
                );
                Err(DbError::LockTimeout {
                    waited_ms: waited.as_millis(),
                }
                .into())
            }
        }
    }

    fn with_retry<T>(
        &self,
        op_name: &'static str,
        mut attempt_once: impl FnMut() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut attempt = 1;
        loop {
            match attempt_once() {
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_for(attempt);
                    debug!(
                        "event=store_retry module=tenant op={} tenant={} attempt={} backoff_ms={}",
                        op_name,
                        self.tenant_id,
                        attempt,
                        backoff.as_millis()
                    );
                    thread::sleep(backoff);
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        "event=store_retry module=tenant status=exhausted op={} tenant={} attempts={}",
                        op_name, self.tenant_id, attempt
                    );
                    return Err(err);
                }
                other => return other,
            }
        }
    }
}

/// Cheap, cloneable reference to an open tenant store.
///
/// While any handle is alive the registry will not evict the store.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<TenantStore>,
}

impl StoreHandle {
    pub(crate) fn new(store: Arc<TenantStore>) -> Self {
        Self { store }
    }

    pub fn tenant_id(&self) -> &TenantId {
        self.store.tenant_id()
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }

    /// Runs `op` against a consistent snapshot.
    ///
    /// Uses the read-only connection when one is open, otherwise the writer.
    pub fn read<T>(&self, mut op: impl FnMut(&Connection) -> LedgerResult<T>) -> LedgerResult<T> {
        let store = &self.store;
        let mutex = store.reader.as_ref().unwrap_or(&store.writer);
        store.with_retry("read", || {
            let mut conn = store.lock(mutex)?;
            let value = {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
                let value = op(&tx)?;
                tx.commit()?;
                value
            };
            MutexGuard::unlock_fair(conn);
            Ok(value)
        })
    }

    /// Runs `op` inside one IMMEDIATE transaction under the writer lock.
    ///
    /// A successful commit hands the lock to the longest waiting caller.
    ///
    /// `op` may run more than once when SQLite reports contention; every
    /// run starts from a rolled-back state. Errors returned by `op` abort
    /// the transaction.
    pub fn write<T>(
        &self,
        mut op: impl FnMut(&Transaction<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let store = &self.store;
        store.with_retry("write", || {
            let mut conn = store.lock(&store.writer)?;
            let value = {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let value = op(&tx)?;
                tx.commit().map_err(LedgerError::from)?;
                value
            };
            MutexGuard::unlock_fair(conn);
            Ok(value)
        })
    }

    pub(crate) fn store(&self) -> &Arc<TenantStore> {
        &self.store
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("tenant_id", self.tenant_id())
            .field("in_memory", &self.path().is_none())
            .finish()
    }
}
