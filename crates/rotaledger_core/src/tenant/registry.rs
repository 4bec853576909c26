//! Process-wide cache of open tenant stores.
//!
//! # Responsibility
//! - Map tenant id to an open [`TenantStore`], provisioning on first access.
//! - Evict stores that stayed idle longer than the configured TTL.
//!
//! # Invariants
//! - Single-flight: concurrent first accesses for one tenant open and
//!   migrate the store once; the other callers block on the same cell.
//! - A failed open is never cached; the next access retries from scratch.
//! - A store is never evicted while a [`StoreHandle`] for it is alive.
//! - In-memory stores are never evicted (eviction would drop their data).

use crate::db::DbError;
use crate::error::{LedgerError, LedgerResult};
use crate::tenant::principal::TenantId;
use crate::tenant::store::{StoreHandle, StoreOptions, TenantStore};
use log::{error, info};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STORE_FILE_PREFIX: &str = "tenant_";
const STORE_FILE_EXTENSION: &str = "sqlite3";

/// Where tenant stores live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// One private in-memory database per tenant.
    InMemory,
    /// One `tenant_<id>.sqlite3` file per tenant under this directory.
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub location: StorageLocation,
    pub idle_ttl: Duration,
    pub store: StoreOptions,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            location: StorageLocation::InMemory,
            idle_ttl: Duration::from_secs(15 * 60),
            store: StoreOptions::default(),
        }
    }
}

struct Slot {
    cell: OnceCell<Arc<TenantStore>>,
    last_access: Mutex<Instant>,
}

impl Slot {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            last_access: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_access.lock())
    }
}

/// Tenant id to open-store cache.
pub struct StoreRegistry {
    slots: Mutex<HashMap<TenantId, Arc<Slot>>>,
    options: RegistryOptions,
}

impl StoreRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            options,
        }
    }

    /// Registry with in-memory stores and default settings.
    pub fn in_memory() -> Self {
        Self::new(RegistryOptions::default())
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Returns a handle to `tenant`'s store, provisioning it when absent.
    ///
    /// # Errors
    /// - `StorageCorruption` when the existing file is unreadable, fails its
    ///   integrity check, or carries an unsupported schema.
    /// - `Storage` for I/O failures (for example an uncreatable data
    ///   directory).
    pub fn get_or_create(&self, tenant: &TenantId) -> LedgerResult<StoreHandle> {
        let slot = {
            let mut slots = self.slots.lock();
            self.evict_locked(&mut slots, Instant::now());
            Arc::clone(
                slots
                    .entry(tenant.clone())
                    .or_insert_with(|| Arc::new(Slot::new())),
            )
        };
        slot.touch();

        match slot.cell.get_or_try_init(|| self.provision(tenant)) {
            Ok(store) => Ok(StoreHandle::new(Arc::clone(store))),
            Err(err) => {
                let mut slots = self.slots.lock();
                let same_slot = slots
                    .get(tenant)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot));
                // Waiters still blocked on this cell will retry provisioning in it.
                let no_waiters = Arc::strong_count(&slot) == 2;
                if same_slot && no_waiters && slot.cell.get().is_none() {
                    slots.remove(tenant);
                }
                Err(err)
            }
        }
    }

    /// Drops stores idle longer than `idle_ttl` that have no live handle.
    ///
    /// Returns the number of evicted stores.
    pub fn evict_idle(&self) -> usize {
        let mut slots = self.slots.lock();
        self.evict_locked(&mut slots, Instant::now())
    }

    /// Number of tenants with an open store.
    pub fn open_tenant_count(&self) -> usize {
        self.slots.lock()
            .values()
            .filter(|slot| slot.cell.get().is_some())
            .count()
    }

    pub fn is_open(&self, tenant: &TenantId) -> bool {
        self.slots.lock()
            .get(tenant)
            .is_some_and(|slot| slot.cell.get().is_some())
    }

    /// File a tenant's store lives in, or `None` for in-memory storage.
    pub fn store_path(&self, tenant: &TenantId) -> Option<PathBuf> {
        match &self.options.location {
            StorageLocation::InMemory => None,
            StorageLocation::Directory(dir) => Some(store_file_path(dir, tenant)),
        }
    }

    fn evict_locked(&self, slots: &mut HashMap<TenantId, Arc<Slot>>, now: Instant) -> usize {
        if self.options.location == StorageLocation::InMemory {
            return 0;
        }

        let idle_ttl = self.options.idle_ttl;
        let before = slots.len();
        slots.retain(|tenant, slot| {
            // Another caller holds the slot between lookup and handle creation.
            if Arc::strong_count(slot) > 1 || slot.idle_for(now) <= idle_ttl {
                return true;
            }
            match slot.cell.get() {
                Some(store) if Arc::strong_count(store) > 1 => true,
                Some(_) => {
                    info!(
                        "event=store_evict module=registry status=ok tenant={} idle_ms={}",
                        tenant,
                        slot.idle_for(now).as_millis()
                    );
                    false
                }
                None => true,
            }
        });
        before - slots.len()
    }

    fn provision(&self, tenant: &TenantId) -> LedgerResult<Arc<TenantStore>> {
        let started_at = Instant::now();
        let result = match &self.options.location {
            StorageLocation::InMemory => {
                TenantStore::open_in_memory(tenant.clone(), &self.options.store)
            }
            StorageLocation::Directory(dir) => std::fs::create_dir_all(dir)
                .map_err(|err| LedgerError::from(DbError::Io(err)))
                .and_then(|()| {
                    TenantStore::open_file(
                        tenant.clone(),
                        &store_file_path(dir, tenant),
                        &self.options.store,
                    )
                }),
        };

        match &result {
            Ok(_) => info!(
                "event=store_provision module=registry status=ok tenant={} duration_ms={}",
                tenant,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_provision module=registry status=error tenant={} kind={:?} duration_ms={} error={}",
                tenant,
                err.kind(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result.map(Arc::new)
    }
}

fn store_file_path(dir: &Path, tenant: &TenantId) -> PathBuf {
    dir.join(format!(
        "{STORE_FILE_PREFIX}{}.{STORE_FILE_EXTENSION}",
        tenant.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::{store_file_path, StoreRegistry};
    use crate::tenant::principal::TenantId;
    use std::path::Path;

    #[test]
    fn store_file_name_embeds_tenant_slug() {
        let tenant = TenantId::parse("guild-7").expect("valid tenant");
        let path = store_file_path(Path::new("/data"), &tenant);
        assert_eq!(path, Path::new("/data/tenant_guild-7.sqlite3"));
    }

    #[test]
    fn in_memory_registry_reuses_open_store() {
        let registry = StoreRegistry::in_memory();
        let tenant = TenantId::parse("alpha").expect("valid tenant");

        let first = registry.get_or_create(&tenant).expect("provision");
        first
            .write(|tx| {
                tx.execute(
                    "INSERT INTO events (uuid, name, event_date, created_at, updated_at)
                     VALUES ('e1', 'Siege', 0, 0, 0);",
                    [],
                )?;
                Ok(())
            })
            .expect("insert event");
        drop(first);

        assert_eq!(registry.evict_idle(), 0);
        let second = registry.get_or_create(&tenant).expect("reopen");
        let count: i64 = second
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM events;", [], |r| r.get(0))?))
            .expect("count");
        assert_eq!(count, 1);
        assert_eq!(registry.open_tenant_count(), 1);
        assert!(registry.store_path(&tenant).is_none());
    }
}
