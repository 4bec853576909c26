use rotaledger_core::{
    AssignOptions, AssignmentCoordinator, Capability, CapabilitySet, Domain, ErrorKind,
    EventDraft, EventService, LedgerError, Principal, RegistryOptions, RosterService,
    StaticAccountDirectory, StorageLocation, StoreRegistry, TenantContextResolver, TenantId,
};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn tenant(id: &str) -> TenantId {
    TenantId::parse(id).unwrap()
}

fn file_registry(dir: &Path, idle_ttl: Duration) -> StoreRegistry {
    StoreRegistry::new(RegistryOptions {
        location: StorageLocation::Directory(dir.to_path_buf()),
        idle_ttl,
        ..RegistryOptions::default()
    })
}

fn resolver_with(registry: StoreRegistry, owners: &[&str]) -> TenantContextResolver {
    let directory = StaticAccountDirectory::new();
    for owner in owners {
        directory.register(tenant(owner));
    }
    TenantContextResolver::new(Arc::new(registry), Arc::new(directory))
}

#[test]
fn same_named_candidates_never_cross_tenants() {
    let resolver = resolver_with(StoreRegistry::in_memory(), &["alpha", "beta"]);
    let alpha = resolver.resolve(&Principal::owner(tenant("alpha"))).unwrap();
    let beta = resolver.resolve(&Principal::owner(tenant("beta"))).unwrap();

    let alpha_aria = RosterService::new(alpha.handle())
        .create_candidate(Domain::Mvp, "Alpha")
        .unwrap();
    let beta_aria = RosterService::new(beta.handle())
        .create_candidate(Domain::Mvp, "Alpha")
        .unwrap();
    let event = EventService::new(alpha.handle())
        .create_event(&EventDraft::new("Siege", 1))
        .unwrap();
    AssignmentCoordinator::new(alpha.handle())
        .assign(Domain::Mvp, event.id, alpha_aria.id, AssignOptions::default())
        .unwrap();

    let beta_view = RosterService::new(beta.handle())
        .get_candidate(Domain::Mvp, beta_aria.id)
        .unwrap();
    assert_eq!(beta_view.award_count, 0);
    assert!(EventService::new(beta.handle()).list_events().unwrap().is_empty());

    let cross = RosterService::new(beta.handle())
        .get_candidate(Domain::Mvp, alpha_aria.id)
        .unwrap_err();
    assert_eq!(cross.kind(), ErrorKind::NotFound);
    let cross_assign = AssignmentCoordinator::new(beta.handle())
        .assign(Domain::Mvp, event.id, beta_aria.id, AssignOptions::default())
        .unwrap_err();
    assert_eq!(cross_assign.kind(), ErrorKind::NotFound);
}

#[test]
fn unknown_and_disabled_owners_are_not_found() {
    let registry = Arc::new(StoreRegistry::in_memory());
    let directory = Arc::new(StaticAccountDirectory::new());
    directory.register(tenant("alpha"));
    let resolver = TenantContextResolver::new(Arc::clone(&registry), directory.clone());

    let unknown = resolver
        .resolve(&Principal::owner(tenant("ghost")))
        .unwrap_err();
    assert!(matches!(unknown, LedgerError::TenantNotFound(ref id) if id.as_str() == "ghost"));

    directory.disable(&tenant("alpha"));
    let disabled = resolver
        .resolve(&Principal::owner(tenant("alpha")))
        .unwrap_err();
    assert_eq!(disabled.kind(), ErrorKind::NotFound);
    assert_eq!(registry.open_tenant_count(), 0);
}

#[test]
fn delegates_reach_the_owner_store_with_their_own_capabilities() {
    let resolver = resolver_with(StoreRegistry::in_memory(), &["alpha"]);
    let owner = resolver.resolve(&Principal::owner(tenant("alpha"))).unwrap();
    let aria = RosterService::new(owner.handle())
        .create_candidate(Domain::Mvp, "Aria")
        .unwrap();

    let viewer = Principal::delegate(
        "officer-7",
        tenant("alpha"),
        CapabilitySet::from_iter([Capability::View, Capability::Assign]),
    );
    let context = resolver.resolve(&viewer).unwrap();
    assert_eq!(context.tenant_id().as_str(), "alpha");
    assert!(context.has(Capability::Assign));
    assert!(context.ensure(Capability::Manage).is_err());
    assert!(owner.ensure(Capability::Manage).is_ok());

    let seen = RosterService::new(context.handle())
        .get_candidate(Domain::Mvp, aria.id)
        .unwrap();
    assert_eq!(seen.display_name, "Aria");
}

#[test]
fn concurrent_first_access_provisions_one_store() {
    let registry = Arc::new(StoreRegistry::in_memory());
    let barrier = Arc::new(Barrier::new(8));
    let workers: Vec<_> = (0..8)
        .map(|index| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let handle = registry.get_or_create(&tenant("crowd")).unwrap();
                RosterService::new(&handle)
                    .create_candidate(Domain::Mvp, &format!("Member {index}"))
                    .unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(registry.open_tenant_count(), 1);
    let handle = registry.get_or_create(&tenant("crowd")).unwrap();
    let roster = RosterService::new(&handle)
        .list_candidates(Domain::Mvp)
        .unwrap();
    assert_eq!(roster.len(), 8);
}

#[test]
fn concurrent_assignments_cannot_both_pass_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(file_registry(dir.path(), Duration::from_secs(60)));
    let handle = registry.get_or_create(&tenant("race")).unwrap();
    let aria = RosterService::new(&handle)
        .create_candidate(Domain::Mvp, "Aria")
        .unwrap();
    RosterService::new(&handle)
        .create_candidate(Domain::Mvp, "Brock")
        .unwrap();
    let events = EventService::new(&handle);
    let first = events.create_event(&EventDraft::new("First", 1)).unwrap();
    let second = events.create_event(&EventDraft::new("Second", 2)).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = [first.id, second.id]
        .into_iter()
        .map(|event_id| {
            let handle = handle.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                AssignmentCoordinator::new(&handle).assign(
                    Domain::Mvp,
                    event_id,
                    aria.id,
                    AssignOptions::default(),
                )
            })
        })
        .collect();
    let outcomes: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    let accepted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(accepted, 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| err.kind() == ErrorKind::NotEligible));
    assert_eq!(
        RosterService::new(&handle)
            .get_candidate(Domain::Mvp, aria.id)
            .unwrap()
            .award_count,
        1
    );
}

#[test]
fn idle_stores_are_evicted_only_without_live_handles() {
    let dir = tempfile::tempdir().unwrap();
    let registry = file_registry(dir.path(), Duration::ZERO);
    let alpha = tenant("alpha");

    let handle = registry.get_or_create(&alpha).unwrap();
    RosterService::new(&handle)
        .create_candidate(Domain::Winner, "Raiders")
        .unwrap();
    thread::sleep(Duration::from_millis(5));
    assert_eq!(registry.evict_idle(), 0);
    assert!(registry.is_open(&alpha));

    drop(handle);
    thread::sleep(Duration::from_millis(5));
    assert_eq!(registry.evict_idle(), 1);
    assert!(!registry.is_open(&alpha));
    assert!(registry.store_path(&alpha).unwrap().exists());

    let reopened = registry.get_or_create(&alpha).unwrap();
    let roster = RosterService::new(&reopened)
        .list_candidates(Domain::Winner)
        .unwrap();
    assert_eq!(roster.len(), 1);
}

#[test]
fn corrupt_store_is_reported_and_never_cached() {
    let dir = tempfile::tempdir().unwrap();
    let registry = file_registry(dir.path(), Duration::from_secs(60));
    let broken = tenant("broken");
    let path = registry.store_path(&broken).unwrap();
    std::fs::write(&path, vec![0x5a_u8; 4096]).unwrap();

    for _ in 0..2 {
        let err = registry.get_or_create(&broken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageCorruption);
        assert!(!registry.is_open(&broken));
    }
    assert_eq!(registry.open_tenant_count(), 0);

    std::fs::remove_file(&path).unwrap();
    let handle = registry.get_or_create(&broken).unwrap();
    assert!(RosterService::new(&handle)
        .list_candidates(Domain::Mvp)
        .unwrap()
        .is_empty());
    assert!(registry.is_open(&broken));
}

#[test]
fn each_tenant_gets_its_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let registry = file_registry(dir.path(), Duration::from_secs(60));
    registry.get_or_create(&tenant("alpha")).unwrap();
    registry.get_or_create(&tenant("beta")).unwrap();

    assert!(dir.path().join("tenant_alpha.sqlite3").exists());
    assert!(dir.path().join("tenant_beta.sqlite3").exists());
    assert_eq!(registry.open_tenant_count(), 2);
}
