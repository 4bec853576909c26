use rotaledger_core::{
    AssignOptions, AssignmentCoordinator, Candidate, Domain, ErrorKind, EventDraft, EventId,
    EventService, LedgerError, RosterService, StoreHandle, StoreRegistry, TenantId,
};

fn memory_handle() -> StoreHandle {
    let registry = StoreRegistry::in_memory();
    registry
        .get_or_create(&TenantId::parse("scenarios").unwrap())
        .unwrap()
}

fn roster(handle: &StoreHandle, names: &[&str]) -> Vec<Candidate> {
    let service = RosterService::new(handle);
    names
        .iter()
        .map(|name| service.create_candidate(Domain::Mvp, name).unwrap())
        .collect()
}

fn events(handle: &StoreHandle, count: usize) -> Vec<EventId> {
    let service = EventService::new(handle);
    (0..count)
        .map(|index| {
            service
                .create_event(&EventDraft::new(format!("Siege {index}"), index as i64))
                .unwrap()
                .id
        })
        .collect()
}

fn count_of(handle: &StoreHandle, candidate: &Candidate) -> u32 {
    RosterService::new(handle)
        .get_candidate(candidate.domain, candidate.id)
        .unwrap()
        .award_count
}

fn assign(
    handle: &StoreHandle,
    event_id: EventId,
    candidate: &Candidate,
) -> Result<rotaledger_core::AssignmentRecord, LedgerError> {
    AssignmentCoordinator::new(handle).assign(
        candidate.domain,
        event_id,
        candidate.id,
        AssignOptions::default(),
    )
}

#[test]
fn first_award_narrows_eligibility_and_blocks_repeat() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock", "Cass"]);
    let (a, b, c) = (&people[0], &people[1], &people[2]);
    let ev = events(&handle, 2);

    assign(&handle, ev[0], a).unwrap();
    assert_eq!(count_of(&handle, a), 1);
    assert_eq!(count_of(&handle, b), 0);
    assert_eq!(count_of(&handle, c), 0);

    let eligibility = AssignmentCoordinator::new(&handle)
        .eligibility(Domain::Mvp)
        .unwrap();
    assert_eq!(eligibility.current_min, Some(0));
    assert_eq!(eligibility.eligible, vec![b.id, c.id]);

    let err = assign(&handle, ev[1], a).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEligible);
    match err {
        LedgerError::NotEligible { eligible, .. } => assert_eq!(eligible, vec![b.id, c.id]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_of(&handle, a), 1);
    assert!(!EventService::new(&handle)
        .get_event(ev[1])
        .unwrap()
        .is_filled(Domain::Mvp));
}

#[test]
fn completed_round_reopens_everyone() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock", "Cass"]);
    let (a, b, c) = (&people[0], &people[1], &people[2]);
    let ev = events(&handle, 4);

    assign(&handle, ev[0], a).unwrap();
    assign(&handle, ev[1], b).unwrap();
    assign(&handle, ev[2], c).unwrap();

    let coordinator = AssignmentCoordinator::new(&handle);
    let eligibility = coordinator.eligibility(Domain::Mvp).unwrap();
    assert_eq!(eligibility.current_min, Some(1));
    assert_eq!(eligibility.eligible, vec![a.id, b.id, c.id]);

    assign(&handle, ev[3], b).unwrap();
    assert_eq!(count_of(&handle, b), 2);

    let status = coordinator.rotation_status(Domain::Mvp).unwrap();
    assert_eq!(status.round, Some(2));
    assert_eq!(status.current_holder, Some(b.id));
    assert_eq!(status.eligible, vec![a.id, c.id]);
}

#[test]
fn reassignment_moves_the_award_and_the_holder() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock", "Cass"]);
    let a = &people[0];
    let ev = events(&handle, 1);
    assign(&handle, ev[0], a).unwrap();

    let d = RosterService::new(&handle)
        .create_candidate(Domain::Mvp, "Dara")
        .unwrap();
    let record = assign(&handle, ev[0], &d).unwrap();
    assert_eq!(record.candidate_id, d.id);

    assert_eq!(count_of(&handle, a), 0);
    assert_eq!(count_of(&handle, &d), 1);
    let holder = AssignmentCoordinator::new(&handle)
        .current_holder(Domain::Mvp)
        .unwrap()
        .unwrap();
    assert_eq!(holder.id, d.id);
    assert!(AssignmentCoordinator::new(&handle)
        .history_of(Domain::Mvp, a.id)
        .unwrap()
        .is_empty());
}

#[test]
fn reassignment_discounts_the_displaced_record() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock"]);
    let (a, b) = (&people[0], &people[1]);
    let ev = events(&handle, 2);
    assign(&handle, ev[0], a).unwrap();
    assign(&handle, ev[1], b).unwrap();

    // Both at 1; moving e1 from A to B would leave B at 2 and A at 0.
    let err = assign(&handle, ev[0], b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEligible);
    assert_eq!(count_of(&handle, a), 1);
    assert_eq!(count_of(&handle, b), 1);
}

#[test]
fn excluded_candidate_keeps_history_but_leaves_rotation() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock", "Cass"]);
    let (a, b, c) = (&people[0], &people[1], &people[2]);
    let ev = events(&handle, 3);
    assign(&handle, ev[0], b).unwrap();
    assign(&handle, ev[1], a).unwrap();

    let coordinator = AssignmentCoordinator::new(&handle);
    let before = coordinator.history_of(Domain::Mvp, b.id).unwrap();

    let excluded = RosterService::new(&handle)
        .set_excluded(Domain::Mvp, b.id, true)
        .unwrap();
    assert!(excluded.is_excluded);
    assert_eq!(excluded.award_count, 1);

    assert_eq!(coordinator.history_of(Domain::Mvp, b.id).unwrap(), before);
    let eligibility = coordinator.eligibility(Domain::Mvp).unwrap();
    assert_eq!(eligibility.eligible, vec![c.id]);

    let err = assign(&handle, ev[2], b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEligible);
}

#[test]
fn excluding_the_holder_clears_it_until_next_write() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock"]);
    let (a, b) = (&people[0], &people[1]);
    let ev = events(&handle, 2);
    assign(&handle, ev[0], a).unwrap();

    let roster_service = RosterService::new(&handle);
    let coordinator = AssignmentCoordinator::new(&handle);
    roster_service.set_excluded(Domain::Mvp, a.id, true).unwrap();
    assert!(coordinator.current_holder(Domain::Mvp).unwrap().is_none());

    let included = roster_service.set_excluded(Domain::Mvp, a.id, false).unwrap();
    assert_eq!(included.award_count, 1);
    assert!(!included.currently_holds);
    assert!(coordinator.current_holder(Domain::Mvp).unwrap().is_none());

    assign(&handle, ev[1], b).unwrap();
    let holder = coordinator.current_holder(Domain::Mvp).unwrap().unwrap();
    assert_eq!(holder.id, b.id);
}

#[test]
fn repeated_assignment_is_idempotent() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock"]);
    let a = &people[0];
    let ev = events(&handle, 1);

    let first = assign(&handle, ev[0], a).unwrap();
    let second = assign(&handle, ev[0], a).unwrap();
    assert_eq!(first, second);
    assert_eq!(count_of(&handle, a), 1);
    assert_eq!(
        AssignmentCoordinator::new(&handle)
            .history_of(Domain::Mvp, a.id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn forced_assignment_bypasses_gate_and_is_flagged() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock"]);
    let a = &people[0];
    let ev = events(&handle, 2);
    assign(&handle, ev[0], a).unwrap();

    let record = AssignmentCoordinator::new(&handle)
        .assign(Domain::Mvp, ev[1], a.id, AssignOptions::forced())
        .unwrap();
    assert!(record.forced);
    assert_eq!(count_of(&handle, a), 2);
    assert!(AssignmentCoordinator::new(&handle)
        .verify_aggregates(Domain::Mvp)
        .unwrap()
        .is_empty());
}

#[test]
fn empty_roster_cannot_assign() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria"]);
    RosterService::new(&handle)
        .set_excluded(Domain::Mvp, people[0].id, true)
        .unwrap();

    let eligibility = AssignmentCoordinator::new(&handle)
        .eligibility(Domain::Mvp)
        .unwrap();
    assert!(!eligibility.can_assign());
    assert!(eligibility.eligible.is_empty());
}

#[test]
fn normal_path_only_accepts_minimum_count_candidates() {
    let handle = memory_handle();
    roster(&handle, &["Aria", "Brock", "Cass", "Dara", "Eli"]);
    let ev = events(&handle, 23);
    let coordinator = AssignmentCoordinator::new(&handle);

    for (index, event_id) in ev.iter().enumerate() {
        if index == 7 {
            RosterService::new(&handle)
                .create_candidate(Domain::Mvp, "Fern")
                .unwrap();
        }
        let current = RosterService::new(&handle)
            .list_candidates(Domain::Mvp)
            .unwrap();
        let min = current.iter().map(|c| c.award_count).min().unwrap();
        let wanted = &current[(index * 3) % current.len()];

        match coordinator.assign(Domain::Mvp, *event_id, wanted.id, AssignOptions::default()) {
            Ok(_) => assert_eq!(wanted.award_count, min),
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::NotEligible);
                assert!(wanted.award_count > min);
                let fallback = coordinator.eligibility(Domain::Mvp).unwrap().eligible[0];
                coordinator
                    .assign(Domain::Mvp, *event_id, fallback, AssignOptions::default())
                    .unwrap();
            }
        }
    }

    let counts: Vec<u32> = RosterService::new(&handle)
        .list_candidates(Domain::Mvp)
        .unwrap()
        .iter()
        .map(|candidate| candidate.award_count)
        .collect();
    assert_eq!(counts.iter().sum::<u32>(), 23);
    let spread = counts.iter().max().unwrap() - counts.iter().min().unwrap();
    assert!(spread <= 1, "counts drifted apart: {counts:?}");
}

#[test]
fn domains_rotate_independently() {
    let handle = memory_handle();
    let member = RosterService::new(&handle)
        .create_candidate(Domain::Mvp, "Aria")
        .unwrap();
    let group = RosterService::new(&handle)
        .create_candidate(Domain::Winner, "Aria")
        .unwrap();
    let ev = events(&handle, 1);

    assign(&handle, ev[0], &member).unwrap();
    assign(&handle, ev[0], &group).unwrap();

    let event = EventService::new(&handle).get_event(ev[0]).unwrap();
    assert!(event.mvp_filled && event.winner_filled);
    assert_eq!(count_of(&handle, &member), 1);
    assert_eq!(count_of(&handle, &group), 1);
}

#[test]
fn candidate_from_other_domain_is_not_found() {
    let handle = memory_handle();
    let group = RosterService::new(&handle)
        .create_candidate(Domain::Winner, "Raiders")
        .unwrap();
    let ev = events(&handle, 1);

    let err = AssignmentCoordinator::new(&handle)
        .assign(Domain::Mvp, ev[0], group.id, AssignOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn reset_starts_a_fresh_rotation() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock"]);
    let ev = events(&handle, 2);
    assign(&handle, ev[0], &people[0]).unwrap();
    assign(&handle, ev[1], &people[1]).unwrap();

    let coordinator = AssignmentCoordinator::new(&handle);
    assert_eq!(coordinator.reset_rotation(Domain::Mvp).unwrap(), 2);

    assert!(coordinator.current_holder(Domain::Mvp).unwrap().is_none());
    assert_eq!(count_of(&handle, &people[0]), 0);
    assert_eq!(
        EventService::new(&handle)
            .list_open_events(Domain::Mvp)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn drifted_counts_are_reported_and_rebuilt() {
    let handle = memory_handle();
    let people = roster(&handle, &["Aria", "Brock"]);
    let ev = events(&handle, 1);
    assign(&handle, ev[0], &people[0]).unwrap();

    handle
        .write(|tx| {
            tx.execute(
                "UPDATE mvp_candidates SET award_count = 5 WHERE uuid = ?1;",
                [people[1].id.to_string()],
            )?;
            Ok(())
        })
        .unwrap();

    let coordinator = AssignmentCoordinator::new(&handle);
    let drift = coordinator.verify_aggregates(Domain::Mvp).unwrap();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].candidate_id, people[1].id);
    assert_eq!((drift[0].stored, drift[0].ledger), (5, 0));

    assert_eq!(coordinator.rebuild_aggregates(Domain::Mvp).unwrap(), 1);
    assert!(coordinator.verify_aggregates(Domain::Mvp).unwrap().is_empty());
}
