//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `rotaledger_core` linkage.
//! - Run one scripted rotation against an in-memory tenant and print the
//!   resulting status, so output stays deterministic for local checks.
//!
//! Usage: `rotaledger_cli [config.json]`. `ROTALEDGER_*` variables apply on
//! top of the file; file logging starts only when `logging.log_dir` is set.

use log::info;
use rotaledger_core::{
    init_logging, AssignOptions, AssignmentCoordinator, Domain, EventDraft, EventService,
    LedgerConfig, Principal, RosterService, StaticAccountDirectory, StoreRegistry,
    TenantContextResolver, TenantId,
};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

const PROBE_TENANT: &str = "probe";
const PROBE_ROSTER: [&str; 3] = ["Aria", "Brock", "Cass"];

fn main() -> ExitCode {
    println!("rotaledger_core ping={}", rotaledger_core::ping());
    println!("rotaledger_core version={}", rotaledger_core::core_version());

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rotaledger_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut config = match config_path {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::default(),
    };
    config.apply_env_overrides()?;
    let options = config.registry_options()?;
    if config.logging.log_dir.is_some() {
        init_logging(&config.logging)?;
    }

    let directory = Arc::new(StaticAccountDirectory::new());
    let tenant = TenantId::parse(PROBE_TENANT)?;
    directory.register(tenant.clone());
    let resolver = TenantContextResolver::new(Arc::new(StoreRegistry::new(options)), directory);
    let context = resolver.resolve(&Principal::owner(tenant))?;
    let handle = context.handle();

    let roster = RosterService::new(handle);
    let existing = roster.list_candidates(Domain::Mvp)?;
    for name in PROBE_ROSTER {
        if !existing.iter().any(|candidate| candidate.display_name == name) {
            roster.create_candidate(Domain::Mvp, name)?;
        }
    }

    let coordinator = AssignmentCoordinator::new(handle);
    let events = EventService::new(handle);
    let event = events.create_event(&EventDraft::new("Probe night", 0))?;
    let eligibility = coordinator.eligibility(Domain::Mvp)?;
    if let Some(pick) = eligibility.eligible.first() {
        coordinator.assign(Domain::Mvp, event.id, *pick, AssignOptions::default())?;
    }

    let status = coordinator.rotation_status(Domain::Mvp)?;
    let holder = coordinator
        .current_holder(Domain::Mvp)?
        .map_or_else(|| "none".to_string(), |candidate| candidate.display_name);
    println!(
        "rotaledger_core probe domain={} candidates={} eligible={} round={} holder={}",
        status.domain,
        status.total_candidates,
        status.eligible.len(),
        status
            .round
            .map_or_else(|| "none".to_string(), |round| round.to_string()),
        holder
    );
    info!(
        "event=cli_probe module=cli status=ok tenant={} open_tenants={}",
        context.tenant_id(),
        resolver.registry().open_tenant_count()
    );
    Ok(())
}
