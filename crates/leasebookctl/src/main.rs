// # leasebookctl
//
// One-shot CLI over the reservation registry.
//
// This is a thin integration layer: it loads settings, wires the system
// implementations into the store, runs exactly one operation, and maps the
// result onto exit codes. All registry logic lives in leasebook-core.
//
// ## Exit codes
//
// - 0: success
// - 1: validation error (bad input, duplicate, unknown identifier)
// - 2: persistence failure (write, reload, partial teardown)

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{Level, warn};
use tracing_subscriber::FmtSubscriber;

use leasebook_core::{
    ConfigIo, DeleteOptions, Error, PrivilegeMode, ReachabilityProbe, Reservation,
    ReservationStore, ServiceControl, Settings, SortKey,
};
use leasebook_system::{LocalConfigIo, SudoConfigIo, SystemPinger, SystemdServiceControl};

mod cli;

use cli::{Cli, Command, DeleteArgs, EditArgs, ListArgs, SortOrder};

/// Exit codes for the CLI surface
#[derive(Debug, Clone, Copy)]
enum CliExitCode {
    /// Operation completed
    Success = 0,
    /// Input rejected, nothing changed
    ValidationError = 1,
    /// Durable state may have been touched; see the error for which steps
    PersistenceError = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to create runtime: {e}");
            return CliExitCode::PersistenceError.into();
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => CliExitCode::Success.into(),
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_validation() {
                CliExitCode::ValidationError.into()
            } else {
                CliExitCode::PersistenceError.into()
            }
        }
    }
}

async fn run(cli: Cli) -> leasebook_core::Result<()> {
    let settings = Settings::load(&cli.config).await?;
    init_logging(&settings.log_level)?;

    let io: Arc<dyn ConfigIo> = match settings.privilege {
        PrivilegeMode::Direct => Arc::new(LocalConfigIo::new()),
        PrivilegeMode::Sudo => Arc::new(SudoConfigIo::new()),
    };
    let services: Arc<dyn ServiceControl> = Arc::new(SystemdServiceControl::new(
        settings.privilege == PrivilegeMode::Sudo,
    ));
    let store = ReservationStore::new(settings.store.clone(), io, services);

    match cli.command {
        Command::List(args) => list(&store, &settings, args).await,
        Command::Add(args) => {
            let address = match args.address {
                Some(address) => address,
                None => {
                    // Suggest from the current registry contents
                    store.reload().await?;
                    store
                        .assign_next_address(
                            &settings.plan.subnet_prefix,
                            settings.plan.range_start,
                            settings.plan.range_end,
                        )
                        .await?
                }
            };
            let reservation = store.add(&args.identifier, &args.mac, address).await?;
            println!(
                "added {} -> {} ({})",
                reservation.identifier, reservation.address, reservation.hardware_address
            );
            Ok(())
        }
        Command::Edit(args) => edit(&store, args).await,
        Command::Delete(args) => delete(&store, args).await,
        Command::NextIp => {
            store.reload().await?;
            let address = store
                .assign_next_address(
                    &settings.plan.subnet_prefix,
                    settings.plan.range_start,
                    settings.plan.range_end,
                )
                .await?;
            println!("{address}");
            Ok(())
        }
    }
}

async fn list(
    store: &ReservationStore,
    settings: &Settings,
    args: ListArgs,
) -> leasebook_core::Result<()> {
    let report = store.reload().await?;
    if !report.source_available {
        warn!("reservation file is unreadable; listing an empty registry");
    }
    let book = store.snapshot().await;

    let statuses = if args.check {
        let probe = ReachabilityProbe::new(Arc::new(SystemPinger::new()), &settings.probe);
        let addresses: Vec<_> = book.iter().map(|r| r.address).collect();
        probe.check_many(&addresses).await
    } else {
        Default::default()
    };

    let reservations = match args.sort {
        SortOrder::Address => book.list(SortKey::Address),
        SortOrder::Name => book.list(SortKey::DisplayName),
        SortOrder::Status => book.list(SortKey::Reachability(&statuses)),
    };

    for reservation in &reservations {
        print_row(
            reservation,
            args.check.then(|| statuses.get(&reservation.address).copied()),
        );
    }
    if reservations.is_empty() {
        println!("no reservations");
    }
    Ok(())
}

fn print_row(reservation: &Reservation, status: Option<Option<bool>>) {
    let status_column = match status {
        None => String::new(),
        Some(Some(true)) => "  online".to_string(),
        Some(Some(false)) => "  offline".to_string(),
        Some(None) => "  unknown".to_string(),
    };
    println!(
        "{:<20} {:<18} {:<16} {}{}",
        reservation.identifier,
        reservation.hardware_address,
        reservation.address,
        reservation.display_name,
        status_column
    );
}

async fn edit(store: &ReservationStore, args: EditArgs) -> leasebook_core::Result<()> {
    if args.mac.is_none() && args.address.is_none() && args.name.is_none() {
        return Err(Error::validation(
            "nothing to change: pass at least one of --mac, --address, --name",
        ));
    }
    let updated = store
        .edit(
            &args.identifier,
            args.mac.as_deref(),
            args.address,
            args.name.as_deref(),
        )
        .await?;
    println!(
        "updated {} -> {} ({})",
        updated.identifier, updated.address, updated.hardware_address
    );
    Ok(())
}

async fn delete(store: &ReservationStore, args: DeleteArgs) -> leasebook_core::Result<()> {
    let options = if args.purge_files {
        DeleteOptions::purge_files()
    } else {
        DeleteOptions::default()
    };

    let report = store.delete(&args.identifier, options).await?;
    for step in &report.applied {
        println!("removed {step}");
    }
    if report.is_clean() {
        println!("deleted {}", args.identifier);
        return Ok(());
    }

    // Some steps failed; surface them as a partial application so the exit
    // code tells the operator to re-run.
    let applied = report.applied.iter().map(ToString::to_string).collect();
    let failed = report
        .failed
        .iter()
        .map(|(step, reason)| format!("{step}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::partially_applied(applied, failed))
}

fn init_logging(level: &str) -> leasebook_core::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("failed to set tracing subscriber: {e}")))
}
