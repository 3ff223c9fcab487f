//! Fixed-interval scheduling of ingestion runs.
//!
//! Runs execute one at a time. All three fire immediately on start
//! (metrics, then seats, then usage) and then repeat on their own
//! intervals. A shutdown request is only observed between runs, so an
//! in-flight run always finishes.

use std::future::Future;

use copilot_metrics_ingest_models::{RunKind, Schedule};
use tokio::signal;
use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::Ingestor;

fn ticker(schedule: &Schedule, kind: RunKind) -> Interval {
    let mut ticker = interval(schedule.interval(kind));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Runs `kind` and logs the outcome. Errors are logged, never propagated,
/// so one failing run does not stop the schedule.
pub async fn run_logged(ingestor: &Ingestor, kind: RunKind) -> bool {
    log::debug!("Executing {kind} ingestion");
    match ingestor.run(kind).await {
        Ok(report) => {
            log::debug!("{kind} ingestion finished: {report}");
            true
        }
        Err(e) => {
            log::error!("{kind} ingestion failed: {e}");
            false
        }
    }
}

/// Repeats every ingestion on its interval until `shutdown` resolves.
pub async fn run_until(
    ingestor: &Ingestor,
    schedule: &Schedule,
    shutdown: impl Future<Output = ()>,
) {
    let mut metrics = ticker(schedule, RunKind::Metrics);
    let mut seats = ticker(schedule, RunKind::Seats);
    let mut usage = ticker(schedule, RunKind::Usage);

    log::info!(
        "Scheduler started (metrics every {}s, seats every {}s, usage every {}s)",
        metrics.period().as_secs(),
        seats.period().as_secs(),
        usage.period().as_secs()
    );

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                log::info!("Scheduler shutting down");
                break;
            }
            _ = metrics.tick() => {
                run_logged(ingestor, RunKind::Metrics).await;
            }
            _ = seats.tick() => {
                run_logged(ingestor, RunKind::Seats).await;
            }
            _ = usage.tick() => {
                run_logged(ingestor, RunKind::Usage).await;
            }
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("Received Ctrl+C"),
        () = terminate => log::info!("Received SIGTERM"),
    }
}
