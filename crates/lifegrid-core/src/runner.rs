//! Timed generation loop with surface controls.
//!
//! This module provides [`run_simulation`], the async task that owns a
//! [`Simulation`] and drives it with support for:
//!
//! - **Immediate start**: the first tick fires as soon as the simulation starts
//! - **Variable speed**: the delay before each tick is read from the speed at
//!   the moment that tick is scheduled
//! - **Cancellation**: stopping drops the pending deadline, and
//!   [`Simulation::tick`] re-checks the running flag before applying anything
//! - **Convergence**: a generation identical to its predecessor ends ticking
//! - **Clean shutdown**: an explicit request or dropping every handle
//!
//! Surface requests and ticks are handled by the same task, one at a time,
//! so a request never observes a half-computed generation.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::simulation::{Simulation, SimulationError, SimulationSnapshot, TickOutcome};
use crate::surface::SimulationHandle;

/// Capacity of the request queue between surfaces and the runner.
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// An operation requested by a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Flip one cell (only while not running).
    ToggleCell {
        /// Row of the cell.
        row: usize,
        /// Column of the cell.
        col: usize,
    },
    /// Start ticking.
    Start,
    /// Stop ticking.
    Stop,
    /// Start if idle, stop if running.
    StartStop,
    /// Reset to an empty grid (only while not running).
    Clear,
    /// Change the speed setting.
    SetSpeed(u32),
    /// Replace the grid with a random fill (only while not running).
    Randomize {
        /// Probability that each cell is alive.
        density: f64,
    },
    /// End the runner task.
    Shutdown,
}

/// A command paired with the channel its result is sent back on.
#[derive(Debug)]
pub struct Request {
    /// The requested operation.
    pub command: Command,
    /// Receives the outcome and the snapshot taken right after it.
    pub reply: oneshot::Sender<Result<SimulationSnapshot, SimulationError>>,
}

/// Reason why the runner task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// A surface sent [`Command::Shutdown`].
    ShutdownRequested,
    /// Every [`SimulationHandle`] was dropped.
    HandlesDropped,
}

/// Result of a runner task.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The reason the runner ended.
    pub end_reason: RunEndReason,
    /// State at the moment the runner ended.
    pub final_snapshot: SimulationSnapshot,
    /// Number of ticks that produced a generation.
    pub total_ticks: u64,
    /// When the runner task began.
    pub started_at: DateTime<Utc>,
    /// When the runner task ended.
    pub ended_at: DateTime<Utc>,
}

/// Spawn the runner task for `simulation` on the current tokio runtime.
///
/// Returns the handle surfaces use to control the simulation and the join
/// handle of the task.
pub fn spawn(simulation: Simulation) -> (SimulationHandle, JoinHandle<RunResult>) {
    let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(simulation.snapshot());
    let task = tokio::spawn(run_simulation(simulation, request_rx, snapshot_tx));
    (SimulationHandle::new(request_tx, snapshot_rx), task)
}

/// Run the simulation until shut down.
///
/// The task waits on whichever comes first: the next surface request or the
/// pending tick deadline. There is at most one deadline, and it only exists
/// while the simulation is running. After every request and every tick the
/// current snapshot is published on `snapshots`.
pub async fn run_simulation(
    mut simulation: Simulation,
    mut requests: mpsc::Receiver<Request>,
    snapshots: watch::Sender<SimulationSnapshot>,
) -> RunResult {
    let started_at = Utc::now();
    let mut total_ticks: u64 = 0;
    let mut next_tick: Option<Instant> = None;

    info!(
        rows = simulation.grid().rows(),
        cols = simulation.grid().cols(),
        speed = simulation.speed(),
        "Simulation runner starting"
    );

    let end_reason = loop {
        let deadline = next_tick.unwrap_or_else(Instant::now);

        tokio::select! {
            // Requests win ties so a stop issued at the deadline is honoured.
            biased;

            request = requests.recv() => {
                let Some(Request { command, reply }) = request else {
                    break RunEndReason::HandlesDropped;
                };

                let result = apply_command(&mut simulation, command, &mut next_tick);
                let snapshot = simulation.snapshot();
                snapshots.send_replace(snapshot.clone());
                if reply.send(result.map(|()| snapshot)).is_err() {
                    debug!(?command, "Requester went away before the reply");
                }

                if command == Command::Shutdown {
                    break RunEndReason::ShutdownRequested;
                }
            }

            () = tokio::time::sleep_until(deadline), if next_tick.is_some() => {
                next_tick = None;
                match simulation.tick() {
                    Ok(TickOutcome::Advanced { delay, .. }) => {
                        total_ticks = total_ticks.saturating_add(1);
                        let now = Instant::now();
                        next_tick = Some(now.checked_add(delay).unwrap_or(now));
                    }
                    Ok(TickOutcome::Converged { .. }) => {
                        total_ticks = total_ticks.saturating_add(1);
                    }
                    Ok(TickOutcome::Skipped) => {}
                    Err(e) => {
                        error!(error = %e, generation = simulation.generation(), "Tick failed, stopping simulation");
                        simulation.record_failure(&e);
                    }
                }
                snapshots.send_replace(simulation.snapshot());
            }
        }
    };

    RunResult {
        end_reason,
        final_snapshot: simulation.snapshot(),
        total_ticks,
        started_at,
        ended_at: Utc::now(),
    }
}

/// Apply one surface command, adjusting the pending tick deadline.
fn apply_command(
    simulation: &mut Simulation,
    command: Command,
    next_tick: &mut Option<Instant>,
) -> Result<(), SimulationError> {
    let result = match command {
        Command::ToggleCell { row, col } => simulation.toggle_cell(row, col),
        Command::Start => {
            simulation.start();
            Ok(())
        }
        Command::Stop | Command::Shutdown => {
            simulation.stop();
            Ok(())
        }
        Command::StartStop => {
            simulation.start_stop();
            Ok(())
        }
        Command::Clear => simulation.clear(),
        Command::SetSpeed(speed) => simulation.set_speed(speed),
        Command::Randomize { density } => simulation.randomize(density),
    };

    if !simulation.is_running() {
        *next_tick = None;
    } else if next_tick.is_none() {
        // Just started: the first tick is due immediately.
        *next_tick = Some(Instant::now());
    }

    if let Err(ref e) = result {
        warn!(?command, error = %e, "Request rejected");
    }
    result
}

/// Log the outcome of a finished runner task.
pub fn log_run_end(result: &RunResult) {
    let elapsed_ms = result
        .ended_at
        .signed_duration_since(result.started_at)
        .num_milliseconds();
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        generation = result.final_snapshot.generation,
        live_cells = result.final_snapshot.live_cells,
        phase = ?result.final_snapshot.phase,
        elapsed_ms,
        "Simulation runner ended"
    );
}
