//! The contract between the simulation core and whatever presents it.
//!
//! A [`SimulationHandle`] is the only way a front end reaches the core. It
//! forwards user intent (toggle, start/stop, clear, speed change) to the
//! runner task and exposes the latest [`SimulationSnapshot`] for rendering.
//! Snapshots are owned copies; nothing a surface does to one can affect the
//! running simulation.

use tokio::sync::{mpsc, oneshot, watch};

use crate::runner::{Command, Request};
use crate::simulation::{SimulationError, SimulationSnapshot};

/// Cloneable handle to a running simulation.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    /// Request queue into the runner task.
    requests: mpsc::Sender<Request>,

    /// Latest published snapshot.
    snapshots: watch::Receiver<SimulationSnapshot>,
}

impl SimulationHandle {
    /// Wrap the channel ends created by [`runner::spawn`](crate::runner::spawn).
    pub const fn new(
        requests: mpsc::Sender<Request>,
        snapshots: watch::Receiver<SimulationSnapshot>,
    ) -> Self {
        Self {
            requests,
            snapshots,
        }
    }

    /// Flip the cell at `(row, col)`.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidOperation`] while running,
    /// [`SimulationError::Grid`] for an out-of-bounds cell.
    pub async fn toggle_cell(
        &self,
        row: usize,
        col: usize,
    ) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::ToggleCell { row, col }).await
    }

    /// Start if idle, stop if running.
    pub async fn start_stop(&self) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::StartStop).await
    }

    /// Start ticking; no-op if already running.
    pub async fn start(&self) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::Start).await
    }

    /// Stop ticking; any tick already scheduled is cancelled.
    pub async fn stop(&self) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::Stop).await
    }

    /// Reset to an empty grid and generation 0.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidOperation`] while running.
    pub async fn clear(&self) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::Clear).await
    }

    /// Change the speed setting.
    ///
    /// # Errors
    ///
    /// [`SimulationError::SpeedOutOfRange`] outside the configured range.
    pub async fn set_speed(&self, speed: u32) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::SetSpeed(speed)).await
    }

    /// Fill the grid randomly with the given live-cell probability.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidOperation`] while running,
    /// [`SimulationError::Grid`] for a density outside `0.0..=1.0`.
    pub async fn randomize(&self, density: f64) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::Randomize { density }).await
    }

    /// Stop the simulation and end the runner task.
    pub async fn shutdown(&self) -> Result<SimulationSnapshot, SimulationError> {
        self.send(Command::Shutdown).await
    }

    /// Return the most recently published snapshot.
    pub fn snapshot(&self) -> SimulationSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<SimulationSnapshot> {
        self.snapshots.clone()
    }

    /// Send a command and wait for the runner's reply.
    ///
    /// Every failure to reach the runner maps to
    /// [`SimulationError::RunnerClosed`].
    async fn send(&self, command: Command) -> Result<SimulationSnapshot, SimulationError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .await
            .map_err(|_closed| SimulationError::RunnerClosed)?;
        response
            .await
            .map_err(|_dropped| SimulationError::RunnerClosed)?
    }
}
