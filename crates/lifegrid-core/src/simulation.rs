//! The simulation controller: grid, generation counter, running flag, and
//! speed, owned together by one value.
//!
//! [`Simulation`] is a synchronous state machine. It never schedules
//! anything itself; the [`runner`](crate::runner) task calls
//! [`Simulation::tick`] when a tick is due and uses the returned delay to
//! schedule the next one.
//!
//! # States
//!
//! - `Idle`: not running. Cells can be toggled, the grid cleared or
//!   randomized.
//! - `Running`: ticks are being scheduled. Editing is rejected.
//! - `Converged`: not running because the last generation was identical to
//!   its predecessor. Behaves like `Idle` for every operation.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{LifeConfig, SpeedConfig};
use crate::grid::{Grid, GridError};
use crate::rules;

/// Errors reported by simulation operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// The operation is not allowed while the simulation is running.
    #[error("cannot {operation} while the simulation is running")]
    InvalidOperation {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// A grid-level failure (bad dimensions, out-of-bounds cell, bad density).
    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    /// A speed setting outside the configured range.
    #[error("speed {speed} is outside {min}..={max}")]
    SpeedOutOfRange {
        /// The rejected speed.
        speed: u32,
        /// Lowest accepted speed.
        min: u32,
        /// Highest accepted speed.
        max: u32,
    },

    /// The generation counter would overflow.
    #[error("generation counter overflow: cannot advance beyond u64::MAX")]
    GenerationOverflow,

    /// The runner task that owns the simulation is no longer running.
    #[error("simulation runner has shut down")]
    RunnerClosed,
}

/// Coarse lifecycle state of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPhase {
    /// Not running.
    Idle,
    /// Ticks are being scheduled.
    Running,
    /// Stopped automatically because a generation reproduced its predecessor.
    Converged,
}

/// What a single call to [`Simulation::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The simulation was not running; nothing changed.
    Skipped,
    /// A new, different generation was produced.
    Advanced {
        /// Generation number after this tick.
        generation: u64,
        /// Delay before the next tick, from the speed at this moment.
        delay: Duration,
    },
    /// The new generation equals the previous one; the simulation stopped.
    Converged {
        /// Generation number after this tick, now frozen.
        generation: u64,
    },
}

/// Read-only view of the simulation handed to surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSnapshot {
    /// The current grid (an owned copy).
    pub grid: Grid,
    /// Completed generations since the last clear.
    pub generation: u64,
    /// Whether ticks are being scheduled.
    pub running: bool,
    /// Lifecycle phase.
    pub phase: SimulationPhase,
    /// Current speed setting.
    pub speed: u32,
    /// Number of live cells in `grid`.
    pub live_cells: usize,
    /// Message of the last tick failure, if the runner stopped on one.
    pub last_error: Option<String>,
}

/// The owned simulation controller.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Current generation's cells.
    grid: Grid,

    /// Completed generations since the last clear or randomize.
    generation: u64,

    /// Whether ticks are being scheduled.
    running: bool,

    /// Whether the last stop was caused by convergence.
    converged: bool,

    /// Current speed, always within `timing.min..=timing.max`.
    speed: u32,

    /// Speed range and delay formula.
    timing: SpeedConfig,

    /// Seed for the next random fill.
    next_seed: u64,

    /// Message of the last tick failure.
    last_error: Option<String>,
}

impl Simulation {
    /// Create an idle simulation with an all-dead grid sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Grid`] for bad dimensions, or
    /// [`SimulationError::SpeedOutOfRange`] if the initial speed is outside
    /// the configured range.
    pub fn new(config: &LifeConfig) -> Result<Self, SimulationError> {
        let grid = Grid::new(config.grid.rows, config.grid.cols)?;
        let mut sim = Self::with_grid(grid, config.speed)?;
        sim.next_seed = config.random.seed;
        Ok(sim)
    }

    /// Create an idle simulation starting from an existing grid.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SpeedOutOfRange`] if `timing.initial` is
    /// outside `timing.min..=timing.max`.
    pub fn with_grid(grid: Grid, timing: SpeedConfig) -> Result<Self, SimulationError> {
        check_speed(&timing, timing.initial)?;
        Ok(Self {
            grid,
            generation: 0,
            running: false,
            converged: false,
            speed: timing.initial,
            timing,
            next_seed: 0,
            last_error: None,
        })
    }

    /// Return the current grid.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Return the number of completed generations.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Return whether ticks are being scheduled.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Return the current speed setting.
    pub const fn speed(&self) -> u32 {
        self.speed
    }

    /// Return the lifecycle phase.
    pub const fn phase(&self) -> SimulationPhase {
        if self.running {
            SimulationPhase::Running
        } else if self.converged {
            SimulationPhase::Converged
        } else {
            SimulationPhase::Idle
        }
    }

    /// Return the delay before the next tick at the current speed.
    pub fn tick_delay(&self) -> Duration {
        self.timing.delay_for(self.speed)
    }

    /// Start ticking. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.converged = false;
        self.last_error = None;
        info!(generation = self.generation, speed = self.speed, "Simulation started");
        true
    }

    /// Stop ticking. Returns `false` if it was not running.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!(generation = self.generation, "Simulation stopped");
        true
    }

    /// Start if idle, stop if running. Returns the new running flag.
    pub fn start_stop(&mut self) -> bool {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
        self.running
    }

    /// Advance one generation if running.
    ///
    /// The running flag is re-checked first, so a tick that was already due
    /// when a stop arrived changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::GenerationOverflow`] if the counter cannot
    /// be incremented. State is left unchanged in that case.
    pub fn tick(&mut self) -> Result<TickOutcome, SimulationError> {
        if !self.running {
            return Ok(TickOutcome::Skipped);
        }

        let generation = self
            .generation
            .checked_add(1)
            .ok_or(SimulationError::GenerationOverflow)?;
        let next = rules::next_generation(&self.grid);
        let converged = next == self.grid;

        self.grid = next;
        self.generation = generation;

        if converged {
            self.running = false;
            self.converged = true;
            info!(generation, live_cells = self.grid.live_count(), "Simulation converged");
            return Ok(TickOutcome::Converged { generation });
        }

        let delay = self.tick_delay();
        debug!(generation, ?delay, "Generation advanced");
        Ok(TickOutcome::Advanced { generation, delay })
    }

    /// Reset to an all-dead grid and generation 0.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidOperation`] while running.
    pub fn clear(&mut self) -> Result<(), SimulationError> {
        self.ensure_idle("clear the grid")?;
        self.grid = Grid::new(self.grid.rows(), self.grid.cols())?;
        self.generation = 0;
        self.converged = false;
        info!("Grid cleared");
        Ok(())
    }

    /// Flip one cell.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidOperation`] while running, or
    /// [`SimulationError::Grid`] if the cell is out of bounds.
    pub fn toggle_cell(&mut self, row: usize, col: usize) -> Result<(), SimulationError> {
        self.ensure_idle("toggle a cell")?;
        self.grid = self.grid.toggle(row, col)?;
        self.converged = false;
        debug!(row, col, "Cell toggled");
        Ok(())
    }

    /// Change the speed. Accepted while running; applies to the next tick
    /// that gets scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SpeedOutOfRange`] if `speed` is outside the
    /// configured range.
    pub fn set_speed(&mut self, speed: u32) -> Result<(), SimulationError> {
        check_speed(&self.timing, speed)?;
        self.speed = speed;
        debug!(speed, delay = ?self.tick_delay(), "Speed changed");
        Ok(())
    }

    /// Replace the grid with a seeded random fill and reset the generation.
    ///
    /// Each call uses the next seed in sequence, so successive fills differ
    /// but a run is reproducible from the configured seed.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidOperation`] while running, or
    /// [`SimulationError::Grid`] if `density` is not within `0.0..=1.0`.
    pub fn randomize(&mut self, density: f64) -> Result<(), SimulationError> {
        self.ensure_idle("randomize the grid")?;
        let seed = self.next_seed;
        self.grid = Grid::random(self.grid.rows(), self.grid.cols(), density, seed)?;
        self.next_seed = seed.wrapping_add(1);
        self.generation = 0;
        self.converged = false;
        info!(seed, density, live_cells = self.grid.live_count(), "Grid randomized");
        Ok(())
    }

    /// Stop the simulation after a failed tick and remember why.
    pub fn record_failure(&mut self, error: &SimulationError) {
        self.running = false;
        self.last_error = Some(error.to_string());
    }

    /// Build a snapshot of the current state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            grid: self.grid.clone(),
            generation: self.generation,
            running: self.running,
            phase: self.phase(),
            speed: self.speed,
            live_cells: self.grid.live_count(),
            last_error: self.last_error.clone(),
        }
    }

    const fn ensure_idle(&self, operation: &'static str) -> Result<(), SimulationError> {
        if self.running {
            return Err(SimulationError::InvalidOperation { operation });
        }
        Ok(())
    }
}

const fn check_speed(timing: &SpeedConfig, speed: u32) -> Result<(), SimulationError> {
    if timing.contains(speed) {
        Ok(())
    } else {
        Err(SimulationError::SpeedOutOfRange {
            speed,
            min: timing.min,
            max: timing.max,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sim_with(rows: usize, cols: usize, live: &[(usize, usize)]) -> Simulation {
        let grid = Grid::from_live_cells(rows, cols, live).unwrap();
        Simulation::with_grid(grid, SpeedConfig::default()).unwrap()
    }

    fn block() -> Simulation {
        sim_with(6, 6, &[(2, 2), (2, 3), (3, 2), (3, 3)])
    }

    fn blinker() -> Simulation {
        sim_with(5, 5, &[(2, 1), (2, 2), (2, 3)])
    }

    #[test]
    fn new_simulation_is_idle_and_empty() {
        let sim = Simulation::new(&LifeConfig::default()).unwrap();
        assert_eq!(sim.phase(), SimulationPhase::Idle);
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.speed(), 50);
        assert_eq!(sim.grid().rows(), 20);
        assert_eq!(sim.grid().cols(), 40);
        assert!(sim.grid().is_empty());
    }

    #[test]
    fn start_is_noop_when_running() {
        let mut sim = block();
        assert!(sim.start());
        assert!(!sim.start());
        assert!(sim.is_running());
    }

    #[test]
    fn tick_when_idle_is_skipped() {
        let mut sim = blinker();
        let before = sim.grid().clone();
        assert_eq!(sim.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(sim.grid(), &before);
        assert_eq!(sim.generation(), 0);
    }

    #[test]
    fn empty_grid_converges_at_generation_one() {
        let mut sim = Simulation::new(&LifeConfig::default()).unwrap();
        sim.start();
        assert_eq!(
            sim.tick().unwrap(),
            TickOutcome::Converged { generation: 1 }
        );
        assert!(!sim.is_running());
        assert_eq!(sim.phase(), SimulationPhase::Converged);
        assert_eq!(sim.generation(), 1);
        // Further ticks do nothing; the counter stays frozen.
        assert_eq!(sim.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(sim.generation(), 1);
    }

    #[test]
    fn block_converges_at_generation_one() {
        let mut sim = block();
        let before = sim.grid().clone();
        sim.start();
        assert_eq!(
            sim.tick().unwrap(),
            TickOutcome::Converged { generation: 1 }
        );
        assert_eq!(sim.grid(), &before);
    }

    #[test]
    fn blinker_keeps_advancing() {
        let mut sim = blinker();
        sim.start();
        for expected in 1..=6 {
            let outcome = sim.tick().unwrap();
            assert_eq!(
                outcome,
                TickOutcome::Advanced {
                    generation: expected,
                    delay: Duration::from_millis(500),
                }
            );
        }
        assert!(sim.is_running());
    }

    #[test]
    fn single_cell_dies_then_converges() {
        let mut sim = sim_with(5, 5, &[(2, 2)]);
        sim.start();
        assert!(matches!(sim.tick().unwrap(), TickOutcome::Advanced { generation: 1, .. }));
        assert!(sim.grid().is_empty());
        assert_eq!(
            sim.tick().unwrap(),
            TickOutcome::Converged { generation: 2 }
        );
    }

    #[test]
    fn stop_keeps_grid_and_generation() {
        let mut sim = blinker();
        sim.start();
        sim.tick().unwrap();
        let grid = sim.grid().clone();
        assert!(sim.stop());
        assert!(!sim.stop());
        assert_eq!(sim.grid(), &grid);
        assert_eq!(sim.generation(), 1);
        assert_eq!(sim.phase(), SimulationPhase::Idle);
    }

    #[test]
    fn start_stop_toggles() {
        let mut sim = blinker();
        assert!(sim.start_stop());
        assert!(!sim.start_stop());
        assert!(sim.start_stop());
    }

    #[test]
    fn clear_while_running_is_rejected() {
        let mut sim = blinker();
        sim.start();
        assert!(matches!(
            sim.clear(),
            Err(SimulationError::InvalidOperation { .. })
        ));
        assert!(!sim.grid().is_empty());
    }

    #[test]
    fn toggle_while_running_is_rejected() {
        let mut sim = blinker();
        sim.start();
        assert!(matches!(
            sim.toggle_cell(0, 0),
            Err(SimulationError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn clear_resets_grid_and_generation() {
        let mut sim = blinker();
        sim.start();
        sim.tick().unwrap();
        sim.tick().unwrap();
        sim.stop();
        sim.clear().unwrap();
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.grid(), &Grid::new(5, 5).unwrap());
        assert_eq!(sim.phase(), SimulationPhase::Idle);
    }

    #[test]
    fn toggle_out_of_bounds_is_reported() {
        let mut sim = blinker();
        assert!(matches!(
            sim.toggle_cell(5, 0),
            Err(SimulationError::Grid(GridError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn toggle_after_convergence_returns_to_idle() {
        let mut sim = block();
        sim.start();
        sim.tick().unwrap();
        assert_eq!(sim.phase(), SimulationPhase::Converged);
        sim.toggle_cell(0, 0).unwrap();
        assert_eq!(sim.phase(), SimulationPhase::Idle);
        assert!(sim.grid().is_alive(0, 0).unwrap());
    }

    #[test]
    fn speed_changes_the_delay() {
        let mut sim = blinker();
        sim.set_speed(90).unwrap();
        assert_eq!(sim.tick_delay(), Duration::from_millis(100));
        sim.start();
        // Accepted while running.
        sim.set_speed(0).unwrap();
        assert!(matches!(
            sim.tick().unwrap(),
            TickOutcome::Advanced { delay, .. } if delay == Duration::from_millis(1000)
        ));
    }

    #[test]
    fn speed_out_of_range_is_rejected() {
        let mut sim = blinker();
        assert_eq!(
            sim.set_speed(100),
            Err(SimulationError::SpeedOutOfRange {
                speed: 100,
                min: 0,
                max: 99
            })
        );
        assert_eq!(sim.speed(), 50);
    }

    #[test]
    fn randomize_is_reproducible_and_advances_seed() {
        let config = LifeConfig::default();
        let mut a = Simulation::new(&config).unwrap();
        let mut b = Simulation::new(&config).unwrap();
        a.randomize(0.3).unwrap();
        b.randomize(0.3).unwrap();
        assert_eq!(a.grid(), b.grid());

        let first = a.grid().clone();
        a.randomize(0.3).unwrap();
        assert_ne!(a.grid(), &first);
        assert_eq!(a.generation(), 0);
    }

    #[test]
    fn randomize_while_running_is_rejected() {
        let mut sim = blinker();
        sim.start();
        assert!(matches!(
            sim.randomize(0.5),
            Err(SimulationError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn generation_overflow_is_reported_without_mutation() {
        let mut sim = blinker();
        sim.generation = u64::MAX;
        sim.start();
        let before = sim.grid().clone();
        assert_eq!(sim.tick(), Err(SimulationError::GenerationOverflow));
        assert_eq!(sim.grid(), &before);
        assert_eq!(sim.generation(), u64::MAX);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut sim = blinker();
        sim.start();
        sim.tick().unwrap();
        let snap = sim.snapshot();
        assert_eq!(snap.generation, 1);
        assert!(snap.running);
        assert_eq!(snap.phase, SimulationPhase::Running);
        assert_eq!(snap.live_cells, 3);
        assert_eq!(&snap.grid, sim.grid());
        assert!(snap.last_error.is_none());
    }

    #[test]
    fn snapshot_serializes_for_surfaces() {
        let mut sim = block();
        sim.start();
        let json = serde_json::to_value(sim.snapshot()).unwrap();
        assert_eq!(json["phase"], "running");
        assert_eq!(json["generation"], 0);
        assert_eq!(json["grid"]["rows"], 6);
        assert_eq!(json["live_cells"], 4);
    }

    #[test]
    fn record_failure_stops_and_reports() {
        let mut sim = blinker();
        sim.start();
        sim.record_failure(&SimulationError::GenerationOverflow);
        let snap = sim.snapshot();
        assert!(!snap.running);
        assert!(snap.last_error.is_some());
    }
}
