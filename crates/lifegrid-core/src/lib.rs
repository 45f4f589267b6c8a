//! Grid, rule engine, and timed generation loop for the lifegrid Game of
//! Life simulator.
//!
//! The grid is fixed-size with hard (non-wrapping) borders. One runner task
//! owns the simulation, advances it at a speed-controlled rate, and stops on
//! its own once a generation reproduces its predecessor.
//!
//! # Modules
//!
//! - [`grid`] -- Fixed-dimension cell matrix with bounds-checked access.
//! - [`rules`] -- Neighbour counting and next-generation computation.
//! - [`simulation`] -- [`Simulation`] controller state machine.
//! - [`runner`] -- The async loop that schedules ticks and serves requests.
//! - [`surface`] -- [`SimulationHandle`], the contract front ends use.
//! - [`config`] -- Configuration loading from `lifegrid-config.yaml`.
//!
//! [`Simulation`]: simulation::Simulation
//! [`SimulationHandle`]: surface::SimulationHandle

pub mod config;
pub mod grid;
pub mod rules;
pub mod runner;
pub mod simulation;
pub mod surface;

pub use config::LifeConfig;
pub use grid::{Grid, GridError};
pub use simulation::{Simulation, SimulationError, SimulationPhase, SimulationSnapshot};
pub use surface::SimulationHandle;
