//! Kitchen stations: the concurrent units that cook recipes.
//!
//! - **Station loop**: dequeues recipes from the shared queue and drives each
//!   one through its steps, publishing progress as it goes
//! - **Step execution**: the timed, cancellable wait behind every step
//!
//! # Components
//!
//! - [`Station`]: one worker in the kitchen's pool
//! - [`StepExecutor`]: performs a single step; [`SimulatedExecutor`] just waits
//! - [`Roster`]: desired pool size and the stations currently on duty
//!
//! # Station Flow
//!
//! 1. Exit on cancellation, retire if the pool shrank below this station
//! 2. Dequeue a recipe, exit when the queue is empty
//! 3. Publish `Created`, then `Updated` after each step
//! 4. Publish `Completed`, `Cancelled` or `Failed` and loop
//!
//! A failing recipe never takes its station down: the error is logged, the
//! recipe is left incomplete and the station moves on to the next one.

pub mod executor;
pub mod roster;
pub mod worker;

pub use executor::{SimulatedExecutor, StepExecutor, StepOutcome};
pub use roster::Roster;
pub use worker::{Station, StationContext, StationExit, StationReport};
