//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunState`: the lifecycle of one batch run (idle, running, stopping, stopped, done)

mod run_state;

// Re-export main types
pub use run_state::RunState;
