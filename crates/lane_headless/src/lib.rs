//! Headless lane battle runner for AI testing and CI verification.
//!
//! This crate drives a [`lane_core`] battle without graphics, controlled
//! via JSON commands on stdin, with battle state output on stdout. This
//! enables:
//!
//! - **Scripted play**: An external controller plays the left side
//! - **Balance testing**: Batches of AI-vs-AI battles in parallel
//! - **Determinism checks**: The same seed must end in the same state hash
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, move, queue, buy, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Lockstep: the battle only moves on `tick`
//! echo '{"cmd":"tick","count":300}' | cargo run -p lane_headless -- run
//!
//! # Real time: 20 ticks per second
//! cargo run -p lane_headless -- run --realtime --tick-ms 50
//!
//! # Balance batch
//! cargo run -p lane_headless -- batch --count 500 --output results/
//! ```

pub mod batch;
pub mod metrics;
pub mod protocol;
pub mod realtime;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, VerifyReport};
pub use metrics::{BatchSummary, BattleMetrics, MetricsCollector};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner, Session};
pub use scenario::{Scenario, ScenarioError};
