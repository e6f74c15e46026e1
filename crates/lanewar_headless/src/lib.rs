//! Headless match runner for strategy testing and balance batches.
//!
//! Plays matches of a scripted player [`Strategy`] against the automated
//! opponent without any presentation layer:
//!
//! - **Single runs**: one seed, optionally streaming JSON-lines frames
//! - **Batches**: many seeds in parallel, summarized into win rate and
//!   match length
//! - **Determinism checks**: the same seed replayed and compared
//!
//! # Example
//!
//! ```bash
//! # One match, a frame every second of match time
//! cargo run -p lanewar_headless -- run --strategy rush --frame-every 60
//!
//! # 500 seeds against hard, results to JSON
//! cargo run -p lanewar_headless -- batch --difficulty hard --count 500 --output results/hard.json
//! ```

pub mod batch;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod strategies;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, MatchMetrics, MetricsCollector, Outcome};
pub use protocol::Record;
pub use runner::{MatchConfig, MatchRunner, RunnerError};
pub use strategies::{Strategy, StrategyError};
