//! JSON-lines output of a headless match.
//!
//! One JSON object per line, tagged by `type`:
//!
//! ```text
//! {"type":"start","seed":7,"difficulty":"normal","strategy":"Rush"}
//! {"type":"frame","tick":60,"events":{...},"snapshot":{...}}
//! {"type":"result","metrics":{...}}
//! ```
//!
//! Logs go to stderr so stdout can be piped straight into a parser.

use lanewar_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::metrics::MatchMetrics;

/// A line of match output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// Emitted before the first update.
    Start {
        seed: u64,
        difficulty: DifficultyId,
        strategy: String,
    },

    /// Periodic view of the match.
    Frame {
        tick: u64,
        /// Events of the update that produced this frame.
        events: TickEvents,
        snapshot: GameSnapshot,
    },

    /// Emitted once the match ends or times out.
    Result { metrics: MatchMetrics },
}

impl Record {
    /// Serialize to a JSON line (with newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_line_shape() {
        let line = Record::Start {
            seed: 7,
            difficulty: DifficultyId::Normal,
            strategy: "Rush".to_string(),
        }
        .to_json_line()
        .unwrap();
        assert_eq!(
            line,
            "{\"type\":\"start\",\"seed\":7,\"difficulty\":\"normal\",\"strategy\":\"Rush\"}\n"
        );
    }

    #[test]
    fn test_result_parses_back() {
        let record = Record::Result {
            metrics: MatchMetrics {
                seed: 3,
                duration_ticks: 120,
                ..Default::default()
            },
        };
        let line = record.to_json_line().unwrap();
        assert_eq!(Record::from_json(line.trim_end()).unwrap(), record);
    }
}
