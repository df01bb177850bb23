//! Execution logs - the recorded trace of a pipeline run

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Unique identifier for a run, based on UUIDv7
///
/// UUIDv7 ids sort chronologically, so listing runs by id lists them by
/// start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u128);

impl RunId {
    /// Generate a new run id
    ///
    /// # Examples
    ///
    /// ```
    /// use clinitag_domain::RunId;
    ///
    /// let a = RunId::new();
    /// let b = RunId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a run id from its raw value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a run id from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid run id: {}", e))
    }

    /// Get the raw value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Database identifier of an execution log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionLogId(pub i64);

impl fmt::Display for ExecutionLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Opened and not yet finalized
    Running,
    /// Finalized with an output
    Succeeded,
    /// Finalized with an error
    Failed,
}

impl RunStatus {
    /// Get the status as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }

    /// Parse a stored status
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "succeeded" => Some(RunStatus::Succeeded),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    /// Whether the run has been finalized
    pub fn is_final(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data needed to open an execution log
#[derive(Debug, Clone, PartialEq)]
pub struct NewExecutionLog {
    /// Run identifier
    pub run_id: RunId,
    /// Name of the agent performing the run
    pub agent_name: String,
    /// Run input
    pub input: Value,
}

/// Terminal outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunCompletion {
    /// The run produced an output
    Succeeded {
        /// Run output
        output: Value,
        /// Wall-clock duration
        duration_ms: u64,
    },
    /// The run aborted
    Failed {
        /// Error message
        error: String,
        /// Wall-clock duration
        duration_ms: u64,
    },
}

impl RunCompletion {
    /// Status this completion finalizes a log with
    pub fn status(&self) -> RunStatus {
        match self {
            RunCompletion::Succeeded { .. } => RunStatus::Succeeded,
            RunCompletion::Failed { .. } => RunStatus::Failed,
        }
    }

    /// Duration carried by either variant
    pub fn duration_ms(&self) -> u64 {
        match self {
            RunCompletion::Succeeded { duration_ms, .. } | RunCompletion::Failed { duration_ms, .. } => {
                *duration_ms
            }
        }
    }
}

/// A persisted execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    /// Database identifier
    pub id: ExecutionLogId,

    /// Run identifier (UUID string form)
    pub run_id: String,

    /// Agent name
    pub agent_name: String,

    /// Run input
    pub input: Value,

    /// Run output, once succeeded
    pub output: Option<Value>,

    /// Duration, once finalized
    pub duration_ms: Option<u64>,

    /// Lifecycle state
    pub status: RunStatus,

    /// Error message, once failed
    pub error_message: Option<String>,

    /// Open timestamp (seconds since Unix epoch)
    pub created_at: u64,

    /// Finalization timestamp (seconds since Unix epoch)
    pub finished_at: Option<u64>,
}

impl ExecutionLog {
    /// Success flag in the sense of a finalized log: `None` while running
    pub fn success(&self) -> Option<bool> {
        match self.status {
            RunStatus::Running => None,
            RunStatus::Succeeded => Some(true),
            RunStatus::Failed => Some(false),
        }
    }
}

/// One timestamped event within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Owning log
    pub log: ExecutionLogId,

    /// Position within the run, starting at 1
    pub sequence: u32,

    /// Event message
    pub message: String,

    /// Optional structured metadata
    pub metadata: Option<Value>,

    /// Event time (milliseconds since Unix epoch)
    pub timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_round_trip() {
        let id = RunId::new();
        let parsed = RunId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(RunId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_status_parsing() {
        for status in [RunStatus::Running, RunStatus::Succeeded, RunStatus::Failed] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("done"), None);
        assert!(!RunStatus::Running.is_final());
        assert!(RunStatus::Failed.is_final());
    }

    #[test]
    fn test_completion_status() {
        let ok = RunCompletion::Succeeded {
            output: serde_json::json!({"num_chunks_processed": 3}),
            duration_ms: 12,
        };
        let err = RunCompletion::Failed {
            error: "boom".to_string(),
            duration_ms: 4,
        };
        assert_eq!(ok.status(), RunStatus::Succeeded);
        assert_eq!(err.status(), RunStatus::Failed);
        assert_eq!(err.duration_ms(), 4);
    }
}
