//! Execution recording for pipeline runs
//!
//! A recorder owns one execution log from open to finalization. Events are
//! appended while the run is in progress; `finish` stamps the outcome exactly
//! once and hands the run's result back unchanged.

use crate::error::ExtractorError;
use clinitag_domain::traits::ExecutionLogStore;
use clinitag_domain::{ExecutionLog, ExecutionLogId, NewExecutionLog, RunCompletion, RunId};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{info, warn};

/// Records one run into an [`ExecutionLogStore`]
pub struct ExecutionRecorder<S> {
    store: Arc<Mutex<S>>,
    log: ExecutionLogId,
    run_id: RunId,
    agent_name: String,
    started: Instant,
}

impl<S> ExecutionRecorder<S>
where
    S: ExecutionLogStore,
    S::Error: Display,
{
    /// Open a running log with the run's input snapshot
    pub fn open(
        store: Arc<Mutex<S>>,
        agent_name: &str,
        input: &impl Serialize,
    ) -> Result<Self, ExtractorError> {
        let run_id = RunId::new();
        let new_log = NewExecutionLog {
            run_id,
            agent_name: agent_name.to_string(),
            input: serde_json::to_value(input)?,
        };

        let log = lock(&store)?
            .open_log(&new_log)
            .map_err(|e| ExtractorError::Recorder(e.to_string()))?;

        info!(run_id = %run_id, agent = agent_name, "Opened execution log");

        Ok(Self {
            store,
            log,
            run_id,
            agent_name: agent_name.to_string(),
            started: Instant::now(),
        })
    }

    /// Run identifier
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Log identifier
    pub fn log_id(&self) -> ExecutionLogId {
        self.log
    }

    /// Append an event to the trace
    pub fn event(&self, message: &str, metadata: Option<Value>) -> Result<(), ExtractorError> {
        match &metadata {
            Some(meta) => info!(run_id = %self.run_id, agent = %self.agent_name, %meta, "{}", message),
            None => info!(run_id = %self.run_id, agent = %self.agent_name, "{}", message),
        }

        lock(&self.store)?
            .append_event(self.log, message, metadata.as_ref())
            .map_err(|e| ExtractorError::Recorder(e.to_string()))?;
        Ok(())
    }

    /// Finalize the log from the run's result and return that result
    ///
    /// A successful result is serialized as the output snapshot. An error is
    /// recorded and then returned as-is. If the output cannot be serialized or
    /// stored, the log is marked failed with that error, which is returned
    /// instead.
    pub fn finish<T: Serialize>(
        self,
        result: Result<T, ExtractorError>,
    ) -> Result<T, ExtractorError> {
        let duration_ms = self.started.elapsed().as_millis() as u64;

        let output = match result {
            Ok(output) => output,
            Err(error) => return Err(self.fail(error, duration_ms)),
        };

        let recorded = serde_json::to_value(&output)
            .map_err(ExtractorError::from)
            .and_then(|snapshot| {
                self.finalize(&RunCompletion::Succeeded {
                    output: snapshot,
                    duration_ms,
                })
            });

        match recorded {
            Ok(_) => {
                info!(run_id = %self.run_id, duration_ms, "Run succeeded");
                Ok(output)
            }
            Err(error) => Err(self.fail(error, duration_ms)),
        }
    }

    fn fail(&self, error: ExtractorError, duration_ms: u64) -> ExtractorError {
        let completion = RunCompletion::Failed {
            error: error.to_string(),
            duration_ms,
        };
        if let Err(record_error) = self.finalize(&completion) {
            warn!(run_id = %self.run_id, "Could not record run failure: {}", record_error);
        }
        warn!(run_id = %self.run_id, duration_ms, "Run failed: {}", error);
        error
    }

    fn finalize(&self, completion: &RunCompletion) -> Result<ExecutionLog, ExtractorError> {
        lock(&self.store)?
            .finalize_log(self.log, completion)
            .map_err(|e| ExtractorError::Recorder(e.to_string()))
    }
}

pub(crate) fn lock<S>(store: &Mutex<S>) -> Result<MutexGuard<'_, S>, ExtractorError> {
    store
        .lock()
        .map_err(|e| ExtractorError::Store(format!("Store lock error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinitag_domain::RunStatus;
    use clinitag_store::SqliteStore;
    use serde_json::json;

    fn shared_store() -> Arc<Mutex<SqliteStore>> {
        Arc::new(Mutex::new(SqliteStore::in_memory().unwrap()))
    }

    #[test]
    fn test_success_records_output_and_events() {
        let store = shared_store();
        let recorder =
            ExecutionRecorder::open(Arc::clone(&store), "TagGenerationAgent", &json!({"doc": "a"}))
                .unwrap();
        let run_id = recorder.run_id();

        recorder.event("Starting tag extraction", None).unwrap();
        recorder.event("Chunk processed", Some(json!({"index": 0}))).unwrap();
        let output = recorder.finish(Ok(json!({"chunks": 1}))).unwrap();
        assert_eq!(output, json!({"chunks": 1}));

        let guard = store.lock().unwrap();
        let log = guard.get_log(run_id).unwrap().unwrap();
        assert_eq!(log.status, RunStatus::Succeeded);
        assert_eq!(log.success(), Some(true));
        assert_eq!(log.input, json!({"doc": "a"}));
        assert_eq!(log.output, Some(json!({"chunks": 1})));
        assert!(log.duration_ms.is_some());

        let events = guard.events_for(log.id).unwrap();
        let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["Starting tag extraction", "Chunk processed"]);
        assert_eq!(events[1].metadata, Some(json!({"index": 0})));
    }

    #[test]
    fn test_failure_is_recorded_and_reraised() {
        let store = shared_store();
        let recorder = ExecutionRecorder::open(Arc::clone(&store), "agent", &json!(null)).unwrap();
        let run_id = recorder.run_id();

        let result: Result<(), _> =
            recorder.finish(Err(ExtractorError::DocumentNotFound("x.pdf".to_string())));
        assert!(matches!(result, Err(ExtractorError::DocumentNotFound(ref d)) if d == "x.pdf"));

        let guard = store.lock().unwrap();
        let log = guard.get_log(run_id).unwrap().unwrap();
        assert_eq!(log.success(), Some(false));
        assert_eq!(log.error_message.as_deref(), Some("Document not found: x.pdf"));
        assert!(log.output.is_none());
        assert!(log.finished_at.is_some());
    }

    struct Opaque;

    impl Serialize for Opaque {
        fn serialize<Ser: serde::Serializer>(&self, _: Ser) -> Result<Ser::Ok, Ser::Error> {
            Err(serde::ser::Error::custom("output cannot be serialized"))
        }
    }

    #[test]
    fn test_unrecordable_output_fails_the_log() {
        let store = shared_store();
        let recorder = ExecutionRecorder::open(Arc::clone(&store), "agent", &json!(null)).unwrap();
        let run_id = recorder.run_id();

        let result = recorder.finish(Ok(Opaque));
        assert!(matches!(result, Err(ExtractorError::Recorder(_))));

        let guard = store.lock().unwrap();
        let log = guard.get_log(run_id).unwrap().unwrap();
        assert_eq!(log.status, RunStatus::Failed);
        assert!(log
            .error_message
            .as_deref()
            .unwrap()
            .contains("output cannot be serialized"));
    }
}
