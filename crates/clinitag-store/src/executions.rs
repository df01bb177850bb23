use crate::{conversion_error, now_millis, now_secs, SqliteStore, StoreError};
use clinitag_domain::traits::ExecutionLogStore;
use clinitag_domain::{
    ExecutionEvent, ExecutionLog, ExecutionLogId, NewExecutionLog, RunCompletion, RunId, RunStatus,
};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;

const LOG_COLUMNS: &str = "id, run_id, agent_name, input_data, output_data, duration_ms, status, \
                           error_message, created_at, finished_at";

fn parse_json(column: usize, raw: &str) -> rusqlite::Result<Value> {
    serde_json::from_str(raw).map_err(|e| conversion_error(column, Type::Text, StoreError::Json(e)))
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionLog> {
    let input: String = row.get(3)?;
    let output: Option<String> = row.get(4)?;
    let status: String = row.get(6)?;

    Ok(ExecutionLog {
        id: ExecutionLogId(row.get(0)?),
        run_id: row.get(1)?,
        agent_name: row.get(2)?,
        input: parse_json(3, &input)?,
        output: output.as_deref().map(|raw| parse_json(4, raw)).transpose()?,
        duration_ms: row.get::<_, Option<i64>>(5)?.map(|d| d as u64),
        status: RunStatus::parse(&status).ok_or_else(|| {
            conversion_error(
                6,
                Type::Text,
                StoreError::InvalidData(format!("Unknown run status: {}", status)),
            )
        })?,
        error_message: row.get(7)?,
        created_at: row.get::<_, i64>(8)? as u64,
        finished_at: row.get::<_, Option<i64>>(9)?.map(|t| t as u64),
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionEvent> {
    let metadata: Option<String> = row.get(3)?;
    Ok(ExecutionEvent {
        log: ExecutionLogId(row.get(0)?),
        sequence: row.get(1)?,
        message: row.get(2)?,
        metadata: metadata.as_deref().map(|raw| parse_json(3, raw)).transpose()?,
        timestamp_ms: row.get::<_, i64>(4)? as u64,
    })
}

impl SqliteStore {
    fn log_by_id(&self, log: ExecutionLogId) -> Result<Option<ExecutionLog>, StoreError> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM execution_logs WHERE id = ?1"),
                params![log.0],
                log_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Why a write against `log` matched no running row
    fn closed_log_error(&self, log: ExecutionLogId) -> StoreError {
        match self.log_by_id(log) {
            Ok(Some(_)) => StoreError::AlreadyFinalized(log.0),
            Ok(None) => StoreError::NotFound(format!("execution log {}", log)),
            Err(e) => e,
        }
    }
}

impl ExecutionLogStore for SqliteStore {
    fn open_log(&mut self, log: &NewExecutionLog) -> Result<ExecutionLogId, Self::Error> {
        let input = serde_json::to_string(&log.input)?;
        self.conn.execute(
            "INSERT INTO execution_logs (run_id, agent_name, input_data, status, created_at)
             VALUES (?1, ?2, ?3, 'running', ?4)",
            params![log.run_id.to_string(), &log.agent_name, input, now_secs()],
        )?;
        Ok(ExecutionLogId(self.conn.last_insert_rowid()))
    }

    fn append_event(
        &mut self,
        log: ExecutionLogId,
        message: &str,
        metadata: Option<&Value>,
    ) -> Result<ExecutionEvent, Self::Error> {
        let metadata_json = metadata.map(serde_json::to_string).transpose()?;

        // Sequence assignment and the running check happen in one statement
        let inserted = self.conn.execute(
            "INSERT INTO execution_events (log_id, sequence, message, metadata, timestamp_ms)
             SELECT ?1,
                    COALESCE((SELECT MAX(sequence) FROM execution_events WHERE log_id = ?1), 0) + 1,
                    ?2, ?3, ?4
             WHERE EXISTS (SELECT 1 FROM execution_logs WHERE id = ?1 AND status = 'running')",
            params![log.0, message, metadata_json, now_millis()],
        )?;
        if inserted == 0 {
            return Err(self.closed_log_error(log));
        }

        let event = self.conn.query_row(
            "SELECT log_id, sequence, message, metadata, timestamp_ms
             FROM execution_events WHERE id = ?1",
            params![self.conn.last_insert_rowid()],
            event_from_row,
        )?;
        Ok(event)
    }

    fn finalize_log(
        &mut self,
        log: ExecutionLogId,
        completion: &RunCompletion,
    ) -> Result<ExecutionLog, Self::Error> {
        let (output, error) = match completion {
            RunCompletion::Succeeded { output, .. } => (Some(serde_json::to_string(output)?), None),
            RunCompletion::Failed { error, .. } => (None, Some(error.as_str())),
        };

        let updated = self.conn.execute(
            "UPDATE execution_logs
             SET status = ?2, output_data = ?3, error_message = ?4, duration_ms = ?5, finished_at = ?6
             WHERE id = ?1 AND status = 'running'",
            params![
                log.0,
                completion.status().as_str(),
                output,
                error,
                completion.duration_ms() as i64,
                now_secs(),
            ],
        )?;
        if updated == 0 {
            return Err(self.closed_log_error(log));
        }

        self.log_by_id(log)?
            .ok_or_else(|| StoreError::NotFound(format!("execution log {}", log)))
    }

    fn get_log(&self, run: RunId) -> Result<Option<ExecutionLog>, Self::Error> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM execution_logs WHERE run_id = ?1"),
                params![run.to_string()],
                log_from_row,
            )
            .optional()?;
        Ok(found)
    }

    fn recent_logs(&self, limit: usize) -> Result<Vec<ExecutionLog>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM execution_logs ORDER BY id DESC LIMIT ?1"
        ))?;
        let logs = stmt
            .query_map(params![limit as i64], log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn events_for(&self, log: ExecutionLogId) -> Result<Vec<ExecutionEvent>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT log_id, sequence, message, metadata, timestamp_ms
             FROM execution_events WHERE log_id = ?1 ORDER BY sequence",
        )?;
        let events = stmt
            .query_map(params![log.0], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}
