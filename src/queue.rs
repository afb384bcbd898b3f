use std::time::{SystemTime, UNIX_EPOCH};

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::AnalysisOutcome;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

/// Persistent record of one analysis task, stored under `task:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub file_path: String,
    pub status: TaskStatus,
    pub created_at: u64,
    pub updated_at: u64,
    pub outcome: Option<AnalysisOutcome>,
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn new(task_id: &str, file_path: &str) -> Self {
        let now = now_ts();
        Self {
            task_id: task_id.to_string(),
            file_path: file_path.to_string(),
            status: TaskStatus::Queued,
            created_at: now,
            updated_at: now,
            outcome: None,
            error: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.status, TaskStatus::Done | TaskStatus::Failed)
    }
}

/// Message pushed onto the broker list for each submitted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub task_id: String,
    pub file_path: String,
}

fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn task_key(task_id: &str) -> String {
    format!("task:{task_id}")
}

/// Submit a file path for analysis. Persists the initial task record and
/// pushes the queue message; returns the new task id.
pub async fn submit(
    conn: &mut MultiplexedConnection,
    queue_name: &str,
    file_path: &str,
) -> Result<String> {
    let task_id = uuid::Uuid::new_v4().to_string();

    let record = TaskRecord::new(&task_id, file_path);
    store_record(conn, &record).await?;

    let message = QueueMessage {
        task_id: task_id.clone(),
        file_path: file_path.to_string(),
    };
    let payload = serde_json::to_string(&message)?;
    conn.lpush::<_, _, ()>(queue_name, payload).await?;

    debug!("Submitted task {} for {}", task_id, file_path);
    Ok(task_id)
}

/// Fetch the record for a task id, if one exists.
pub async fn fetch(
    conn: &mut MultiplexedConnection,
    task_id: &str,
) -> Result<Option<TaskRecord>> {
    let value: Option<String> = conn.get(task_key(task_id)).await?;
    match value {
        Some(v) => Ok(Some(serde_json::from_str(&v)?)),
        None => Ok(None),
    }
}

/// Block up to `timeout_secs` waiting for the next queued task.
pub async fn next_message(
    conn: &mut MultiplexedConnection,
    queue_name: &str,
    timeout_secs: f64,
) -> Result<Option<QueueMessage>> {
    let popped: Option<(String, String)> = conn.brpop(queue_name, timeout_secs).await?;
    match popped {
        Some((_list, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
        None => Ok(None),
    }
}

pub async fn store_record(conn: &mut MultiplexedConnection, record: &TaskRecord) -> Result<()> {
    let payload = serde_json::to_string(record)?;
    conn.set::<_, _, ()>(task_key(&record.task_id), payload)
        .await?;
    Ok(())
}

async fn update_status(
    conn: &mut MultiplexedConnection,
    message: &QueueMessage,
    status: TaskStatus,
    outcome: Option<AnalysisOutcome>,
    error: Option<String>,
) -> Result<()> {
    let mut record = fetch(conn, &message.task_id)
        .await?
        .unwrap_or_else(|| TaskRecord::new(&message.task_id, &message.file_path));

    record.status = status;
    record.outcome = outcome;
    record.error = error;
    record.updated_at = now_ts();

    store_record(conn, &record).await
}

pub async fn mark_processing(
    conn: &mut MultiplexedConnection,
    message: &QueueMessage,
) -> Result<()> {
    update_status(conn, message, TaskStatus::Processing, None, None).await
}

/// Resolve a task successfully. The handled missing-file case lands here
/// too, carrying the structured error mapping as its outcome.
pub async fn mark_done(
    conn: &mut MultiplexedConnection,
    message: &QueueMessage,
    outcome: AnalysisOutcome,
) -> Result<()> {
    update_status(conn, message, TaskStatus::Done, Some(outcome), None).await
}

/// Resolve a task as failed, recording the propagated error text.
pub async fn mark_failed(
    conn: &mut MultiplexedConnection,
    message: &QueueMessage,
    error: &str,
) -> Result<()> {
    update_status(conn, message, TaskStatus::Failed, None, Some(error.to_string())).await
}
