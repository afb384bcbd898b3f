use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::analysis::analyze_audio;
use crate::classifier::LazyClassifier;
use crate::config::Config;
use crate::error::Result;
use crate::queue::{self, QueueMessage};

/// How long each blocking pop waits before the loop re-checks for shutdown.
const POLL_TIMEOUT_SECS: f64 = 1.0;

/// Run the analysis worker until interrupted.
///
/// The checkpoint is loaded once at startup so a missing or corrupt model
/// fails the process instead of the first task. Tasks run independently on
/// the blocking pool, bounded by `config.concurrency` slots.
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let classifier = Arc::new(LazyClassifier::new(config.model_path.clone()));
    classifier.warm()?;
    info!("Classifier ready ({})", config.model_path.display());

    let client = redis::Client::open(config.redis_url.as_str())?;
    let mut conn = client.get_multiplexed_tokio_connection().await?;
    info!("Connected to broker at {}", config.redis_url);

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut active = JoinSet::new();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        queue = %config.queue_name,
        slots = config.concurrency,
        "Worker started"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received, draining {} active tasks", active.len());
                while let Some(result) = active.join_next().await {
                    if let Err(e) = result {
                        error!("Task panicked during shutdown: {e}");
                    }
                }
                info!("Worker shutdown complete");
                break;
            }

            message = queue::next_message(&mut conn, &config.queue_name, POLL_TIMEOUT_SECS) => {
                // Reap finished tasks before taking on new work
                while let Some(result) = active.try_join_next() {
                    if let Err(e) = result {
                        error!("Task panicked: {e}");
                    }
                }

                let message = match message {
                    Ok(Some(m)) => m,
                    Ok(None) => continue,
                    Err(e) => {
                        error!("Broker poll failed: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

                debug!(task_id = %message.task_id, "Picked up task");

                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("Semaphore closed");
                let task_conn = conn.clone();
                let task_classifier = classifier.clone();

                active.spawn(async move {
                    let _permit = permit;
                    process_message(task_conn, message, task_classifier).await;
                });
            }
        }
    }

    Ok(())
}

/// Execute one queued task and persist its resolution.
async fn process_message(
    mut conn: MultiplexedConnection,
    message: QueueMessage,
    classifier: Arc<LazyClassifier>,
) {
    if let Err(e) = queue::mark_processing(&mut conn, &message).await {
        warn!(task_id = %message.task_id, "Failed to mark task processing: {e}");
    }

    let path = PathBuf::from(&message.file_path);
    let result =
        tokio::task::spawn_blocking(move || analyze_audio(&path, &classifier)).await;

    let resolution = match result {
        Ok(Ok(outcome)) => {
            info!(task_id = %message.task_id, "Task done");
            queue::mark_done(&mut conn, &message, outcome).await
        }
        Ok(Err(e)) => {
            warn!(task_id = %message.task_id, "Task failed: {e}");
            queue::mark_failed(&mut conn, &message, &e.to_string()).await
        }
        Err(e) => {
            error!(task_id = %message.task_id, "Analysis panicked: {e}");
            queue::mark_failed(&mut conn, &message, "analysis panicked").await
        }
    };

    if let Err(e) = resolution {
        error!(task_id = %message.task_id, "Failed to persist task result: {e}");
    }
}
