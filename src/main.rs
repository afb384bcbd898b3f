use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deepscan::classifier::LazyClassifier;
use deepscan::config::Config;
use deepscan::{analysis, queue, video, worker};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "deepscan")]
#[command(version, about = "Deepfake audio analysis worker and video frame extractor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the analysis worker
    Worker {
        /// Concurrent task slots (overrides config)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Queue an audio file for analysis and print the task id
    Submit {
        /// Audio file to analyze
        file: PathBuf,

        /// Poll until the task resolves, then print the task record
        #[arg(long)]
        wait: bool,
    },

    /// Print the record of a submitted task
    Status {
        task_id: String,
    },

    /// Analyze an audio file locally, without the queue
    Analyze {
        /// Audio file to analyze
        file: PathBuf,
    },

    /// Extract sample frames from a video
    Frames {
        /// Video file to sample
        video: PathBuf,

        /// Directory to write frames into
        #[arg(short, long, default_value = "frames")]
        output_dir: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Submitted paths travel to the worker by value, so resolve them to
/// absolute form when possible.
fn resolve_submit_path(file: &Path) -> String {
    std::fs::canonicalize(file)
        .unwrap_or_else(|_| file.to_path_buf())
        .display()
        .to_string()
}

async fn broker_connection(config: &Config) -> Result<redis::aio::MultiplexedConnection> {
    let client = redis::Client::open(config.redis_url.as_str())
        .with_context(|| format!("Invalid broker URL: {}", config.redis_url))?;
    client
        .get_multiplexed_tokio_connection()
        .await
        .with_context(|| format!("Failed to connect to broker at {}", config.redis_url))
}

async fn wait_for_task(
    conn: &mut redis::aio::MultiplexedConnection,
    task_id: &str,
) -> Result<queue::TaskRecord> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Waiting for analysis...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    loop {
        if let Some(record) = queue::fetch(conn, task_id).await? {
            if record.is_resolved() {
                spinner.finish_and_clear();
                return Ok(record);
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Worker { concurrency } => {
            if let Some(c) = concurrency {
                config.concurrency = c;
            }
            worker::run(config).await?;
        }

        Command::Submit { file, wait } => {
            config.validate().context("Configuration validation failed")?;

            let file_path = resolve_submit_path(&file);
            let mut conn = broker_connection(&config).await?;
            let task_id = queue::submit(&mut conn, &config.queue_name, &file_path).await?;
            println!("{task_id}");

            if wait {
                let record = wait_for_task(&mut conn, &task_id).await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }

        Command::Status { task_id } => {
            config.validate().context("Configuration validation failed")?;

            let mut conn = broker_connection(&config).await?;
            match queue::fetch(&mut conn, &task_id).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => anyhow::bail!("Task not found: {task_id}"),
            }
        }

        Command::Analyze { file } => {
            let classifier = LazyClassifier::new(config.model_path.clone());
            let outcome = tokio::task::spawn_blocking(move || {
                analysis::analyze_audio(&file, &classifier)
            })
            .await??;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Frames { video, output_dir } => {
            let frames = tokio::task::spawn_blocking(move || {
                video::extract_frames_into(&video, &output_dir)
            })
            .await??;

            info!("Extracted {} frames", frames.len());
            for frame in &frames {
                println!("{}", frame.display());
            }
        }
    }

    Ok(())
}
