use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledgerflow_config::FlowDefinition;
use ledgerflow_engine::{
  ChannelNotifier, EngineConfig, EventRunner, ExecutionMode, FlowEngine, LoggingDispatcher,
  LoggingScheduler, RunEvent,
};
use ledgerflow_store::{MemoryStore, RunStore, SqliteStore};
use ledgerflow_trigger::FlowEventContext;
use ledgerflow_workflow::validate;

/// Ledgerflow - workflow automation for accounts receivable
#[derive(Parser)]
#[command(name = "ledgerflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.ledgerflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Engine configuration file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a flow definition for problems
  Validate {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,
  },

  /// Run a flow once against an event read from stdin
  Run {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,

    /// Dispatch enrollments instead of simulating them
    #[arg(long)]
    live: bool,
  },

  /// Save a flow into the local database
  Import {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,
  },

  /// Fan out JSON-lines events from stdin to every matching stored flow
  Dispatch {
    /// Dispatch enrollments instead of simulating them
    #[arg(long)]
    live: bool,
  },

  /// Continue a waiting run whose wait has elapsed
  Resume { run_id: String },

  /// List the recorded runs of a flow
  Runs { flow_id: String },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ledgerflow=info,warn")),
    )
    .with_target(false)
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".ledgerflow"),
  };
  let config = load_config(cli.config.as_deref())?;

  let Some(command) = cli.command else {
    println!("ledgerflow - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match command {
      Commands::Validate { flow_file } => validate_flow(&flow_file),
      Commands::Run { flow_file, live } => run_flow(&flow_file, mode(live), config).await,
      Commands::Import { flow_file } => import_flow(&flow_file, &data_dir).await,
      Commands::Dispatch { live } => dispatch_events(&data_dir, mode(live), config).await,
      Commands::Resume { run_id } => resume_run(&run_id, &data_dir, config).await,
      Commands::Runs { flow_id } => list_runs(&flow_id, &data_dir).await,
    }
  })
}

fn mode(live: bool) -> ExecutionMode {
  if live {
    ExecutionMode::Live
  } else {
    ExecutionMode::DryRun
  }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
  let Some(path) = path else {
    return Ok(EngineConfig::default());
  };
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  EngineConfig::from_json(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}

fn load_flow(flow_file: &Path) -> Result<FlowDefinition> {
  let content = std::fs::read_to_string(flow_file)
    .with_context(|| format!("failed to read flow file: {}", flow_file.display()))?;
  FlowDefinition::from_json(&content)
    .with_context(|| format!("failed to parse flow file: {}", flow_file.display()))
}

async fn open_store(data_dir: &Path) -> Result<SqliteStore> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
  let url = format!("sqlite://{}", data_dir.join("ledgerflow.db").display());
  SqliteStore::connect(&url)
    .await
    .with_context(|| format!("failed to open database at {}", url))
}

fn validate_flow(flow_file: &Path) -> Result<()> {
  let flow = load_flow(flow_file)?;
  let findings = validate(&flow);
  if findings.is_empty() {
    println!("{}: ok", flow.name);
    return Ok(());
  }
  for finding in &findings {
    println!("{}", finding);
  }
  bail!("{} problem(s) found in {}", findings.len(), flow.name)
}

async fn run_flow(flow_file: &Path, mode: ExecutionMode, config: EngineConfig) -> Result<()> {
  let flow = load_flow(flow_file)?;
  let event = read_event_from_stdin(&flow.org_id)?;

  let store = Arc::new(MemoryStore::new());
  store.insert_flow(flow.clone())?;
  let engine = FlowEngine::new(config, store.clone(), store, Arc::new(LoggingDispatcher));

  eprintln!("Running flow: {} ({})", flow.name, mode);
  let log = engine
    .execute_flow_by_id(&flow.org_id, &flow.id, mode, &event)
    .await
    .context("flow execution failed")?;

  println!("{}", serde_json::to_string_pretty(&log)?);
  Ok(())
}

async fn import_flow(flow_file: &Path, data_dir: &Path) -> Result<()> {
  let flow = load_flow(flow_file)?;
  let store = open_store(data_dir).await?;
  store.save_flow(&flow).await.context("failed to save flow")?;
  info!(flow_id = %flow.id, org_id = %flow.org_id, "flow imported");
  println!("{}", flow.id);
  Ok(())
}

async fn dispatch_events(data_dir: &Path, mode: ExecutionMode, config: EngineConfig) -> Result<()> {
  let store = Arc::new(open_store(data_dir).await?);
  let (tx, mut rx) = mpsc::unbounded_channel();
  let engine = FlowEngine::new(config, store.clone(), store, Arc::new(LoggingDispatcher))
    .with_scheduler(Arc::new(LoggingScheduler))
    .with_notifier(Arc::new(ChannelNotifier::new(tx)));

  let printer = tokio::spawn(async move {
    while let Some(event) = rx.recv().await {
      match &event {
        RunEvent::RunRecorded { run_id, .. } => println!("{}", run_id),
        other => {
          if let Ok(line) = serde_json::to_string(other) {
            eprintln!("{}", line);
          }
        }
      }
    }
  });

  let runner = EventRunner::new(engine, mode);
  let sender = runner.sender();
  let cancel = CancellationToken::new();
  let runner_handle = tokio::spawn(runner.start(cancel.clone()));

  let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
  let mut line_no = 0;
  loop {
    let line = tokio::select! {
      _ = tokio::signal::ctrl_c() => {
        cancel.cancel();
        break;
      }
      line = lines.next_line() => line.context("failed to read events from stdin")?,
    };
    let Some(line) = line else {
      break;
    };
    line_no += 1;
    if line.trim().is_empty() {
      continue;
    }
    let event = FlowEventContext::from_json(&line)
      .with_context(|| format!("invalid event on line {}", line_no))?;
    sender.send(event).await.context("event runner stopped")?;
  }
  drop(sender);

  runner_handle.await??;
  printer.await?;
  Ok(())
}

async fn resume_run(run_id: &str, data_dir: &Path, config: EngineConfig) -> Result<()> {
  let store = Arc::new(open_store(data_dir).await?);
  let engine = FlowEngine::new(config, store.clone(), store, Arc::new(LoggingDispatcher))
    .with_scheduler(Arc::new(LoggingScheduler));

  let run = engine
    .resume(run_id)
    .await
    .with_context(|| format!("failed to resume run {}", run_id))?;
  println!("{}", serde_json::to_string_pretty(&run)?);
  Ok(())
}

async fn list_runs(flow_id: &str, data_dir: &Path) -> Result<()> {
  let store = open_store(data_dir).await?;
  let runs = store.list_runs(flow_id).await.context("failed to list runs")?;
  println!("{}", serde_json::to_string_pretty(&runs)?);
  Ok(())
}

/// Read the triggering event from stdin, defaulting to an empty event of `org_id`.
fn read_event_from_stdin(org_id: &str) -> Result<FlowEventContext> {
  use std::io::IsTerminal;

  let mut input = String::new();
  if !io::stdin().is_terminal() {
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read event from stdin")?;
  }

  if input.trim().is_empty() {
    Ok(FlowEventContext {
      org_id: org_id.to_string(),
      ..FlowEventContext::default()
    })
  } else {
    FlowEventContext::from_json(&input).context("failed to parse event JSON from stdin")
  }
}
