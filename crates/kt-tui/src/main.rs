//! kt - live Kubernetes tables in the terminal
//!
//! Watches the deployments and pods of one namespace and shows them as
//! continuously updated tables. Read-only.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kt_table::WatchBridge;
use kt_tui::{
    join_bridges, AppEvent, ClientConfig, Dashboard, DeploymentRows, EventHandler, KubeSource,
    PodRows,
};
use ratatui::prelude::*;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kt")]
#[command(about = "Live Kubernetes deployments and pods in the terminal")]
#[command(version)]
struct Cli {
    /// Namespace to watch
    #[arg(short, long, env = "KT_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Path to a kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,

    /// Terminal input poll interval in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.namespace);
        if let Some(path) = &self.kubeconfig {
            config = config.with_kubeconfig(path);
        }
        if let Some(context) = &self.context {
            config = config.with_context(context);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to a file; the terminal belongs to the dashboard.
    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    let (mut dashboard, tasks) = match start(&cli).await {
        Ok(started) => started,
        Err(failures) => {
            for failure in failures {
                eprintln!("Error: {failure}");
            }
            std::process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run application
    let tick_rate = Duration::from_millis(cli.tick_ms);
    let result = run_app(&mut terminal, &mut dashboard, tick_rate).await;

    for task in &tasks {
        task.abort();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!(error = %err, "dashboard stopped");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    info!("dashboard closed");
    Ok(())
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kt=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .init();
    Ok(())
}

/// Connect, subscribe to every collection, and build the dashboard.
///
/// Every collection is subscribed before anything is reported, so all failing
/// collections are named, not just the first.
async fn start(cli: &Cli) -> Result<(Dashboard, Vec<JoinHandle<()>>), Vec<anyhow::Error>> {
    let source = KubeSource::connect(&cli.client_config())
        .await
        .map_err(|err| vec![anyhow::Error::from(err)])?;

    let deployments = WatchBridge::new("deployments", DeploymentRows::default());
    let pods = WatchBridge::new("pods", PodRows::default());

    let mut dashboard = Dashboard::new(source.namespace());
    dashboard.register(deployments.table());
    dashboard.register(pods.table());

    let (deployments, pods) = tokio::join!(
        deployments.start(source.subscribe::<Deployment>("deployments")),
        pods.start(source.subscribe::<Pod>("pods")),
    );

    let tasks = join_bridges([deployments, pods]).map_err(|failures| {
        failures
            .into_iter()
            .map(anyhow::Error::from)
            .collect::<Vec<_>>()
    })?;
    Ok((dashboard, tasks))
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    dashboard: &mut Dashboard,
    tick_rate: Duration,
) -> anyhow::Result<()> {
    let mut events = EventHandler::new(tick_rate);
    terminal.draw(|frame| dashboard.draw(frame))?;

    // Main loop
    while dashboard.running() {
        let redraw = tokio::select! {
            event = events.next() => match event {
                Some(AppEvent::Key(key)) => dashboard.handle_key(key),
                Some(AppEvent::Resize(_, _)) => true,
                None => {
                    dashboard.quit();
                    false
                }
            },
            view = dashboard.next_change() => dashboard.on_table_changed(view),
        };

        if redraw && dashboard.running() {
            terminal.draw(|frame| dashboard.draw(frame))?;
        }
    }

    Ok(())
}
