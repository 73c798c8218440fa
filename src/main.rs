use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log_monitor::app::Supervisor;
use log_monitor::config::Config;
use log_monitor::constants;
use log_monitor::infra::pushgateway_adapter::push_url;
use log_monitor::infra::{FileTailFactory, PushgatewayPublisher};
use log_monitor::parser::{Family, LineOutcome, LineParser};
use log_monitor::{logging, metrics};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "log_monitor")]
#[command(about = "Tails prover/miner worker logs and pushes the latest values to a Pushgateway")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start one monitor per configured log and run until interrupted (default)
    Run,
    /// Validate the configuration and print the resolved sources
    Check,
    /// Run a family's line parser on literal lines
    Parse {
        #[arg(long, value_enum)]
        family: Family,
        /// Lines to parse
        #[arg(required = true)]
        lines: Vec<String>,
    },
}

#[derive(Args)]
struct Settings {
    /// TOML configuration file; flags below override it
    #[arg(long, env = "LOG_MONITOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Path to the oula log file
    #[arg(long, global = true)]
    oula_log: Option<String>,
    /// Path to the new version oula log file
    #[arg(long, global = true)]
    oula_new_log: Option<String>,
    /// Path to the zkwork log file
    #[arg(long, global = true)]
    zkwork_log: Option<String>,
    /// Path to the cysic log file
    #[arg(long, global = true)]
    cysic_log: Option<String>,
    /// Path to a prover log reporting `instant rate: N.NN`
    #[arg(long, global = true)]
    instant_rate_log: Option<String>,
    /// Path to a pool worker log reporting `proof rate N/s`
    #[arg(long, global = true)]
    pool_rate_log: Option<String>,

    /// Pushgateway URL
    #[arg(long, env = "LOG_MONITOR_PUSHGATEWAY_URL", global = true)]
    pushgateway_url: Option<String>,
    /// Job name for Pushgateway
    #[arg(long, env = "LOG_MONITOR_JOB_NAME", global = true)]
    job_name: Option<String>,
    /// Instance name for Pushgateway
    #[arg(long, env = "LOG_MONITOR_INSTANCE_NAME", global = true)]
    instance_name: Option<String>,
    /// Upper bound on a single push
    #[arg(long, global = true)]
    publish_timeout_secs: Option<u64>,
    /// How often a tailer checks an idle file for growth
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,
    /// Longest log line kept; longer lines are dropped
    #[arg(long, global = true)]
    max_line_bytes: Option<usize>,
    /// Serve the monitor's own metrics on this address
    #[arg(long, env = "LOG_MONITOR_METRICS_ADDR", global = true)]
    metrics_addr: Option<SocketAddr>,
    /// Directory for the JSON log files
    #[arg(long, default_value = constants::DEFAULT_LOG_DIR, global = true)]
    log_dir: PathBuf,
}

impl Settings {
    /// Defaults, then the config file, then flags and environment
    fn resolve(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => Config::default(),
        };

        let preset_paths = [
            (constants::OULA_SOURCE, &self.oula_log),
            (constants::OULA_NEW_SOURCE, &self.oula_new_log),
            (constants::ZKWORK_SOURCE, &self.zkwork_log),
            (constants::CYSIC_SOURCE, &self.cysic_log),
            (constants::INSTANT_RATE_SOURCE, &self.instant_rate_log),
            (constants::POOL_RATE_SOURCE, &self.pool_rate_log),
        ];
        for (name, path) in preset_paths {
            if let (Some(preset), Some(path)) = (constants::preset(name), path) {
                config.set_preset_path(preset, path);
            }
        }

        if let Some(url) = &self.pushgateway_url {
            config.gateway.url = url.clone();
        }
        if let Some(job) = &self.job_name {
            config.gateway.job = job.clone();
        }
        if let Some(instance) = &self.instance_name {
            config.gateway.instance = instance.clone();
        }
        if let Some(secs) = self.publish_timeout_secs {
            config.gateway.timeout_secs = secs;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.tailer.poll_interval_ms = ms;
        }
        if let Some(bytes) = self.max_line_bytes {
            config.tailer.max_line_bytes = bytes;
        }
        if self.metrics_addr.is_some() {
            config.telemetry.metrics_addr = self.metrics_addr;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let _guard = logging::init_logging(&cli.settings.log_dir);
            run(cli.settings.resolve()?).await
        }
        Commands::Check => check(cli.settings.resolve()?),
        Commands::Parse { family, lines } => {
            parse(family, &lines);
            Ok(())
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let sources = config.log_sources().context("invalid configuration")?;
    metrics::init_metrics(config.telemetry.metrics_addr)?;

    let publisher = Arc::new(PushgatewayPublisher::new(config.gateway.timeout())?);
    let factory = Arc::new(
        FileTailFactory::new(config.tailer.poll_interval())
            .with_max_line_bytes(config.tailer.max_line_bytes),
    );

    info!(
        gateway = %config.gateway.url,
        job = %config.gateway.job,
        instance = %config.gateway.instance,
        sources = sources.len(),
        "starting log monitor"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let reports = Supervisor::new(sources, config.gateway, factory, publisher)
        .run(shutdown_rx)
        .await;
    let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
    info!(monitors = reports.len(), failed, "log monitor stopped");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => error!(error = %e, "cannot listen for SIGTERM; only Ctrl-C will stop the monitor"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn check(config: Config) -> Result<()> {
    let sources = config.log_sources().context("invalid configuration")?;
    println!(
        "gateway {} job={} instance={} timeout={}s",
        config.gateway.url, config.gateway.job, config.gateway.instance, config.gateway.timeout_secs
    );
    if sources.is_empty() {
        println!("no log sources configured");
    }
    for source in &sources {
        let url = push_url(&config.gateway.target_for(source))?;
        println!("{} -> {} {}", source, source.metric, url);
    }
    Ok(())
}

fn parse(family: Family, lines: &[String]) {
    let parser = LineParser::new(family);
    for line in lines {
        match parser.classify(line) {
            LineOutcome::Sample(value) => println!("{}\t{}", value, line),
            LineOutcome::NoMatch => println!("no sample (no match)\t{}", line),
            LineOutcome::BadNumber(text) => println!("no sample (not a number: {})\t{}", text, line),
        }
    }
}
