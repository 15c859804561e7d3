//! govlens - governance dashboard CLI
//!
//! The `govlens` command reads the platform's governance API and prints
//! what is governed, where each bundle sits in its policy, and what is
//! waiting for approval.
//!
//! ## Commands
//!
//! - `summary`: Headline metrics
//! - `bundles`: Governed (or all) bundles with deep links
//! - `policies`: Stage adoption per policy
//! - `projects`: Projects with and without a bundle
//! - `models`: Registered models by governance status
//! - `approvals`: Pending approval requests
//! - `report`: The full dashboard, once or on an interval
//! - `score`: Score a credit application against the hosted model

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use govlens_api::{
    ApiConfig, ApiFlavor, AuthScheme, CachedSource, GovernanceClient, ScoringClient, ScoringConfig,
};
use govlens_core::report::{
    render_approvals_md, render_bundles_md, render_header, render_models_md, render_policies_md,
    render_projects_md, render_summary_md, render_warnings_md,
};
use govlens_core::{
    render_report_json, render_report_md, score_application, write_report, Dashboard,
    DashboardReport, LinkBuilder, ScoreInput, METRICS,
};

#[derive(Parser)]
#[command(name = "govlens")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Governance dashboard for ML-platform bundles, policies and models", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Output format for reports
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown, global = true)]
    format: OutputFormat,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

/// Where and how to reach the platform; no `Debug`, it holds keys
#[derive(Args, Clone)]
struct ConnectionArgs {
    /// Platform base URL
    #[arg(long, env = "API_HOST", global = true)]
    api_host: Option<String>,

    /// Platform API key
    #[arg(long, env = "API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// How the key is sent: `header` or `basic`
    #[arg(long, env = "GOVLENS_AUTH", default_value = "header", global = true)]
    auth: AuthScheme,

    /// Endpoint family: `governance` or `guardrails`
    #[arg(long, env = "GOVLENS_API_FLAVOR", default_value = "governance", global = true)]
    flavor: ApiFlavor,

    /// Per-request timeout in seconds
    #[arg(long, env = "GOVLENS_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Scoring model endpoint URL
    #[arg(long, env = "SCORING_URL", global = true)]
    scoring_url: Option<String>,

    /// Scoring model key
    #[arg(long, env = "SCORING_KEY", hide_env_values = true, global = true)]
    scoring_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Headline metrics
    Summary,

    /// Bundles with evidence links
    Bundles {
        /// Include bundles without a policy
        #[arg(long)]
        all: bool,
    },

    /// Stage adoption per policy
    Policies,

    /// Projects with and without a bundle
    Projects,

    /// Registered models by governance status
    Models,

    /// Pending approval requests
    Approvals,

    /// Full dashboard
    Report {
        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Re-fetch and re-render every SECS seconds until Ctrl-C
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },

    /// Score a credit application
    Score(ScoreArgs),
}

#[derive(Args, Debug, Clone, Copy)]
struct ScoreArgs {
    /// Repayment status last month (-1 paid duly, 1..=9 months late)
    #[arg(long = "pay-0", allow_negative_numbers = true)]
    pay_0: i64,

    /// Repayment status two months ago
    #[arg(long = "pay-2", allow_negative_numbers = true)]
    pay_2: i64,

    /// Repayment status three months ago
    #[arg(long = "pay-3", allow_negative_numbers = true)]
    pay_3: i64,

    /// Repayment status four months ago
    #[arg(long = "pay-4", allow_negative_numbers = true)]
    pay_4: i64,

    /// Credit limit
    #[arg(long, allow_negative_numbers = true)]
    limit_bal: i64,

    /// Last statement amount
    #[arg(long = "bill-amt1", allow_negative_numbers = true)]
    bill_amt1: i64,

    /// Applicant age
    #[arg(long, allow_negative_numbers = true)]
    age: i64,
}

impl From<ScoreArgs> for ScoreInput {
    fn from(args: ScoreArgs) -> Self {
        ScoreInput {
            pay_0: args.pay_0,
            pay_2: args.pay_2,
            pay_3: args.pay_3,
            pay_4: args.pay_4,
            limit_bal: args.limit_bal,
            bill_amt1: args.bill_amt1,
            age: args.age,
        }
    }
}

/// Dashboard section selected by a subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Summary,
    Bundles { all: bool },
    Policies,
    Projects,
    Models,
    Approvals,
    Full,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    govlens_core::init_tracing(cli.json, govlens_core::telemetry::level_for(cli.verbose));

    let view = match cli.command {
        Commands::Score(args) => return cmd_score(&cli.connection, args.into(), cli.format).await,
        Commands::Report { output, watch } => {
            let ctx = DashboardContext::connect(&cli.connection)?;
            return cmd_report(&ctx, cli.format, output.as_deref(), watch).await;
        }
        Commands::Summary => View::Summary,
        Commands::Bundles { all } => View::Bundles { all },
        Commands::Policies => View::Policies,
        Commands::Projects => View::Projects,
        Commands::Models => View::Models,
        Commands::Approvals => View::Approvals,
    };

    let ctx = DashboardContext::connect(&cli.connection)?;
    let content = ctx.render(view, cli.format).await?;
    print!("{}", content);
    ctx.flush_metrics();
    Ok(())
}

fn timeout(args: &ConnectionArgs) -> Result<Option<Duration>> {
    match args.timeout_secs {
        Some(0) => anyhow::bail!("--timeout-secs must be at least 1"),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}

fn api_config(args: &ConnectionArgs) -> Result<ApiConfig> {
    let host = args
        .api_host
        .as_deref()
        .context("API_HOST is not set (use --api-host or the API_HOST variable)")?;
    let key = args
        .api_key
        .as_deref()
        .context("API_KEY is not set (use --api-key or the API_KEY variable)")?;

    let mut config = ApiConfig::new(host, key)
        .context("Invalid governance API configuration")?
        .with_auth(args.auth)
        .with_flavor(args.flavor);
    if let Some(timeout) = timeout(args)? {
        config = config.with_timeout(timeout)?;
    }
    Ok(config)
}

fn scoring_config(args: &ConnectionArgs) -> Result<ScoringConfig> {
    let url = args
        .scoring_url
        .as_deref()
        .context("SCORING_URL is not set (use --scoring-url or the SCORING_URL variable)")?;
    let key = args
        .scoring_key
        .as_deref()
        .context("SCORING_KEY is not set (use --scoring-key or the SCORING_KEY variable)")?;

    let mut config = ScoringConfig::new(url, key).context("Invalid scoring configuration")?;
    if let Some(timeout) = timeout(args)? {
        config.timeout = timeout;
    }
    Ok(config)
}

/// A connected dashboard: cached client, pipeline and link builder
struct DashboardContext {
    cache: Arc<CachedSource<GovernanceClient>>,
    dashboard: Dashboard,
    links: LinkBuilder,
}

impl DashboardContext {
    fn connect(args: &ConnectionArgs) -> Result<Self> {
        let config = api_config(args)?;
        Self::from_config(config)
    }

    fn from_config(config: ApiConfig) -> Result<Self> {
        info!(
            host = %config.host_str(),
            flavor = %config.flavor,
            auth = %config.auth,
            "Connecting to governance API"
        );
        let links = LinkBuilder::from_url(config.host().clone());
        let host = config.host_str().to_string();
        let client = GovernanceClient::new(config).context("Failed to build HTTP client")?;
        let cache = Arc::new(CachedSource::new(client));
        let dashboard = Dashboard::new(cache.clone(), &host);
        Ok(Self {
            cache,
            dashboard,
            links,
        })
    }

    async fn load(&self) -> DashboardReport {
        DashboardReport::new(self.dashboard.load().await)
    }

    async fn render(&self, view: View, format: OutputFormat) -> Result<String> {
        let report = self.load().await;
        render_view(view, &report, &self.links, format)
    }

    fn flush_metrics(&self) {
        let stats = self.cache.stats();
        info!(
            metric = "cache",
            hits = stats.hits,
            misses = stats.misses,
        );
        METRICS.flush();
    }
}

/// Render one section of `report`.
///
/// Markdown sections end with the warnings list when any fetch degraded;
/// JSON sections carry only their own data.
fn render_view(
    view: View,
    report: &DashboardReport,
    links: &LinkBuilder,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let json = match view {
                View::Full => render_report_json(report)?,
                View::Summary => serde_json::to_string_pretty(&report.summary)?,
                View::Bundles { all: true } => serde_json::to_string_pretty(&report.bundles)?,
                View::Bundles { all: false } => {
                    let governed: Vec<_> = report.governed_bundles().collect();
                    serde_json::to_string_pretty(&governed)?
                }
                View::Policies => serde_json::to_string_pretty(&report.policy_adoption)?,
                View::Projects => serde_json::to_string_pretty(&report.project_coverage)?,
                View::Models => serde_json::to_string_pretty(&report.model_governance)?,
                View::Approvals => serde_json::to_string_pretty(&report.approvals)?,
            };
            Ok(format!("{json}\n"))
        }
        OutputFormat::Markdown => {
            if view == View::Full {
                return Ok(render_report_md(report, links));
            }
            let mut md = render_header(report);
            md.push_str(&match view {
                View::Summary => render_summary_md(report),
                View::Bundles { all } => render_bundles_md(report, links, all),
                View::Policies => render_policies_md(report, links),
                View::Projects => render_projects_md(report, links),
                View::Models => render_models_md(report, links),
                View::Approvals => render_approvals_md(report),
                View::Full => String::new(),
            });
            md.push_str(&render_warnings_md(report));
            Ok(md)
        }
    }
}

async fn report_once(
    ctx: &DashboardContext,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let content = ctx.render(View::Full, format).await?;
    match output {
        Some(path) => {
            write_report(path, &content)
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            println!("Wrote report to {:?}", path);
        }
        None => print!("{}", content),
    }
    ctx.flush_metrics();
    Ok(())
}

async fn cmd_report(
    ctx: &DashboardContext,
    format: OutputFormat,
    output: Option<&Path>,
    watch: Option<u64>,
) -> Result<()> {
    let Some(secs) = watch else {
        return report_once(ctx, format, output).await;
    };
    if secs == 0 {
        anyhow::bail!("--watch must be at least 1 second");
    }

    info!(interval_secs = secs, "Watching governance API; Ctrl-C to stop");
    watch_reports(
        ctx,
        format,
        output,
        Duration::from_secs(secs),
        tokio::signal::ctrl_c(),
    )
    .await
}

/// Re-render every `period` until `shutdown` resolves.
///
/// One `shutdown` future lives for the whole loop, so a signal that lands
/// mid-refresh is not lost; the in-flight refresh is dropped.
async fn watch_reports(
    ctx: &DashboardContext,
    format: OutputFormat,
    output: Option<&Path>,
    period: Duration,
    shutdown: impl std::future::Future<Output = std::io::Result<()>>,
) -> Result<()> {
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = ticker.tick() => {
                // Each refresh is a new run.
                ctx.cache.clear();
                tokio::select! {
                    signal = &mut shutdown => {
                        signal.context("Failed to listen for Ctrl-C")?;
                        break;
                    }
                    result = report_once(ctx, format, output) => result?,
                }
                METRICS.reset();
            }
        }
    }
    info!("Stopped watching");
    Ok(())
}

async fn cmd_score(args: &ConnectionArgs, input: ScoreInput, format: OutputFormat) -> Result<()> {
    // Validate before touching the network or requiring scoring credentials.
    input.validate()?;
    let client = ScoringClient::new(scoring_config(args)?)?;
    let outcome = score_application(&client, &input)
        .await
        .context("Failed to score application")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Markdown => print!("{}", outcome.render_text()),
    }
    METRICS.flush();
    Ok(())
}
