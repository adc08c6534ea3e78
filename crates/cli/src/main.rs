use anyhow::Context;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vantage_core::client::{AlphaVantageClient, MarketDataClient};
use vantage_core::dashboard::{Dashboard, DashboardError};
use vantage_core::endpoint::{Endpoint, Param, Selection};

mod interactive;

#[derive(Debug, Parser)]
#[command(name = "vantage", about = "Financial data dashboard (Alpha Vantage)")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the data categories and their endpoints.
    List,

    /// Fetch one endpoint and print it.
    Fetch(FetchArgs),

    /// Pick endpoints from a menu until you quit (the default).
    Interactive,
}

#[derive(Debug, clap::Args)]
struct FetchArgs {
    /// API function, e.g. TIME_SERIES_DAILY, GLOBAL_QUOTE, SMA.
    function: String,

    #[arg(long)]
    symbol: Option<String>,

    /// compact or full.
    #[arg(long = "outputsize")]
    output_size: Option<String>,

    /// Search text for SYMBOL_SEARCH.
    #[arg(long)]
    keywords: Option<String>,

    /// Source currency for FX endpoints.
    #[arg(long)]
    from: Option<String>,

    /// Target currency for FX endpoints.
    #[arg(long)]
    to: Option<String>,

    /// daily, weekly or monthly.
    #[arg(long)]
    interval: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    time_period: Option<u32>,

    /// close, open, high or low.
    #[arg(long)]
    series_type: Option<String>,

    /// Print the view as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl FetchArgs {
    fn selection(&self) -> anyhow::Result<Selection> {
        let endpoint: Endpoint = self.function.parse()?;
        let mut selection = Selection::new(endpoint);

        let time_period = self.time_period.map(|n| n.to_string());
        let given = [
            (Param::Symbol, self.symbol.as_deref()),
            (Param::OutputSize, self.output_size.as_deref()),
            (Param::Keywords, self.keywords.as_deref()),
            (Param::FromCurrency, self.from.as_deref()),
            (Param::ToCurrency, self.to.as_deref()),
            (Param::Interval, self.interval.as_deref()),
            (Param::TimePeriod, time_period.as_deref()),
            (Param::SeriesType, self.series_type.as_deref()),
        ];
        for (param, value) in given {
            if let Some(value) = value {
                selection.set(param, value)?;
            }
        }
        Ok(selection)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = vantage_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Some(Command::List) = &args.command {
        print_menu();
        return Ok(ExitCode::SUCCESS);
    }

    let api_key = settings
        .resolve_api_key()
        .context("cannot start without an Alpha Vantage API key")?;
    eprintln!("Running with API key from {}", api_key.source());

    let client = AlphaVantageClient::from_settings(&settings, api_key)?;
    let dashboard = Dashboard::new(client);

    match args.command {
        Some(Command::Fetch(fetch)) => Ok(run_once(&dashboard, &fetch).await?.exit_code()),
        Some(Command::List) => Ok(ExitCode::SUCCESS),
        Some(Command::Interactive) | None => {
            interactive::run(&dashboard).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Shown,
    /// Already rendered on stderr.
    Failed,
}

impl Outcome {
    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Shown => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
        }
    }
}

async fn run_once<C: MarketDataClient>(
    dashboard: &Dashboard<C>,
    args: &FetchArgs,
) -> anyhow::Result<Outcome> {
    let selection = args.selection()?;
    match dashboard.run(&selection).await {
        Ok(view) if args.json => {
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(Outcome::Shown)
        }
        Ok(view) => {
            print!("{}", vantage_core::render::view(&view));
            Ok(Outcome::Shown)
        }
        Err(err) => {
            report(&err);
            eprint!("{}", vantage_core::render::error(&err));
            Ok(Outcome::Failed)
        }
    }
}

/// Sends transport failures to Sentry; shape failures are the user's to read.
pub(crate) fn report(err: &DashboardError) {
    if let DashboardError::Transport(inner) = err {
        let err = anyhow::anyhow!("{inner}");
        sentry_anyhow::capture_anyhow(&err);
    }
    tracing::warn!(error = %err, "dashboard action failed");
}

fn print_menu() {
    for entry in vantage_core::endpoint::menu() {
        println!("{}", entry.category.label());
        for endpoint in entry.endpoints {
            let params: Vec<String> = endpoint
                .params
                .iter()
                .map(|p| format!("--{} {}", p.name.replace('_', "-"), p.default))
                .collect();
            println!("  {:<24} {}", endpoint.function.function(), params.join(" "));
        }
    }
}

fn init_sentry(settings: &vantage_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
