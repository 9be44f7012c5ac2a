use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wealthdesk_core::domain::Role;
use wealthdesk_core::fixtures::Seed;
use wealthdesk_core::remote::{DashboardClient, HttpDashboardClient, LocalDashboardClient};
use wealthdesk_core::store::DashboardStore;
use wealthdesk_core::time::clock::SystemClock;
use wealthdesk_core::views;

mod walkthrough;

#[derive(Debug, Parser)]
#[command(name = "wealthdesk_presenter")]
struct Args {
    /// Base URL of a running wealthdesk_api. Falls back to WEALTHDESK_API_URL; runs
    /// against an in-process store when neither is set.
    #[arg(long)]
    api_url: Option<String>,

    /// JSON seed for the in-process store. Ignored with --api-url.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Client whose blueprint, recommendation, structuring case and ticket are walked.
    #[arg(long, default_value = "c-002")]
    client_id: String,

    /// Reset the demo data before starting (requires the administrator persona).
    #[arg(long)]
    reset: bool,

    /// Print the plan without clicking anything.
    #[arg(long)]
    dry_run: bool,

    /// Persona whose dashboard is printed at the end.
    #[arg(long, default_value = "admin")]
    final_role: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = wealthdesk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let final_role: Role = args.final_role.parse()?;

    let api_url = match args.api_url.as_deref() {
        Some(url) => Some(url),
        None => settings.require_api_url().ok(),
    };
    let client: Box<dyn DashboardClient> = match api_url {
        Some(url) => Box::new(HttpDashboardClient::new(url)?),
        None => {
            let seed = match args.seed.as_deref() {
                Some(path) => Seed::from_json_file(path)?,
                None => settings.load_seed()?,
            };
            let store = DashboardStore::new(seed.clone(), Arc::new(SystemClock))?;
            Box::new(LocalDashboardClient::new(store, seed))
        }
    };

    if let Err(err) = present(client.as_ref(), &args, final_role).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(api = %client.target(), error = %err, "walkthrough failed");
        return Err(err);
    }
    Ok(())
}

async fn present(
    client: &dyn DashboardClient,
    args: &Args,
    final_role: Role,
) -> anyhow::Result<()> {
    if args.reset {
        client.set_role(Role::Administrator).await?;
        client.reset().await.context("demo reset failed")?;
    }

    let snapshot = client.snapshot().await?;
    let plan = walkthrough::plan(&snapshot, &args.client_id)?;

    if args.dry_run {
        tracing::info!(
            api = %client.target(),
            dry_run = true,
            client = %plan.client_name,
            blueprint = ?plan.blueprint_id,
            recommendation = ?plan.recommendation_id,
            structuring_case = ?plan.structuring_case_id,
            "walkthrough plan"
        );
        return Ok(());
    }

    let summary = walkthrough::run(client, &plan).await?;
    for step in &summary.steps {
        tracing::info!(%step, "walkthrough step");
    }
    tracing::info!(
        client = %plan.client_name,
        steps = summary.steps.len(),
        ticket_id = ?summary.ticket_id,
        "walkthrough complete"
    );

    client.set_role(final_role).await?;
    let snapshot = client.snapshot().await?;
    let client_filter = (final_role == Role::Client).then_some(plan.client_id.as_str());
    let dashboard = views::dashboard(&snapshot, final_role, client_filter)?;
    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    Ok(())
}

fn init_sentry(settings: &wealthdesk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
