//! Runs the booking scenario on the simulation clock and prints a JSON summary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use ride_core::config::DeskConfig;
use ride_core::fixtures::{sample_destination, sample_fleet, sample_pickup, sample_rider, SAMPLE_RIDER_ID};
use ride_core::history::HistorySummary;
use ride_core::lifecycle::{RideRequest, RideStatus};
use ride_core::matching::DriverPool;
use ride_core::model::Driver;
use ride_core::pricing::{FareQuote, RideClass};
use ride_core::routing::{FixedRouteEstimator, RouteEstimate};
use ride_core::telemetry::DeskTelemetry;
use ride_core::{RideDesk, Simulation};

#[derive(Parser)]
#[command(
    name = "ride_demo",
    about = "Book, dispatch, ride and rate one trip against a mock fleet"
)]
struct Cli {
    /// JSON desk configuration; defaults apply to missing fields
    #[arg(long, env = "RIDE_DESK_CONFIG")]
    config: Option<PathBuf>,
    /// Ride class: economy, comfort or xl
    #[arg(long, default_value = "economy")]
    class: RideClass,
    /// Trip distance in kilometres
    #[arg(long, default_value_t = 5.2)]
    distance_km: f64,
    /// Estimated trip duration in minutes
    #[arg(long, default_value_t = 15)]
    duration_minutes: u32,
    /// Stars given after the trip (1-5)
    #[arg(long, default_value_t = 5)]
    rating: u8,
    /// Archive the trip without a rating
    #[arg(long)]
    skip_rating: bool,
    #[arg(long)]
    feedback: Option<String>,
    /// Overrides the matching seed from the config
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, env = "RIDE_DEMO_LOG", default_value = "info")]
    log_level: String,
    /// Pretty-print the summary
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct Summary {
    quotes: Vec<FareQuote>,
    ride: RideRequest,
    driver: Option<Driver>,
    rider_history: HistorySummary,
    wallet_balance: f64,
    telemetry: DeskTelemetry,
    simulated_ms: u64,
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<DeskConfig> {
    let mut config = match &cli.config {
        Some(path) => DeskConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DeskConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.validate().context("validating config")?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<Summary> {
    let config = load_config(cli)?;
    let route = RouteEstimate::new(cli.distance_km, cli.duration_minutes);
    let pool = Arc::new(DriverPool::from_drivers(
        sample_fleet().context("building sample fleet")?,
    ));
    let desk = RideDesk::new(config, pool).with_router(Box::new(FixedRouteEstimator(route)));
    let mut sim = Simulation::new(desk);

    let rider = sample_rider().context("building sample rider")?;
    let pickup = sample_pickup().context("building pickup")?;
    let destination = sample_destination().context("building destination")?;
    let (_, quotes) = sim
        .desk()
        .quote(&pickup, &destination)
        .context("quoting trip")?;
    let ride_id = sim
        .request_ride(rider.id.clone(), pickup, destination, cli.class)
        .context("requesting ride")?;
    info!(ride_id = %ride_id, rider = %rider.name, "searching for a driver");

    let steps = sim.run_until_idle();
    info!(steps, now_ms = sim.now(), "simulation idle");

    let status = sim.ride(&ride_id).map(RideRequest::status);
    match status {
        Some(RideStatus::Completed) if cli.skip_rating => sim.skip_rating(&ride_id)?,
        Some(RideStatus::Completed) => sim
            .rate_ride(&ride_id, cli.rating, cli.feedback.clone())
            .context("rating ride")?,
        Some(RideStatus::InProgress) => {
            let done = sim.complete_ride(&ride_id).context("completing ride")?;
            info!(ride_id = %done.id(), "trip completed manually");
            sim.rate_ride(&ride_id, cli.rating, cli.feedback.clone())
                .context("rating ride")?;
        }
        other => warn!(ride_id = %ride_id, status = ?other, "ride did not complete"),
    }

    let desk = sim.desk();
    let ride = desk
        .ride(&ride_id)
        .cloned()
        .with_context(|| format!("ride {ride_id} vanished"))?;
    let driver = ride.driver_id().and_then(|id| desk.pool().get(id));
    Ok(Summary {
        quotes,
        ride,
        driver,
        rider_history: desk.history().summary_for(&SAMPLE_RIDER_ID.into()),
        wallet_balance: desk.wallet().balance(&SAMPLE_RIDER_ID.into()),
        telemetry: *desk.telemetry(),
        simulated_ms: sim.now(),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let summary = run(&cli)?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{json}");
    Ok(())
}
