// ============================================================================
// File: src/main.rs
// Entry point and CLI handling
// ============================================================================

mod config;
mod error;
mod llm_client;
mod markdown;
mod models;
mod orchestrator;
mod pipeline;
mod search_client;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use colored::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Budget, Config, FlightClass, HotelRating, Settings, TravelTheme, TripPreferences};
use crate::llm_client::GeminiClient;
use crate::markdown::MarkdownExporter;
use crate::models::SearchRequest;
use crate::orchestrator::{TripPlanner, TripRequest};
use crate::pipeline::FlightOfferPipeline;
use crate::search_client::SerpApiClient;

/// Command-line arguments for the travel planner
#[derive(Parser, Debug)]
#[command(name = "trip-planner")]
#[command(about = "Plan a trip: cheapest flights, hotels, restaurants and a day-by-day itinerary", long_about = None)]
struct Args {
    /// Departure airport (IATA code)
    #[arg(long, default_value = "BOM")]
    from: String,

    /// Destination airport (IATA code)
    #[arg(long, default_value = "DEL")]
    to: String,

    /// Outbound date, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    departure: Option<NaiveDate>,

    /// Return date, YYYY-MM-DD (defaults to today)
    #[arg(long = "return")]
    return_date: Option<NaiveDate>,

    /// Trip duration in days
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=14))]
    days: u8,

    #[arg(long, value_enum, default_value_t = TravelTheme::Couple)]
    theme: TravelTheme,

    /// Activities you enjoy
    #[arg(long, default_value = "Relaxing on the beach, exploring historical sites")]
    activities: String,

    #[arg(long, value_enum, default_value_t = Budget::Economy)]
    budget: Budget,

    #[arg(long, value_enum, default_value_t = FlightClass::Economy)]
    flight_class: FlightClass,

    #[arg(long, value_enum, default_value_t = HotelRating::Any)]
    hotel_rating: HotelRating,

    /// Ask the agents to check visa requirements
    #[arg(long)]
    visa: bool,

    /// Ask the agents to cover travel insurance
    #[arg(long)]
    insurance: bool,

    /// Optional JSON file with non-secret settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Path where the markdown travel plan will be saved
    #[arg(short, long, default_value = "travel_plan.md")]
    output: PathBuf,

    /// Enable verbose output (debug logs on stderr)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn trip_request(&self, currency: &str) -> TripRequest {
        let today = Local::now().date_naive();

        TripRequest {
            search: SearchRequest::new(
                &self.from,
                &self.to,
                self.departure.unwrap_or(today),
                self.return_date.unwrap_or(today),
                currency,
            ),
            preferences: TripPreferences {
                days: self.days,
                theme: self.theme,
                activities: self.activities.clone(),
                budget: self.budget,
                flight_class: self.flight_class,
                hotel_rating: self.hotel_rating,
                visa_required: self.visa,
                travel_insurance: self.insurance,
            },
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();
    init_tracing(args.verbose);

    // Credentials are checked before any request is made
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let config = Config::from_env(settings)?;
    info!(model = %config.settings.model, "Configuration loaded");

    let search_client = Arc::new(SerpApiClient::new(&config)?);
    let generator = Arc::new(GeminiClient::new(&config)?);
    let pipeline = FlightOfferPipeline::new(
        search_client,
        config.settings.booking_base_url.clone(),
        config.settings.top_offers,
    );
    let planner = TripPlanner::new(pipeline, generator, true);

    let request = args.trip_request(&config.settings.currency);
    orchestrator::print_header(&request);

    let plan = planner.run(&request).await;
    orchestrator::print_plan(&plan);

    MarkdownExporter::new(&plan).export(&args.output)?;
    println!("\n{} Travel plan exported to: {}",
        "✓".green().bold(),
        args.output.display().to_string().bright_cyan());

    println!("\n{} Total tokens used: {}",
        "ℹ".blue().bold(),
        plan.total_tokens.to_string().bright_yellow());

    Ok(())
}
