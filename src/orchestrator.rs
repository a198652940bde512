// ============================================================================
// File: src/orchestrator.rs
// Trip planning: flights first, then the research, hotel and planner agents
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::config::TripPreferences;
use crate::llm_client::{Agent, TextGenerator};
use crate::markdown::{format_datetime, format_duration};
use crate::models::{FlightOffer, SearchRequest};
use crate::pipeline::{FlightOfferPipeline, RankedOffer};

/// Everything one "generate" action needs
#[derive(Debug, Clone)]
pub struct TripRequest {
    pub search: SearchRequest,
    pub preferences: TripPreferences,
}

/// Output of one run. Sections that failed are left empty.
#[derive(Debug, Clone)]
pub struct TravelPlan {
    pub request: TripRequest,
    pub flights: Vec<RankedOffer>,
    pub research: String,
    pub hotels_restaurants: String,
    pub itinerary: String,
    pub warnings: Vec<String>,
    pub total_tokens: usize,
}

impl TravelPlan {
    fn new(request: TripRequest) -> Self {
        Self {
            request,
            flights: Vec::new(),
            research: String::new(),
            hotels_restaurants: String::new(),
            itinerary: String::new(),
            warnings: Vec::new(),
            total_tokens: 0,
        }
    }
}

pub struct TripPlanner {
    pipeline: FlightOfferPipeline,
    generator: Arc<dyn TextGenerator>,
    researcher: Agent,
    planner: Agent,
    show_progress: bool,
}

impl TripPlanner {
    pub fn new(pipeline: FlightOfferPipeline, generator: Arc<dyn TextGenerator>, show_progress: bool) -> Self {
        let researcher = Agent::new(
            "Researcher",
            vec![
                "Identify the travel destination specified by the user.".to_string(),
                "Gather detailed information on the destination, including climate, culture, and safety tips.".to_string(),
                "Find popular attractions, landmarks, and must-visit places.".to_string(),
                "Search for activities that match the user's interests and travel style.".to_string(),
                "Prioritize information from reliable sources and official travel guides.".to_string(),
                "Provide well-structured summaries with key insights and recommendations.".to_string(),
            ],
        )
        .with_web_search();

        let planner = Agent::new(
            "Planner",
            vec![
                "Gather details about the user's travel preferences and budget.".to_string(),
                "Create a detailed itinerary with scheduled activities and estimated costs.".to_string(),
                "Ensure the itinerary includes transportation options and travel time estimates.".to_string(),
                "Optimize the schedule for convenience and enjoyment.".to_string(),
                "Present the itinerary in a structured format.".to_string(),
            ],
        );

        Self {
            pipeline,
            generator,
            researcher,
            planner,
            show_progress,
        }
    }

    /// Run every stage in order. No stage failure aborts the run.
    pub async fn run(&self, request: &TripRequest) -> TravelPlan {
        let mut plan = TravelPlan::new(request.clone());
        let search = &request.search;
        let prefs = &request.preferences;

        // 1) Flights
        let spinner = self.spinner("Fetching best flight options...");
        let report = self.pipeline.run(search).await;
        spinner.finish_and_clear();
        let search_warned = !report.warnings.is_empty();
        plan.warnings.extend(report.warnings);
        plan.flights = report.offers;
        // Generic hint only when the search itself reported nothing
        if plan.flights.is_empty() && !search_warned {
            plan.warnings.push(
                "No flights returned. Check your SERPAPI_API_KEY, departure/arrival codes, or try again later."
                    .to_string(),
            );
        }

        // 2) Research
        let research_prompt = research_prompt(search, prefs);
        plan.research = self
            .run_agent(&self.researcher, &research_prompt, "Researching best attractions & activities...", &mut plan)
            .await;

        // 3) Hotels & restaurants
        let finder = hotel_restaurant_finder(&search.destination, prefs);
        let hotel_prompt = hotel_restaurant_prompt(search, prefs);
        plan.hotels_restaurants = self
            .run_agent(&finder, &hotel_prompt, "Searching for hotels & restaurants...", &mut plan)
            .await;

        // 4) Itinerary
        let offers: Vec<&FlightOffer> = plan.flights.iter().map(|r| &r.offer).collect();
        let flights_json = serde_json::to_string(&offers).unwrap_or_else(|_| "[]".to_string());
        let planning_prompt = planning_prompt(search, prefs, &plan.research, &flights_json, &plan.hotels_restaurants);
        plan.itinerary = self
            .run_agent(&self.planner, &planning_prompt, "Creating your personalized itinerary...", &mut plan)
            .await;

        plan
    }

    async fn run_agent(&self, agent: &Agent, prompt: &str, message: &str, plan: &mut TravelPlan) -> String {
        let spinner = self.spinner(message);
        let result = agent.run(self.generator.as_ref(), prompt).await;
        spinner.finish_and_clear();

        match result {
            Ok(completion) => {
                plan.total_tokens += completion.tokens;
                completion.content
            }
            Err(e) => {
                warn!(agent = %agent.name, "Agent failed: {}", e);
                plan.warnings.push(format!("{} failed: {}", agent.name, e));
                String::new()
            }
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

fn hotel_restaurant_finder(destination: &str, prefs: &TripPreferences) -> Agent {
    Agent::new(
        "Hotel & Restaurant Finder",
        vec![
            format!(
                "Find 3-5 excellent {} hotels in {} suitable for {}",
                prefs.hotel_rating.label(),
                destination,
                prefs.theme.label()
            ),
            format!(
                "Find 3-5 highly-rated restaurants in {} matching these preferences: {}",
                destination, prefs.activities
            ),
            "For each hotel and restaurant, include: name, address, price range, rating, and brief description".to_string(),
            "Format the results clearly with headings for Hotels and Restaurants sections".to_string(),
            "If no results found, suggest alternative search terms".to_string(),
        ],
    )
    .with_web_search()
}

fn research_prompt(search: &SearchRequest, prefs: &TripPreferences) -> String {
    format!(
        "Research the best attractions and activities in {} for a {}-day {} trip. \
         The traveler enjoys: {}. Budget: {}. Flight Class: {}. Hotel Rating: {}. \
         Visa Requirement: {}. Travel Insurance: {}.",
        search.destination,
        prefs.days,
        prefs.theme.label().to_lowercase(),
        prefs.activities,
        prefs.budget.label(),
        prefs.flight_class.label(),
        prefs.hotel_rating.label(),
        prefs.visa_required,
        prefs.travel_insurance
    )
}

fn hotel_restaurant_prompt(search: &SearchRequest, prefs: &TripPreferences) -> String {
    format!(
        "Find the best hotels and restaurants near popular attractions in {} for a {} trip. \
         Budget: {}. Hotel Rating: {}. Preferred activities: {}.",
        search.destination,
        prefs.theme.label().to_lowercase(),
        prefs.budget.label(),
        prefs.hotel_rating.label(),
        prefs.activities
    )
}

fn planning_prompt(
    search: &SearchRequest,
    prefs: &TripPreferences,
    research: &str,
    flights_json: &str,
    hotels_restaurants: &str,
) -> String {
    format!(
        "Based on the following data, create a {}-day itinerary for a {} trip to {}. \
         The traveler enjoys: {}. Budget: {}. Flight Class: {}. Hotel Rating: {}. \
         Visa Requirement: {}. Travel Insurance: {}. \
         Research: {}. Flights: {}. Hotels & Restaurants: {}.",
        prefs.days,
        prefs.theme.label().to_lowercase(),
        search.destination,
        prefs.activities,
        prefs.budget.label(),
        prefs.flight_class.label(),
        prefs.hotel_rating.label(),
        prefs.visa_required,
        prefs.travel_insurance,
        research,
        flights_json,
        hotels_restaurants
    )
}

pub fn print_header(request: &TripRequest) {
    println!("{}", "\n═══════════════════════════════════════".bright_blue());
    println!("{}", "        AI-POWERED TRAVEL PLANNER".bright_white().bold());
    println!("{}", "═══════════════════════════════════════".bright_blue());
    println!(
        "\n{}: {} → {}",
        "Route".green().bold(),
        request.search.origin,
        request.search.destination
    );
    println!(
        "{}: {} to {}",
        "Dates".green().bold(),
        request.search.outbound_date,
        request.search.return_date
    );
    println!(
        "{}: {} ({} days)\n",
        "Trip".green().bold(),
        request.preferences.theme.label(),
        request.preferences.days
    );
}

pub fn print_plan(plan: &TravelPlan) {
    print_section("Cheapest Flight Options");
    if plan.flights.is_empty() {
        println!("{} No flight data available.", "⚠".yellow());
    }
    for ranked in &plan.flights {
        print_flight(ranked);
    }

    print_section("Hotels & Restaurants");
    println!("{}", plan.hotels_restaurants);

    print_section("Your Personalized Itinerary");
    println!("{}", plan.itinerary);

    if !plan.warnings.is_empty() {
        println!();
        for warning in &plan.warnings {
            println!("{} {}", "⚠".yellow(), warning);
        }
    }
}

fn print_section(title: &str) {
    println!("\n{} {}", "►".yellow().bold(), title.bright_white().bold());
    println!("{}", "─".repeat(40).bright_black());
}

fn print_flight(ranked: &RankedOffer) {
    let offer = &ranked.offer;
    let price = offer
        .price
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Not Available".to_string());

    println!("\n{} {}", "●".bright_cyan(), offer.airline_label().bright_white().bold());
    println!("  Departure: {}", format_datetime(offer.departure().and_then(|e| e.time)));
    println!("  Arrival:   {}", format_datetime(offer.arrival().and_then(|e| e.time)));
    println!("  Duration:  {}", format_duration(offer.total_duration_minutes));
    println!("  Price:     {}", price.green().bold());
    println!("  Book:      {}", ranked.link.as_str().bright_cyan());
}
