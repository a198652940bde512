// ============================================================================
// File: src/markdown.rs
// Markdown export functionality
// ============================================================================

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::Path;

use crate::orchestrator::TravelPlan;
use crate::pipeline::RankedOffer;

/// `Mar-06, 2025 | 06:20 PM`, or `N/A` when the time is unknown.
pub fn format_datetime(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%b-%d, %Y | %I:%M %p").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn format_duration(minutes: Option<u32>) -> String {
    minutes
        .map(|m| format!("{} min", m))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Escape the column separator inside a table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub struct MarkdownExporter<'a> {
    plan: &'a TravelPlan,
}

impl<'a> MarkdownExporter<'a> {
    pub fn new(plan: &'a TravelPlan) -> Self {
        Self { plan }
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut content = String::new();

        self.write_header(&mut content);
        self.write_flights(&mut content);
        self.write_text_section(&mut content, "Destination Research", &self.plan.research);
        self.write_text_section(&mut content, "Hotels & Restaurants", &self.plan.hotels_restaurants);
        self.write_text_section(&mut content, "Your Personalized Itinerary", &self.plan.itinerary);
        self.write_warnings(&mut content);

        content
    }

    fn write_header(&self, content: &mut String) {
        let search = &self.plan.request.search;
        let prefs = &self.plan.request.preferences;

        content.push_str(&format!(
            "# Travel Plan: {} → {}\n\n",
            search.origin, search.destination
        ));
        content.push_str(&format!("**Generated**: {}\n\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
        content.push_str(&format!(
            "**Dates**: {} to {}\n\n",
            search.outbound_date, search.return_date
        ));
        content.push_str(&format!(
            "**Trip**: {}, {} days | Budget: {} | Flight Class: {} | Hotel Rating: {}\n\n",
            prefs.theme.label(),
            prefs.days,
            prefs.budget.label(),
            prefs.flight_class.label(),
            prefs.hotel_rating.label()
        ));
        content.push_str(&format!("**Total Tokens Used**: {}\n\n", self.plan.total_tokens));
    }

    fn write_flights(&self, content: &mut String) {
        content.push_str("## Cheapest Flight Options\n\n");

        if self.plan.flights.is_empty() {
            content.push_str("No flight data available.\n\n");
            return;
        }

        content.push_str("| # | Airline | Departure | Arrival | Duration | Price | Booking |\n");
        content.push_str("|---|---------|-----------|---------|----------|-------|---------|\n");
        for (i, ranked) in self.plan.flights.iter().enumerate() {
            content.push_str(&Self::flight_row(i + 1, ranked));
        }
        content.push('\n');
    }

    fn flight_row(position: usize, ranked: &RankedOffer) -> String {
        let offer = &ranked.offer;
        let price = offer
            .price
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "Not Available".to_string());

        format!(
            "| {} | {} | {} | {} | {} | {} | [Book Now]({}) |\n",
            position,
            cell(offer.airline_label()),
            cell(&format_datetime(offer.departure().and_then(|e| e.time))),
            cell(&format_datetime(offer.arrival().and_then(|e| e.time))),
            format_duration(offer.total_duration_minutes),
            price,
            ranked.link
        )
    }

    fn write_text_section(&self, content: &mut String, title: &str, text: &str) {
        content.push_str(&format!("## {}\n\n", title));
        if text.trim().is_empty() {
            content.push_str("_Not available._\n\n");
        } else {
            content.push_str(text.trim_end());
            content.push_str("\n\n");
        }
    }

    fn write_warnings(&self, content: &mut String) {
        if self.plan.warnings.is_empty() {
            return;
        }

        content.push_str("## Warnings\n\n");
        for warning in &self.plan.warnings {
            content.push_str(&format!("> {}\n", warning));
        }
        content.push('\n');
    }
}
