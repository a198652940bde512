// ============================================================================
// File: src/models.rs
// API request and response models
// ============================================================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_AIRLINE: &str = "Unknown Airline";
const LEG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parameters of one flight search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub outbound_date: NaiveDate,
    pub return_date: NaiveDate,
    pub currency: String,
}

impl SearchRequest {
    /// Normalize raw form input into a request.
    ///
    /// Airport codes are only uppercased. Length, charset and date ordering
    /// are left for the search service to reject.
    pub fn new(
        origin: &str,
        destination: &str,
        outbound_date: NaiveDate,
        return_date: NaiveDate,
        currency: &str,
    ) -> Self {
        Self {
            origin: origin.to_uppercase(),
            destination: destination.to_uppercase(),
            outbound_date,
            return_date,
            currency: currency.to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// SerpApi Google Flights payloads
// ----------------------------------------------------------------------------

/// Response from the flight search engine. Every field is optional.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct FlightSearchResponse {
    /// Absent when the engine found nothing worth ranking
    pub best_flights: Option<Vec<RawOffer>>,
    pub error: Option<String>,
}

/// Offer record as returned by the search engine
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct RawOffer {
    pub price: Option<f64>,
    pub airline: Option<String>,
    pub airline_logo: Option<String>,
    pub total_duration: Option<u32>,
    /// Token exchanged by a follow-up search for booking options
    pub departure_token: Option<String>,
    /// Booking reference; only meaningful in a token lookup response
    pub booking_token: Option<String>,
    #[serde(default)]
    pub flights: Vec<RawLeg>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct RawLeg {
    pub departure_airport: Option<RawAirport>,
    pub arrival_airport: Option<RawAirport>,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub duration: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct RawAirport {
    pub id: Option<String>,
    pub name: Option<String>,
    pub time: Option<String>,
}

// ----------------------------------------------------------------------------
// Normalized offers
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.currency, self.amount)
    }
}

/// One end of a flight segment
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Endpoint {
    pub airport: Option<String>,
    pub name: Option<String>,
    /// Local time; `None` when missing or unparseable
    pub time: Option<NaiveDateTime>,
}

impl From<RawAirport> for Endpoint {
    fn from(raw: RawAirport) -> Self {
        Self {
            airport: raw.id,
            name: raw.name,
            time: raw
                .time
                .and_then(|t| NaiveDateTime::parse_from_str(&t, LEG_TIME_FORMAT).ok()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Leg {
    pub departure: Endpoint,
    pub arrival: Endpoint,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub duration_minutes: Option<u32>,
}

impl From<RawLeg> for Leg {
    fn from(raw: RawLeg) -> Self {
        Self {
            departure: raw.departure_airport.map(Endpoint::from).unwrap_or_default(),
            arrival: raw.arrival_airport.map(Endpoint::from).unwrap_or_default(),
            airline: raw.airline,
            flight_number: raw.flight_number,
            duration_minutes: raw.duration,
        }
    }
}

/// One priced round-trip option.
///
/// Built once from the raw record; only `booking_reference` is filled in
/// later, by the booking lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlightOffer {
    pub price: Option<Money>,
    pub airline: Option<String>,
    pub legs: Vec<Leg>,
    pub total_duration_minutes: Option<u32>,
    /// Display-only, passed through untouched
    pub airline_logo: Option<String>,
    pub booking_token: Option<String>,
    pub booking_reference: Option<String>,
}

impl FlightOffer {
    pub fn from_raw(raw: RawOffer, currency: &str) -> Self {
        let legs: Vec<Leg> = raw.flights.into_iter().map(Leg::from).collect();
        // The first leg's carrier wins over the record-level name
        let airline = legs
            .first()
            .and_then(|leg| leg.airline.clone())
            .or(raw.airline);

        Self {
            price: raw.price.map(|amount| Money {
                amount,
                currency: currency.to_string(),
            }),
            airline,
            legs,
            total_duration_minutes: raw.total_duration,
            airline_logo: raw.airline_logo,
            booking_token: raw.departure_token.filter(|t| !t.is_empty()),
            booking_reference: None,
        }
    }

    pub fn airline_label(&self) -> &str {
        self.airline.as_deref().unwrap_or(UNKNOWN_AIRLINE)
    }

    pub fn departure(&self) -> Option<&Endpoint> {
        self.legs.first().map(|leg| &leg.departure)
    }

    pub fn arrival(&self) -> Option<&Endpoint> {
        self.legs.last().map(|leg| &leg.arrival)
    }

    /// Ranking key; a missing price sorts after every known one.
    pub fn price_key(&self) -> f64 {
        self.price.as_ref().map_or(f64::INFINITY, |p| p.amount)
    }
}

// ----------------------------------------------------------------------------
// Gemini generateContent payloads
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Request structure for the Gemini API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<serde_json::Value>,
}

/// Response structure from the Gemini API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub total_token_count: Option<usize>,
}
