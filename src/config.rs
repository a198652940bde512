// ============================================================================
// File: src/config.rs
// Configuration structures and validation
// ============================================================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

pub const SERPAPI_KEY_VAR: &str = "SERPAPI_API_KEY";
pub const GOOGLE_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Startup configuration: credentials from the environment plus settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// SerpApi key used for the flight search and booking lookups
    pub serpapi_api_key: String,

    /// Google AI key used by the Gemini agents
    pub google_api_key: String,

    pub settings: Settings,
}

/// Non-secret tunables, loaded from an optional JSON file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the SerpApi endpoint
    pub serpapi_url: String,

    /// Base URL of the Gemini API
    pub gemini_url: String,

    /// Gemini model identifier used by every agent
    pub model: String,

    /// Prefix the resolved booking reference is appended to
    pub booking_base_url: String,

    /// ISO currency code prices are requested in
    pub currency: String,

    /// Interface language passed to the search engine
    pub language: String,

    /// Per-request timeout applied to every collaborator call
    pub request_timeout_secs: u64,

    /// How many of the cheapest offers are kept
    pub top_offers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serpapi_url: "https://serpapi.com".to_string(),
            gemini_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash-preview-04-17".to_string(),
            booking_base_url: "https://www.google.com/travel/flights?tfs=".to_string(),
            currency: "INR".to_string(),
            language: "en".to_string(),
            request_timeout_secs: 30,
            top_offers: 3,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> PlannerResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PlannerError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> PlannerResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| PlannerError::Configuration(format!("Failed to parse settings: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env(settings: Settings) -> PlannerResult<Self> {
        Self::from_lookup(settings, |key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup and validate it.
    pub fn from_lookup<F>(settings: Settings, lookup: F) -> PlannerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    PlannerError::Configuration(format!("{} environment variable not set", key))
                })
        };

        let config = Self {
            serpapi_api_key: require(SERPAPI_KEY_VAR)?,
            google_api_key: require(GOOGLE_KEY_VAR)?,
            settings,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> PlannerResult<()> {
        let fault = |msg: &str| Err(PlannerError::Configuration(msg.to_string()));

        if self.serpapi_api_key.is_empty() {
            return fault("SerpApi key is required");
        }

        if self.google_api_key.is_empty() {
            return fault("Google API key is required");
        }

        if self.settings.serpapi_url.is_empty()
            || self.settings.gemini_url.is_empty()
            || self.settings.booking_base_url.is_empty()
        {
            return fault("Service URLs must not be empty");
        }

        if self.settings.request_timeout_secs == 0 {
            return fault("Request timeout must be at least one second");
        }

        if self.settings.top_offers == 0 {
            return fault("At least one offer must be kept");
        }

        Ok(())
    }
}

/// Kind of trip the plan is tailored for
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum TravelTheme {
    Couple,
    Family,
    Adventure,
    Solo,
}

impl TravelTheme {
    pub fn label(self) -> &'static str {
        match self {
            TravelTheme::Couple => "Couple Getaway",
            TravelTheme::Family => "Family Vacation",
            TravelTheme::Adventure => "Adventure Trip",
            TravelTheme::Solo => "Solo Exploration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Budget {
    Economy,
    Standard,
    Luxury,
}

impl Budget {
    pub fn label(self) -> &'static str {
        match self {
            Budget::Economy => "Economy",
            Budget::Standard => "Standard",
            Budget::Luxury => "Luxury",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum FlightClass {
    Economy,
    Business,
    First,
}

impl FlightClass {
    pub fn label(self) -> &'static str {
        match self {
            FlightClass::Economy => "Economy",
            FlightClass::Business => "Business",
            FlightClass::First => "First Class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum HotelRating {
    Any,
    Three,
    Four,
    Five,
}

impl HotelRating {
    pub fn label(self) -> &'static str {
        match self {
            HotelRating::Any => "Any",
            HotelRating::Three => "3-star",
            HotelRating::Four => "4-star",
            HotelRating::Five => "5-star",
        }
    }
}

/// Traveler preferences fed into the agent prompts
#[derive(Debug, Clone, Serialize)]
pub struct TripPreferences {
    pub days: u8,
    pub theme: TravelTheme,
    pub activities: String,
    pub budget: Budget,
    pub flight_class: FlightClass,
    pub hotel_rating: HotelRating,
    pub visa_required: bool,
    pub travel_insurance: bool,
}
