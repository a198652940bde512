// ============================================================================
// File: src/pipeline.rs
// Flight offer selection: fetch, rank, resolve booking links
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Outcome, PlannerError, PlannerResult};
use crate::models::{FlightOffer, FlightSearchResponse, SearchRequest};
use crate::search_client::FlightSearch;

pub const PLACEHOLDER_LINK: &str = "#";

/// Offers returned by one search. `Empty` is a normal, displayable outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferSet {
    Found(Vec<FlightOffer>),
    Empty,
}

impl OfferSet {
    pub fn from_offers(offers: Vec<FlightOffer>) -> Self {
        if offers.is_empty() {
            OfferSet::Empty
        } else {
            OfferSet::Found(offers)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OfferSet::Found(offers) => offers.len(),
            OfferSet::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_offers(self) -> Vec<FlightOffer> {
        match self {
            OfferSet::Found(offers) => offers,
            OfferSet::Empty => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BookingLink {
    Resolved { reference: String, url: String },
    Placeholder,
}

impl BookingLink {
    pub fn as_str(&self) -> &str {
        match self {
            BookingLink::Resolved { url, .. } => url,
            BookingLink::Placeholder => PLACEHOLDER_LINK,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            BookingLink::Resolved { reference, .. } => Some(reference),
            BookingLink::Placeholder => None,
        }
    }
}

impl std::fmt::Display for BookingLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top offer ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOffer {
    pub offer: FlightOffer,
    pub link: BookingLink,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub offers: Vec<RankedOffer>,
    /// User-visible, non-fatal problems met along the way
    pub warnings: Vec<String>,
}

/// Sort by ascending price and keep the first `limit` offers.
///
/// The sort is stable, so equal prices keep the order the search engine
/// returned them in. Offers without a price go last.
pub fn rank(offers: OfferSet, limit: usize) -> Vec<FlightOffer> {
    let mut offers = offers.into_offers();
    offers.sort_by(|a, b| a.price_key().total_cmp(&b.price_key()));
    offers.truncate(limit);
    offers
}

/// Pick the booking reference for the offer at `index` of the ranked list.
///
/// Matching is positional: the lookup response is assumed to list offers in
/// the same order as the ranked list. The engine does not guarantee that.
pub fn reference_at_position(response: &FlightSearchResponse, index: usize) -> PlannerResult<String> {
    let offers = response.best_flights.as_ref().ok_or_else(|| {
        PlannerError::BookingResolution("lookup response has no offer list".to_string())
    })?;

    let offer = offers.get(index).ok_or_else(|| {
        PlannerError::BookingResolution(format!(
            "lookup returned {} offers, position {} requested",
            offers.len(),
            index
        ))
    })?;

    offer
        .booking_token
        .clone()
        .filter(|reference| !reference.is_empty())
        .ok_or_else(|| {
            PlannerError::BookingResolution(format!("offer at position {} has no booking token", index))
        })
}

pub struct FlightOfferPipeline {
    client: Arc<dyn FlightSearch>,
    booking_base_url: String,
    limit: usize,
}

impl FlightOfferPipeline {
    pub fn new(client: Arc<dyn FlightSearch>, booking_base_url: String, limit: usize) -> Self {
        Self {
            client,
            booking_base_url,
            limit,
        }
    }

    /// Fetch, rank and link the cheapest offers for `request`.
    pub async fn run(&self, request: &SearchRequest) -> PipelineReport {
        let mut report = PipelineReport::default();

        let fetched = self.fetch_offers(request).await;
        if let Some(cause) = fetched.cause() {
            report.warnings.push(format!("No flight data available: {}", cause));
        }

        let offer_set = fetched.into_value();
        if offer_set.is_empty() {
            debug!("Search returned no offers");
        }

        let found = offer_set.len();
        let ranked = rank(offer_set, self.limit);
        info!(found, kept = ranked.len(), "Ranked flight offers");

        for (index, mut offer) in ranked.into_iter().enumerate() {
            let outcome = self.resolve_booking_link(&offer, index, request).await;
            match outcome.cause() {
                // A missing reference shows as a placeholder link and nothing else
                Some(PlannerError::BookingResolution(msg)) => {
                    debug!(index, "Booking link unresolved: {}", msg);
                }
                Some(other) => report
                    .warnings
                    .push(format!("Booking link for offer {} unavailable: {}", index + 1, other)),
                None => {}
            }

            offer.booking_reference = outcome.value().reference().map(str::to_string);
            report.offers.push(RankedOffer {
                offer,
                link: outcome.into_value(),
            });
        }

        report
    }

    /// Run the search and normalize its offers.
    ///
    /// A failed call or a response without the offer list degrades to
    /// `OfferSet::Empty`.
    pub async fn fetch_offers(&self, request: &SearchRequest) -> Outcome<OfferSet> {
        let response = match self.client.search(request).await {
            Ok(response) => response,
            Err(cause) => {
                warn!("Flight search failed: {}", cause);
                return Outcome::degraded(OfferSet::Empty, cause);
            }
        };

        match response.best_flights {
            Some(raw) => {
                let offers = raw
                    .into_iter()
                    .map(|r| FlightOffer::from_raw(r, &request.currency))
                    .collect();
                Outcome::Ok(OfferSet::from_offers(offers))
            }
            None => {
                warn!("Flight search response carried no offer list");
                Outcome::degraded(
                    OfferSet::Empty,
                    PlannerError::MalformedResponse("response has no best_flights field".to_string()),
                )
            }
        }
    }

    /// Resolve the booking URL for the offer at `index` of the ranked list.
    pub async fn resolve_booking_link(
        &self,
        offer: &FlightOffer,
        index: usize,
        request: &SearchRequest,
    ) -> Outcome<BookingLink> {
        let Some(token) = offer.booking_token.as_deref().filter(|t| !t.is_empty()) else {
            return Outcome::Ok(BookingLink::Placeholder);
        };

        let resolved = self
            .lookup_booking_reference(token, index, request)
            .await
            .map(|reference| BookingLink::Resolved {
                url: format!("{}{}", self.booking_base_url, reference),
                reference,
            });

        Outcome::recover(resolved, || BookingLink::Placeholder)
    }

    async fn lookup_booking_reference(
        &self,
        token: &str,
        index: usize,
        request: &SearchRequest,
    ) -> PlannerResult<String> {
        let response = self.client.search_with_token(request, token).await?;
        reference_at_position(&response, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    const BASE: &str = "https://www.google.com/travel/flights?tfs=";

    struct FakeSearch {
        search: PlannerResult<FlightSearchResponse>,
        lookup: PlannerResult<FlightSearchResponse>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeSearch {
        fn new(search: PlannerResult<FlightSearchResponse>, lookup: PlannerResult<FlightSearchResponse>) -> Arc<Self> {
            Arc::new(Self {
                search,
                lookup,
                lookups: Mutex::new(Vec::new()),
            })
        }

        fn lookup_tokens(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FlightSearch for FakeSearch {
        async fn search(&self, _request: &SearchRequest) -> PlannerResult<FlightSearchResponse> {
            self.search.clone()
        }

        async fn search_with_token(
            &self,
            _request: &SearchRequest,
            departure_token: &str,
        ) -> PlannerResult<FlightSearchResponse> {
            self.lookups.lock().unwrap().push(departure_token.to_string());
            self.lookup.clone()
        }
    }

    fn response(value: Value) -> FlightSearchResponse {
        serde_json::from_value(value).unwrap()
    }

    fn request() -> SearchRequest {
        SearchRequest::new(
            "BOM",
            "DEL",
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            "INR",
        )
    }

    fn offer(airline: &str, price: Option<f64>) -> FlightOffer {
        FlightOffer {
            price: price.map(|amount| crate::models::Money {
                amount,
                currency: "INR".to_string(),
            }),
            airline: Some(airline.to_string()),
            ..Default::default()
        }
    }

    fn airlines(offers: &[FlightOffer]) -> Vec<&str> {
        offers.iter().map(|o| o.airline_label()).collect()
    }

    fn pipeline(fake: Arc<FakeSearch>) -> FlightOfferPipeline {
        FlightOfferPipeline::new(fake, BASE.to_string(), 3)
    }

    fn five_offers() -> Value {
        json!({
            "best_flights": [
                {"price": 5000, "airline": "A"},
                {"price": 3000, "airline": "B"},
                {"price": 3000, "airline": "C"},
                {"airline": "D"},
                {"price": 4000, "airline": "E"}
            ]
        })
    }

    #[test]
    fn test_rank_orders_by_price_and_keeps_ties_stable() {
        let offers = vec![
            offer("A", Some(200.0)),
            offer("B", Some(100.0)),
            offer("C", Some(200.0)),
            offer("D", Some(100.0)),
        ];
        let ranked = rank(OfferSet::from_offers(offers), 10);

        assert_eq!(airlines(&ranked), vec!["B", "D", "A", "C"]);
        assert!(ranked.windows(2).all(|w| w[0].price_key() <= w[1].price_key()));
    }

    #[test]
    fn test_rank_puts_unknown_price_last() {
        let offers = vec![
            offer("none-1", None),
            offer("pricey", Some(99_999.0)),
            offer("none-2", None),
            offer("cheap", Some(1.0)),
        ];
        let ranked = rank(OfferSet::from_offers(offers), 10);

        assert_eq!(airlines(&ranked), vec!["cheap", "pricey", "none-1", "none-2"]);
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        for n in 0..6 {
            let offers = (0..n).map(|i| offer("X", Some(i as f64))).collect();
            assert_eq!(rank(OfferSet::from_offers(offers), 3).len(), n.min(3));
        }
        assert!(rank(OfferSet::Empty, 3).is_empty());
    }

    #[test]
    fn test_reference_at_position() {
        let resp = response(json!({
            "best_flights": [{"booking_token": "X"}, {"booking_token": "ABC123"}]
        }));
        assert_eq!(reference_at_position(&resp, 1).unwrap(), "ABC123");
        assert!(matches!(
            reference_at_position(&resp, 2),
            Err(PlannerError::BookingResolution(_))
        ));
        assert!(matches!(
            reference_at_position(&FlightSearchResponse::default(), 0),
            Err(PlannerError::BookingResolution(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_without_offer_field_is_empty() {
        let fake = FakeSearch::new(Ok(response(json!({"search_metadata": {}}))), Ok(Default::default()));
        let outcome = pipeline(fake).fetch_offers(&request()).await;

        assert!(matches!(outcome.cause(), Some(PlannerError::MalformedResponse(_))));
        let set = outcome.into_value();
        assert_eq!(set, OfferSet::Empty);
        assert_eq!(rank(set, 3), rank(OfferSet::from_offers(Vec::new()), 3));
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let fake = FakeSearch::new(
            Err(PlannerError::CollaboratorUnavailable("connection refused".to_string())),
            Ok(Default::default()),
        );
        let report = pipeline(fake).run(&request()).await;

        assert!(report.offers.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fetch_empty_list_is_not_a_warning() {
        let fake = FakeSearch::new(Ok(response(json!({"best_flights": []}))), Ok(Default::default()));
        let outcome = pipeline(fake).fetch_offers(&request()).await;

        assert_eq!(outcome, Outcome::Ok(OfferSet::Empty));
    }

    #[tokio::test]
    async fn test_offer_without_token_skips_lookup() {
        let fake = FakeSearch::new(Ok(Default::default()), Ok(Default::default()));
        let pipeline = pipeline(fake.clone());

        let outcome = pipeline.resolve_booking_link(&offer("A", Some(1.0)), 0, &request()).await;

        assert_eq!(outcome, Outcome::Ok(BookingLink::Placeholder));
        assert_eq!(outcome.value().as_str(), "#");
        assert!(fake.lookup_tokens().is_empty());
    }

    #[tokio::test]
    async fn test_resolves_reference_at_same_position() {
        let lookup = response(json!({
            "best_flights": [
                {"booking_token": "FIRST"},
                {"booking_token": "ABC123"},
                {"booking_token": "THIRD"}
            ]
        }));
        let fake = FakeSearch::new(Ok(Default::default()), Ok(lookup));
        let pipeline = pipeline(fake.clone());

        let ranked = vec![
            offer("A", Some(1.0)),
            FlightOffer {
                booking_token: Some("tok-b".to_string()),
                ..offer("B", Some(2.0))
            },
            offer("C", Some(3.0)),
        ];
        let link = pipeline
            .resolve_booking_link(&ranked[1], 1, &request())
            .await
            .into_value();

        assert!(link.as_str().contains("ABC123"));
        assert_eq!(link.as_str(), format!("{}ABC123", BASE));
        assert_eq!(fake.lookup_tokens(), vec!["tok-b".to_string()]);
    }

    #[tokio::test]
    async fn test_short_lookup_list_falls_back_to_placeholder() {
        let lookup = response(json!({"best_flights": [{"booking_token": "ONLY"}]}));
        let fake = FakeSearch::new(Ok(Default::default()), Ok(lookup));
        let tokened = FlightOffer {
            booking_token: Some("tok".to_string()),
            ..offer("A", Some(1.0))
        };

        let outcome = pipeline(fake).resolve_booking_link(&tokened, 2, &request()).await;

        assert!(matches!(outcome.cause(), Some(PlannerError::BookingResolution(_))));
        assert_eq!(outcome.into_value(), BookingLink::Placeholder);
    }

    #[tokio::test]
    async fn test_lookup_failure_warns_and_keeps_offer() {
        let search = response(json!({
            "best_flights": [{"price": 100, "airline": "A", "departure_token": "tok-a"}]
        }));
        let fake = FakeSearch::new(
            Ok(search),
            Err(PlannerError::CollaboratorUnavailable("timed out".to_string())),
        );

        let report = pipeline(fake).run(&request()).await;

        assert_eq!(report.offers.len(), 1);
        assert_eq!(report.offers[0].link, BookingLink::Placeholder);
        assert!(report.offers[0].offer.booking_reference.is_none());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_end_to_end_ranking_and_links() {
        let mut search = five_offers();
        search["best_flights"][1]["departure_token"] = json!("tok-b");
        search["best_flights"][4]["departure_token"] = json!("tok-e");
        let lookup = response(json!({
            "best_flights": [
                {"booking_token": "REF0"},
                {"booking_token": "REF1"}
            ]
        }));
        let fake = FakeSearch::new(Ok(response(search)), Ok(lookup));

        let report = pipeline(fake.clone()).run(&request()).await;
        let offers: Vec<FlightOffer> = report.offers.iter().map(|r| r.offer.clone()).collect();

        assert_eq!(airlines(&offers), vec!["B", "C", "E"]);
        let prices: Vec<f64> = offers.iter().map(|o| o.price_key()).collect();
        assert_eq!(prices, vec![3000.0, 3000.0, 4000.0]);

        assert_eq!(report.offers[0].offer.booking_reference.as_deref(), Some("REF0"));
        assert_eq!(report.offers[1].link, BookingLink::Placeholder);
        // E sits at position 2, past the end of the lookup list
        assert_eq!(report.offers[2].link, BookingLink::Placeholder);
        assert!(report.warnings.is_empty());
        assert_eq!(fake.lookup_tokens(), vec!["tok-b".to_string(), "tok-e".to_string()]);
    }

    #[tokio::test]
    async fn test_rank_three_of_five_offers() {
        let fake = FakeSearch::new(Ok(response(five_offers())), Ok(Default::default()));
        let set = pipeline(fake).fetch_offers(&request()).await.into_value();

        assert_eq!(set.len(), 5);
        let ranked = rank(set, 3);
        assert_eq!(airlines(&ranked), vec!["B", "C", "E"]);
    }
}
