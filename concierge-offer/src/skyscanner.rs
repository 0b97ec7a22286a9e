use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use concierge_core::{FlightOffer, FlightSegment, SearchRequest, TripType};
use concierge_store::app_config::QuotesConfig;

use crate::quotes::{QuoteClient, QuoteError};

/// Browse-quotes client for the Skyscanner partner API
pub struct SkyscannerClient {
    http: Client,
    api_base: String,
    api_key: String,
    country: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BrowseQuotesResponse {
    #[serde(default)]
    quotes: Vec<Quote>,
    #[serde(default)]
    carriers: Vec<Carrier>,
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Quote {
    quote_id: u64,
    min_price: f64,
    #[serde(default)]
    direct: bool,
    outbound_leg: QuoteLeg,
    #[serde(default)]
    inbound_leg: Option<QuoteLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QuoteLeg {
    #[serde(default)]
    carrier_ids: Vec<u64>,
    origin_id: u64,
    destination_id: u64,
    departure_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Carrier {
    carrier_id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Place {
    place_id: u64,
    #[serde(default)]
    iata_code: Option<String>,
}

impl SkyscannerClient {
    /// `None` when no API key is configured
    pub fn from_config(config: &QuotesConfig) -> Result<Option<Self>, QuoteError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Some(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            country: config.country.clone(),
        }))
    }

    fn url(&self, request: &SearchRequest) -> String {
        let mut url = format!(
            "{}/{}/{}/{}/{}/{}/{}",
            self.api_base,
            self.country,
            request.currency_code(),
            request.locale_code(),
            request.origin,
            request.destination,
            request.departure_date,
        );
        if let (TripType::RoundTrip, Some(return_date)) = (request.trip_type, request.return_date) {
            url.push_str(&format!("/{}", return_date));
        }
        url
    }
}

#[async_trait]
impl QuoteClient for SkyscannerClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, QuoteError> {
        let response = self
            .http
            .get(self.url(request))
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let payload: BrowseQuotesResponse = serde_json::from_str(&body)?;
        debug!("Skyscanner returned {} quotes", payload.quotes.len());

        Ok(offers_from_quotes(payload, request))
    }
}

fn offers_from_quotes(payload: BrowseQuotesResponse, request: &SearchRequest) -> Vec<FlightOffer> {
    let carriers: HashMap<u64, &str> = payload
        .carriers
        .iter()
        .map(|c| (c.carrier_id, c.name.as_str()))
        .collect();
    let places: HashMap<u64, &str> = payload
        .places
        .iter()
        .filter_map(|p| p.iata_code.as_deref().map(|code| (p.place_id, code)))
        .collect();

    let currency = request.currency_code().to_string();

    let round_trip = match (request.trip_type, request.return_date) {
        (TripType::RoundTrip, Some(return_date)) => Some(return_date),
        _ => None,
    };

    let offers: Vec<FlightOffer> = payload
        .quotes
        .iter()
        .filter_map(|quote| {
            // A round trip needs both legs; outbound-only quotes are dropped
            let inbound = match (round_trip, &quote.inbound_leg) {
                (Some(return_date), Some(leg)) => Some(vec![quote_segment(
                    leg,
                    quote.direct,
                    &carriers,
                    &places,
                    &request.destination,
                    &request.origin,
                    return_date,
                )]),
                (Some(_), None) => return None,
                (None, _) => None,
            };
            let outbound = quote_segment(
                &quote.outbound_leg,
                quote.direct,
                &carriers,
                &places,
                &request.origin,
                &request.destination,
                request.departure_date,
            );

            Some(FlightOffer::new(
                format!("SKY-{}", quote.quote_id),
                quote.min_price,
                currency.clone(),
                vec![outbound],
                inbound,
                request.cabin_class,
                format!(
                    "https://www.skyscanner.com/transport/flights/{}/{}/{}/",
                    request.origin.to_ascii_lowercase(),
                    request.destination.to_ascii_lowercase(),
                    request.departure_date.format("%y%m%d"),
                ),
            ))
        })
        .collect();

    if offers.len() < payload.quotes.len() {
        debug!(
            "Dropped {} one-way quotes from a round-trip search",
            payload.quotes.len() - offers.len()
        );
    }
    offers
}

/// Browse quotes carry a date but no schedule, so arrival equals departure.
fn quote_segment(
    leg: &QuoteLeg,
    direct: bool,
    carriers: &HashMap<u64, &str>,
    places: &HashMap<u64, &str>,
    origin: &str,
    destination: &str,
    fallback_date: NaiveDate,
) -> FlightSegment {
    let departure = parse_quote_date(&leg.departure_date)
        .unwrap_or_else(|| fallback_date.and_time(NaiveTime::MIN).and_utc());
    let carrier_id = leg.carrier_ids.first().copied();
    let carrier = carrier_id
        .and_then(|id| carriers.get(&id).copied())
        .unwrap_or("Unknown carrier");

    FlightSegment::new(
        places.get(&leg.origin_id).copied().unwrap_or(origin).to_string(),
        places.get(&leg.destination_id).copied().unwrap_or(destination).to_string(),
        departure,
        departure,
        carrier.to_string(),
        carrier_id.map(|id| id.to_string()).unwrap_or_default(),
        if direct { 0 } else { 1 },
    )
}

fn parse_quote_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}
