use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use concierge_core::insight::round_cents;
use concierge_core::{FlightOffer, FlightSegment, SearchRequest, TripType};

const CARRIERS: &[(&str, &str)] = &[
    ("American Airlines", "AA"),
    ("Delta Airlines", "DL"),
    ("United Airlines", "UA"),
    ("British Airways", "BA"),
    ("JetBlue Airways", "B6"),
    ("Lufthansa", "LH"),
];

const BASE_PRICES: &[f64] = &[299.0, 349.0, 399.0, 449.0, 499.0, 549.0, 599.0];

const HUBS: &[&str] = &["ORD", "ATL", "DFW", "DEN", "FRA"];

/// Offers below this index fly direct
const DIRECT_OFFERS: usize = 3;

/// Deterministic stand-in for the live quote source.
///
/// Output depends only on the request and the seed, so the same search keeps
/// producing the same offers across cache misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockQuoteGenerator;

impl MockQuoteGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Seed taken from the leading 64 bits of the request's cache key
    pub fn default_seed(request: &SearchRequest) -> u64 {
        let key = request.cache_key();
        u64::from_str_radix(&key[..16.min(key.len())], 16).unwrap_or(0)
    }

    pub fn generate(&self, request: &SearchRequest, seed: u64) -> Vec<FlightOffer> {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(5..=8);
        let carrier_offset = (seed % CARRIERS.len() as u64) as usize;
        let seated = request.passengers().seated().max(1) as f64;
        let currency = request.currency_code().to_string();
        let hub = HUBS
            .iter()
            .find(|h| **h != request.origin && **h != request.destination)
            .copied()
            .unwrap_or("ORD");

        let return_date = match request.trip_type {
            TripType::RoundTrip => request.return_date,
            _ => None,
        };

        (0..count)
            .map(|index| {
                let (carrier, code) = CARRIERS[(index + carrier_offset) % CARRIERS.len()];
                let number: u32 = rng.gen_range(100..1000);
                let block_minutes: i64 = rng.gen_range(90..=600);
                let direct = index < DIRECT_OFFERS;

                let departure = at(request.departure_date, &mut rng);
                let outbound = leg(
                    &request.origin,
                    &request.destination,
                    hub,
                    departure,
                    block_minutes,
                    direct,
                    carrier,
                    code,
                    number,
                    &mut rng,
                );

                let inbound = return_date.map(|date| {
                    let departure = at(date, &mut rng);
                    leg(
                        &request.destination,
                        &request.origin,
                        hub,
                        departure,
                        block_minutes,
                        direct,
                        carrier,
                        code,
                        number + 1,
                        &mut rng,
                    )
                });

                let price = round_cents(
                    BASE_PRICES[index % BASE_PRICES.len()]
                        * request.cabin_class.price_multiplier()
                        * seated,
                );

                FlightOffer::new(
                    format!("MOCK-{:016x}-{:02}", seed, index + 1),
                    price,
                    currency.clone(),
                    outbound,
                    inbound,
                    request.cabin_class,
                    booking_link(request, return_date),
                )
            })
            .collect()
    }
}

fn at(date: NaiveDate, rng: &mut StdRng) -> DateTime<Utc> {
    let hour: i64 = rng.gen_range(6..22);
    let minute: i64 = [0, 15, 30, 45][rng.gen_range(0..4)];
    (date.and_time(NaiveTime::MIN) + Duration::minutes(hour * 60 + minute)).and_utc()
}

#[allow(clippy::too_many_arguments)]
fn leg(
    origin: &str,
    destination: &str,
    hub: &str,
    departure: DateTime<Utc>,
    block_minutes: i64,
    direct: bool,
    carrier: &str,
    code: &str,
    number: u32,
    rng: &mut StdRng,
) -> Vec<FlightSegment> {
    if direct {
        return vec![FlightSegment::new(
            origin.to_string(),
            destination.to_string(),
            departure,
            departure + Duration::minutes(block_minutes),
            carrier.to_string(),
            format!("{}{}", code, number),
            0,
        )];
    }

    let first = block_minutes / 2;
    let layover: i64 = rng.gen_range(60..=150);
    let connect = departure + Duration::minutes(first + layover);

    vec![
        FlightSegment::new(
            origin.to_string(),
            hub.to_string(),
            departure,
            departure + Duration::minutes(first),
            carrier.to_string(),
            format!("{}{}", code, number),
            0,
        ),
        FlightSegment::new(
            hub.to_string(),
            destination.to_string(),
            connect,
            connect + Duration::minutes(block_minutes - first),
            carrier.to_string(),
            format!("{}{}", code, number + 1000),
            0,
        ),
    ]
}

fn booking_link(request: &SearchRequest, return_date: Option<NaiveDate>) -> String {
    let mut link = format!(
        "https://www.skyscanner.com/transport/flights/{}/{}/{}/",
        request.origin.to_ascii_lowercase(),
        request.destination.to_ascii_lowercase(),
        request.departure_date.format("%y%m%d"),
    );
    if let Some(date) = return_date {
        link.push_str(&format!("{}/", date.format("%y%m%d")));
    }
    link
}
