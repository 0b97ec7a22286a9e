use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};

use crate::search::CabinClass;

/// One non-stop (or technical-stop) flight between two airports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightSegment {
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub carrier: String,
    pub flight_number: String,
    pub duration: String,
    pub stops: u32,
}

impl FlightSegment {
    pub fn new(
        origin: String,
        destination: String,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
        carrier: String,
        flight_number: String,
        stops: u32,
    ) -> Self {
        let duration = format_duration(arrival_time - departure_time);
        Self {
            origin,
            destination,
            departure_time,
            arrival_time,
            carrier,
            flight_number,
            duration,
            stops,
        }
    }
}

/// A priced, bookable itinerary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightOffer {
    pub id: String,
    pub price: f64,
    pub currency: String,
    pub outbound_segments: Vec<FlightSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_segments: Option<Vec<FlightSegment>>,
    pub total_duration: String,
    pub stops: u32,
    pub cabin_class: CabinClass,
    pub booking_link: String,
}

impl FlightOffer {
    /// Build an offer, deriving `stops` and `total_duration` from the segments.
    ///
    /// Stops per leg are the connections between its segments plus any
    /// technical stops inside them; the offer reports the worst leg.
    pub fn new(
        id: String,
        price: f64,
        currency: String,
        outbound_segments: Vec<FlightSegment>,
        inbound_segments: Option<Vec<FlightSegment>>,
        cabin_class: CabinClass,
        booking_link: String,
    ) -> Self {
        let inbound_segments = inbound_segments.filter(|segments| !segments.is_empty());
        let outbound_stops = leg_stops(&outbound_segments);
        let inbound_stops = inbound_segments.as_deref().map(leg_stops).unwrap_or(0);

        let total_duration = leg_elapsed(&outbound_segments)
            .map(format_duration)
            .unwrap_or_else(|| "0h 0m".to_string());

        Self {
            id,
            price,
            currency,
            outbound_segments,
            inbound_segments,
            total_duration,
            stops: outbound_stops.max(inbound_stops),
            cabin_class,
            booking_link,
        }
    }

    /// Marketing carrier of the first outbound segment
    pub fn carrier(&self) -> Option<&str> {
        self.outbound_segments.first().map(|s| s.carrier.as_str())
    }

    pub fn is_direct(&self) -> bool {
        self.stops == 0
    }
}

pub fn leg_stops(segments: &[FlightSegment]) -> u32 {
    if segments.is_empty() {
        return 0;
    }
    let connections = segments.len() as u32 - 1;
    connections + segments.iter().map(|s| s.stops).sum::<u32>()
}

fn leg_elapsed(segments: &[FlightSegment]) -> Option<Duration> {
    let first = segments.first()?;
    let last = segments.last()?;
    Some(last.arrival_time - first.departure_time)
}

pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Where the offers of a search response came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferSource {
    Cache,
    Live,
    Mock,
}

impl OfferSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferSource::Cache => "cache",
            OfferSource::Live => "live",
            OfferSource::Mock => "mock",
        }
    }
}

/// Cached offers for one canonical search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub offers: Vec<FlightOffer>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(cache_key: String, offers: Vec<FlightOffer>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            cache_key,
            offers,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// An entry is only usable while its expiry lies strictly in the future
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn segment(origin: &str, destination: &str, dep_hour: u32, arr_hour: u32, stops: u32) -> FlightSegment {
        FlightSegment::new(
            origin.to_string(),
            destination.to_string(),
            Utc.with_ymd_and_hms(2025, 6, 1, dep_hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, arr_hour, 30, 0).unwrap(),
            "Delta Airlines".to_string(),
            "DL100".to_string(),
            stops,
        )
    }

    #[test]
    fn test_direct_offer_has_zero_stops() {
        let offer = FlightOffer::new(
            "FL001".to_string(),
            299.0,
            "USD".to_string(),
            vec![segment("JFK", "LHR", 8, 15, 0)],
            None,
            CabinClass::Economy,
            "https://example.com".to_string(),
        );
        assert_eq!(offer.stops, 0);
        assert!(offer.is_direct());
        assert_eq!(offer.total_duration, "7h 30m");
        assert_eq!(offer.outbound_segments[0].duration, "7h 30m");
    }

    #[test]
    fn test_stops_take_the_worst_leg() {
        let offer = FlightOffer::new(
            "FL002".to_string(),
            499.0,
            "USD".to_string(),
            vec![segment("JFK", "LHR", 8, 15, 0)],
            Some(vec![segment("LHR", "BOS", 8, 12, 1), segment("BOS", "JFK", 14, 15, 0)]),
            CabinClass::Economy,
            "https://example.com".to_string(),
        );
        assert_eq!(offer.stops, 2);
        assert_eq!(offer.carrier(), Some("Delta Airlines"));
    }

    #[test]
    fn test_empty_inbound_is_dropped() {
        let offer = FlightOffer::new(
            "FL003".to_string(),
            299.0,
            "USD".to_string(),
            vec![segment("JFK", "LHR", 8, 15, 0)],
            Some(vec![]),
            CabinClass::Economy,
            "https://example.com".to_string(),
        );
        assert!(offer.inbound_segments.is_none());
    }

    #[test]
    fn test_cache_entry_freshness_is_strict() {
        let entry = CacheEntry::new("k".to_string(), vec![], Duration::hours(1));
        assert!(entry.is_fresh(entry.created_at));
        assert!(!entry.is_fresh(entry.expires_at));
        assert!(!entry.is_fresh(entry.expires_at + Duration::seconds(1)));
    }
}
