use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::{CoreError, CoreResult};

const MAX_PASSENGERS: u32 = 9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    #[default]
    Economy,
    Business,
    First,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }

    /// Fare multiplier applied on top of economy base prices
    pub fn price_multiplier(&self) -> f64 {
        match self {
            CabinClass::Economy => 1.0,
            CabinClass::Business => 2.5,
            CabinClass::First => 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    #[default]
    OneWay,
    RoundTrip,
    MultiCity,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::OneWay => "one_way",
            TripType::RoundTrip => "round_trip",
            TripType::MultiCity => "multi_city",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassengerCounts {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl PassengerCounts {
    pub fn total(&self) -> u32 {
        self.adults
            .saturating_add(self.children)
            .saturating_add(self.infants)
    }

    /// Infants travel on a lap and do not hold a paid seat
    pub fn seated(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

/// A flight search as submitted by a caller.
///
/// `currency` and `locale` may be omitted by the caller; [`SearchRequest::normalized`]
/// fills them from the configured defaults before the request is used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
    #[serde(default)]
    pub cabin_class: CabinClass,
    #[serde(default)]
    pub trip_type: TripType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Free-text preferences forwarded to the enrichment service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
    /// Upper spend the caller has in mind, in `currency`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn default_adults() -> u32 {
    1
}

impl SearchRequest {
    pub fn one_way(origin: &str, destination: &str, departure_date: NaiveDate) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date,
            return_date: None,
            adults: 1,
            children: 0,
            infants: 0,
            cabin_class: CabinClass::Economy,
            trip_type: TripType::OneWay,
            currency: None,
            locale: None,
            preferences: None,
            budget: None,
            user_id: None,
        }
    }

    pub fn passengers(&self) -> PassengerCounts {
        PassengerCounts {
            adults: self.adults,
            children: self.children,
            infants: self.infants,
        }
    }

    pub fn currency_code(&self) -> &str {
        self.currency.as_deref().unwrap_or("USD")
    }

    pub fn locale_code(&self) -> &str {
        self.locale.as_deref().unwrap_or("en-US")
    }

    /// Validate the request and return a canonical copy with upper-cased codes
    /// and defaults applied.
    pub fn normalized(mut self, default_currency: &str, default_locale: &str) -> CoreResult<Self> {
        self.origin = normalize_airport(&self.origin, "origin")?;
        self.destination = normalize_airport(&self.destination, "destination")?;

        if self.origin == self.destination {
            return Err(CoreError::ValidationError(
                "origin and destination must differ".to_string(),
            ));
        }

        if self.trip_type == TripType::RoundTrip && self.return_date.is_none() {
            return Err(CoreError::ValidationError(
                "return_date is required for round_trip searches".to_string(),
            ));
        }

        if let Some(return_date) = self.return_date {
            if return_date < self.departure_date {
                return Err(CoreError::ValidationError(
                    "return_date must not be before departure_date".to_string(),
                ));
            }
        }

        let passengers = self.passengers();
        if [passengers.adults, passengers.children, passengers.infants]
            .iter()
            .any(|count| *count > MAX_PASSENGERS)
        {
            return Err(CoreError::ValidationError(format!(
                "a search may include at most {} passengers",
                MAX_PASSENGERS
            )));
        }
        if passengers.adults < 1 {
            return Err(CoreError::ValidationError(
                "at least one adult passenger is required".to_string(),
            ));
        }
        if passengers.infants > passengers.adults {
            return Err(CoreError::ValidationError(
                "each infant must travel with an adult".to_string(),
            ));
        }
        if passengers.total() > MAX_PASSENGERS {
            return Err(CoreError::ValidationError(format!(
                "a search may include at most {} passengers",
                MAX_PASSENGERS
            )));
        }

        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(CoreError::ValidationError(
                    "budget must be a positive amount".to_string(),
                ));
            }
        }

        let currency = self
            .currency
            .take()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_currency.to_string());
        let currency = currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::ValidationError(format!(
                "invalid currency code: {}",
                currency
            )));
        }
        self.currency = Some(currency);

        let locale = self
            .locale
            .take()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| default_locale.to_string());
        self.locale = Some(locale.trim().to_string());

        Ok(self)
    }

    /// The search-defining fields as a loosely-typed mapping.
    ///
    /// Caller metadata (`preferences`, `budget`, `user_id`) is left out so it
    /// does not fragment the cache.
    pub fn search_params(&self) -> Map<String, Value> {
        let mut params = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        params.remove("preferences");
        params.remove("budget");
        params.remove("user_id");
        params
    }

    pub fn cache_key(&self) -> String {
        crate::cache_key::cache_key_for_params(&self.search_params())
    }
}

fn normalize_airport(code: &str, field: &str) -> CoreResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "{} must be a three-letter IATA code",
            field
        )));
    }
    Ok(code)
}

/// Caller metadata captured at the HTTP boundary
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_search_request_deserialization_defaults() {
        let json = r#"
            {
                "origin": "jfk",
                "destination": "LHR",
                "departure_date": "2025-06-01"
            }
        "#;
        let req: SearchRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.adults, 1);
        assert_eq!(req.children, 0);
        assert_eq!(req.cabin_class, CabinClass::Economy);
        assert_eq!(req.trip_type, TripType::OneWay);
        assert_eq!(req.departure_date, date(2025, 6, 1));
    }

    #[test]
    fn test_missing_departure_date_is_rejected() {
        let json = r#"{"origin": "JFK", "destination": "LHR", "adults": 1}"#;
        let result: Result<SearchRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_normalized_applies_defaults() {
        let req = SearchRequest::one_way("jfk", "lhr", date(2025, 6, 1))
            .normalized("EUR", "en-GB")
            .unwrap();
        assert_eq!(req.origin, "JFK");
        assert_eq!(req.destination, "LHR");
        assert_eq!(req.currency_code(), "EUR");
        assert_eq!(req.locale_code(), "en-GB");
    }

    #[test]
    fn test_round_trip_requires_return_date() {
        let mut req = SearchRequest::one_way("JFK", "LHR", date(2025, 6, 1));
        req.trip_type = TripType::RoundTrip;
        let err = req.normalized("USD", "en-US").unwrap_err();
        assert!(err.to_string().contains("return_date"));
    }

    #[test]
    fn test_return_before_departure_is_rejected() {
        let mut req = SearchRequest::one_way("JFK", "LHR", date(2025, 6, 10));
        req.trip_type = TripType::RoundTrip;
        req.return_date = Some(date(2025, 6, 1));
        assert!(req.normalized("USD", "en-US").is_err());
    }

    #[test]
    fn test_passenger_rules() {
        let mut req = SearchRequest::one_way("JFK", "LHR", date(2025, 6, 1));
        req.adults = 0;
        assert!(req.clone().normalized("USD", "en-US").is_err());

        req.adults = 1;
        req.infants = 2;
        assert!(req.clone().normalized("USD", "en-US").is_err());

        req.adults = 8;
        req.infants = 0;
        req.children = 2;
        assert!(req.normalized("USD", "en-US").is_err());
    }

    #[test]
    fn test_oversized_passenger_counts_are_rejected() {
        let mut req = SearchRequest::one_way("JFK", "LHR", date(2025, 6, 1));
        req.adults = u32::MAX;
        req.children = 1;
        let err = req.normalized("USD", "en-US").unwrap_err();
        assert!(err.to_string().contains("at most 9 passengers"));

        let counts = PassengerCounts { adults: u32::MAX, children: 1, infants: 1 };
        assert_eq!(counts.total(), u32::MAX);
        assert_eq!(counts.seated(), u32::MAX);
    }

    #[test]
    fn test_budget_must_be_positive() {
        let mut req = SearchRequest::one_way("JFK", "LHR", date(2025, 6, 1));
        req.budget = Some(0.0);
        assert!(req.clone().normalized("USD", "en-US").is_err());

        req.budget = Some(750.0);
        let req = req.normalized("USD", "en-US").unwrap();
        assert_eq!(req.budget, Some(750.0));
    }

    #[test]
    fn test_invalid_airport_code() {
        let req = SearchRequest::one_way("JFKX", "LHR", date(2025, 6, 1));
        assert!(req.normalized("USD", "en-US").is_err());
    }

    #[test]
    fn test_cache_key_ignores_caller_metadata() {
        let base = SearchRequest::one_way("JFK", "LHR", date(2025, 6, 1))
            .normalized("USD", "en-US")
            .unwrap();
        let mut with_meta = base.clone();
        with_meta.preferences = Some("window seat".to_string());
        with_meta.budget = Some(800.0);
        with_meta.user_id = Some("user-1".to_string());

        assert_eq!(base.cache_key(), with_meta.cache_key());

        let mut other = base.clone();
        other.cabin_class = CabinClass::Business;
        assert_ne!(base.cache_key(), other.cache_key());
    }
}
