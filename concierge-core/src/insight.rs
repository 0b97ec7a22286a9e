use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::offer::FlightOffer;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    /// Produced by the language model
    Llm,
    /// Synthesized locally from offer arithmetic
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AIInsightResult {
    pub search_id: Uuid,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_analysis: Option<PriceAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_analysis: Option<TimingAnalysis>,
    pub generated_at: DateTime<Utc>,
    pub source: InsightSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceAnalysis {
    #[serde(default)]
    pub price_range_quality: String,
    #[serde(default)]
    pub value_assessment: String,
    #[serde(default)]
    pub price_trends: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<PriceStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TimingAnalysis {
    #[serde(default)]
    pub best_booking_time: String,
    #[serde(default)]
    pub seasonal_factors: String,
    #[serde(default)]
    pub flexibility_benefits: String,
}

/// Summary arithmetic over an offer set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceStatistics {
    pub total_options: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub average_price: f64,
    pub direct_flights: usize,
    pub connecting_flights: usize,
    pub carriers: Vec<String>,
}

impl PriceStatistics {
    /// Returns `None` for an empty offer set.
    pub fn from_offers(offers: &[FlightOffer]) -> Option<Self> {
        if offers.is_empty() {
            return None;
        }

        let prices: Vec<f64> = offers.iter().map(|o| o.price).collect();
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = prices.iter().sum::<f64>() / prices.len() as f64;

        let direct = offers.iter().filter(|o| o.is_direct()).count();
        let carriers: BTreeSet<String> = offers
            .iter()
            .filter_map(|o| o.carrier().map(str::to_string))
            .collect();

        Some(Self {
            total_options: offers.len(),
            min_price: round_cents(min),
            max_price: round_cents(max),
            average_price: round_cents(average),
            direct_flights: direct,
            connecting_flights: offers.len() - direct,
            carriers: carriers.into_iter().collect(),
        })
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
