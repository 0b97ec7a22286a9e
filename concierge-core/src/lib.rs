pub mod airports;
pub mod analytics;
pub mod cache_key;
pub mod insight;
pub mod offer;
pub mod repository;
pub mod search;

pub use analytics::SearchAnalyticsRecord;
pub use insight::{AIInsightResult, InsightSource, PriceAnalysis, PriceStatistics, TimingAnalysis};
pub use offer::{CacheEntry, FlightOffer, FlightSegment, OfferSource};
pub use search::{CabinClass, PassengerCounts, SearchContext, SearchRequest, TripType};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
