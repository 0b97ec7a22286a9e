pub mod enrichment;
pub mod generator;
pub mod llm;
pub mod orchestrator;
pub mod quotes;
pub mod skyscanner;

pub use enrichment::{Enrichment, EnrichmentService, FallbackMode};
pub use generator::MockQuoteGenerator;
pub use llm::{ChatMessage, LlmClient, LlmError, OpenAiClient};
pub use orchestrator::{
    FlightSearchResponse, RouteInsights, SearchError, SearchMetadata, SearchOrchestrator,
    SearchSettings,
};
pub use quotes::{QuoteAdapter, QuoteBatch, QuoteClient, QuoteError, QuoteProvider, QuoteSource};
pub use skyscanner::SkyscannerClient;
