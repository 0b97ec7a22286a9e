use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use concierge_core::{FlightOffer, OfferSource, SearchRequest};
use concierge_store::app_config::FailurePolicy;

use crate::generator::MockQuoteGenerator;

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Quote provider is not configured")]
    MissingCredentials,
    #[error("Quote provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Quote provider answered with status {0}")]
    Status(u16),
    #[error("Quote provider payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteSource {
    Live,
    /// Mock offers served because the live source could not answer
    Fallback { reason: String },
}

#[derive(Debug, Clone)]
pub struct QuoteBatch {
    pub offers: Vec<FlightOffer>,
    pub source: QuoteSource,
}

impl QuoteBatch {
    pub fn offer_source(&self) -> OfferSource {
        match self.source {
            QuoteSource::Live => OfferSource::Live,
            QuoteSource::Fallback { .. } => OfferSource::Mock,
        }
    }
}

/// Anything the orchestrator can ask for flight offers
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch(&self, request: &SearchRequest) -> Result<QuoteBatch, QuoteError>;

    /// Whether a live upstream is configured
    fn is_live(&self) -> bool;
}

/// A live upstream quote source
#[async_trait]
pub trait QuoteClient: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, QuoteError>;
}

/// Live quotes when possible, deterministic mock offers otherwise
pub struct QuoteAdapter {
    client: Option<Arc<dyn QuoteClient>>,
    generator: MockQuoteGenerator,
    policy: FailurePolicy,
}

impl QuoteAdapter {
    pub fn new(client: Option<Arc<dyn QuoteClient>>, policy: FailurePolicy) -> Self {
        Self {
            client,
            generator: MockQuoteGenerator::new(),
            policy,
        }
    }

    fn fallback(&self, request: &SearchRequest, error: QuoteError) -> Result<QuoteBatch, QuoteError> {
        if self.policy == FailurePolicy::Strict {
            return Err(error);
        }

        let seed = MockQuoteGenerator::default_seed(request);
        Ok(QuoteBatch {
            offers: self.generator.generate(request, seed),
            source: QuoteSource::Fallback {
                reason: error.to_string(),
            },
        })
    }
}

#[async_trait]
impl QuoteProvider for QuoteAdapter {
    async fn fetch(&self, request: &SearchRequest) -> Result<QuoteBatch, QuoteError> {
        let Some(client) = &self.client else {
            info!(
                "No quote provider configured, serving mock offers for {}-{}",
                request.origin, request.destination
            );
            return self.fallback(request, QuoteError::MissingCredentials);
        };

        match client.search(request).await {
            Ok(offers) => Ok(QuoteBatch {
                offers,
                source: QuoteSource::Live,
            }),
            Err(e) => {
                warn!(
                    "Quote provider failed for {}-{}: {}",
                    request.origin, request.destination, e
                );
                self.fallback(request, e)
            }
        }
    }

    fn is_live(&self) -> bool {
        self.client.is_some()
    }
}
