use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use concierge_core::repository::{AnalyticsSink, CacheStore, InsightStore};
use concierge_core::{
    AIInsightResult, CabinClass, CoreError, FlightOffer, OfferSource, PassengerCounts,
    PriceStatistics, SearchAnalyticsRecord, SearchContext, SearchRequest, TripType,
};
use concierge_store::app_config::{Config, InsightMode};
use concierge_store::Backends;

use crate::enrichment::{EnrichmentService, FallbackMode};
use crate::llm::{LlmClient, OpenAiClient};
use crate::quotes::{QuoteAdapter, QuoteClient, QuoteError, QuoteProvider};
use crate::skyscanner::SkyscannerClient;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] CoreError),
    #[error(transparent)]
    Upstream(#[from] QuoteError),
    #[error("Search failed: {0}")]
    Internal(String),
}

/// Knobs the orchestrator reads on every search
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub cache_enabled: bool,
    pub cache_ttl: chrono::Duration,
    pub insights_enabled: bool,
    pub insight_mode: InsightMode,
    pub analytics_enabled: bool,
    pub default_currency: String,
    pub default_locale: String,
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_enabled: config.cache.enabled,
            cache_ttl: config.cache.ttl(),
            insights_enabled: config.insights.enabled,
            insight_mode: config.insights.mode,
            analytics_enabled: config.analytics.enabled,
            default_currency: config.search.default_currency.clone(),
            default_locale: config.search.default_locale.clone(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub search_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub passengers: PassengerCounts,
    pub cabin_class: CabinClass,
    pub trip_type: TripType,
    pub currency: String,
    pub search_duration_ms: u64,
    pub results_count: usize,
    pub cached: bool,
    pub offer_source: OfferSource,
}

/// Cheaper options listed after the best deal
const ALTERNATIVES: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct FlightSearchResponse {
    pub search_id: Uuid,
    /// Cheapest first
    pub flights: Vec<FlightOffer>,
    pub best_deal: Option<FlightOffer>,
    pub alternatives: Vec<FlightOffer>,
    pub search_metadata: SearchMetadata,
    pub ai_insights: Option<AIInsightResult>,
}

/// Insights for a route asked for without running a full search
#[derive(Debug, Clone, Serialize)]
pub struct RouteInsights {
    #[serde(flatten)]
    pub insight: AIInsightResult,
    pub statistics: Option<PriceStatistics>,
}

/// Runs one search end to end: cache, quotes, insights, analytics.
pub struct SearchOrchestrator {
    cache: Arc<dyn CacheStore>,
    quotes: Arc<dyn QuoteProvider>,
    enrichment: Arc<EnrichmentService>,
    insights: Arc<dyn InsightStore>,
    analytics: Arc<dyn AnalyticsSink>,
    settings: SearchSettings,
}

impl SearchOrchestrator {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        quotes: Arc<dyn QuoteProvider>,
        enrichment: Arc<EnrichmentService>,
        insights: Arc<dyn InsightStore>,
        analytics: Arc<dyn AnalyticsSink>,
        settings: SearchSettings,
    ) -> Self {
        Self { cache, quotes, enrichment, insights, analytics, settings }
    }

    /// Wire the configured upstream clients over the given backends.
    ///
    /// A client that cannot be built is logged and left out, which puts the
    /// service on mock quotes or rule-based insights.
    pub fn from_config(config: &Config, backends: &Backends) -> Self {
        let quote_client: Option<Arc<dyn QuoteClient>> =
            match SkyscannerClient::from_config(&config.quotes) {
                Ok(client) => client.map(|c| Arc::new(c) as Arc<dyn QuoteClient>),
                Err(e) => {
                    warn!("Quote client unavailable, serving mock offers: {}", e);
                    None
                }
            };
        if quote_client.is_none() {
            info!("Flight quotes come from the mock generator");
        }

        let llm: Option<Arc<dyn LlmClient>> = match OpenAiClient::from_config(&config.llm) {
            Ok(client) => client.map(|c| Arc::new(c) as Arc<dyn LlmClient>),
            Err(e) => {
                warn!("Insight model unavailable: {}", e);
                None
            }
        };
        if llm.is_none() {
            info!("No insight model configured, insights are rule-based");
        }

        Self::new(
            backends.cache.clone(),
            Arc::new(QuoteAdapter::new(quote_client, config.quotes.failure_policy)),
            Arc::new(EnrichmentService::new(llm)),
            backends.insights.clone(),
            backends.analytics.clone(),
            SearchSettings::from_config(config),
        )
    }

    pub fn quotes_live(&self) -> bool {
        self.quotes.is_live()
    }

    pub fn insights_available(&self) -> bool {
        self.enrichment.is_available()
    }

    pub async fn search(
        &self,
        request: SearchRequest,
        context: SearchContext,
    ) -> Result<FlightSearchResponse, SearchError> {
        let request =
            request.normalized(&self.settings.default_currency, &self.settings.default_locale)?;

        let search_id = Uuid::new_v4();
        let started = Instant::now();
        let cache_key = request.cache_key();

        let (offers, offer_source) = self.offers_for(&request, &cache_key).await?;
        let search_duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "Search {} {}-{} returned {} offers from {} in {}ms",
            search_id,
            request.origin,
            request.destination,
            offers.len(),
            offer_source.as_str(),
            search_duration_ms
        );

        let search_metadata = SearchMetadata {
            search_id,
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            departure_date: request.departure_date,
            return_date: request.return_date,
            passengers: request.passengers(),
            cabin_class: request.cabin_class,
            trip_type: request.trip_type,
            currency: request.currency_code().to_string(),
            search_duration_ms,
            results_count: offers.len(),
            cached: offer_source == OfferSource::Cache,
            offer_source,
        };

        let ai_insights = self.enrich(search_id, &offers, &request).await;

        if self.settings.analytics_enabled {
            let record = SearchAnalyticsRecord::new(
                search_id,
                &request,
                &context,
                offers.len(),
                search_duration_ms,
                offer_source,
            );
            let analytics = self.analytics.clone();
            tokio::spawn(async move {
                if let Err(e) = analytics.record(&record).await {
                    warn!("Failed to store analytics for {}: {}", record.search_id, e);
                }
            });
        }

        let best_deal = offers.first().cloned();
        let alternatives = offers.iter().skip(1).take(ALTERNATIVES).cloned().collect();

        Ok(FlightSearchResponse {
            search_id,
            flights: offers,
            best_deal,
            alternatives,
            search_metadata,
            ai_insights,
        })
    }

    /// Cached offers when fresh, else a quote fetch that refills the cache.
    /// Fetched offers are sorted by price before they are cached.
    async fn offers_for(
        &self,
        request: &SearchRequest,
        cache_key: &str,
    ) -> Result<(Vec<FlightOffer>, OfferSource), SearchError> {
        let cached_offers = if self.settings.cache_enabled {
            match self.cache.get(cache_key).await {
                Ok(hit) => hit,
                Err(e) => {
                    warn!("Cache read failed for {}, treating as miss: {}", cache_key, e);
                    None
                }
            }
        } else {
            None
        };

        let (offers, offer_source) = match cached_offers {
            Some(offers) => {
                debug!("Cache hit for {}", cache_key);
                (offers, OfferSource::Cache)
            }
            None => {
                let mut batch = self.quotes.fetch(request).await?;
                batch.offers.sort_by(|a, b| a.price.total_cmp(&b.price));
                let source = batch.offer_source();
                if self.settings.cache_enabled && !batch.offers.is_empty() {
                    if let Err(e) = self
                        .cache
                        .put(cache_key, &batch.offers, self.settings.cache_ttl)
                        .await
                    {
                        warn!("Cache write failed for {}: {}", cache_key, e);
                    }
                }
                (batch.offers, source)
            }
        };

        Ok((offers, offer_source))
    }

    /// Insights for a route and date, computed on demand.
    ///
    /// Uses the same cache and quote path as a search but records no
    /// analytics and stores nothing under the returned id.
    pub async fn route_insights(&self, request: SearchRequest) -> Result<RouteInsights, SearchError> {
        let request =
            request.normalized(&self.settings.default_currency, &self.settings.default_locale)?;
        let (offers, offer_source) = self.offers_for(&request, &request.cache_key()).await?;

        debug!(
            "Route insights {}-{} over {} offers from {}",
            request.origin,
            request.destination,
            offers.len(),
            offer_source.as_str()
        );

        let insight = self
            .enrichment
            .analyze(Uuid::new_v4(), &offers, &request, FallbackMode::RuleBased)
            .await
            .into_result()
            .ok_or_else(|| SearchError::Internal("no insight produced".to_string()))?;

        Ok(RouteInsights {
            insight,
            statistics: PriceStatistics::from_offers(&offers),
        })
    }

    /// Inline mode answers with the insight; deferred mode stores it later.
    async fn enrich(
        &self,
        search_id: Uuid,
        offers: &[FlightOffer],
        request: &SearchRequest,
    ) -> Option<AIInsightResult> {
        if !self.settings.insights_enabled {
            return None;
        }

        match self.settings.insight_mode {
            InsightMode::Inline => {
                let result = self
                    .enrichment
                    .analyze(search_id, offers, request, FallbackMode::Absent)
                    .await
                    .into_result()?;
                if let Err(e) = self.insights.save(&result).await {
                    warn!("Failed to store insights for {}: {}", search_id, e);
                }
                Some(result)
            }
            InsightMode::Deferred => {
                let enrichment = self.enrichment.clone();
                let store = self.insights.clone();
                let offers = offers.to_vec();
                let request = request.clone();
                tokio::spawn(async move {
                    let outcome = enrichment
                        .analyze(search_id, &offers, &request, FallbackMode::RuleBased)
                        .await;
                    if let Some(result) = outcome.into_result() {
                        if let Err(e) = store.save(&result).await {
                            warn!("Failed to store insights for {}: {}", search_id, e);
                        }
                    }
                });
                None
            }
        }
    }

    /// Stored insight for a search, if any
    pub async fn insight(&self, search_id: Uuid) -> Result<Option<AIInsightResult>, SearchError> {
        self.insights
            .get(search_id)
            .await
            .map_err(|e| SearchError::Internal(e.to_string()))
    }
}
