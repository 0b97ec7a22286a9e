//! Travel insights for a set of offers.
//!
//! The language model is tried first. When it is missing or its answer is
//! unusable, the caller picks between a rule-based summary computed from the
//! offers and no insight at all.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use concierge_core::{
    AIInsightResult, FlightOffer, InsightSource, PriceAnalysis, PriceStatistics, SearchRequest,
    TimingAnalysis,
};

use crate::llm::{ChatMessage, LlmClient};

/// Most bullets kept per list when scanning free text
const MAX_BULLETS: usize = 3;

/// Offers shown to the model
const SAMPLE_OFFERS: usize = 5;

const SYSTEM_PROMPT: &str = "You are an expert travel consultant. Analyse flight search \
results and answer with a JSON object holding the keys \"insights\" (list of strings), \
\"recommendations\" (list of strings), \"price_analysis\" (object with \
price_range_quality, value_assessment, price_trends) and \"timing_analysis\" (object with \
best_booking_time, seasonal_factors, flexibility_benefits). Keep every item to one sentence.";

/// What to do when the model cannot produce an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    RuleBased,
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Generated(AIInsightResult),
    Fallback(AIInsightResult),
    Absent,
}

impl Enrichment {
    pub fn into_result(self) -> Option<AIInsightResult> {
        match self {
            Enrichment::Generated(result) | Enrichment::Fallback(result) => Some(result),
            Enrichment::Absent => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelInsight {
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    price_analysis: Option<PriceAnalysis>,
    #[serde(default)]
    timing_analysis: Option<TimingAnalysis>,
}

pub struct EnrichmentService {
    llm: Option<Arc<dyn LlmClient>>,
}

impl EnrichmentService {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn analyze(
        &self,
        search_id: Uuid,
        offers: &[FlightOffer],
        request: &SearchRequest,
        fallback: FallbackMode,
    ) -> Enrichment {
        if let Some(llm) = &self.llm {
            let messages = build_messages(offers, request);
            match llm.complete(&messages).await {
                Ok(content) => match parse_model_content(search_id, &content, offers) {
                    Some(result) => return Enrichment::Generated(result),
                    None => warn!("Insight model answer for {} had no usable content", search_id),
                },
                Err(e) => warn!("Insight model call failed for {}: {}", search_id, e),
            }
        } else {
            debug!("No insight model configured");
        }

        match fallback {
            FallbackMode::RuleBased => {
                Enrichment::Fallback(rule_based_insight(search_id, offers, request))
            }
            FallbackMode::Absent => Enrichment::Absent,
        }
    }
}

fn build_messages(offers: &[FlightOffer], request: &SearchRequest) -> Vec<ChatMessage> {
    let samples: Vec<serde_json::Value> = offers
        .iter()
        .take(SAMPLE_OFFERS)
        .map(|offer| {
            serde_json::json!({
                "carrier": offer.carrier(),
                "price": offer.price,
                "currency": offer.currency,
                "stops": offer.stops,
                "duration": offer.total_duration,
                "departure_time": offer.outbound_segments.first().map(|s| s.departure_time),
            })
        })
        .collect();

    let context = serde_json::json!({
        "route": format!("{} to {}", request.origin, request.destination),
        "departure_date": request.departure_date,
        "return_date": request.return_date,
        "trip_type": request.trip_type.as_str(),
        "cabin_class": request.cabin_class.as_str(),
        "passengers": request.passengers(),
        "total_options": offers.len(),
        "statistics": PriceStatistics::from_offers(offers),
        "sample_offers": samples,
        "preferences": request.preferences,
        "budget": request.budget,
    });

    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Analyse these flight search results and give actionable advice:\n{}",
            context
        )),
    ]
}

/// Read the model's answer as structured JSON, else scan it for bullets.
pub fn parse_model_content(
    search_id: Uuid,
    content: &str,
    offers: &[FlightOffer],
) -> Option<AIInsightResult> {
    let body = strip_code_fence(content);

    let parsed = match serde_json::from_str::<ModelInsight>(body) {
        Ok(parsed) if !parsed.insights.is_empty() || !parsed.recommendations.is_empty() => parsed,
        _ => {
            let (insights, recommendations) = scan_bullets(content);
            if insights.is_empty() && recommendations.is_empty() {
                return None;
            }
            ModelInsight { insights, recommendations, ..ModelInsight::default() }
        }
    };

    let statistics = PriceStatistics::from_offers(offers);
    let price_analysis = match parsed.price_analysis {
        Some(mut analysis) => {
            analysis.statistics = analysis.statistics.or(statistics);
            Some(analysis)
        }
        None => statistics.map(|s| PriceAnalysis { statistics: Some(s), ..PriceAnalysis::default() }),
    };

    Some(AIInsightResult {
        search_id,
        insights: parsed.insights,
        recommendations: parsed.recommendations,
        price_analysis,
        timing_analysis: parsed.timing_analysis,
        generated_at: Utc::now(),
        source: InsightSource::Llm,
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Split bulleted lines into (insights, recommendations), at most three each.
pub fn scan_bullets(text: &str) -> (Vec<String>, Vec<String>) {
    let mut insights = Vec::new();
    let mut recommendations = Vec::new();

    for line in text.lines() {
        let Some(item) = bullet_text(line.trim()) else {
            continue;
        };
        let lower = item.to_lowercase();
        if lower.contains("recommend") || lower.contains("suggest") {
            if recommendations.len() < MAX_BULLETS {
                recommendations.push(item.to_string());
            }
        } else if insights.len() < MAX_BULLETS {
            insights.push(item.to_string());
        }
    }

    (insights, recommendations)
}

fn bullet_text(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .or_else(|| line.strip_prefix('•'))
    {
        rest
    } else {
        let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        line[digits..].strip_prefix('.')?
    };

    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Summary computed from the offers alone
pub fn rule_based_insight(
    search_id: Uuid,
    offers: &[FlightOffer],
    request: &SearchRequest,
) -> AIInsightResult {
    let Some(stats) = PriceStatistics::from_offers(offers) else {
        return AIInsightResult {
            search_id,
            insights: vec![
                "No flights available for this route. Please try different dates or destinations."
                    .to_string(),
            ],
            recommendations: Vec::new(),
            price_analysis: None,
            timing_analysis: None,
            generated_at: Utc::now(),
            source: InsightSource::Fallback,
        };
    };

    let currency = request.currency_code();
    let mut insights = vec![
        format!(
            "{} flights available from {} to {} with prices from {} {:.2} to {:.2}.",
            stats.total_options,
            request.origin,
            request.destination,
            currency,
            stats.min_price,
            stats.max_price
        ),
        format!("The average fare is {} {:.2}.", currency, stats.average_price),
        format!(
            "{} direct and {} connecting options across {} airline(s).",
            stats.direct_flights,
            stats.connecting_flights,
            stats.carriers.len()
        ),
    ];
    if let Some(budget) = request.budget {
        let within = offers.iter().filter(|o| o.price <= budget).count();
        insights.push(format!(
            "{} of {} options fit a budget of {} {:.2}.",
            within, stats.total_options, currency, budget
        ));
    }

    let mut recommendations = Vec::new();
    if let Some(cheapest) = offers.iter().min_by(|a, b| a.price.total_cmp(&b.price)) {
        recommendations.push(format!(
            "Best value: {} at {} {:.2} ({}).",
            cheapest.carrier().unwrap_or("unknown carrier"),
            currency,
            cheapest.price,
            describe_stops(cheapest.stops)
        ));
        if !cheapest.is_direct() {
            if let Some(direct) = offers
                .iter()
                .filter(|o| o.is_direct())
                .min_by(|a, b| a.price.total_cmp(&b.price))
            {
                recommendations.push(format!(
                    "The cheapest direct flight is {} at {} {:.2}.",
                    direct.carrier().unwrap_or("unknown carrier"),
                    currency,
                    direct.price
                ));
            }
        }
    }
    recommendations.push("Book early to lock in current fares.".to_string());
    recommendations.truncate(MAX_BULLETS);

    let spread = if stats.min_price > 0.0 {
        (stats.max_price - stats.min_price) / stats.min_price
    } else {
        0.0
    };
    let price_range_quality = if spread > 0.5 {
        "Wide price range; comparing options pays off."
    } else if spread > 0.2 {
        "Moderate price range across options."
    } else {
        "Prices are tightly clustered."
    };
    let below_average = if stats.average_price > 0.0 {
        (stats.average_price - stats.min_price) / stats.average_price * 100.0
    } else {
        0.0
    };

    let days_out = (request.departure_date - Utc::now().date_naive()).num_days();
    let best_booking_time = if days_out > 60 {
        "Fares are usually stable this far out; watch for sales."
    } else if days_out >= 21 {
        "This is typically a good window to book."
    } else {
        "Departure is close and fares tend to rise; book soon."
    };
    let seasonal_factors = match request.departure_date.month() {
        6..=8 | 12 => "Peak travel season; expect higher demand.",
        _ => "Off-peak period; demand is typically moderate.",
    };

    AIInsightResult {
        search_id,
        insights,
        recommendations,
        price_analysis: Some(PriceAnalysis {
            price_range_quality: price_range_quality.to_string(),
            value_assessment: format!(
                "The cheapest fare is {:.0}% below the average.",
                below_average
            ),
            price_trends: "Trend data is unavailable; figures reflect the current results."
                .to_string(),
            statistics: Some(stats),
        }),
        timing_analysis: Some(TimingAnalysis {
            best_booking_time: best_booking_time.to_string(),
            seasonal_factors: seasonal_factors.to_string(),
            flexibility_benefits: "Shifting departure by a day or two can lower the fare."
                .to_string(),
        }),
        generated_at: Utc::now(),
        source: InsightSource::Fallback,
    }
}

/// Stand-in served while nothing has been stored for a search
pub fn pending_insight(search_id: Uuid) -> AIInsightResult {
    AIInsightResult {
        search_id,
        insights: vec!["Insights for this search are not available yet.".to_string()],
        recommendations: vec!["Compare total travel time as well as price.".to_string()],
        price_analysis: None,
        timing_analysis: None,
        generated_at: Utc::now(),
        source: InsightSource::Fallback,
    }
}

fn describe_stops(stops: u32) -> String {
    match stops {
        0 => "direct".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    }
}
