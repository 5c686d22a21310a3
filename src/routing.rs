// Routing decision engine - explicit override first, then keyword/pattern scoring

use crate::catalog::CatalogSnapshot;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const REASON_OVERRIDE: &str = "parameter_override";
pub const REASON_NO_MATCH: &str = "no_match_fallback";

/// Outcome of one routing decision. Created fresh per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Name of the expert selected to handle the query
    pub selected: String,

    /// Confidence score in [0.0, 1.0]
    pub confidence: f64,

    /// Machine-readable reason: `parameter_override`, `keyword_match:<kw>`,
    /// `pattern_match:<pat>` or `no_match_fallback`
    pub reason: String,

    /// Alternates to try if the primary fails. Advisory only; the core does
    /// not retry them automatically.
    pub fallbacks: Vec<String>,
}

/// Route to the expert named by an explicit override, bypassing scoring.
///
/// Returns `None` when no override is given, or when the named expert is
/// missing from the catalog or not active - the caller then falls through
/// to rule-based routing.
pub fn select_by_override(
    target: Option<&str>,
    snapshot: &CatalogSnapshot,
) -> Option<RoutingDecision> {
    let target = target.filter(|t| !t.is_empty())?;

    let Some(record) = snapshot.get(target) else {
        tracing::warn!(%target, "override target not found in catalog, ignoring");
        return None;
    };

    if record.status != crate::catalog::ExpertStatus::Active {
        tracing::warn!(%target, status = ?record.status, "override target not active, ignoring");
        return None;
    }

    let fallback = snapshot.fallback();
    let fallbacks = if fallback.is_empty() {
        Vec::new()
    } else {
        vec![fallback.to_string()]
    };

    Some(RoutingDecision {
        selected: target.to_string(),
        confidence: 1.0,
        reason: REASON_OVERRIDE.to_string(),
        fallbacks,
    })
}

/// Route by keyword and pattern matching against catalog rules.
///
/// Keywords are case-insensitive substring matches at base score 0.9;
/// patterns are case-insensitive regex searches at base score 0.8. Priority
/// adds up to 0.09 on top of the base, so higher-priority experts win ties
/// deterministically. Always returns a decision: with no candidates the
/// configured fallback expert is selected at confidence 0.5.
pub fn select_by_rules(query: &str, snapshot: &CatalogSnapshot) -> RoutingDecision {
    let query_lower = query.to_lowercase();

    // Active experts, highest priority first. The sort is stable, so ties
    // preserve catalog order.
    let mut ordered: Vec<_> = snapshot.active().collect();
    ordered.sort_by_key(|e| std::cmp::Reverse(e.routing.priority));

    let mut candidates: Vec<(String, f64, String)> = Vec::new();

    for expert in ordered {
        let rules = &expert.routing;
        let bonus = (rules.priority as f64 * 0.01).min(0.09);

        // First matching keyword wins for this expert
        let mut keyword_matched = false;
        for keyword in &rules.keywords {
            if query_lower.contains(&keyword.to_lowercase()) {
                candidates.push((
                    expert.name.clone(),
                    0.9 + bonus,
                    format!("keyword_match:{keyword}"),
                ));
                keyword_matched = true;
                break;
            }
        }

        // Patterns only considered when no keyword matched
        if !keyword_matched {
            for pattern in &rules.patterns {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => {
                        if re.is_match(query) {
                            candidates.push((
                                expert.name.clone(),
                                0.8 + bonus,
                                format!("pattern_match:{pattern}"),
                            ));
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            expert = %expert.name,
                            %pattern,
                            %err,
                            "invalid routing pattern, skipping"
                        );
                    }
                }
            }
        }
    }

    // Stable sort by score descending
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    if let Some((selected, confidence, reason)) = candidates.first().cloned() {
        let mut fallbacks: Vec<String> =
            candidates.iter().skip(1).take(2).map(|c| c.0.clone()).collect();
        let fallback = snapshot.fallback();
        if !fallback.is_empty() && !fallbacks.iter().any(|f| f == fallback) {
            fallbacks.push(fallback.to_string());
        }

        tracing::debug!(%selected, confidence, %reason, "routed by rules");

        return RoutingDecision {
            selected,
            confidence,
            reason,
            fallbacks,
        };
    }

    tracing::debug!(fallback = snapshot.fallback(), "no rule matched, using fallback");

    RoutingDecision {
        selected: snapshot.fallback().to_string(),
        confidence: 0.5,
        reason: REASON_NO_MATCH.to_string(),
        fallbacks: Vec::new(),
    }
}

/// The single routing-priority contract: explicit override first, rule-based
/// matching otherwise.
pub fn select(
    query: &str,
    target: Option<&str>,
    snapshot: &CatalogSnapshot,
) -> RoutingDecision {
    if let Some(decision) = select_by_override(target, snapshot) {
        return decision;
    }
    select_by_rules(query, snapshot)
}
