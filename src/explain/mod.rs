//! Rule-based explanation engine
//!
//! Produces a deterministic, human-readable rationale for a flagged record.
//! Rules form a fixed ordered list of independent predicate + message pairs;
//! every matching rule contributes one reason and rules never short-circuit
//! each other. Evaluation order only affects presentation (concatenation
//! order), not whether a rule fires.
//!
//! This is a pure function of one record's feature values at a time: no
//! randomness, no cross-record state.

/// Separator between reason strings in the joined explanation.
pub const REASON_SEPARATOR: &str = "; ";

/// Reason emitted when no rule matched a flagged record.
pub const FALLBACK_REASON: &str = "General anomaly detected by AI ensemble model";

/// Latency is considered a spike above this multiple of the rolling mean.
pub const LATENCY_SPIKE_FACTOR: f64 = 2.0;

/// Endpoint substring -> operational hint.
const ENDPOINT_HINTS: [(&str, &str); 4] = [
    ("/login", "Possible auth service slowdown"),
    ("/order", "Possible DB or payment issue"),
    ("/search", "Search index or API timeout"),
    ("/checkout", "Checkout pipeline delay"),
];

/// Feature values a rule may inspect.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Request path
    pub endpoint: &'a str,
    /// Record latency in milliseconds
    pub latency_ms: f64,
    /// Rolling mean latency at this record's sorted position
    pub rolling_mean_latency: f64,
    /// Derived server-error flag (status code >= 500)
    pub status_error: bool,
}

/// The independent explanation rules, in evaluation (and presentation) order.
///
/// The fallback reason is not a rule: it depends on whether any rule matched,
/// so [`explain`] applies [`FALLBACK_REASON`] after evaluating the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Latency exceeds twice the rolling mean
    LatencySpike,
    /// The record carries a 5xx status
    ServerError,
    /// The endpoint matches a known trouble-spot table
    EndpointHint,
}

/// Fixed rule evaluation order.
pub const RULES: [Rule; 3] = [Rule::LatencySpike, Rule::ServerError, Rule::EndpointHint];

impl Rule {
    /// Evaluate this rule against a record's features.
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<String> {
        match self {
            Rule::LatencySpike => {
                // Floor the denominator at 1 to guard against a zero mean
                let baseline = ctx.rolling_mean_latency.max(1.0);
                if ctx.latency_ms > LATENCY_SPIKE_FACTOR * baseline {
                    let multiplier = ctx.latency_ms / baseline;
                    Some(format!("Latency spike (>{multiplier:.1}x rolling mean)"))
                } else {
                    None
                }
            }
            Rule::ServerError => {
                if ctx.status_error {
                    Some("HTTP 5xx error detected".to_string())
                } else {
                    None
                }
            }
            Rule::EndpointHint => ENDPOINT_HINTS
                .iter()
                .find(|(needle, _)| ctx.endpoint.contains(needle))
                .map(|(_, hint)| hint.to_string()),
        }
    }
}

/// Build the joined explanation string for a flagged record.
///
/// Every matching rule contributes one reason; if none match,
/// [`FALLBACK_REASON`] guarantees the result is non-empty.
pub fn explain(ctx: &RuleContext<'_>) -> String {
    let reasons: Vec<String> = RULES.iter().filter_map(|rule| rule.evaluate(ctx)).collect();

    if reasons.is_empty() {
        FALLBACK_REASON.to_string()
    } else {
        reasons.join(REASON_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_ctx() -> RuleContext<'static> {
        RuleContext {
            endpoint: "/health",
            latency_ms: 100.0,
            rolling_mean_latency: 100.0,
            status_error: false,
        }
    }

    #[test]
    fn test_latency_spike_includes_multiplier() {
        let ctx = RuleContext {
            latency_ms: 5000.0,
            rolling_mean_latency: 100.0,
            ..quiet_ctx()
        };
        let reason = Rule::LatencySpike.evaluate(&ctx).unwrap();
        assert_eq!(reason, "Latency spike (>50.0x rolling mean)");
    }

    #[test]
    fn test_latency_spike_guards_zero_baseline() {
        let ctx = RuleContext {
            latency_ms: 3.0,
            rolling_mean_latency: 0.0,
            ..quiet_ctx()
        };
        // Denominator floored at 1: 3 > 2 * 1 fires with multiplier 3
        let reason = Rule::LatencySpike.evaluate(&ctx).unwrap();
        assert_eq!(reason, "Latency spike (>3.0x rolling mean)");
    }

    #[test]
    fn test_server_error_rule() {
        let ctx = RuleContext {
            status_error: true,
            ..quiet_ctx()
        };
        assert_eq!(
            Rule::ServerError.evaluate(&ctx).unwrap(),
            "HTTP 5xx error detected"
        );
        assert!(Rule::ServerError.evaluate(&quiet_ctx()).is_none());
    }

    #[test]
    fn test_endpoint_hint_matches_substring() {
        let ctx = RuleContext {
            endpoint: "/api/v2/search?q=x",
            ..quiet_ctx()
        };
        assert_eq!(
            Rule::EndpointHint.evaluate(&ctx).unwrap(),
            "Search index or API timeout"
        );
        assert!(Rule::EndpointHint.evaluate(&quiet_ctx()).is_none());
    }

    #[test]
    fn test_rules_do_not_short_circuit() {
        let ctx = RuleContext {
            endpoint: "/login",
            latency_ms: 900.0,
            rolling_mean_latency: 100.0,
            status_error: true,
        };
        let explanation = explain(&ctx);
        assert_eq!(
            explanation,
            "Latency spike (>9.0x rolling mean); \
             HTTP 5xx error detected; \
             Possible auth service slowdown"
        );
    }

    #[test]
    fn test_fallback_guarantees_non_empty() {
        let explanation = explain(&quiet_ctx());
        assert_eq!(explanation, "General anomaly detected by AI ensemble model");
    }

    #[test]
    fn test_explain_is_pure() {
        let ctx = RuleContext {
            endpoint: "/order",
            latency_ms: 450.0,
            rolling_mean_latency: 120.0,
            status_error: false,
        };
        assert_eq!(explain(&ctx), explain(&ctx));
    }
}
