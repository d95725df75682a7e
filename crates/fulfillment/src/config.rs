//! Orchestrator tuning knobs.

use std::time::Duration;

/// Settings the orchestrator receives from its host.
///
/// Defaults:
/// - `order_cache_ttl`: 1 hour
/// - `sales_report_cache_ttl`: 24 hours
/// - `external_call_timeout`: 5 seconds
/// - `low_stock_threshold`: 2 units
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// TTL of cached buyer and seller order views.
    pub order_cache_ttl: Duration,
    /// TTL of cached sales reports.
    pub sales_report_cache_ttl: Duration,
    /// Deadline applied to every collaborator call.
    pub external_call_timeout: Duration,
    /// Stock at or below which the seller is warned after a shipment.
    pub low_stock_threshold: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            order_cache_ttl: Duration::from_secs(60 * 60),
            sales_report_cache_ttl: Duration::from_secs(24 * 60 * 60),
            external_call_timeout: Duration::from_millis(5000),
            low_stock_threshold: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.order_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.sales_report_cache_ttl, Duration::from_secs(86400));
        assert_eq!(config.external_call_timeout, Duration::from_secs(5));
        assert_eq!(config.low_stock_threshold, 2);
    }
}
