//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring transaction
//! processing. Every collector is labelled by transaction type.
//!
//! # Metrics
//!
//! - `ldvm_tx_checked_total` - Transactions that passed a dry-run check
//! - `ldvm_tx_accepted_total` - Transactions applied to state
//! - `ldvm_tx_rejected_total` - Transactions rejected by check or apply

use prometheus::{IntCounterVec, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions checked
    pub checked_total: IntCounterVec,

    /// Transactions accepted
    pub accepted_total: IntCounterVec,

    /// Transactions rejected
    pub rejected_total: IntCounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let checked_total = IntCounterVec::new(
            Opts::new("ldvm_tx_checked_total", "Transactions that passed a dry-run check"),
            &["tx_type"],
        )?;
        registry.register(Box::new(checked_total.clone()))?;

        let accepted_total = IntCounterVec::new(
            Opts::new("ldvm_tx_accepted_total", "Transactions applied to state"),
            &["tx_type"],
        )?;
        registry.register(Box::new(accepted_total.clone()))?;

        let rejected_total = IntCounterVec::new(
            Opts::new("ldvm_tx_rejected_total", "Transactions rejected by check or apply"),
            &["tx_type"],
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        Ok(Self {
            checked_total,
            accepted_total,
            rejected_total,
            registry,
        })
    }

    /// Record a successful check
    pub fn record_checked(&self, tx_type: &str) {
        self.checked_total.with_label_values(&[tx_type]).inc();
    }

    /// Record an applied transaction
    pub fn record_accepted(&self, tx_type: &str) {
        self.accepted_total.with_label_values(&[tx_type]).inc();
    }

    /// Record a rejection
    pub fn record_rejected(&self, tx_type: &str) {
        self.rejected_total.with_label_values(&[tx_type]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();

        a.record_accepted("Transfer");
        a.record_accepted("Transfer");
        a.record_rejected("Borrow");

        assert_eq!(a.accepted_total.with_label_values(&["Transfer"]).get(), 2);
        assert_eq!(a.rejected_total.with_label_values(&["Borrow"]).get(), 1);
        assert_eq!(b.accepted_total.with_label_values(&["Transfer"]).get(), 0);
        assert!(!a.registry().gather().is_empty());
    }
}
