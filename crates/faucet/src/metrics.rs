//! Prometheus metrics for the faucet

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Faucet counters, registered on a private registry.
pub struct FaucetMetrics {
    registry: Registry,
    pub dispensed_total: IntCounterVec,
    pub failures_total: IntCounterVec,
    pub cooldown_entries: IntGauge,
}

impl FaucetMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let dispensed_total = IntCounterVec::new(
            Opts::new("faucet_dispense_total", "Transfers submitted, by token"),
            &["token"],
        )?;

        let failures_total = IntCounterVec::new(
            Opts::new("faucet_dispense_failures_total", "Rejected or failed requests, by reason"),
            &["reason"],
        )?;

        let cooldown_entries = IntGauge::new(
            "faucet_cooldown_entries",
            "Address/token pairs currently remembered by the cooldown store",
        )?;

        registry.register(Box::new(dispensed_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(cooldown_entries.clone()))?;

        Ok(Self {
            registry,
            dispensed_total,
            failures_total,
            cooldown_entries,
        })
    }

    pub fn record_dispensed(&self, token: &str) {
        self.dispensed_total.with_label_values(&[token]).inc();
    }

    pub fn record_failure(&self, reason: &str) {
        self.failures_total.with_label_values(&[reason]).inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> prometheus::Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
