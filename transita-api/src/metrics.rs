use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

/// Process-local metrics registry, shared through `AppState` rather than a
/// global so test routers get their own counters.
pub struct Metrics {
    registry: Registry,
    pub seat_lock_attempts: IntCounterVec,
    pub seat_lock_latency: Histogram,
    pub payment_events: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let seat_lock_attempts = IntCounterVec::new(
            Opts::new("transita_seat_lock_attempts_total", "Total seat lock attempts"),
            &["result"],
        )?;
        let seat_lock_latency = Histogram::with_opts(HistogramOpts::new(
            "transita_seat_lock_latency_seconds",
            "Latency for seat lock operations",
        ))?;
        let payment_events = IntCounterVec::new(
            Opts::new("transita_payment_events_total", "Payment webhook events processed"),
            &["provider", "outcome"],
        )?;

        registry.register(Box::new(seat_lock_attempts.clone()))?;
        registry.register(Box::new(seat_lock_latency.clone()))?;
        registry.register(Box::new(payment_events.clone()))?;

        Ok(Self {
            registry,
            seat_lock_attempts,
            seat_lock_latency,
            payment_events,
        })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
