use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static FBR_SUBMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "einvoice_fbr_submissions_total",
            "Persisted FBR submission attempts by environment and outcome",
        ),
        &["environment", "outcome"],
    )
    .expect("Failed to create einvoice_fbr_submissions_total metric");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register einvoice_fbr_submissions_total");
    counter
});

/// Record one persisted submission attempt.
pub fn record_submission(environment: &str, outcome: &str) {
    FBR_SUBMISSIONS_TOTAL
        .with_label_values(&[environment, outcome])
        .inc();
}

/// Render the prometheus text exposition for the /metrics endpoint.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer).ok();
    String::from_utf8(buffer).unwrap_or_default()
}
