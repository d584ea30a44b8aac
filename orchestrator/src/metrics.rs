use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

use crate::error::Result;

lazy_static! {
    pub static ref INVOCATIONS: IntCounterVec = register_int_counter_vec!(
        "itinerary_invocations_total",
        "Function invocations by outcome",
        &["outcome"]
    )
    .expect("metric can be registered");
    pub static ref STAGE_DURATION: HistogramVec = register_histogram_vec!(
        "itinerary_stage_duration_seconds",
        "Wall time spent in each pipeline stage",
        &["stage"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("metric can be registered");
}

/// Prometheus text exposition of the default registry.
pub fn render() -> Result<(String, String)> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((
        String::from_utf8_lossy(&buffer).into_owned(),
        encoder.format_type().to_string(),
    ))
}
