use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ==== Threat Engine Metrics ====
    pub static ref THREAT_ENGINE_FRAMES: IntCounter = {
        let metric = IntCounter::new(
            "threat_engine_frames_total",
            "Total number of frames folded into the node registry",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref THREAT_ENGINE_TICKS: IntCounter = {
        let metric = IntCounter::new(
            "threat_engine_ticks_total",
            "Total number of reporting ticks",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref THREAT_ENGINE_TRACKED_NODES: IntGauge = {
        let metric = IntGauge::new(
            "threat_engine_tracked_nodes",
            "Number of tracks held by the node registry",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref THREAT_ENGINE_CLUSTERS: IntGauge = {
        let metric = IntGauge::new(
            "threat_engine_clusters",
            "Number of clusters found at the last tick",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref THREAT_ENGINE_CLUSTER_THREATS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "threat_engine_cluster_threat_total",
                "Clusters reported per threat level",
            ),
            &["level"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref THREAT_ENGINE_REJECTED_BOXES: IntCounter = {
        let metric = IntCounter::new(
            "threat_engine_rejected_boxes_total",
            "Track boxes rejected for having no area after clipping",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref THREAT_ENGINE_SINK_FAILURES: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "threat_engine_sink_failures_total",
                "Report writes that failed, by sink and record kind",
            ),
            &["sink", "record"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref THREAT_ENGINE_TICK_DURATION: Histogram = {
        let metric = Histogram::with_opts(
            HistogramOpts::new(
                "threat_engine_tick_duration_seconds",
                "Time spent clustering, scoring and reporting one tick",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Alert Service Metrics ====
    pub static ref ALERT_SERVICE_ALERTS_DISPATCHED: IntCounter = {
        let metric = IntCounter::new(
            "alert_service_alerts_dispatched_total",
            "Alerts converted and served to operators",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ALERT_SERVICE_ALERTS_SKIPPED: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "alert_service_alerts_skipped_total",
                "Alerts dropped before dispatch",
            ),
            &["reason"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ALERT_SERVICE_INGESTED: IntCounter = {
        let metric = IntCounter::new(
            "alert_service_incidents_ingested_total",
            "Incident records received from threat engines",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}

/// Helper function to encode metrics for Prometheus scraping
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
    })
}
