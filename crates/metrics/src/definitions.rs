//! Metric name and label definitions.
//!
//! Centralizing these definitions keeps names consistent across crates and
//! documents what is exported.

/// Inbound dispatch metrics
pub mod auto_reply {
    /// Total inbound messages entering the dispatch pipeline
    pub const MESSAGES_RECEIVED_TOTAL: &str = "courier_auto_reply_messages_received_total";
    /// Dispatch outcomes by branch (drop, simple, forward, deferred)
    pub const DISPATCH_BRANCH_TOTAL: &str = "courier_auto_reply_dispatch_branch_total";
    /// Forwarded turns whose generation step failed
    pub const GENERATION_FAILURES_TOTAL: &str = "courier_auto_reply_generation_failures_total";
    /// End-to-end dispatch duration in seconds
    pub const DISPATCH_DURATION_SECONDS: &str = "courier_auto_reply_dispatch_duration_seconds";
    /// Reply delivery failures inside a dispatcher
    pub const DELIVERY_FAILURES_TOTAL: &str = "courier_auto_reply_delivery_failures_total";
}

/// Pre-classifier gate metrics
pub mod pre_classifier {
    /// Gate opinions by action
    pub const OUTCOMES_TOTAL: &str = "courier_pre_classifier_outcomes_total";
    /// Gate failures by cause (status, timeout, parse, invalid_action, transport)
    pub const FAILURES_TOTAL: &str = "courier_pre_classifier_failures_total";
    /// Gate request duration in seconds
    pub const DURATION_SECONDS: &str = "courier_pre_classifier_duration_seconds";
}

/// Reasoning side-channel metrics
pub mod reasoning {
    /// Reasoning posts delivered, by mode
    pub const PUBLISHED_TOTAL: &str = "courier_reasoning_published_total";
    /// Reasoning posts that failed to deliver, by mode
    pub const PUBLISH_FAILURES_TOTAL: &str = "courier_reasoning_publish_failures_total";
    /// Reasoning posts cut at the length limit
    pub const TRUNCATED_TOTAL: &str = "courier_reasoning_truncated_total";
}

/// Common label keys
pub mod labels {
    pub const ACTION: &str = "action";
    pub const BRANCH: &str = "branch";
    pub const CAUSE: &str = "cause";
    pub const CHANNEL: &str = "channel";
    pub const MODE: &str = "mode";
    pub const PROVIDER: &str = "provider";
}

/// Standard histogram buckets for different metric types
pub mod buckets {
    /// Gate round-trip buckets (in seconds)
    /// Covers 1ms to 10s
    pub const GATE_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    /// Dispatch duration buckets (in seconds)
    /// Covers 10ms to 5 minutes (forwarded turns include generation)
    pub const DISPATCH_DURATION: &[f64] = &[
        0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
    ];
}
