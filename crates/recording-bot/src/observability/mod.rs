//! Observability for the recording bot.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `rb_lifecycle_state` | Gauge | none | Current lifecycle state code |
//! | `rb_startup_failures_total` | Counter | `kind` | Fatal startup errors |
//! | `rb_config_load_duration_seconds` | Histogram | `status` | Configuration load time |
//! | `rb_outbound_connection_limit` | Gauge | none | Installed outbound connection limit |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::{
    init_metrics_recorder, record_config_load_duration, record_startup_failure,
    set_lifecycle_state, set_outbound_connection_limit,
};
