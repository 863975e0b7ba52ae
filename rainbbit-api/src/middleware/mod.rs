//! Middleware modules for RAINBBIT API
//!
//! - `admission`: global and per-client rate limiting
//!
//! Request metrics are recorded by `telemetry::observability_middleware`,
//! which wraps admission so rejected requests are counted too.

mod admission;

pub use admission::{
    admission_middleware, extract_client_ip, Admission, AdmissionConfig, AdmissionController,
};
