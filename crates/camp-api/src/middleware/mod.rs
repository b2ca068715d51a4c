//! HTTP 미들웨어.
//!
//! 인증/인가 미들웨어는 [`crate::auth`]에 있습니다.

pub mod metrics;

pub use metrics::metrics_layer;
