//! Middleware wrapping the route dispatcher.
//!
//! Composition, outermost first: [`metrics::track_metrics`] →
//! [`auth::require_auth`] → [`crate::router::dispatch`]. Metrics sit outside
//! the gate so rejected and unmatched requests are still observed.

pub mod auth;
pub mod metrics;

pub use auth::{require_auth, AuthState};
pub use metrics::track_metrics;
