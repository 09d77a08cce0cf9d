//! HTTP middleware for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//!
//! Authentication is not a layer: handlers that need a caller take a
//! [`RequireUser`] or [`RequireAdmin`] extractor.

pub mod auth;
pub mod request_id;

pub use auth::{AuthRejection, RequireAdmin, RequireUser};
pub use request_id::request_id_middleware;
