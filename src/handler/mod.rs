//! Request handler module
//!
//! The router: a pure function of the request, the edge configuration and the
//! fetch capability.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
