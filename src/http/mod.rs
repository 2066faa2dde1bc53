//! HTTP protocol layer module
//!
//! Response builders and cache directives shared by the router and the platform layer.

pub mod cache;
pub mod response;

// Re-export commonly used types
pub use cache::CachePolicy;
pub use response::{
    build_400_response, build_404_response, build_405_response, build_408_response,
    build_413_response, build_503_response, build_welcome_response,
};
