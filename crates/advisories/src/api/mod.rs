/// REST plumbing: the HTTP client and the wire-only payload types
mod client;
pub mod dto;

pub use client::{envelope_data, ApiClient};
pub use dto::paths;
