//! Client library for the university advisory scheduling API.
//!
//! Students request advisory sessions, professors answer them and manage
//! their weekly availability, directors review history and download
//! reports. [`context::AppContext`] holds one authenticated session and
//! hands out the role's [`views::Dashboard`].

pub mod advisory;
pub mod api;
pub mod availability;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod reports;
pub mod session;
pub mod store;
pub mod views;

pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{ClientError, ClientResult};
