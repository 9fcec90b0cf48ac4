//! HTTP plumbing shared by every feed adapter.

pub mod auth;
mod basic;
mod client;

pub use basic::{BasicClient, USER_AGENT, fetch_bytes};
pub use client::HttpClient;
