//! GitHub REST implementation of the gateway.

mod client;
mod error;
mod types;

pub use client::{GitHubClient, GitHubConnector};
