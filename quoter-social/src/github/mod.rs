//! GitHub user-status integration: the GraphQL client and its wire types.
pub mod client;
pub mod types;

pub use client::{ClientConfig, GithubStatusClient};
