//! Status publishing for quoter.
//!
//! [`publisher`] holds the service-agnostic contract (publish, read back,
//! verify); [`github`] implements it against GitHub's GraphQL user status.
pub mod github;
pub mod publisher;

pub use github::{ClientConfig, GithubStatusClient};
pub use publisher::{RemoteStatus, StatusPublisher, Verification};
