//! Text embedding providers used by the dense ranker and index builds.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
