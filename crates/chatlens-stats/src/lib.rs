//! Statistics over chat rooms.
//!
//! [`StatisticsEngine::compute`] is pure and deterministic for a given room
//! and configuration, apart from the `computed_at` stamp.

pub mod cache;
pub mod config;
pub mod engine;
pub mod keywords;
pub mod sentiment;

pub use cache::SnapshotCache;
pub use config::StatsConfig;
pub use engine::StatisticsEngine;
pub use sentiment::Sentiment;
