//! Analysis requests for chat rooms.
//!
//! [`AnalysisCoordinator`] turns a room and an [`AnalysisType`] into a
//! provider call, tracks each attempt as an [`AnalysisRequest`] moving
//! through `Pending → Running → Succeeded | Failed`, and keeps the full
//! history per room.
//!
//! [`AnalysisType`]: chatlens_types::AnalysisType
//! [`AnalysisRequest`]: chatlens_types::AnalysisRequest

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::AnalysisConfig;
pub use coordinator::AnalysisCoordinator;
pub use error::{AnalysisError, Result};
