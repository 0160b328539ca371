//! Shared data model for chatlens.
//!
//! Rooms own their messages; analysis requests and statistics snapshots
//! reference rooms by id.

mod analysis;
mod room;
mod snapshot;

pub use analysis::{AnalysisRequest, AnalysisStatus, AnalysisType, FailureReason, ParseAnalysisTypeError};
pub use room::{FileMeta, IngestedFile, Message, ParsedMessage, Room, RoomSummary, Watermark};
pub use snapshot::{KeywordCount, ParticipantStats, SentimentDistribution, StatisticsSnapshot};
