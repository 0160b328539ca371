//! # Chatlens - chat export analysis for Rust
//!
//! Chatlens ingests exported KakaoTalk chat logs, keeps them as rooms,
//! computes activity statistics and runs AI analyses over them:
//! - **Parsing** of PC, mobile and CSV exports, with multi-line messages
//! - **Rooms** merged from several uploads, deduplicated by content hash
//! - **Statistics** (hourly and weekday activity, keywords, sentiment)
//! - **Analysis** requests with one in-flight call per room and type,
//!   cancellation and timeouts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatlens::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let chatlens = ChatlensBuilder::new()
//!         .openai_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()
//!         .await?;
//!
//!     let bytes = std::fs::read("KakaoTalk_Chat.txt")?;
//!     let report = chatlens
//!         .ingestion()
//!         .ingest("KakaoTalk_Chat.txt", &bytes, RoomTarget::default())
//!         .await?;
//!
//!     let room_id = report.outcome.room.id;
//!     let request = chatlens.coordinator().submit(&room_id, AnalysisType::Sentiment).await?;
//!     let done = chatlens.coordinator().wait(&request.id).await?;
//!     println!("{}", done.result_text.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **chatlens-types**: Rooms, messages, analysis requests, snapshots
//! - **chatlens-parser**: Chat export parser
//! - **chatlens-persist**: Room store (memory, MongoDB)
//! - **chatlens-stats**: Statistics engine and snapshot cache
//! - **chatlens-llm**: Provider clients (OpenAI)
//! - **chatlens-context**: Token-bounded analysis prompts
//! - **chatlens-analysis**: Analysis request coordinator
//!
//! ## Features
//!
//! - `mongodb`: MongoDB room store

// Re-export all public APIs
pub use chatlens_analysis as analysis;
pub use chatlens_context as context;
pub use chatlens_llm as llm;
pub use chatlens_parser as parser;
pub use chatlens_persist as persist;
pub use chatlens_stats as stats;
pub use chatlens_types as types;

// Re-export commonly used types
pub use chatlens_analysis::{AnalysisConfig, AnalysisCoordinator, AnalysisError};
pub use chatlens_context::{ContextConfig, ContextStrategy, DefaultContextStrategy};
pub use chatlens_llm::{ChatClient, LlmError, OpenAIClient};
pub use chatlens_parser::{LogFormat, LogParser, ParseError, ParserConfig};
pub use chatlens_persist::{MemoryRoomStore, MessageQuery, RoomStore, RoomTarget, StoreError};
pub use chatlens_stats::{SnapshotCache, StatisticsEngine, StatsConfig};
pub use chatlens_types::{
    AnalysisRequest, AnalysisStatus, AnalysisType, FailureReason, IngestedFile, Message, Room, RoomSummary,
    StatisticsSnapshot,
};

/// High-level builder
pub mod builder;
pub mod error;
pub mod ingest;

pub use builder::{Chatlens, ChatlensBuilder};
pub use error::IngestError;
pub use ingest::{IngestReport, IngestionService};

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{Chatlens, ChatlensBuilder};
    pub use crate::ingest::IngestionService;
    pub use crate::persist::RoomTarget;
    pub use crate::types::{AnalysisStatus, AnalysisType};
    pub use anyhow::Result;
}
