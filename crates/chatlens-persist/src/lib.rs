//! Room storage for chatlens.
//!
//! [`MemoryRoomStore`] is always available; [`MongoRoomStore`] requires the
//! `mongodb` feature.

pub mod dbs;
pub mod error;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryRoomStore;
pub use store::{IngestOutcome, MessageQuery, RoomStore, RoomTarget};

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoRoomStore;
