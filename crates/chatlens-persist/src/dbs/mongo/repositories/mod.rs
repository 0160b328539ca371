pub mod file;
pub mod message;
pub mod room;

pub use file::MongoFileRepository;
pub use message::MongoMessageRepository;
pub use room::MongoRoomRepository;
