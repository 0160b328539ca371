pub mod client;
mod locks;
pub mod models;
pub mod repositories;

pub use client::MongoRoomStore;
