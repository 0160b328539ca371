pub mod analyze;
pub mod export;
pub mod health;
pub mod rooms;
pub mod settings;
pub mod upload;
pub mod validate_key;
pub mod visualization;
