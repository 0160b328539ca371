pub mod error;
mod csv;
mod grammar;
pub mod parser;

pub use error::{ParseError, Result};
pub use parser::{LogFormat, LogParser, ParseReport, ParserConfig};
