pub mod decoder;
pub mod encoder;
pub mod matcher;
pub mod tables;
pub mod tokens;

pub use decoder::{inflate, Inflated};
pub use encoder::deflate;
pub use matcher::Matcher;
pub use tokens::Token;

/// History window size shared by matcher and decoder (RFC 1951)
pub const WINDOW_SIZE: usize = 32768;

/// Shortest and longest back-reference lengths
pub const MIN_MATCH: usize = 3;
pub const MAX_MATCH: usize = 258;
