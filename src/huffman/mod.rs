pub mod decoder;
pub mod encoder;
pub mod tables;

pub use decoder::HuffmanDecoder;
pub use encoder::{build_code_table, compute_code_lengths, CodeTable};
