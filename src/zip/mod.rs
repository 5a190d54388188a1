pub mod constants;
pub mod date;
pub mod reader;
pub mod writer;

pub use date::DosDateTime;
pub use reader::{Archive, Member, Members};
pub use writer::{max_archive_size, write_archive, ArchiveWriter, FileSpec};

use crate::error::{Error, Result};

/// Compression method of an archive member
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Stored,
    Deflate,
}

impl Method {
    pub fn from_u16(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(Method::Stored),
            8 => Ok(Method::Deflate),
            other => Err(Error::UnsupportedMethod(other)),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Method::Stored => 0,
            Method::Deflate => 8,
        }
    }
}
