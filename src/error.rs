use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    // Truncated input
    #[error("unexpected end of input")]
    InsufficientInput,

    // DEFLATE stream errors
    #[error("invalid DEFLATE block type: {0}")]
    InvalidBlockType(u8),

    #[error("stored block length mismatch: LEN={len:#06x}, NLEN={nlen:#06x}")]
    StoredBlockLengthMismatch { len: u16, nlen: u16 },

    #[error("invalid Huffman code length: {0} (max 15)")]
    InvalidCodeLength(u8),

    #[error("Huffman code oversubscribed: more codes than possible for bit length")]
    HuffmanOversubscribed,

    #[error("invalid Huffman code in stream")]
    InvalidHuffmanCode,

    #[error("invalid Huffman symbol: {0}")]
    InvalidHuffmanSymbol(u16),

    #[error("invalid code length sequence")]
    InvalidCodeLengthSequence,

    #[error("back-reference distance {distance} exceeds produced output {available}")]
    InvalidBackReference { distance: u16, available: usize },

    // Destination capacity
    #[error("output buffer full")]
    OutputFull,

    // ZIP archive errors
    #[error("end of central directory record not found")]
    EocdrNotFound,

    #[error("multi-disk archives are not supported")]
    MultiDiskArchive,

    #[error("bad record signature: expected {expected:#010x}, found {found:#010x}")]
    BadRecordSignature { expected: u32, found: u32 },

    #[error("record or member payload extends past the end of the archive")]
    MemberOutOfBounds,

    #[error("central directory does not match end of central directory record")]
    CentralDirectoryMismatch,

    #[error("stored member size mismatch: comp_size={comp_size}, uncomp_size={uncomp_size}")]
    StoredSizeMismatch { comp_size: u32, uncomp_size: u32 },

    #[error("unsupported compression method: {0}")]
    UnsupportedMethod(u16),

    // Extraction mismatches
    #[error("CRC32 mismatch: expected {expected:#010x}, found {found:#010x}")]
    Crc32Mismatch { expected: u32, found: u32 },

    #[error("size mismatch: expected {expected} bytes, found {found}")]
    SizeMismatch { expected: u32, found: u32 },

    // Writer input limits
    #[error("too many members (max 65535)")]
    TooManyMembers,

    #[error("member name longer than 65535 bytes")]
    NameTooLong,

    #[error("comment longer than 65535 bytes")]
    CommentTooLong,

    #[error("member larger than 4 GiB")]
    MemberTooLarge,

    #[error("archive larger than 4 GiB")]
    ArchiveTooLarge,
}

pub type Result<T> = std::result::Result<T, Error>;
