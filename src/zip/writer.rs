use super::constants::*;
use super::date::DosDateTime;
use super::Method;
use crate::crc32::crc32;
use crate::deflate::deflate;
use crate::error::{Error, Result};

/// One input to `write_archive`
#[derive(Clone, Copy, Debug)]
pub struct FileSpec<'a> {
    pub name: &'a [u8],
    pub data: &'a [u8],
    pub mtime: DosDateTime,
}

/// Upper bound on the archive `write_archive` will produce for these inputs
pub fn max_archive_size(files: &[FileSpec<'_>], comment: &[u8]) -> usize {
    files
        .iter()
        .map(|f| LFH_SIZE + CFH_SIZE + 2 * f.name.len() + f.data.len())
        .sum::<usize>()
        + EOCDR_SIZE
        + comment.len()
}

/// Write a whole archive in input order
///
/// `progress` is invoked once per member after compression with
/// (name, uncomp_size, comp_size).
pub fn write_archive(
    files: &[FileSpec<'_>],
    comment: &[u8],
    mut progress: Option<&mut dyn FnMut(&[u8], u32, u32)>,
) -> Result<Vec<u8>> {
    let mut writer = ArchiveWriter::with_capacity(max_archive_size(files, comment));
    for file in files {
        let comp_size = writer.add(file.name, file.data, file.mtime)?;
        if let Some(callback) = progress.as_mut() {
            callback(file.name, file.data.len() as u32, comp_size);
        }
    }
    writer.finish(comment)
}

/// Recorded while writing local headers, replayed as the central directory
struct CentralEntry {
    name: Vec<u8>,
    mtime: DosDateTime,
    method: Method,
    crc32: u32,
    comp_size: u32,
    uncomp_size: u32,
    lfh_offset: u32,
    is_dir: bool,
}

/// Incremental archive writer: `add` members, then `finish` with a comment
///
/// Each member is compressed with DEFLATE and falls back to stored when that
/// is not strictly smaller; a member whose name ends in `/` with no data is
/// stored with directory attributes.
pub struct ArchiveWriter {
    out: Vec<u8>,
    entries: Vec<CentralEntry>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self { out: Vec::new(), entries: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { out: Vec::with_capacity(capacity), entries: Vec::new() }
    }

    /// Append one member; returns its compressed size
    pub fn add(&mut self, name: &[u8], data: &[u8], mtime: DosDateTime) -> Result<u32> {
        if self.entries.len() == u16::MAX as usize {
            return Err(Error::TooManyMembers);
        }
        if name.len() > u16::MAX as usize {
            return Err(Error::NameTooLong);
        }
        let uncomp_size = u32::try_from(data.len()).map_err(|_| Error::MemberTooLarge)?;
        let lfh_offset = u32::try_from(self.out.len()).map_err(|_| Error::ArchiveTooLarge)?;

        let crc = crc32(data);

        let mut scratch = vec![0u8; data.len()];
        let (method, comp_len) = match deflate(data, &mut scratch) {
            Ok(n) if n < data.len() => (Method::Deflate, n),
            _ => (Method::Stored, data.len()),
        };
        let payload: &[u8] = if method == Method::Deflate { &scratch[..comp_len] } else { data };

        self.push_u32(LFH_SIGNATURE);
        self.push_u16(version_needed(method));
        self.push_u16(0); // general purpose flags
        self.push_u16(method.as_u16());
        self.push_u16(mtime.time);
        self.push_u16(mtime.date);
        self.push_u32(crc);
        self.push_u32(comp_len as u32);
        self.push_u32(uncomp_size);
        self.push_u16(name.len() as u16);
        self.push_u16(0); // extra field length
        self.out.extend_from_slice(name);
        self.out.extend_from_slice(payload);

        self.entries.push(CentralEntry {
            name: name.to_vec(),
            mtime,
            method,
            crc32: crc,
            comp_size: comp_len as u32,
            uncomp_size,
            lfh_offset,
            is_dir: name.last() == Some(&b'/') && data.is_empty(),
        });

        Ok(comp_len as u32)
    }

    /// Emit the central directory and EOCDR; returns the finished archive
    pub fn finish(mut self, comment: &[u8]) -> Result<Vec<u8>> {
        if comment.len() > u16::MAX as usize {
            return Err(Error::CommentTooLong);
        }
        let cd_offset = u32::try_from(self.out.len()).map_err(|_| Error::ArchiveTooLarge)?;

        let entries = std::mem::take(&mut self.entries);
        for entry in &entries {
            self.push_u32(CFH_SIGNATURE);
            self.push_u16(VERSION_MADE_BY);
            self.push_u16(version_needed(entry.method));
            self.push_u16(0); // general purpose flags
            self.push_u16(entry.method.as_u16());
            self.push_u16(entry.mtime.time);
            self.push_u16(entry.mtime.date);
            self.push_u32(entry.crc32);
            self.push_u32(entry.comp_size);
            self.push_u32(entry.uncomp_size);
            self.push_u16(entry.name.len() as u16);
            self.push_u16(0); // extra field length
            self.push_u16(0); // comment length
            self.push_u16(0); // disk number start
            self.push_u16(0); // internal attributes
            self.push_u32(if entry.is_dir { EXT_ATTR_DIR } else { EXT_ATTR_FILE });
            self.push_u32(entry.lfh_offset);
            self.out.extend_from_slice(&entry.name);
        }

        let cd_size = u32::try_from(self.out.len() - cd_offset as usize)
            .map_err(|_| Error::ArchiveTooLarge)?;

        self.push_u32(EOCDR_SIGNATURE);
        self.push_u16(0); // disk number
        self.push_u16(0); // central directory start disk
        self.push_u16(entries.len() as u16);
        self.push_u16(entries.len() as u16);
        self.push_u32(cd_size);
        self.push_u32(cd_offset);
        self.push_u16(comment.len() as u16);
        self.out.extend_from_slice(comment);

        Ok(self.out)
    }

    fn push_u16(&mut self, value: u16) {
        self.out.extend_from_slice(&value.to_le_bytes());
    }

    fn push_u32(&mut self, value: u32) {
        self.out.extend_from_slice(&value.to_le_bytes());
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn version_needed(method: Method) -> u16 {
    match method {
        Method::Stored => VERSION_NEEDED_STORED,
        Method::Deflate => VERSION_NEEDED_DEFLATE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_archive_is_canonical() {
        let out = ArchiveWriter::new().finish(b"").unwrap();
        assert_eq!(out, EMPTY_ARCHIVE);
    }

    #[test]
    fn test_stays_under_max_size() {
        let files = [
            FileSpec { name: b"a.txt", data: b"foo", mtime: DosDateTime::EPOCH },
            FileSpec { name: b"b.txt", data: b"barbarbarbarbar", mtime: DosDateTime::EPOCH },
        ];
        let out = write_archive(&files, b"comment", None).unwrap();
        assert!(out.len() <= max_archive_size(&files, b"comment"));
    }

    #[test]
    fn test_incompressible_member_is_stored() {
        let data: Vec<u8> = (1..=255).collect();
        let mut writer = ArchiveWriter::new();
        let comp_size = writer.add(b"perm", &data, DosDateTime::EPOCH).unwrap();
        assert_eq!(comp_size, data.len() as u32);

        let out = writer.finish(b"").unwrap();
        // Method word in the LFH
        assert_eq!(u16::from_le_bytes([out[8], out[9]]), 0);
    }

    #[test]
    fn test_comment_too_long() {
        let comment = vec![b'a'; u16::MAX as usize + 1];
        assert!(matches!(
            ArchiveWriter::new().finish(&comment),
            Err(Error::CommentTooLong)
        ));
    }
}
