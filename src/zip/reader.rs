use memchr::memmem;

use super::constants::*;
use super::date::DosDateTime;
use super::Method;
use crate::crc32::crc32;
use crate::deflate::inflate;
use crate::error::{Error, Result};

/// A parsed archive, borrowing the caller's buffer
///
/// `parse` validates every record up front; the member iterator afterwards
/// is a cheap re-walk of the already checked central directory.
pub struct Archive<'a> {
    data: &'a [u8],
    comment: &'a [u8],
    num_members: u16,
    cd_start: usize,
    cd_end: usize,
}

/// One member as described by its central file header
///
/// All fields come from the CFH; the local header only contributes the
/// payload location and is bounds-checked during `Archive::parse`.
#[derive(Clone, Copy, Debug)]
pub struct Member<'a> {
    pub name: &'a [u8],
    pub comment: &'a [u8],
    pub mtime: DosDateTime,
    pub method: Method,
    pub crc32: u32,
    pub comp_size: u32,
    pub uncomp_size: u32,
    pub is_dir: bool,
    pub comp_data: &'a [u8],
}

impl<'a> Archive<'a> {
    /// Parse and validate an archive held in `data`
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let eocdr = find_eocdr(data).ok_or(Error::EocdrNotFound)?;

        let disk_nbr = read_u16(data, eocdr + 4).ok_or(Error::MemberOutOfBounds)?;
        let cd_start_disk = read_u16(data, eocdr + 6).ok_or(Error::MemberOutOfBounds)?;
        let disk_entries = read_u16(data, eocdr + 8).ok_or(Error::MemberOutOfBounds)?;
        let total_entries = read_u16(data, eocdr + 10).ok_or(Error::MemberOutOfBounds)?;
        let cd_size = read_u32(data, eocdr + 12).ok_or(Error::MemberOutOfBounds)?;
        let cd_offset = read_u32(data, eocdr + 16).ok_or(Error::MemberOutOfBounds)?;
        let comment_len = read_u16(data, eocdr + 20).ok_or(Error::MemberOutOfBounds)?;

        if disk_nbr != 0 || cd_start_disk != 0 || disk_entries != total_entries {
            return Err(Error::MultiDiskArchive);
        }

        if cd_offset as u64 + cd_size as u64 > eocdr as u64 {
            return Err(Error::MemberOutOfBounds);
        }
        let cd_start = cd_offset as usize;
        let cd_end = cd_start + cd_size as usize;

        let mut offset = cd_start;
        for _ in 0..total_entries {
            offset = validate_entry(data, offset, cd_end)?;
        }
        if offset != cd_end {
            return Err(Error::CentralDirectoryMismatch);
        }

        let comment = &data[eocdr + EOCDR_SIZE..eocdr + EOCDR_SIZE + comment_len as usize];
        Ok(Self { data, comment, num_members: total_entries, cd_start, cd_end })
    }

    /// Archive comment bytes
    pub fn comment(&self) -> &'a [u8] {
        self.comment
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.num_members as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_members == 0
    }

    /// Iterate the members in central directory order
    pub fn members(&self) -> Members<'a> {
        Members { data: self.data, offset: self.cd_start, end: self.cd_end }
    }
}

/// Lazy member iterator over a validated central directory
pub struct Members<'a> {
    data: &'a [u8],
    offset: usize,
    end: usize,
}

impl<'a> Iterator for Members<'a> {
    type Item = Member<'a>;

    fn next(&mut self) -> Option<Member<'a>> {
        if self.offset >= self.end {
            return None;
        }
        let (member, next) = member_at(self.data, self.offset)?;
        self.offset = next;
        Some(member)
    }
}

impl Member<'_> {
    /// Decompress (or copy) the payload into `dst`, verifying the declared
    /// size and CRC-32. Returns the number of bytes produced.
    pub fn extract(&self, dst: &mut [u8]) -> Result<usize> {
        let n = self.uncomp_size as usize;
        if dst.len() < n {
            return Err(Error::OutputFull);
        }

        match self.method {
            Method::Stored => dst[..n].copy_from_slice(self.comp_data),
            Method::Deflate => {
                let result = inflate(self.comp_data, &mut dst[..n])?;
                if result.dst_used != n {
                    return Err(Error::SizeMismatch {
                        expected: self.uncomp_size,
                        found: result.dst_used as u32,
                    });
                }
            }
        }

        let found = crc32(&dst[..n]);
        if found != self.crc32 {
            return Err(Error::Crc32Mismatch { expected: self.crc32, found });
        }
        Ok(n)
    }
}

/// Scan backward for an EOCDR whose comment length lands exactly on the end
/// of the buffer
fn find_eocdr(data: &[u8]) -> Option<usize> {
    let signature = EOCDR_SIGNATURE.to_le_bytes();
    for pos in memmem::rfind_iter(data, &signature) {
        if let Some(comment_len) = read_u16(data, pos + 20) {
            if pos + EOCDR_SIZE + comment_len as usize == data.len() {
                return Some(pos);
            }
        }
    }
    None
}

/// Validate one central directory entry and the local header it points at;
/// returns the offset of the next entry
fn validate_entry(data: &[u8], offset: usize, cd_end: usize) -> Result<usize> {
    let signature = read_u32(data, offset).ok_or(Error::MemberOutOfBounds)?;
    if signature != CFH_SIGNATURE {
        return Err(Error::BadRecordSignature { expected: CFH_SIGNATURE, found: signature });
    }
    if offset + CFH_SIZE > cd_end {
        return Err(Error::MemberOutOfBounds);
    }

    let method_raw = read_u16(data, offset + 10).ok_or(Error::MemberOutOfBounds)?;
    let comp_size = read_u32(data, offset + 20).ok_or(Error::MemberOutOfBounds)?;
    let uncomp_size = read_u32(data, offset + 24).ok_or(Error::MemberOutOfBounds)?;
    let name_len = read_u16(data, offset + 28).ok_or(Error::MemberOutOfBounds)?;
    let extra_len = read_u16(data, offset + 30).ok_or(Error::MemberOutOfBounds)?;
    let comment_len = read_u16(data, offset + 32).ok_or(Error::MemberOutOfBounds)?;
    let lfh_offset = read_u32(data, offset + 42).ok_or(Error::MemberOutOfBounds)?;

    let next =
        offset + CFH_SIZE + name_len as usize + extra_len as usize + comment_len as usize;
    if next > cd_end {
        return Err(Error::MemberOutOfBounds);
    }

    let method = Method::from_u16(method_raw)?;
    if method == Method::Stored && comp_size != uncomp_size {
        return Err(Error::StoredSizeMismatch { comp_size, uncomp_size });
    }

    // The local header must exist and its payload must lie inside the buffer
    let lfh = lfh_offset as usize;
    let lfh_sig = read_u32(data, lfh).ok_or(Error::MemberOutOfBounds)?;
    if lfh_sig != LFH_SIGNATURE {
        return Err(Error::BadRecordSignature { expected: LFH_SIGNATURE, found: lfh_sig });
    }
    let lfh_name_len = read_u16(data, lfh + 26).ok_or(Error::MemberOutOfBounds)?;
    let lfh_extra_len = read_u16(data, lfh + 28).ok_or(Error::MemberOutOfBounds)?;

    let payload_start =
        lfh as u64 + LFH_SIZE as u64 + lfh_name_len as u64 + lfh_extra_len as u64;
    if payload_start + comp_size as u64 > data.len() as u64 {
        return Err(Error::MemberOutOfBounds);
    }

    Ok(next)
}

/// Build a member view from an already validated entry
fn member_at(data: &[u8], offset: usize) -> Option<(Member<'_>, usize)> {
    if read_u32(data, offset)? != CFH_SIGNATURE {
        return None;
    }

    let method = Method::from_u16(read_u16(data, offset + 10)?).ok()?;
    let mod_time = read_u16(data, offset + 12)?;
    let mod_date = read_u16(data, offset + 14)?;
    let crc32 = read_u32(data, offset + 16)?;
    let comp_size = read_u32(data, offset + 20)?;
    let uncomp_size = read_u32(data, offset + 24)?;
    let name_len = read_u16(data, offset + 28)? as usize;
    let extra_len = read_u16(data, offset + 30)? as usize;
    let comment_len = read_u16(data, offset + 32)? as usize;
    let lfh_offset = read_u32(data, offset + 42)? as usize;

    let name = data.get(offset + CFH_SIZE..offset + CFH_SIZE + name_len)?;
    let comment_start = offset + CFH_SIZE + name_len + extra_len;
    let comment = data.get(comment_start..comment_start + comment_len)?;

    let lfh_name_len = read_u16(data, lfh_offset + 26)? as usize;
    let lfh_extra_len = read_u16(data, lfh_offset + 28)? as usize;
    let payload_start = lfh_offset + LFH_SIZE + lfh_name_len + lfh_extra_len;
    let comp_data = data.get(payload_start..payload_start + comp_size as usize)?;

    let member = Member {
        name,
        comment,
        mtime: DosDateTime { date: mod_date, time: mod_time },
        method,
        crc32,
        comp_size,
        uncomp_size,
        is_dir: name.last() == Some(&b'/'),
        comp_data,
    };
    Some((member, comment_start + comment_len))
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_archive() {
        let archive = Archive::parse(&EMPTY_ARCHIVE).unwrap();
        assert_eq!(archive.len(), 0);
        assert!(archive.is_empty());
        assert_eq!(archive.comment(), b"");
        assert_eq!(archive.members().count(), 0);
    }

    #[test]
    fn test_truncated_empty_archive() {
        for n in 0..EMPTY_ARCHIVE.len() {
            assert!(Archive::parse(&EMPTY_ARCHIVE[..n]).is_err());
        }
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let mut data = EMPTY_ARCHIVE.to_vec();
        data.push(0x00);
        assert!(matches!(Archive::parse(&data), Err(Error::EocdrNotFound)));
    }

    #[test]
    fn test_comment_reaches_end() {
        let mut data = EMPTY_ARCHIVE.to_vec();
        data[20] = 5; // comment_len
        data.extend_from_slice(b"hello");
        let archive = Archive::parse(&data).unwrap();
        assert_eq!(archive.comment(), b"hello");
    }

    #[test]
    fn test_multi_disk_rejected() {
        let mut data = EMPTY_ARCHIVE.to_vec();
        data[4] = 1; // disk number
        assert!(matches!(Archive::parse(&data), Err(Error::MultiDiskArchive)));
    }
}
