use std::sync::OnceLock;

use super::tables::{CODE_LENGTH_ORDER, DISTANCE_TABLE, LENGTH_TABLE};
use crate::bits::BitReader;
use crate::error::{Error, Result};
use crate::huffman::HuffmanDecoder;

/// Outcome of a successful `inflate`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inflated {
    /// Compressed bytes consumed, counting the final block's bit padding up
    /// to its containing byte
    pub src_used: usize,
    /// Bytes written to the destination
    pub dst_used: usize,
}

/// Decompress a DEFLATE stream from `src` into `dst`
///
/// `dst` doubles as the history buffer for back-references. On any error the
/// destination contents are unspecified.
pub fn inflate(src: &[u8], dst: &mut [u8]) -> Result<Inflated> {
    let mut bits = BitReader::new(src);
    let mut out_pos = 0usize;

    loop {
        let header = bits.read_bits(3)?;
        let is_final = header & 1 != 0;

        match (header >> 1) as u8 {
            0 => inflate_stored(&mut bits, dst, &mut out_pos)?,
            1 => {
                let (lit, dist) = fixed_decoders();
                inflate_symbols(&mut bits, lit, dist, dst, &mut out_pos)?;
            }
            2 => {
                let (lit, dist) = read_dynamic_decoders(&mut bits)?;
                inflate_symbols(&mut bits, &lit, &dist, dst, &mut out_pos)?;
            }
            btype => return Err(Error::InvalidBlockType(btype)),
        }

        if is_final {
            break;
        }
    }

    Ok(Inflated { src_used: bits.bytes_consumed(), dst_used: out_pos })
}

fn fixed_decoders() -> (&'static HuffmanDecoder, &'static HuffmanDecoder) {
    static FIXED: OnceLock<(HuffmanDecoder, HuffmanDecoder)> = OnceLock::new();
    let (lit, dist) =
        FIXED.get_or_init(|| (HuffmanDecoder::fixed_litlen(), HuffmanDecoder::fixed_dist()));
    (lit, dist)
}

/// Stored block: byte-aligned LEN/NLEN framing around raw bytes
fn inflate_stored(bits: &mut BitReader<'_>, dst: &mut [u8], out_pos: &mut usize) -> Result<()> {
    let len = bits.read_u16_le()?;
    let nlen = bits.read_u16_le()?;
    if len != !nlen {
        return Err(Error::StoredBlockLengthMismatch { len, nlen });
    }

    let payload = bits.read_bytes(len as usize)?;
    if *out_pos + payload.len() > dst.len() {
        return Err(Error::OutputFull);
    }
    dst[*out_pos..*out_pos + payload.len()].copy_from_slice(payload);
    *out_pos += payload.len();
    Ok(())
}

/// Parse the dynamic block header and build the two decoders
fn read_dynamic_decoders(bits: &mut BitReader<'_>) -> Result<(HuffmanDecoder, HuffmanDecoder)> {
    let hlit = bits.read_bits(5)? as usize + 257;
    let hdist = bits.read_bits(5)? as usize + 1;
    let hclen = bits.read_bits(4)? as usize + 4;

    let mut cl_lengths = [0u8; 19];
    for &sym in CODE_LENGTH_ORDER.iter().take(hclen) {
        cl_lengths[sym] = bits.read_bits(3)? as u8;
    }
    let cl_decoder = HuffmanDecoder::from_code_lengths(&cl_lengths)?;

    // Literal/length and distance code lengths share one RLE-coded sequence
    let total = hlit + hdist;
    let mut lengths = Vec::with_capacity(total);
    while lengths.len() < total {
        let sym = cl_decoder.decode(bits)?;
        match sym {
            0..=15 => lengths.push(sym as u8),
            16 => {
                let repeat = bits.read_bits(2)? as usize + 3;
                let prev = *lengths.last().ok_or(Error::InvalidCodeLengthSequence)?;
                lengths.extend(std::iter::repeat(prev).take(repeat));
            }
            17 => {
                let repeat = bits.read_bits(3)? as usize + 3;
                lengths.resize(lengths.len() + repeat, 0);
            }
            18 => {
                let repeat = bits.read_bits(7)? as usize + 11;
                lengths.resize(lengths.len() + repeat, 0);
            }
            _ => return Err(Error::InvalidHuffmanSymbol(sym)),
        }
    }
    if lengths.len() > total {
        return Err(Error::InvalidCodeLengthSequence);
    }

    let lit_decoder = HuffmanDecoder::from_code_lengths(&lengths[..hlit])?;
    let dist_decoder = HuffmanDecoder::from_code_lengths(&lengths[hlit..])?;
    Ok((lit_decoder, dist_decoder))
}

/// Decode literal and length/distance symbols until end of block
fn inflate_symbols(
    bits: &mut BitReader<'_>,
    lit_decoder: &HuffmanDecoder,
    dist_decoder: &HuffmanDecoder,
    dst: &mut [u8],
    out_pos: &mut usize,
) -> Result<()> {
    loop {
        let sym = lit_decoder.decode(bits)?;
        match sym {
            0..=255 => {
                if *out_pos == dst.len() {
                    return Err(Error::OutputFull);
                }
                dst[*out_pos] = sym as u8;
                *out_pos += 1;
            }
            256 => return Ok(()),
            257..=285 => {
                let (len_base, len_extra) = LENGTH_TABLE[sym as usize - 257];
                let length = len_base as usize + bits.read_bits(len_extra)? as usize;

                let dist_sym = dist_decoder.decode(bits)?;
                if dist_sym > 29 {
                    return Err(Error::InvalidHuffmanSymbol(dist_sym));
                }
                let (dist_base, dist_extra) = DISTANCE_TABLE[dist_sym as usize];
                let distance = dist_base as usize + bits.read_bits(dist_extra)? as usize;

                if distance > *out_pos {
                    return Err(Error::InvalidBackReference {
                        distance: distance as u16,
                        available: *out_pos,
                    });
                }
                if *out_pos + length > dst.len() {
                    return Err(Error::OutputFull);
                }
                // Byte-by-byte so overlapping copies repeat freshly written bytes
                for _ in 0..length {
                    dst[*out_pos] = dst[*out_pos - distance];
                    *out_pos += 1;
                }
            }
            _ => return Err(Error::InvalidHuffmanSymbol(sym)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORED_HELLO: [u8; 10] = [
        0x01, // bfinal: 1, btype: 00
        0x05, 0x00, // LEN = 5
        0xFA, 0xFF, // NLEN = !5
        b'H', b'e', b'l', b'l', b'o',
    ];

    #[test]
    fn test_stored_block() {
        let mut dst = [0u8; 10];
        let result = inflate(&STORED_HELLO, &mut dst).unwrap();
        assert_eq!(result, Inflated { src_used: 10, dst_used: 5 });
        assert_eq!(&dst[..5], b"Hello");
    }

    #[test]
    fn test_stored_block_bad_nlen() {
        let mut bad = STORED_HELLO;
        bad[3] = 0x12;
        bad[4] = 0x34;
        let mut dst = [0u8; 10];
        assert_eq!(
            inflate(&bad, &mut dst),
            Err(Error::StoredBlockLengthMismatch { len: 5, nlen: 0x3412 })
        );
    }

    #[test]
    fn test_stored_block_truncated() {
        let mut dst = [0u8; 10];
        for n in 0..STORED_HELLO.len() {
            assert_eq!(inflate(&STORED_HELLO[..n], &mut dst), Err(Error::InsufficientInput));
        }
    }

    #[test]
    fn test_stored_block_output_full() {
        let mut dst = [0u8; 4];
        assert_eq!(inflate(&STORED_HELLO, &mut dst), Err(Error::OutputFull));
    }

    #[test]
    fn test_reserved_block_type() {
        // bfinal: 0, btype: 11
        let src = [0x06];
        let mut dst = [0u8; 10];
        assert_eq!(inflate(&src, &mut dst), Err(Error::InvalidBlockType(3)));
    }

    #[test]
    fn test_empty_input() {
        let mut dst = [0u8; 1];
        assert_eq!(inflate(&[], &mut dst), Err(Error::InsufficientInput));
    }

    #[test]
    fn test_static_block_hand_built() {
        // bfinal=1, btype=01, literal 'a' (0x61 -> code 0x91, 8 bits), EOB
        let mut src = Vec::new();
        let mut buf = [0u8; 8];
        {
            let mut writer = crate::bits::BitWriter::new(&mut buf);
            writer.write_bits(1, 1).unwrap();
            writer.write_bits(0b01, 2).unwrap();
            // 'a' = symbol 97: fixed code 0x30 + 97 = 0x91, MSB-first over 8 bits
            writer.write_bits(crate::bits::reverse_bits(0x91, 8), 8).unwrap();
            writer.write_bits(0, 7).unwrap(); // EOB
            let n = writer.finish().unwrap();
            src.extend_from_slice(&buf[..n]);
        }

        let mut dst = [0u8; 4];
        let result = inflate(&src, &mut dst).unwrap();
        assert_eq!(result.dst_used, 1);
        assert_eq!(dst[0], b'a');
    }

    #[test]
    fn test_overlapping_copy() {
        // 'a' followed by a distance-1 length-4 copy, static codes
        let mut buf = [0u8; 8];
        let n = {
            let mut writer = crate::bits::BitWriter::new(&mut buf);
            writer.write_bits(1, 1).unwrap();
            writer.write_bits(0b01, 2).unwrap();
            writer.write_bits(crate::bits::reverse_bits(0x91, 8), 8).unwrap(); // 'a'
            writer.write_bits(crate::bits::reverse_bits(0b0000010, 7), 7).unwrap(); // sym 258: len 4
            writer.write_bits(crate::bits::reverse_bits(0, 5), 5).unwrap(); // dist code 0: dist 1
            writer.write_bits(0, 7).unwrap(); // EOB
            writer.finish().unwrap()
        };

        let mut dst = [0u8; 8];
        let result = inflate(&buf[..n], &mut dst).unwrap();
        assert_eq!(&dst[..result.dst_used], b"aaaaa");
    }

    #[test]
    fn test_distance_beyond_output() {
        // Length/distance pair as the very first symbol: nothing to copy from
        let mut buf = [0u8; 8];
        let n = {
            let mut writer = crate::bits::BitWriter::new(&mut buf);
            writer.write_bits(1, 1).unwrap();
            writer.write_bits(0b01, 2).unwrap();
            writer.write_bits(crate::bits::reverse_bits(0b0000010, 7), 7).unwrap(); // len 4
            writer.write_bits(crate::bits::reverse_bits(0, 5), 5).unwrap(); // dist 1
            writer.write_bits(0, 7).unwrap();
            writer.finish().unwrap()
        };

        let mut dst = [0u8; 8];
        assert_eq!(
            inflate(&buf[..n], &mut dst),
            Err(Error::InvalidBackReference { distance: 1, available: 0 })
        );
    }
}
