use std::sync::OnceLock;

use super::matcher::Matcher;
use super::tables::{encode_distance, encode_length, CODE_LENGTH_EXTRA, CODE_LENGTH_ORDER};
use super::tokens::Token;
use super::MAX_MATCH;
use crate::bits::BitWriter;
use crate::error::Result;
use crate::huffman::decoder::MAX_CODE_LENGTH;
use crate::huffman::tables::{fixed_dist_lengths, fixed_litlen_lengths};
use crate::huffman::{build_code_table, compute_code_lengths, CodeTable};

/// Maximum code length for the code length alphabet
const MAX_CL_CODE_LENGTH: u8 = 7;

/// A block closes once it covers this many source bytes. Kept under the
/// 16-bit stored LEN field even when the closing token is a full-length match.
const MAX_BLOCK_SRC: usize = 65535 - MAX_MATCH;

/// ... or once it holds this many tokens
const MAX_BLOCK_TOKENS: usize = 16384;

/// Compress `src` into `dst`, returning the number of bytes written
///
/// Each block is emitted in whichever of the three DEFLATE encodings costs
/// the fewest bits; ties prefer static over dynamic over stored. Fails with
/// `Error::OutputFull` when `dst` cannot hold the stream, in which case the
/// contents of `dst` are unspecified.
pub fn deflate(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut writer = BitWriter::new(dst);
    let mut matcher = Matcher::new(src);
    let mut tokens: Vec<Token> = Vec::with_capacity(MAX_BLOCK_TOKENS.min(src.len() + 1));

    let mut block_start = 0usize;
    let mut covered = 0usize;

    while let Some(token) = matcher.next_token() {
        tokens.push(token);
        covered += token.source_len();

        let is_final = covered == src.len();
        if is_final || covered - block_start >= MAX_BLOCK_SRC || tokens.len() >= MAX_BLOCK_TOKENS {
            write_block(&mut writer, &src[block_start..covered], &tokens, is_final)?;
            tokens.clear();
            block_start = covered;
        }
    }

    if src.is_empty() {
        write_block(&mut writer, &[], &[], true)?;
    }

    writer.finish()
}

fn fixed_codes() -> &'static (CodeTable, CodeTable) {
    static FIXED_CODES: OnceLock<(CodeTable, CodeTable)> = OnceLock::new();
    FIXED_CODES.get_or_init(|| {
        (build_code_table(&fixed_litlen_lengths()), build_code_table(&fixed_dist_lengths()))
    })
}

/// Emit one block in the cheapest encoding
fn write_block(
    writer: &mut BitWriter<'_>,
    src_block: &[u8],
    tokens: &[Token],
    is_final: bool,
) -> Result<()> {
    let (lit_freq, dist_freq) = count_frequencies(tokens);

    let num_lit = last_used(&lit_freq).max(257);
    let num_dist = last_used(&dist_freq).max(1);

    let lit_lengths = compute_code_lengths(&lit_freq[..num_lit], MAX_CODE_LENGTH);
    let dist_lengths = compute_code_lengths(&dist_freq[..num_dist], MAX_CODE_LENGTH);
    let header = DynamicHeader::plan(&lit_lengths, &dist_lengths);

    let static_cost =
        3 + body_cost(tokens, &fixed_litlen_lengths(), &fixed_dist_lengths());
    let dynamic_cost = 3 + header.bits + body_cost(tokens, &lit_lengths, &dist_lengths);
    let stored_cost = {
        let padding = (8 - (writer.bit_position() + 3) % 8) % 8;
        3 + padding + 32 + 8 * src_block.len() as u64
    };

    writer.write_bits(is_final as u32, 1)?;

    if static_cost <= dynamic_cost && static_cost <= stored_cost {
        writer.write_bits(0b01, 2)?;
        let (lit_codes, dist_codes) = fixed_codes();
        write_tokens(writer, tokens, lit_codes, dist_codes)
    } else if dynamic_cost <= stored_cost {
        writer.write_bits(0b10, 2)?;
        header.write(writer)?;
        let lit_codes = build_code_table(&lit_lengths);
        let dist_codes = build_code_table(&dist_lengths);
        write_tokens(writer, tokens, &lit_codes, &dist_codes)
    } else {
        writer.write_bits(0b00, 2)?;
        writer.align_to_byte()?;
        let len = src_block.len() as u16;
        writer.write_bits(len as u32, 16)?;
        writer.write_bits(!len as u32, 16)?;
        writer.write_bytes(src_block)
    }
}

/// Symbol frequencies over the token stream; the end-of-block symbol is
/// always counted once
fn count_frequencies(tokens: &[Token]) -> ([u32; 286], [u32; 30]) {
    let mut lit_freq = [0u32; 286];
    let mut dist_freq = [0u32; 30];

    for token in tokens {
        match *token {
            Token::Literal(byte) => lit_freq[byte as usize] += 1,
            Token::Copy { length, distance } => {
                let (len_code, _, _) = encode_length(length);
                let (dist_code, _, _) = encode_distance(distance);
                lit_freq[len_code as usize] += 1;
                dist_freq[dist_code as usize] += 1;
            }
        }
    }
    lit_freq[256] = 1;

    (lit_freq, dist_freq)
}

fn last_used(freqs: &[u32]) -> usize {
    freqs.iter().rposition(|&f| f > 0).map_or(0, |i| i + 1)
}

/// Bit cost of the token stream plus end-of-block under the given code lengths
fn body_cost(tokens: &[Token], lit_lengths: &[u8], dist_lengths: &[u8]) -> u64 {
    let mut bits = lit_lengths[256] as u64;
    for token in tokens {
        bits += match *token {
            Token::Literal(byte) => lit_lengths[byte as usize] as u64,
            Token::Copy { length, distance } => {
                let (len_code, _, len_extra) = encode_length(length);
                let (dist_code, _, dist_extra) = encode_distance(distance);
                lit_lengths[len_code as usize] as u64
                    + len_extra as u64
                    + dist_lengths[dist_code as usize] as u64
                    + dist_extra as u64
            }
        };
    }
    bits
}

/// Emit the token stream and the end-of-block symbol under the given codes
fn write_tokens(
    writer: &mut BitWriter<'_>,
    tokens: &[Token],
    lit_codes: &CodeTable,
    dist_codes: &CodeTable,
) -> Result<()> {
    for token in tokens {
        match *token {
            Token::Literal(byte) => {
                let (code, len) = lit_codes[byte as usize];
                writer.write_bits(code as u32, len)?;
            }
            Token::Copy { length, distance } => {
                let (len_code, len_extra, len_ebits) = encode_length(length);
                let (code, len) = lit_codes[len_code as usize];
                writer.write_bits(code as u32, len)?;
                writer.write_bits(len_extra as u32, len_ebits)?;

                let (dist_code, dist_extra, dist_ebits) = encode_distance(distance);
                let (code, len) = dist_codes[dist_code as usize];
                writer.write_bits(code as u32, len)?;
                writer.write_bits(dist_extra as u32, dist_ebits)?;
            }
        }
    }

    let (code, len) = lit_codes[256];
    writer.write_bits(code as u32, len)
}

/// Planned serialization of a dynamic block header (RFC 1951 section 3.2.7)
struct DynamicHeader {
    hlit: usize,
    hdist: usize,
    hclen: usize,
    cl_lengths: Vec<u8>,
    cl_codes: CodeTable,
    rle: Vec<(u8, u8)>,
    /// Total header cost in bits, excluding the 3 block-header bits
    bits: u64,
}

impl DynamicHeader {
    fn plan(lit_lengths: &[u8], dist_lengths: &[u8]) -> Self {
        let combined: Vec<u8> =
            lit_lengths.iter().chain(dist_lengths.iter()).copied().collect();
        let rle = rle_encode_lengths(&combined);

        let mut cl_freq = [0u32; 19];
        for &(sym, _) in &rle {
            cl_freq[sym as usize] += 1;
        }
        let cl_lengths = compute_code_lengths(&cl_freq, MAX_CL_CODE_LENGTH);
        let cl_codes = build_code_table(&cl_lengths);

        // Smallest suffix trim of the permuted code-length lengths, minimum 4
        let hclen = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&sym| cl_lengths[sym] > 0)
            .map_or(4, |i| (i + 1).max(4));

        let mut bits = (5 + 5 + 4 + 3 * hclen) as u64;
        for &(sym, _) in &rle {
            bits += cl_lengths[sym as usize] as u64;
            if sym >= 16 {
                bits += CODE_LENGTH_EXTRA[sym as usize - 16] as u64;
            }
        }

        Self {
            hlit: lit_lengths.len() - 257,
            hdist: dist_lengths.len() - 1,
            hclen,
            cl_lengths,
            cl_codes,
            rle,
            bits,
        }
    }

    fn write(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        writer.write_bits(self.hlit as u32, 5)?;
        writer.write_bits(self.hdist as u32, 5)?;
        writer.write_bits(self.hclen as u32 - 4, 4)?;

        for &sym in CODE_LENGTH_ORDER.iter().take(self.hclen) {
            writer.write_bits(self.cl_lengths[sym] as u32, 3)?;
        }

        for &(sym, extra) in &self.rle {
            let (code, len) = self.cl_codes[sym as usize];
            writer.write_bits(code as u32, len)?;
            if sym >= 16 {
                writer.write_bits(extra as u32, CODE_LENGTH_EXTRA[sym as usize - 16])?;
            }
        }
        Ok(())
    }
}

/// Run-length encode code lengths with the repeat symbols 16, 17 and 18
fn rle_encode_lengths(lengths: &[u8]) -> Vec<(u8, u8)> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < lengths.len() {
        let len = lengths[i];
        let mut run = 1;
        while i + run < lengths.len() && lengths[i + run] == len {
            run += 1;
        }
        i += run;

        if len == 0 {
            while run >= 11 {
                let n = run.min(138);
                out.push((18, (n - 11) as u8));
                run -= n;
            }
            if run >= 3 {
                out.push((17, (run - 3) as u8));
                run = 0;
            }
            out.extend(std::iter::repeat((0, 0)).take(run));
        } else {
            out.push((len, 0));
            run -= 1;
            while run >= 3 {
                let n = run.min(6);
                out.push((16, (n - 3) as u8));
                run -= n;
            }
            out.extend(std::iter::repeat((len, 0)).take(run));
        }
    }

    out
}
