//! RIFF/WAVE container header: parsing (via `nom`) and emission.

use nom::{
    bytes::complete::{tag, take},
    number::complete::{le_u16, le_u32},
    IResult,
};

use crate::error::{Error, Result};

const FORMAT_TAG_IMA_ADPCM: u16 = 0x0011;
const FMT_EXTRA_SIZE: u16 = 2;
const FACT_CHUNK_SIZE: u32 = 4;
const HEADER_SIZE: usize = 60;

/// Parsed RIFF/WAVE IMA-ADPCM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub num_channels: u16,
    pub sampling_rate: u32,
    pub byte_rate: u32,
    pub block_size: u16,
    pub bits_per_sample: u16,
    pub samples_per_block: u32,
    pub num_samples: u32,
    pub data_offset: usize,
    pub data_size: u32,
}

impl WavHeader {
    pub fn samples_per_block_for(block_size: u16, num_channels: u16) -> Result<u32> {
        let frame = 4u32 * num_channels as u32;
        if (block_size as u32) < frame {
            return Err(Error::invalid_format(format!(
                "block_size {block_size} smaller than header size {frame}"
            )));
        }
        Ok(1 + 8 * (block_size as u32 - frame) / frame)
    }

    pub fn num_blocks(&self) -> u32 {
        self.data_size / self.block_size as u32
    }
}

fn chunk_id(input: &[u8]) -> IResult<&[u8], &[u8], HeaderParseError> {
    take(4usize)(input)
}

/// `nom` error carrier distinguishing truncated input from schema violations.
///
/// `*::complete` parsers report running out of bytes as `ErrorKind::Eof`; this crate maps
/// that specifically to [`Error::InsufficientData`] and everything else (tag mismatches,
/// our own explicit `Err::Failure` verify sites below) to [`Error::InvalidFormat`].
#[derive(Debug)]
struct HeaderParseError(Error);

impl<'a> nom::error::ParseError<&'a [u8]> for HeaderParseError {
    fn from_error_kind(input: &'a [u8], kind: nom::error::ErrorKind) -> Self {
        let err = if kind == nom::error::ErrorKind::Eof {
            Error::InsufficientData {
                needed: input.len() + 1,
                available: input.len(),
            }
        } else {
            Error::invalid_format("malformed RIFF/WAVE header")
        };
        HeaderParseError(err)
    }

    fn append(_input: &'a [u8], _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

fn verify_fail<T>(reason: &'static str) -> IResult<&[u8], T, HeaderParseError> {
    Err(nom::Err::Failure(HeaderParseError(Error::invalid_format(
        reason,
    ))))
}

/// Parses a full IMA-ADPCM WAVE header, skipping unknown chunks by their declared size.
pub fn decode_header(bytes: &[u8]) -> Result<WavHeader> {
    const MIN_RIFF_PREFIX: usize = 12; // "RIFF" + size (u32) + "WAVE"
    if bytes.len() < MIN_RIFF_PREFIX {
        return Err(Error::InsufficientData {
            needed: MIN_RIFF_PREFIX,
            available: bytes.len(),
        });
    }
    parse_header(bytes).map(|(_, header)| header).map_err(|e| match e {
        nom::Err::Error(HeaderParseError(err)) | nom::Err::Failure(HeaderParseError(err)) => err,
        nom::Err::Incomplete(_) => Error::InsufficientData {
            needed: bytes.len() + 1,
            available: bytes.len(),
        },
    })
}

fn parse_header(bytes: &[u8]) -> IResult<&[u8], WavHeader, HeaderParseError> {
    let (input, _) = tag("RIFF")(bytes)?;
    let (input, _riff_size) = le_u32(input)?;
    let (input, _) = tag("WAVE")(input)?;

    let mut input = input;
    let mut num_channels = 0u16;
    let mut sampling_rate = 0u32;
    let mut byte_rate = 0u32;
    let mut block_size = 0u16;
    let mut bits_per_sample = 0u16;
    let mut samples_per_block = 0u32;
    let mut fact_num_samples: Option<u32> = None;
    let mut fmt_seen = false;

    loop {
        let (rest, id) = chunk_id(input)?;
        let (rest, size) = le_u32(rest)?;

        match id {
            b"fmt " => {
                let (rest2, format_tag) = le_u16(rest)?;
                let (rest2, ch) = le_u16(rest2)?;
                let (rest2, sr) = le_u32(rest2)?;
                let (rest2, br) = le_u32(rest2)?;
                let (rest2, blk) = le_u16(rest2)?;
                let (rest2, bits) = le_u16(rest2)?;
                let (rest2, extra) = le_u16(rest2)?;
                let (rest2, spb) = le_u16(rest2)?;
                let spb = spb as u32;

                if format_tag != FORMAT_TAG_IMA_ADPCM {
                    return verify_fail("fmt chunk format tag must be 17 (IMA-ADPCM)");
                }
                if extra != FMT_EXTRA_SIZE {
                    return verify_fail("fmt chunk extra size must be 2");
                }
                if bits != 4 {
                    return verify_fail("bits_per_sample must be 4");
                }
                if ch == 0 || ch > 2 {
                    return verify_fail("num_channels must be 1 or 2");
                }

                num_channels = ch;
                sampling_rate = sr;
                byte_rate = br;
                block_size = blk;
                bits_per_sample = bits;
                samples_per_block = spb;
                fmt_seen = true;
                input = rest2;
            }
            b"fact" => {
                if size != FACT_CHUNK_SIZE {
                    return verify_fail("fact chunk size must be 4");
                }
                let (rest2, total) = le_u32(rest)?;
                fact_num_samples = Some(total);
                input = rest2;
            }
            b"data" => {
                if !fmt_seen {
                    return verify_fail("data chunk encountered before fmt chunk");
                }
                let data_offset = bytes.len() - rest.len();
                let num_samples = fact_num_samples.unwrap_or_else(|| {
                    // off-by-one overestimate reproduced intentionally when `fact` is absent
                    (size / block_size as u32 + 1) * samples_per_block
                });
                let header = WavHeader {
                    num_channels,
                    sampling_rate,
                    byte_rate,
                    block_size,
                    bits_per_sample,
                    samples_per_block,
                    num_samples,
                    data_offset,
                    data_size: size,
                };
                return Ok((rest, header));
            }
            _ => {
                let (rest2, _skipped) = take(size as usize)(rest)?;
                input = rest2;
            }
        }
    }
}

/// Emits a fixed 60-byte IMA-ADPCM WAVE header into `out`, returning the number of bytes written.
pub fn encode_header(header: &WavHeader, out: &mut [u8]) -> Result<usize> {
    if header.num_channels == 0 || header.num_channels > 2 {
        return Err(Error::invalid_format("num_channels must be 1 or 2"));
    }
    if header.bits_per_sample != 4 {
        return Err(Error::invalid_format("bits_per_sample must be 4"));
    }
    if header.samples_per_block > u16::MAX as u32 {
        return Err(Error::invalid_format("samples_per_block does not fit the wire format's u16 field"));
    }
    if out.len() < HEADER_SIZE {
        return Err(Error::InsufficientBuffer {
            needed: HEADER_SIZE,
            available: out.len(),
        });
    }

    let fmt_chunk_size: u32 = 20;
    let fact_chunk_size: u32 = FACT_CHUNK_SIZE;
    let riff_size = 4 + (8 + fmt_chunk_size) + (8 + fact_chunk_size) + (8 + header.data_size);

    let mut w = 0usize;
    macro_rules! put_bytes {
        ($bytes:expr) => {{
            let b = $bytes;
            out[w..w + b.len()].copy_from_slice(&b);
            w += b.len();
        }};
    }

    put_bytes!(*b"RIFF");
    put_bytes!(riff_size.to_le_bytes());
    put_bytes!(*b"WAVE");

    put_bytes!(*b"fmt ");
    put_bytes!(fmt_chunk_size.to_le_bytes());
    put_bytes!(FORMAT_TAG_IMA_ADPCM.to_le_bytes());
    put_bytes!(header.num_channels.to_le_bytes());
    put_bytes!(header.sampling_rate.to_le_bytes());
    put_bytes!(header.byte_rate.to_le_bytes());
    put_bytes!(header.block_size.to_le_bytes());
    put_bytes!(header.bits_per_sample.to_le_bytes());
    put_bytes!(FMT_EXTRA_SIZE.to_le_bytes());
    put_bytes!(header.samples_per_block.to_le_bytes());

    put_bytes!(*b"fact");
    put_bytes!(fact_chunk_size.to_le_bytes());
    put_bytes!(header.num_samples.to_le_bytes());

    put_bytes!(*b"data");
    put_bytes!(header.data_size.to_le_bytes());

    Ok(w)
}
