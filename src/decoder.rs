//! Whole-file decode: header parse followed by block-by-block unpacking.

use crate::block::{block_byte_length, unpack_block};
use crate::error::{Error, Result};
use crate::header::{decode_header, WavHeader};

/// Decodes an entire IMA-ADPCM WAVE file into `out`, one pre-sized vector per channel.
///
/// `out` must have exactly `header.num_channels` entries, each already sized to at least
/// `header.num_samples`; callers that only need a header's dimensions can call
/// [`decode_header`] directly without allocating PCM output. Returns the parsed header.
pub fn decode_whole(bytes: &[u8], out: &mut [Vec<i16>]) -> Result<WavHeader> {
    let header = decode_header(bytes)?;
    let data = &bytes[header.data_offset..];
    if data.len() < header.data_size as usize {
        return Err(Error::InsufficientData {
            needed: header.data_size as usize,
            available: data.len(),
        });
    }
    let data = &data[..header.data_size as usize];

    let num_channels = header.num_channels as usize;
    let num_samples = header.num_samples as usize;
    if out.len() != num_channels {
        return Err(Error::InsufficientBuffer {
            needed: num_channels,
            available: out.len(),
        });
    }
    for channel in out.iter() {
        if channel.len() < num_samples {
            return Err(Error::InsufficientBuffer {
                needed: num_samples,
                available: channel.len(),
            });
        }
    }

    let samples_per_block = header.samples_per_block as usize;
    let mut remaining_samples = header.num_samples as usize;
    let mut sample_offset = 0usize;
    let mut block_offset = 0usize;

    while remaining_samples > 0 {
        let n = remaining_samples.min(samples_per_block);
        let block_len = block_byte_length(num_channels, n);
        if block_offset + block_len > data.len() {
            break;
        }
        let block_bytes = &data[block_offset..block_offset + block_len];

        let mut slices: Vec<Vec<i16>> = (0..num_channels).map(|_| vec![0i16; n]).collect();
        unpack_block(block_bytes, num_channels, n, &mut slices)?;

        for (ch, slice) in slices.into_iter().enumerate() {
            out[ch][sample_offset..sample_offset + n].copy_from_slice(&slice);
        }

        sample_offset += n;
        remaining_samples -= n;
        block_offset += block_len;
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CoreState;
    use crate::header::encode_header;

    #[test]
    fn decode_whole_reads_single_mono_block() {
        let init = CoreState::new(42, 10);
        let nibbles = [0u8, 1, 2, 3];
        let mut block_buf = vec![0u8; 32];
        let written = crate::block::pack_block(&[init], &[&nibbles], &mut block_buf).unwrap();
        block_buf.truncate(written);

        let header = WavHeader {
            num_channels: 1,
            sampling_rate: 8000,
            byte_rate: 4000,
            block_size: written as u16,
            bits_per_sample: 4,
            samples_per_block: 4,
            num_samples: 4,
            data_offset: 60,
            data_size: written as u32,
        };
        let mut file = vec![0u8; 60];
        encode_header(&header, &mut file).unwrap();
        file.extend_from_slice(&block_buf);

        let mut pcm = vec![vec![0i16; 4]];
        let parsed_header = decode_whole(&file, &mut pcm).unwrap();
        assert_eq!(parsed_header.num_samples, 4);
        assert_eq!(pcm[0][0], 42);
    }

    #[test]
    fn decode_whole_rejects_undersized_output_buffer() {
        let init = CoreState::new(42, 10);
        let nibbles = [0u8, 1, 2, 3];
        let mut block_buf = vec![0u8; 32];
        let written = crate::block::pack_block(&[init], &[&nibbles], &mut block_buf).unwrap();
        block_buf.truncate(written);

        let header = WavHeader {
            num_channels: 1,
            sampling_rate: 8000,
            byte_rate: 4000,
            block_size: written as u16,
            bits_per_sample: 4,
            samples_per_block: 4,
            num_samples: 4,
            data_offset: 60,
            data_size: written as u32,
        };
        let mut file = vec![0u8; 60];
        encode_header(&header, &mut file).unwrap();
        file.extend_from_slice(&block_buf);

        let mut too_small = vec![vec![0i16; 2]];
        let err = decode_whole(&file, &mut too_small).unwrap_err();
        assert_eq!(
            err,
            Error::InsufficientBuffer {
                needed: 4,
                available: 2,
            }
        );
    }
}
