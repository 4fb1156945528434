//! moiadpcm is an IMA-ADPCM audio codec built around a beam-search optimizing encoder.
//!
//! A plain IMA-ADPCM encoder picks each 4-bit nibble by local quantisation only. This
//! crate's encoder instead runs a bounded look-ahead search over a handful of candidate
//! paths per sample, keeping whichever nibble sequence minimises prediction error several
//! samples into the future, while always keeping a reference greedy path as a fallback so
//! the search can never do worse than a plain encoder would.
//!
//! # Examples
//!
//! Round-tripping a short mono signal:
//! ```
//! use moiadpcm::{decode_header, Encoder, EncodeParameter, decode_whole};
//!
//! let samples: Vec<i16> = (0..256)
//!     .map(|t| (8000.0 * (2.0 * std::f64::consts::PI * 440.0 * t as f64 / 8000.0).sin()) as i16)
//!     .collect();
//!
//! let mut encoder = Encoder::new(256).unwrap();
//! encoder
//!     .set_encode_parameter(EncodeParameter {
//!         num_channels: 1,
//!         sampling_rate: 8000,
//!         bits_per_sample: 4,
//!         block_size: 256,
//!         search_beam_width: 4,
//!         search_depth: 2,
//!     })
//!     .unwrap();
//! let encoded = encoder.encode_whole(&[&samples], samples.len()).unwrap();
//!
//! let dims = decode_header(&encoded).unwrap();
//! let mut pcm = vec![vec![0i16; dims.num_samples as usize]; dims.num_channels as usize];
//! let header = decode_whole(&encoded, &mut pcm).unwrap();
//! assert_eq!(header.num_samples as usize, samples.len());
//! assert_eq!(pcm[0][0], samples[0]);
//! ```

pub mod block;
pub mod core;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod tables;

pub use core::CoreState;
pub use decoder::decode_whole;
pub use encoder::{EncodeParameter, Encoder};
pub use error::{Error, Result};
pub use header::{decode_header, encode_header, WavHeader};
