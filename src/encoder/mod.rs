//! Beam-search optimizing IMA-ADPCM encoder.

mod search;
mod topk;

use crate::block::{block_byte_length, pack_block};
use crate::core::CoreState;
use crate::error::{Error, Result};
use crate::header::{encode_header, WavHeader};
use search::{evaluate_score, search_min_score};
use topk::select_kth_smallest;

const MAX_SEARCH_BEAM_WIDTH: u8 = 16;
const MAX_SEARCH_DEPTH: u8 = 8;
const MAX_NUM_CHANNELS: u16 = 2;

/// Caller-supplied encode configuration; validated and converted to a [`WavHeader`] template
/// by [`Encoder::set_encode_parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParameter {
    pub num_channels: u16,
    pub sampling_rate: u32,
    pub bits_per_sample: u16,
    pub block_size: u16,
    pub search_beam_width: u8,
    pub search_depth: u8,
}

#[derive(Clone)]
struct Candidate {
    state: CoreState,
    total_cost: f64,
    init_stepsize_index: u8,
    nibbles: Vec<u8>,
    len: usize,
}

impl Candidate {
    fn new(max_block_size: usize) -> Self {
        Self {
            state: CoreState::new(0, 0),
            total_cost: 0.0,
            init_stepsize_index: 0,
            nibbles: vec![0u8; max_block_size.max(1)],
            len: 0,
        }
    }

    fn copy_from(&mut self, other: &Candidate) {
        self.state = other.state;
        self.total_cost = other.total_cost;
        self.init_stepsize_index = other.init_stepsize_index;
        self.len = other.len;
        self.nibbles[..other.len].copy_from_slice(&other.nibbles[..other.len]);
    }

    fn seed(&mut self, prev_sample: i16, stepsize_index: u8) {
        self.state = CoreState::new(prev_sample, stepsize_index);
        self.total_cost = 0.0;
        self.init_stepsize_index = stepsize_index;
        self.nibbles[0] = 0;
        self.len = 1;
    }

    fn push(&mut self, nibble: u8, step_cost: f64) {
        self.nibbles[self.len] = nibble;
        self.len += 1;
        self.total_cost += step_cost;
        self.state = self.state.step(nibble);
    }
}

struct Scratch {
    active: Vec<Candidate>,
    backup: Vec<Candidate>,
    default_candidate: Candidate,
    scores: Vec<f64>,
    init_scores: [f64; 89],
    /// Destructive quickselect scratch, reused by both top-K selections instead of calling
    /// `.to_vec()` on `scores`/`init_scores` every block or sample step.
    rank_buffer: Vec<f64>,
}

impl Scratch {
    fn new(max_block_size: usize, beam_width: usize) -> Self {
        let score_len = (beam_width * 8).max(89);
        Self {
            active: (0..beam_width).map(|_| Candidate::new(max_block_size)).collect(),
            backup: (0..beam_width).map(|_| Candidate::new(max_block_size)).collect(),
            default_candidate: Candidate::new(max_block_size),
            scores: vec![0.0; score_len],
            init_scores: [0.0; 89],
            rank_buffer: vec![0.0; score_len],
        }
    }
}

/// Beam-search optimizing IMA-ADPCM encoder.
///
/// One handle encodes any number of whole files; buffers sized from `max_block_size` at
/// construction are reused across every block and every call to [`Self::encode_whole`].
pub struct Encoder {
    max_block_size: usize,
    parameter: Option<EncodeParameter>,
    samples_per_block: u32,
    scratch: Option<Scratch>,
}

impl Encoder {
    pub fn new(max_block_size: usize) -> Result<Self> {
        if max_block_size == 0 || max_block_size > u16::MAX as usize {
            return Err(Error::invalid_argument("max_block_size must be in 1..=65535"));
        }
        Ok(Self {
            max_block_size,
            parameter: None,
            samples_per_block: 0,
            scratch: None,
        })
    }

    pub fn set_encode_parameter(&mut self, param: EncodeParameter) -> Result<()> {
        if param.bits_per_sample != 4 {
            return Err(Error::invalid_format("bits_per_sample must be 4"));
        }
        if param.num_channels == 0 || param.num_channels > MAX_NUM_CHANNELS {
            return Err(Error::invalid_format("num_channels must be 1 or 2"));
        }
        if param.search_beam_width == 0 || param.search_beam_width > MAX_SEARCH_BEAM_WIDTH {
            return Err(Error::invalid_argument("search_beam_width must be in 1..=16"));
        }
        if param.search_depth == 0 || param.search_depth > MAX_SEARCH_DEPTH {
            return Err(Error::invalid_argument("search_depth must be in 1..=8"));
        }
        if param.block_size as usize > self.max_block_size {
            return Err(Error::invalid_format(
                "block_size exceeds the encoder's max_block_size",
            ));
        }

        let samples_per_block = WavHeader::samples_per_block_for(param.block_size, param.num_channels)?;

        self.parameter = Some(param);
        self.samples_per_block = samples_per_block;
        self.scratch = Some(Scratch::new(samples_per_block as usize, param.search_beam_width as usize));
        Ok(())
    }

    pub fn encode_whole(&mut self, input: &[&[i16]], num_samples: usize) -> Result<Vec<u8>> {
        let param = self.parameter.ok_or(Error::ParameterNotSet)?;
        let scratch = self
            .scratch
            .as_mut()
            .expect("scratch is populated whenever parameter is set");

        if input.len() != param.num_channels as usize {
            return Err(Error::invalid_argument("input channel count mismatches the encode parameter"));
        }
        if input.iter().any(|ch| ch.len() < num_samples) {
            return Err(Error::invalid_argument("channel slice shorter than num_samples"));
        }

        let num_channels = param.num_channels as usize;
        let samples_per_block = self.samples_per_block as usize;
        let w = param.search_beam_width as usize;
        let d = param.search_depth as usize;

        let mut body = Vec::new();
        let mut offset = 0usize;
        let mut channel_states = vec![CoreState::new(0, 0); num_channels];
        let mut channel_nibbles: Vec<Vec<u8>> = vec![Vec::with_capacity(samples_per_block); num_channels];

        while offset < num_samples {
            let n = (num_samples - offset).min(samples_per_block);

            for ch in 0..num_channels {
                let x = &input[ch][offset..offset + n];
                let (init_index, nibbles) = encode_channel_block(x, scratch, w, d);
                channel_states[ch] = CoreState::new(x[0], init_index);
                channel_nibbles[ch].clear();
                channel_nibbles[ch].extend_from_slice(nibbles);
            }

            let block_len = block_byte_length(num_channels, n);
            let start = body.len();
            body.resize(start + block_len, 0);
            let refs: Vec<&[u8]> = channel_nibbles.iter().map(|v| v.as_slice()).collect();
            pack_block(&channel_states, &refs, &mut body[start..])?;

            offset += n;
        }

        let byte_rate =
            (param.sampling_rate as u64 * param.block_size as u64 / self.samples_per_block as u64) as u32;

        let header = WavHeader {
            num_channels: param.num_channels,
            sampling_rate: param.sampling_rate,
            byte_rate,
            block_size: param.block_size,
            bits_per_sample: param.bits_per_sample,
            samples_per_block: self.samples_per_block,
            num_samples: num_samples as u32,
            data_offset: 60,
            data_size: body.len() as u32,
        };

        let mut out = vec![0u8; 60];
        encode_header(&header, &mut out)?;
        out.extend_from_slice(&body);
        Ok(out)
    }
}

/// Runs the beam search for one channel's block, returning the chosen initial step-size
/// index and a slice of `scratch`'s winning candidate's nibble path (length `x.len()`).
fn encode_channel_block<'s>(x: &[i16], scratch: &'s mut Scratch, w: usize, d: usize) -> (u8, &'s [u8]) {
    let n = x.len();
    debug_assert!(n >= 1);
    let w = w.min(scratch.active.len());

    let lookahead0 = d.min(n.saturating_sub(1));
    for (i, score) in scratch.init_scores.iter_mut().enumerate() {
        let state = CoreState::new(x[0], i as u8);
        *score = search_min_score(state, 0.0, &x[1..], lookahead0, f64::INFINITY);
    }

    let rank_buffer = &mut scratch.rank_buffer[..89];
    rank_buffer.copy_from_slice(&scratch.init_scores);
    let threshold = select_kth_smallest(rank_buffer, w);

    let mut selected = Vec::with_capacity(w);
    for (i, &score) in scratch.init_scores.iter().enumerate() {
        if score <= threshold {
            selected.push(i as u8);
            if selected.len() == w {
                break;
            }
        }
    }

    let mut best_init = selected[0];
    let mut best_init_score = scratch.init_scores[selected[0] as usize];
    for &i in &selected {
        if scratch.init_scores[i as usize] < best_init_score {
            best_init_score = scratch.init_scores[i as usize];
            best_init = i;
        }
    }

    for (slot, &index) in selected.iter().enumerate() {
        scratch.active[slot].seed(x[0], index);
    }
    for slot in selected.len()..w {
        scratch.active[slot].copy_from(&scratch.active[0]);
    }
    scratch.default_candidate.seed(x[0], best_init);

    for t in 1..n {
        let remaining = n - t;
        let depth = d.min(remaining);
        let target = x[t];

        for j in 0..w {
            let cand = &scratch.active[j];
            let sign = if (target as i32 - cand.state.prev_sample as i32) < 0 { 8u8 } else { 0u8 };
            for a in 0u8..8 {
                let nibble = a | sign;
                scratch.scores[j * 8 + a as usize] = evaluate_score(
                    cand.state,
                    cand.total_cost,
                    target,
                    &x[t + 1..],
                    nibble,
                    depth.saturating_sub(1),
                );
            }
        }

        let score_slice = &scratch.scores[..w * 8];
        let rank_buffer = &mut scratch.rank_buffer[..w * 8];
        rank_buffer.copy_from_slice(score_slice);
        let mut threshold = select_kth_smallest(rank_buffer, w);
        if threshold <= 0.0 {
            threshold = f64::MIN_POSITIVE;
        }

        for j in 0..w {
            scratch.backup[j].copy_from(&scratch.active[j]);
        }

        let mut accepted = 0usize;
        'scan: for j in 0..w {
            let cand = &scratch.backup[j];
            let sign = if (target as i32 - cand.state.prev_sample as i32) < 0 { 8u8 } else { 0u8 };
            for a in 0u8..8 {
                if accepted == w {
                    break 'scan;
                }
                let score = score_slice[j * 8 + a as usize];
                if score <= threshold {
                    let nibble = a | sign;
                    let step_cost = cand.state.cost(nibble, target);
                    scratch.active[accepted].copy_from(cand);
                    scratch.active[accepted].push(nibble, step_cost);
                    accepted += 1;
                }
            }
        }
        // the reference path always survives as a fallback even if pruning is aggressive
        while accepted < w {
            scratch.active[accepted].copy_from(&scratch.default_candidate);
            accepted += 1;
        }

        let killer = scratch.default_candidate.state.reference_greedy(target);
        let step_cost = scratch.default_candidate.state.cost(killer, target);
        scratch.default_candidate.push(killer, step_cost);
    }

    let mut winner = 0usize;
    let mut winner_cost = scratch.active[0].total_cost;
    for j in 1..w {
        if scratch.active[j].total_cost < winner_cost {
            winner_cost = scratch.active[j].total_cost;
            winner = j;
        }
    }

    if scratch.default_candidate.total_cost < winner_cost {
        (
            scratch.default_candidate.init_stepsize_index,
            &scratch.default_candidate.nibbles[..n],
        )
    } else {
        (scratch.active[winner].init_stepsize_index, &scratch.active[winner].nibbles[..n])
    }
}
