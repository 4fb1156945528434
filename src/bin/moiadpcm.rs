//! Command-line front end: encode, decode, or compute reconstruction statistics.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use moiadpcm::{decode_header, decode_whole, EncodeParameter, Encoder};

#[derive(Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Mode {
    Encode,
    Decode,
    ComputeStats,
}

/// IMA-ADPCM codec with a beam-search optimizing encoder.
#[derive(Parser)]
#[command(name = "moiadpcm", version, about)]
struct Cli {
    /// Operation to perform.
    #[arg(value_enum)]
    mode: Mode,

    /// Input WAV file.
    input: PathBuf,

    /// Output WAV file (required for encode/decode, ignored for compute-stats).
    output: Option<PathBuf>,

    /// Block size in bytes used when encoding.
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u16).range(1..=65535))]
    block_size: u16,

    /// Beam width used by the encoder's search.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..=16))]
    search_beam_width: u8,

    /// Look-ahead depth used by the encoder's search.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=8))]
    search_depth: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("moiadpcm: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    match cli.mode {
        Mode::Encode => do_encode(cli),
        Mode::Decode => do_decode(cli),
        Mode::ComputeStats => do_compute_stats(cli),
    }
}

fn read_pcm_wav(path: &PathBuf) -> Result<(hound::WavSpec, Vec<Vec<i16>>), String> {
    let mut reader = hound::WavReader::open(path).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    let num_channels = spec.channels as usize;
    let mut channels: Vec<Vec<i16>> = vec![Vec::new(); num_channels];

    for (i, sample) in reader.samples::<i16>().enumerate() {
        let sample = sample.map_err(|e| e.to_string())?;
        channels[i % num_channels].push(sample);
    }
    Ok((spec, channels))
}

fn write_pcm_wav(path: &PathBuf, spec: hound::WavSpec, channels: &[Vec<i16>]) -> Result<(), String> {
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| e.to_string())?;
    let num_samples = channels.first().map(|c| c.len()).unwrap_or(0);
    for t in 0..num_samples {
        for channel in channels {
            writer.write_sample(channel[t]).map_err(|e| e.to_string())?;
        }
    }
    writer.finalize().map_err(|e| e.to_string())
}

fn do_encode(cli: &Cli) -> Result<(), String> {
    let (spec, channels) = read_pcm_wav(&cli.input)?;
    let num_samples = channels.first().map(|c| c.len()).unwrap_or(0);

    let mut encoder = Encoder::new(cli.block_size as usize).map_err(|e| e.to_string())?;
    encoder
        .set_encode_parameter(EncodeParameter {
            num_channels: spec.channels,
            sampling_rate: spec.sample_rate,
            bits_per_sample: 4,
            block_size: cli.block_size,
            search_beam_width: cli.search_beam_width,
            search_depth: cli.search_depth,
        })
        .map_err(|e| e.to_string())?;

    let refs: Vec<&[i16]> = channels.iter().map(|c| c.as_slice()).collect();
    let encoded = encoder
        .encode_whole(&refs, num_samples)
        .map_err(|e| e.to_string())?;

    let output = cli.output.as_ref().ok_or("encode requires an output path")?;
    std::fs::write(output, encoded).map_err(|e| e.to_string())
}

fn do_decode(cli: &Cli) -> Result<(), String> {
    let bytes = std::fs::read(&cli.input).map_err(|e| e.to_string())?;
    let dims = decode_header(&bytes).map_err(|e| e.to_string())?;
    let mut pcm = vec![vec![0i16; dims.num_samples as usize]; dims.num_channels as usize];
    let header = decode_whole(&bytes, &mut pcm).map_err(|e| e.to_string())?;

    let spec = hound::WavSpec {
        channels: header.num_channels,
        sample_rate: header.sampling_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let output = cli.output.as_ref().ok_or("decode requires an output path")?;
    write_pcm_wav(output, spec, &pcm)
}

fn do_compute_stats(cli: &Cli) -> Result<(), String> {
    let (spec, channels) = read_pcm_wav(&cli.input)?;
    let num_samples = channels.first().map(|c| c.len()).unwrap_or(0);

    let mut encoder = Encoder::new(cli.block_size as usize).map_err(|e| e.to_string())?;
    encoder
        .set_encode_parameter(EncodeParameter {
            num_channels: spec.channels,
            sampling_rate: spec.sample_rate,
            bits_per_sample: 4,
            block_size: cli.block_size,
            search_beam_width: cli.search_beam_width,
            search_depth: cli.search_depth,
        })
        .map_err(|e| e.to_string())?;

    let refs: Vec<&[i16]> = channels.iter().map(|c| c.as_slice()).collect();
    let encoded = encoder
        .encode_whole(&refs, num_samples)
        .map_err(|e| e.to_string())?;
    let dims = decode_header(&encoded).map_err(|e| e.to_string())?;
    let mut reconstructed = vec![vec![0i16; dims.num_samples as usize]; dims.num_channels as usize];
    decode_whole(&encoded, &mut reconstructed).map_err(|e| e.to_string())?;

    let mut sum_sq = 0.0f64;
    let mut count = 0u64;
    for (ch, original) in channels.iter().enumerate() {
        for (&a, &b) in original.iter().zip(reconstructed[ch].iter()) {
            let na = a as f64 / 32768.0;
            let nb = b as f64 / 32768.0;
            sum_sq += (na - nb).powi(2);
            count += 1;
        }
    }
    let rmse = if count > 0 { (sum_sq / count as f64).sqrt() } else { 0.0 };

    println!("input bytes:   {}", num_samples * channels.len() * 2);
    println!("encoded bytes: {}", encoded.len());
    println!("rmse:          {rmse:.6}");
    Ok(())
}
