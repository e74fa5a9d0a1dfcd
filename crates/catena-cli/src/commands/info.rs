//! WAV metadata command.

use catena_io::{WavFormat, read_wav_info};
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    pub file: std::path::PathBuf,

    /// Block size used to report how many blocks a run would take
    #[arg(long, default_value = "1024")]
    block_size: usize,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.file)?;

    let format = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    };

    println!("File:        {}", args.file.display());
    println!("Format:      {} {}-bit", format, info.bits_per_sample);
    println!("Channels:    {}", info.channels);
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );
    if args.block_size > 0 {
        println!(
            "Blocks:      {} of {} frames",
            info.num_frames.div_ceil(args.block_size as u64),
            args.block_size
        );
    }

    Ok(())
}
