//! File-based chain processing command.

use super::check::point_at;
use super::common::{linear_to_db, peak, rms};
use catena_config::{ChainSetup, EngineSettings, parse_chain};
use catena_core::Chain;
use catena_io::{read_wav, render_chain, write_wav};
use catena_registry::Registry;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Chain string (e.g. "-ea:120 -kos:1,0,100,0.5,0 -efl:4000")
    #[arg(short, long, allow_hyphen_values = true, conflicts_with = "setup")]
    chain: Option<String>,

    /// Chain setup file (.toml, or one "-a:<name> <chain>" line per chain)
    #[arg(short, long)]
    setup: Option<PathBuf>,

    /// Chain to run from the setup file (default: the first)
    #[arg(long, requires = "setup")]
    chain_name: Option<String>,

    /// Processing block size in frames (default: setup value or 1024)
    #[arg(long)]
    block_size: Option<usize>,

    /// Output bit depth: 16, 24 or 32 (default: setup value or 32)
    #[arg(long)]
    bit_depth: Option<u16>,
}

fn load_chain(args: &ProcessArgs, registry: &Registry) -> anyhow::Result<(Chain, EngineSettings)> {
    if let Some(path) = &args.setup {
        let setup = ChainSetup::load(path)?;
        println!("Loading setup: {}", setup.name);
        let name = match &args.chain_name {
            Some(name) => name.clone(),
            None => setup
                .chains
                .first()
                .map(|c| c.name.clone())
                .ok_or_else(|| anyhow::anyhow!("Setup '{}' has no chains", setup.name))?,
        };
        let chain = setup.build_chain(&name, registry)?;
        return Ok((chain, setup.settings));
    }

    if let Some(text) = &args.chain {
        return match parse_chain(text, registry) {
            Ok(chain) => Ok((chain, EngineSettings::default())),
            Err(err) => {
                eprintln!("{}", point_at(text, &err));
                Err(anyhow::anyhow!("invalid chain: {err}"))
            }
        };
    }

    anyhow::bail!("No chain specified. Use --chain or --setup")
}

pub fn run(args: ProcessArgs, registry: &Registry) -> anyhow::Result<()> {
    let (mut chain, settings) = load_chain(&args, registry)?;

    println!("Reading {}...", args.input.display());
    let (samples, spec) = read_wav(&args.input)?;
    let channels = spec.channels as usize;
    let frames = samples.len() / channels.max(1);
    println!(
        "  {} frames, {} channel(s), {} Hz, {:.2}s",
        frames,
        channels,
        spec.sample_rate,
        frames as f64 / f64::from(spec.sample_rate)
    );

    if settings.sample_rate != spec.sample_rate {
        tracing::warn!(
            setup = settings.sample_rate,
            file = spec.sample_rate,
            "sample rate differs from setup; using the file's"
        );
    }
    let block_size = args.block_size.unwrap_or(settings.buffer_size);
    let bits = args.bit_depth.unwrap_or(settings.output_bits);
    let settings = settings
        .with_sample_rate(spec.sample_rate)
        .with_buffer_size(block_size)
        .with_output_bits(bits);
    settings.validate()?;

    println!(
        "Processing \"{}\" ({} operator(s), {} controller(s), {}-frame blocks)...",
        chain,
        chain.number_of_chain_operators(),
        chain.number_of_controllers(),
        settings.buffer_size
    );

    let pb = ProgressBar::new(frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    let (output, out_channels) = render_chain(
        &mut chain,
        &samples,
        channels,
        spec.sample_rate,
        settings.buffer_size,
        |done, _| pb.set_position(done as u64),
    )?;
    pb.finish_with_message("done");

    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&samples)),
        linear_to_db(peak(&samples))
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&output)),
        linear_to_db(peak(&output))
    );

    let out_spec = spec
        .with_channels(u16::try_from(out_channels)?)
        .with_bits(settings.output_bits);
    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &output, out_spec)?;
    println!("Done!");

    Ok(())
}
