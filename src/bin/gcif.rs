//! `gcif` command line tool: compress PNG sprite sheets to `.gci` and
//! decompress them back.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use gcif_codec::{Knobs, compress_ex, decompress};
use image::RgbaImage;

/// Lossless sprite sheet codec
#[derive(Debug, Parser)]
#[command(name = "gcif", version, about)]
struct Args {
	/// Compress a PNG into a .gci file
	#[arg(short = 'c', conflicts_with = "decompress")]
	compress: bool,

	/// Decompress a .gci file into a PNG
	#[arg(short = 'd')]
	decompress: bool,

	/// Compression level (0 = faster .. 3 = stronger)
	#[arg(short = 'L', long = "level", default_value_t = 2)]
	level: u32,

	/// JSON file overriding individual encoder knobs
	#[arg(long)]
	knobs: Option<PathBuf>,

	/// Input file
	input: PathBuf,

	/// Output file
	output: PathBuf,
}

fn load_knobs(args: &Args) -> Result<Knobs> {
	let mut knobs = Knobs::preset(args.level);
	if let Some(path) = &args.knobs {
		let text = std::fs::read_to_string(path)
			.with_context(|| format!("reading knobs file {}", path.display()))?;
		knobs = serde_json::from_str(&text)
			.with_context(|| format!("parsing knobs file {}", path.display()))?;
	}
	Ok(knobs)
}

fn run(args: &Args) -> Result<()> {
	if args.compress == args.decompress {
		bail!("exactly one of -c or -d is required");
	}

	if args.compress {
		let png = image::open(&args.input)
			.with_context(|| format!("reading {}", args.input.display()))?
			.to_rgba8();
		let (width, height) = png.dimensions();

		let knobs = load_knobs(args)?;
		let encoded = compress_ex(png.as_raw(), width, height, &knobs)
			.context("compressing image")?;

		std::fs::write(&args.output, &encoded)
			.with_context(|| format!("writing {}", args.output.display()))?;

		let raw = width as u64 * height as u64 * 4;
		log::info!(
			"{} -> {} ({} bytes, {:.2}% of raw RGBA)",
			args.input.display(),
			args.output.display(),
			encoded.len(),
			encoded.len() as f64 * 100.0 / raw as f64,
		);
	} else {
		let data = std::fs::read(&args.input)
			.with_context(|| format!("reading {}", args.input.display()))?;
		let decoded = decompress(&data).context("decompressing image")?;

		let png = RgbaImage::from_raw(
			u32::from(decoded.width),
			u32::from(decoded.height),
			decoded.rgba,
		)
		.context("assembling PNG")?;
		png.save(&args.output)
			.with_context(|| format!("writing {}", args.output.display()))?;
	}

	Ok(())
}

fn main() -> ExitCode {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let args = Args::parse();
	match run(&args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("gcif: {err:#}");
			ExitCode::FAILURE
		}
	}
}
