use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use lundump_core::{read_chunk, DecodeOptions, DEFAULT_MAX_DEPTH};
use lundump_nls::{Decoder, Encoding};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod listing;
mod opcode;

use listing::Listing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Yaml,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Text => "lst",
            Format::Yaml => "yaml",
        }
    }
}

/// Disassemble Lua 5.1 precompiled chunks
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Chunks to disassemble; each one is processed independently
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write one listing per input into this directory instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Encoding of string constants and names
    #[arg(short, long, default_value = "utf8")]
    encoding: Encoding,

    /// Deepest allowed function nesting
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Chunks carry no line info, locals or upvalue name lists
    #[arg(long)]
    no_debug_info: bool,

    /// Reject inputs with bytes after the main function
    #[arg(long)]
    strict: bool,
}

impl Args {
    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
            debug_info: !self.no_debug_info,
            reject_trailing_bytes: self.strict,
        }
    }
}

fn render(path: &Path, options: &DecodeOptions, nls: &Decoder, format: Format) -> Result<String> {
    let file = File::open(path).context("open")?;
    let chunk = read_chunk(BufReader::new(file), options)?;
    let listing = Listing::new(&chunk, nls)?;
    match format {
        Format::Text => Ok(listing.to_text()),
        Format::Yaml => listing.to_yaml(),
    }
}

fn disassemble(path: &Path, args: &Args) -> Result<()> {
    let nls = Decoder::new(args.encoding);
    let rendered = render(path, &args.decode_options(), &nls, args.format)?;

    match &args.output {
        Some(dir) => {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
            let stem = path.file_stem().unwrap_or(path.as_os_str()).to_string_lossy();
            let target = dir.join(format!("{}.{}", stem, args.format.extension()));
            std::fs::write(&target, rendered)
                .with_context(|| format!("write {}", target.display()))?;
            log::info!("{} -> {}", path.display(), target.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "; {}", path.display())?;
            stdout.write_all(rendered.as_bytes())?;
        }
    }
    Ok(())
}

/// Disassemble every input, logging failures; returns how many failed.
fn run(args: &Args) -> usize {
    let mut failed = 0usize;
    for path in &args.inputs {
        if let Err(e) = disassemble(path, args) {
            log::error!("{}: {:#}", path.display(), e);
            failed += 1;
        }
    }
    failed
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let failed = run(&args);
    if failed > 0 {
        log::error!("{} of {} inputs failed", failed, args.inputs.len());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
