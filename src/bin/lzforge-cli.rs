//! lzforge-cli - Command-line interface for lzforge
//!
//! A command-line tool for compressing and decompressing console game
//! resources in the Nintendo and CRI formats the engine supports.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use lzforge::{BitOrder, ByteOrder, Codec, FormatId, NibbleOrder, ParseStrategy};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "lzforge-cli")]
#[command(about = "A CLI tool for console LZ/Huffman/RLE compression and decompression")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v for debug logging, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    Compress {
        /// Input file to compress
        input: PathBuf,

        /// Output compressed file
        output: PathBuf,

        /// Target format (see the `formats` command)
        #[arg(short = 'F', long)]
        format: FormatId,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Parse strategy
        #[arg(short, long, value_enum, default_value_t = CliStrategy::Optimal)]
        strategy: CliStrategy,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Decompress a file
    Decompress {
        /// Input compressed file
        input: PathBuf,

        /// Output decompressed file
        output: PathBuf,

        /// Format of the input; detected from its signature when omitted
        #[arg(short = 'F', long)]
        format: Option<FormatId>,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Get information about a compressed file
    Info {
        /// Compressed file to analyze
        input: PathBuf,

        /// Format of the input; detected from its signature when omitted
        #[arg(short = 'F', long)]
        format: Option<FormatId>,
    },

    /// List the supported formats
    Formats,
}

/// Overrides of a format's default layout options
#[derive(clap::Args, Clone, Copy)]
struct LayoutArgs {
    /// Byte order of header fields and tables
    #[arg(long, value_enum)]
    byte_order: Option<CliByteOrder>,

    /// Bit order inside bitstream words
    #[arg(long, value_enum)]
    bit_order: Option<CliBitOrder>,

    /// Nibble order of 4-bit Huffman data
    #[arg(long, value_enum)]
    nibble_order: Option<CliNibbleOrder>,
}

impl LayoutArgs {
    fn apply(&self, mut codec: Codec) -> Codec {
        if let Some(order) = self.byte_order {
            codec = codec.byte_order(order.into());
        }
        if let Some(order) = self.bit_order {
            codec = codec.bit_order(order.into());
        }
        if let Some(order) = self.nibble_order {
            codec = codec.nibble_order(order.into());
        }
        codec
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliStrategy {
    /// Cheapest encoding under the format's token costs - Default
    Optimal,
    /// Longest match wins (faster)
    Greedy,
}

impl From<CliStrategy> for ParseStrategy {
    fn from(strategy: CliStrategy) -> Self {
        match strategy {
            CliStrategy::Optimal => ParseStrategy::Optimal,
            CliStrategy::Greedy => ParseStrategy::Greedy,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl From<CliByteOrder> for ByteOrder {
    fn from(order: CliByteOrder) -> Self {
        match order {
            CliByteOrder::Little => ByteOrder::LittleEndian,
            CliByteOrder::Big => ByteOrder::BigEndian,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliBitOrder {
    /// Highest bit first
    Msb,
    /// Lowest bit first
    Lsb,
}

impl From<CliBitOrder> for BitOrder {
    fn from(order: CliBitOrder) -> Self {
        match order {
            CliBitOrder::Msb => BitOrder::MsbFirst,
            CliBitOrder::Lsb => BitOrder::LsbFirst,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliNibbleOrder {
    /// Low nibble first
    Low,
    /// High nibble first
    High,
}

impl From<CliNibbleOrder> for NibbleOrder {
    fn from(order: CliNibbleOrder) -> Self {
        match order {
            CliNibbleOrder::Low => NibbleOrder::LowFirst,
            CliNibbleOrder::High => NibbleOrder::HighFirst,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let verbose = cli.verbose > 0;

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            layout,
            strategy,
            force,
        } => {
            let codec = layout.apply(Codec::new(format)).strategy(strategy.into());
            compress_file(&input, &output, codec, force, verbose, cli.quiet)
        }
        Commands::Decompress {
            input,
            output,
            format,
            layout,
            force,
        } => decompress_file(&input, &output, format, layout, force, verbose, cli.quiet),
        Commands::Info { input, format } => show_file_info(&input, format, verbose),
        Commands::Formats => {
            list_formats();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn check_paths(input: &Path, output: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    // Check if input file exists
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }

    // Check if output file exists and force flag
    if output.exists() && !force {
        return Err(format!(
            "Output file '{}' already exists. Use --force to overwrite",
            output.display()
        )
        .into());
    }
    Ok(())
}

/// Two-step progress bar for inputs over 1 MiB
fn progress_bar(
    size: usize,
    quiet: bool,
    message: &'static str,
) -> Result<Option<ProgressBar>, Box<dyn std::error::Error>> {
    if quiet || size <= 1024 * 1024 {
        return Ok(None);
    }
    let pb = ProgressBar::new(2);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    pb.inc(1);
    Ok(Some(pb))
}

fn compress_file(
    input: &Path,
    output: &Path,
    codec: Codec,
    force: bool,
    verbose: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_paths(input, output, force)?;

    if verbose {
        println!(
            "Compressing '{}' to '{}'",
            input.display(),
            output.display()
        );
        println!(
            "Format: {}, Options: {:?}, Strategy: {:?}",
            codec.format(),
            codec.format_options(),
            codec.parse_settings().strategy
        );
    }

    let start_time = Instant::now();

    // Read input file
    let input_data = fs::read(input)?;
    let input_size = input_data.len();

    if verbose {
        println!("Input size: {} bytes", input_size);
    }

    let progress = progress_bar(input_size, quiet, "Compressing...")?;

    // Compress data
    let (compressed_data, stats) = codec
        .compress_with_stats(&input_data)
        .map_err(|e| format!("Compression failed: {}", e))?;

    if let Some(ref pb) = progress {
        pb.inc(1);
        pb.finish_with_message("Compression complete");
    }

    // Write output file
    fs::write(output, &compressed_data)?;

    let compression_time = start_time.elapsed();
    let output_size = compressed_data.len();

    if !quiet {
        println!("✓ Compression successful!");
        println!("  Input:  {} bytes", input_size);
        println!("  Output: {} bytes", output_size);
        println!("  Ratio:  {:.1}%", stats.compression_ratio * 100.0);
        println!("  Time:   {:.2?}", compression_time);

        if verbose {
            println!(
                "  Tokens: {} literals, {} matches (longest {})",
                stats.literal_count, stats.match_count, stats.longest_match
            );
        }
        if output_size > input_size {
            println!("  Note: File expanded during compression (common for small/random data)");
        }
    }

    Ok(())
}

fn resolve_format(
    data: &[u8],
    format: Option<FormatId>,
) -> Result<FormatId, Box<dyn std::error::Error>> {
    match format.or_else(|| FormatId::detect(data)) {
        Some(format) => Ok(format),
        None => Err("Unable to detect the format; pass --format".into()),
    }
}

fn decompress_file(
    input: &Path,
    output: &Path,
    format: Option<FormatId>,
    layout: LayoutArgs,
    force: bool,
    verbose: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_paths(input, output, force)?;

    let start_time = Instant::now();

    // Read input file
    let compressed_data = fs::read(input)?;
    let input_size = compressed_data.len();
    let codec = layout.apply(Codec::new(resolve_format(&compressed_data, format)?));

    if verbose {
        println!(
            "Decompressing '{}' to '{}' as {}",
            input.display(),
            output.display(),
            codec.format()
        );
        println!("Compressed size: {} bytes", input_size);
    }

    let progress = progress_bar(input_size, quiet, "Decompressing...")?;

    // Decompress data
    let decompressed_data = codec
        .decompress(&compressed_data)
        .map_err(|e| format!("Decompression failed: {}", e))?;

    if let Some(ref pb) = progress {
        pb.inc(1);
        pb.finish_with_message("Decompression complete");
    }

    // Write output file
    fs::write(output, &decompressed_data)?;

    let decompression_time = start_time.elapsed();
    let output_size = decompressed_data.len();

    if !quiet {
        println!("✓ Decompression successful!");
        println!("  Input:  {} bytes", input_size);
        println!("  Output: {} bytes", output_size);
        if output_size > 0 {
            println!("  Ratio:  {:.1}%", input_size as f64 / output_size as f64 * 100.0);
        }
        println!("  Time:   {:.2?}", decompression_time);
    }

    Ok(())
}

fn show_file_info(
    input: &Path,
    format: Option<FormatId>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Check if input file exists
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }

    let data = fs::read(input)?;
    let file_size = data.len();
    let format = resolve_format(&data, format)?;

    println!("Compressed File Information:");
    println!("  File: {}", input.display());
    println!("  Size: {} bytes", file_size);
    println!("  Format: {}", format);

    if verbose {
        let header: Vec<String> = data.iter().take(16).map(|b| format!("{:02x}", b)).collect();
        println!("  Header bytes: {}", header.join(" "));
    }

    match Codec::new(format).decompress(&data) {
        Ok(decompressed) => {
            let decompressed_size = decompressed.len();
            println!("  Decompressed Size: {} bytes", decompressed_size);
            if decompressed_size > 0 {
                let ratio = file_size as f64 / decompressed_size as f64 * 100.0;
                println!("  Compression Ratio: {:.1}%", ratio);
            }
            println!("  Status: ✓ Valid {} file", format);
        }
        Err(e) => {
            println!("  Status: ✗ Invalid or corrupted {} file", format);
            if verbose {
                println!("  Error: {}", e);
            }
        }
    }

    Ok(())
}

fn list_formats() {
    println!("{:<14} {:>12}  Default byte order", "Format", "Max size");
    for format in FormatId::ALL {
        println!(
            "{:<14} {:>12}  {:?}",
            format.name(),
            format!("{:#x}", format.max_plaintext_size()),
            format.default_options().byte_order
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let input_path = dir.path().join("input.txt");
        let compressed_path = dir.path().join("compressed.szs");
        let output_path = dir.path().join("output.txt");

        // Create test data
        let test_data = b"Hello, World! This is a test of the lzforge CLI tool.";
        fs::write(&input_path, test_data)?;

        // Compress
        let codec = Codec::new(FormatId::Yaz0Be);
        compress_file(&input_path, &compressed_path, codec, false, false, true)?;

        // Decompress with the format detected from the signature
        let layout = LayoutArgs {
            byte_order: None,
            bit_order: None,
            nibble_order: None,
        };
        decompress_file(&compressed_path, &output_path, None, layout, false, false, true)?;

        // Verify
        let result_data = fs::read(&output_path)?;
        assert_eq!(test_data, &result_data[..]);

        // Refuses to overwrite without --force
        assert!(compress_file(&input_path, &compressed_path, codec, false, false, true).is_err());
        compress_file(&input_path, &compressed_path, codec, true, false, true)?;

        Ok(())
    }

    #[test]
    fn test_layout_overrides() {
        let layout = LayoutArgs {
            byte_order: Some(CliByteOrder::Big),
            bit_order: Some(CliBitOrder::Lsb),
            nibble_order: None,
        };
        let codec = layout.apply(Codec::new(FormatId::Mio0Le));
        assert_eq!(codec.format_options().byte_order, ByteOrder::BigEndian);
        assert_eq!(codec.format_options().bit_order, BitOrder::LsbFirst);
    }

    #[test]
    fn test_cli_parses_format_names() {
        let cli = Cli::try_parse_from(["lzforge-cli", "compress", "a", "b", "-F", "yaz0-be"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Compress { format: FormatId::Yaz0Be, .. }
        ));
        assert!(Cli::try_parse_from(["lzforge-cli", "compress", "a", "b", "-F", "zip"]).is_err());
    }
}
