//! Thin demo binary: loads a grayscale PNG, runs it through [`qr::Context`],
//! and prints whatever payloads are found. Not part of the decode API
//! (Section 4.N) - a CLI harness for poking at the library interactively.

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use qr::Context;
use thiserror::Error;

#[derive(Parser)]
#[command(about = "Decode QR codes from a PNG image")]
struct Args {
    /// Path to a grayscale (or RGB, converted on load) PNG image.
    image: PathBuf,

    /// Print the raw decoded bytes as a lossy UTF-8 string (default) or hex.
    #[arg(long)]
    hex: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to decode PNG {0}: {1}")]
    Png(PathBuf, #[source] png::DecodingError),
    #[error(transparent)]
    Context(#[from] qr::Error),
}

fn main() -> Result<(), CliError> {
    #[cfg(feature = "tracing-subscriber")]
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let (pixels, w, h) = load_grayscale(&args.image)?;

    let mut ctx = Context::new();
    ctx.resize(w, h)?;
    ctx.begin().copy_from_slice(&pixels);
    ctx.end();

    let count = ctx.count();
    println!("{count} candidate symbol(s) found");
    for i in 0..count {
        match ctx.extract(i) {
            Ok(code) => match qr::decode(&code) {
                Ok(data) => print_data(i, &data, args.hex),
                Err(e) => eprintln!("symbol {i}: decode failed: {} ({e})", e.strerror()),
            },
            Err(e) => eprintln!("symbol {i}: extract failed: {e}"),
        }
    }
    Ok(())
}

fn print_data(index: usize, data: &qr::Data, hex: bool) {
    if hex {
        let hex_str: String = data.payload.iter().map(|b| format!("{b:02x}")).collect();
        println!("symbol {index}: v{} {:?} mask={} [{}]", data.version, data.ecc_level, data.mask, hex_str);
    } else {
        println!(
            "symbol {index}: v{} {:?} mask={} {:?}: {}",
            data.version,
            data.ecc_level,
            data.mask,
            data.data_type,
            String::from_utf8_lossy(&data.payload)
        );
    }
}

fn load_grayscale(path: &PathBuf) -> Result<(Vec<u8>, usize, usize), CliError> {
    let file = File::open(path).map_err(|e| CliError::Io(path.clone(), e))?;
    let decoder = png::Decoder::new(file);
    let mut reader = decoder.read_info().map_err(|e| CliError::Png(path.clone(), e))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(|e| CliError::Png(path.clone(), e))?;
    let (w, h) = (info.width as usize, info.height as usize);

    let channels = info.color_type.samples();
    let mut gray = Vec::with_capacity(w * h);
    for pixel in buf[..info.buffer_size()].chunks(channels) {
        let luma = match channels {
            1 | 2 => pixel[0],
            _ => ((pixel[0] as u32 * 299 + pixel[1] as u32 * 587 + pixel[2] as u32 * 114) / 1000) as u8,
        };
        gray.push(luma);
    }
    Ok((gray, w, h))
}
