use log::info;
use thiserror::Error;

use lvbitx::{generate_bitfile, load_bitfile_file, LoadError, XmlWriteError};

#[derive(Debug, Error)]
enum RepackError {
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("{0}")]
    Write(#[from] XmlWriteError),
    #[error("{0}: {1}")]
    Io(String, std::io::Error),
}

fn main() -> Result<(), RepackError> {
    env_logger::init();
    run_cli()
}

fn run_cli() -> Result<(), RepackError> {
    let mut args = std::env::args();

    if args.len() < 2 || args.len() > 3 {
        println!(
            r#"Usage:
lvbitx-repack [input].lvbitx
lvbitx-repack [input].lvbitx [output].lvbitx

Decodes the input bitfile and regenerates it. With no output path the
regenerated document is written to stdout."#
        );
        return Ok(());
    }

    let input_path = args.nth(1).expect("Missing input file path");
    let output_path = args.next();

    let bitfile = load_bitfile_file(&input_path)?;
    info!(
        "Loaded {} for {}: {} registers, {} DMA channels, {} register blocks, {} base clocks, {} bitstream bytes",
        input_path,
        bitfile.target_class,
        bitfile.registers.len(),
        bitfile.channels.len(),
        bitfile.register_blocks.len(),
        bitfile.used_base_clocks.len(),
        bitfile.bitstream.len(),
    );

    let document = generate_bitfile(&bitfile)?;
    match output_path {
        Some(path) => {
            std::fs::write(&path, &document).map_err(|e| RepackError::Io(path.clone(), e))?;
            info!("Wrote {path}");
        }
        None => println!("{document}"),
    }

    Ok(())
}
