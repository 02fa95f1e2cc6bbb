use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use pgure_core::io::ser::SerReader;

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let info = reader.source_info(&args.file);

    println!("File:        {}", info.filename.display());
    println!("Frames:      {}", info.total_frames);
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Bit depth:   {}", info.bit_depth);
    println!("Color mode:  {:?}", info.color_mode);

    if let Some(ref obs) = info.observer {
        println!("Observer:    {}", obs);
    }
    if let Some(ref tel) = info.telescope {
        println!("Telescope:   {}", tel);
    }
    if let Some(ref inst) = info.instrument {
        println!("Instrument:  {}", inst);
    }
    println!(
        "Timestamps:  {}",
        if reader.timestamps().is_some() { "yes" } else { "no" }
    );

    let frame_bytes = reader.frame_bytes();
    let total_mb = (frame_bytes * info.total_frames) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    let decoded_mb =
        (info.width as usize * info.height as usize * info.total_frames * 8) as f64
            / (1024.0 * 1024.0);
    println!("Decoded:     {:.1} MB (f64)", decoded_mb);

    Ok(())
}
