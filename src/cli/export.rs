//! Export subcommand for gtd-board CLI
//!
//! Writes the board snapshot as JSON to stdout or a file, gzip-compressed
//! when asked or when the file name ends in `.gz`.

use anyhow::Result;
use clap::Args;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the export subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Force gzip compression (auto-detected from .gz extension otherwise)
    #[arg(long)]
    pub gzip: bool,
}

impl ExportArgs {
    /// Determine if output should be compressed based on args and filename
    pub fn should_compress(&self) -> bool {
        self.gzip
            || self
                .output
                .as_ref()
                .is_some_and(|p| p.extension().is_some_and(|ext| ext == "gz"))
    }

    /// Write `json` to the chosen destination.
    pub fn write(&self, json: &str) -> Result<()> {
        let bytes = if self.should_compress() {
            gzip(json.as_bytes())?
        } else {
            json.as_bytes().to_vec()
        };

        match &self.output {
            Some(path) => std::fs::write(path, bytes)?,
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&bytes)?;
                if !self.should_compress() {
                    stdout.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
