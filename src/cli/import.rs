//! Import subcommand for gtd-board CLI
//!
//! Reads a JSON snapshot (optionally gzip-compressed) and replaces the
//! board with it.

use anyhow::{Context, Result};
use clap::Args;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::PathBuf;

/// Arguments for the import subcommand
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the export file to import
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Validate the file and report what would be imported without writing
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    /// Check if this is a gzipped file based on extension
    pub fn is_gzipped(&self) -> bool {
        self.file.extension().is_some_and(|ext| ext == "gz")
    }

    /// Read the file contents, decompressing when needed.
    pub fn read(&self) -> Result<String> {
        let file = std::fs::File::open(&self.file)
            .with_context(|| format!("opening {}", self.file.display()))?;
        let mut content = String::new();
        if self.is_gzipped() {
            GzDecoder::new(file).read_to_string(&mut content)?;
        } else {
            let mut file = file;
            file.read_to_string(&mut content)?;
        }
        Ok(content)
    }
}
