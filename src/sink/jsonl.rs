// src/sink/jsonl.rs
// =============================================================================
// Writes profiles as JSON lines: one JSON object per line.
//
// Example output:
//   {"id":"1/1","category":"music"}
//   {"id":"1/2","category":"music"}
//
// Rust concepts:
// - Generics: JsonLinesWriter<W> works with any io::Write (file, stdout, Vec)
// - BufWriter: Batches small writes into fewer system calls
// =============================================================================

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use super::ProfileWriter;
use crate::profile::Profile;

pub struct JsonLinesWriter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonLinesWriter<BufWriter<File>> {
    /// Creates (or truncates) the output file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl JsonLinesWriter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ProfileWriter for JsonLinesWriter<W> {
    fn write(&mut self, profile: &Profile) -> Result<()> {
        serde_json::to_writer(&mut self.out, profile)
            .with_context(|| format!("Failed to write profile {}", profile.id))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush output")
    }
}
