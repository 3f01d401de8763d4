// Snapshot JSONL writer
// One JSON object per sampled epoch, written as the simulation runs

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use shortfall_sim::Snapshot;

/// Streams snapshots as JSON lines to a file or stdout.
pub struct SnapshotWriter {
    out: Box<dyn Write>,
    written: usize,
}

impl SnapshotWriter {
    pub fn stdout() -> Self {
        Self { out: Box::new(BufWriter::new(io::stdout())), written: 0 }
    }

    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { out: Box::new(BufWriter::new(file)), written: 0 })
    }

    pub fn write(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, snapshot).map_err(io::Error::from)?;
        writeln!(self.out)?;
        self.written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<usize> {
        self.out.flush()?;
        Ok(self.written)
    }
}
