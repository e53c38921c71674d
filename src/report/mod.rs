pub mod csv;
pub mod json;

use crate::analyzer::{FileResult, Verdict};
use std::io;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, results: &[FileResult]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, results),
        _ => csv::write(&mut file, results),
    }
}

/// Summary statistics for a batch of results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub empty: usize,
    pub no_frames: usize,
    pub error: usize,
    pub frames: usize,
}

impl Summary {
    pub fn from_results(results: &[FileResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for r in results {
            match r.verdict {
                Verdict::Ok => summary.ok += 1,
                Verdict::Empty => summary.empty += 1,
                Verdict::NoFrames => summary.no_frames += 1,
                Verdict::Error => summary.error += 1,
            }
            summary.frames += r.frame_count;
        }

        summary
    }

    /// True when every file held at least one frame
    pub fn all_ok(&self) -> bool {
        self.ok == self.total
    }
}
