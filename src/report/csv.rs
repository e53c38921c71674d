//! CSV report generation

use crate::analyzer::FileResult;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, results: &[FileResult]) -> io::Result<()> {
    // Header
    writeln!(
        writer,
        "verdict,filepath,size_bytes,frame_count,avg_bitrate_kbps,duration_secs,frame_size_cv,error"
    )?;

    // Rows
    for r in results {
        let (bitrate, duration, cv) = match &r.stats {
            Some(stats) if stats.frame_count > 0 => (
                stats.avg_bitrate.to_string(),
                format!("{:.2}", stats.duration_secs),
                format!("{:.2}", stats.frame_size_cv()),
            ),
            _ => ("n/a".to_string(), "n/a".to_string(), "n/a".to_string()),
        };

        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            r.verdict,
            escape_csv(&r.file_path),
            r.size_bytes,
            r.frame_count,
            bitrate,
            duration,
            cv,
            escape_csv(r.error.as_deref().unwrap_or("-"))
        )?;
    }

    Ok(())
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
