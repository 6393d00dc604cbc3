use std::path::Path;

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use cue_logger::{LogFile, LogLevel, LogRecord};

pub fn show_log(path: &Path, level: log::Level) -> Result<()> {
    if !path.is_file() {
        bail!("Log file {} does not exist", path.display());
    }

    let log = LogFile::open(path)?;
    let mut shown = 0;
    for record in log.at_least(LogLevel::from(level)) {
        println!("{}", format_record(record));
        shown += 1;
    }

    if log.skipped() > 0 {
        eprintln!("Skipped {} malformed lines", log.skipped());
    }
    log::debug!("Showed {} of {} records", shown, log.records().len());
    Ok(())
}

fn format_record(record: &LogRecord) -> String {
    let secs = record.timestamp.floor();
    let nanos = ((record.timestamp - secs) * 1e9) as u32;
    let time = DateTime::from_timestamp(secs as i64, nanos)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| format!("{:.3}", record.timestamp));
    format!(
        "{} {:<5} {}: {}",
        time, record.level, record.target, record.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record() {
        let record = LogRecord {
            timestamp: 0.0,
            level: LogLevel::Warn,
            target: "cue_capture".into(),
            message: "Failed to read frame".into(),
            source: None,
        };
        let line = format_record(&record);
        assert!(line.ends_with("WARN  cue_capture: Failed to read frame"));
    }
}
