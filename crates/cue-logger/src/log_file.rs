use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result};

use crate::{LogLevel, LogRecord};

/// A JSON-lines log file read back into memory.
pub struct LogFile {
    records: Vec<LogRecord>,
    skipped: usize,
}

impl LogFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open log file {:?}", path.as_ref()))?;
        Self::read(file)
    }

    /// Parse records from any reader. Lines that are not valid records are
    /// skipped and counted.
    pub fn read(source: impl Read) -> Result<Self> {
        let mut records = Vec::new();
        let mut skipped = 0;
        for line in BufReader::new(source).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("Failed to parse log line: {}", e);
                    skipped += 1;
                }
            }
        }
        Ok(Self { records, skipped })
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn take_records(self) -> Vec<LogRecord> {
        self.records
    }

    /// Number of lines that could not be parsed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Records at `level` or more severe.
    pub fn at_least(&self, level: LogLevel) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().filter(move |r| r.level <= level)
    }

    /// Records with a timestamp in `[start, end)`.
    pub fn between(&self, start: f64, end: f64) -> impl Iterator<Item = &LogRecord> {
        self.records
            .iter()
            .filter(move |r| r.timestamp >= start && r.timestamp < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"{"timestamp":1.0,"level":"info","target":"cue_cli","message":"start"}
{"timestamp":2.0,"level":"warn","target":"cue_capture::pipeline","message":"Failed to read frame","source":"src/pipeline.rs:10"}
not json

{"timestamp":3.0,"level":"debug","target":"cue_physics","message":"miss"}
"#;

    #[test]
    fn test_read_skips_bad_lines() {
        let log = LogFile::read(LOG.as_bytes()).unwrap();
        assert_eq!(log.records().len(), 3);
        assert_eq!(log.skipped(), 1);
        assert_eq!(
            log.records()[1].source.as_deref(),
            Some("src/pipeline.rs:10")
        );
    }

    #[test]
    fn test_filters() {
        let log = LogFile::read(LOG.as_bytes()).unwrap();
        assert_eq!(log.at_least(LogLevel::Info).count(), 2);
        assert_eq!(log.at_least(LogLevel::Error).count(), 0);
        let messages = log
            .between(2.0, 4.0)
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["Failed to read frame", "miss"]);
    }
}
