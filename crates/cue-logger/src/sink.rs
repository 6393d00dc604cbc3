use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{mpsc as std_mpsc, Arc, Mutex},
    thread,
};

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;

use crate::LogRecord;

/// Destination for structured log records.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord);

    /// Block until all records written so far are persisted.
    fn flush(&self) {}
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write(&self, record: &LogRecord) {
        self.as_ref().write(record);
    }

    fn flush(&self) {
        self.as_ref().flush();
    }
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the records written so far.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: &LogRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
    }
}

enum WorkerMsg {
    Record(LogRecord),
    Flush(std_mpsc::Sender<()>),
}

/// Writes records as JSON lines from a background thread, so logging never
/// waits for the disk.
pub struct JsonFileSink {
    path: PathBuf,
    sender: mpsc::UnboundedSender<WorkerMsg>,
}

impl JsonFileSink {
    /// Create the log file and start the writer thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists or cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            bail!("Log file already exists: {:?}", path);
        }
        let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        thread::spawn(move || run_worker(receiver, BufWriter::new(file)));
        Ok(Self { path, sender })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonFileSink {
    fn write(&self, record: &LogRecord) {
        // The worker only exits once the sink is dropped
        self.sender.send(WorkerMsg::Record(record.clone())).ok();
    }

    fn flush(&self) {
        let (tx, rx) = std_mpsc::channel();
        if self.sender.send(WorkerMsg::Flush(tx)).is_ok() {
            rx.recv().ok();
        }
    }
}

impl Drop for JsonFileSink {
    fn drop(&mut self) {
        self.flush();
    }
}

fn run_worker(mut receiver: mpsc::UnboundedReceiver<WorkerMsg>, mut file: BufWriter<File>) {
    while let Some(msg) = receiver.blocking_recv() {
        match msg {
            WorkerMsg::Record(record) => {
                let written = serde_json::to_writer(&mut file, &record)
                    .map_err(std::io::Error::from)
                    .and_then(|_| file.write_all(b"\n"));
                if let Err(e) = written {
                    eprintln!("Failed to write to log file: {}", e);
                }
            }
            WorkerMsg::Flush(done) => {
                if let Err(e) = file.flush() {
                    eprintln!("Failed to flush log file: {}", e);
                }
                done.send(()).ok();
            }
        }
    }
    let _ = file.flush();
}
