use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use arc_swap::ArcSwap;
use cue_core::CaptureSettings;

use crate::{CaptureError, DeviceBackend, DeviceSelector, FramePair, FrameSource};

/// Lifecycle of a [`CapturePipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelinePhase {
    Closed,
    /// Discovery and connection are in progress
    Opening,
    /// Open, frames are pulled on demand
    Idle,
    /// Open, a background thread publishes frames continuously
    Recording,
}

impl PipelinePhase {
    pub fn is_open(self) -> bool {
        matches!(self, PipelinePhase::Idle | PipelinePhase::Recording)
    }
}

/// Counters since the pipeline was last opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_published: u64,
    pub failed_reads: u64,
}

#[derive(Default)]
struct Shared {
    stop: AtomicBool,
    frames_published: AtomicU64,
    failed_reads: AtomicU64,
    /// Set by the recording thread when it gives up
    terminated: Mutex<Option<String>>,
}

struct Control {
    phase: PipelinePhase,
    /// The open device while it is not lent to the recording thread
    source: Option<Box<dyn FrameSource>>,
    /// The recording thread hands the device back when it exits
    worker: Option<JoinHandle<Box<dyn FrameSource>>>,
}

/// Delivers the freshest frame of a camera without blocking the producer.
///
/// While recording, a background thread reads frames as fast as the device
/// delivers them and swaps each one into a single slot. Readers get the most
/// recent frame; older ones are dropped. All methods take `&self`, so the
/// pipeline can be shared between threads behind an `Arc`.
///
/// Every method except [`latest`](Self::latest) and [`stats`](Self::stats)
/// takes an internal lock. An idle [`read`](Self::read) keeps it while the
/// device delivers a frame, and stopping the recording thread keeps it until
/// the thread finishes its current read. Concurrent callers can therefore
/// wait up to the read timeout. `latest` never waits.
pub struct CapturePipeline {
    backend: Arc<dyn DeviceBackend>,
    selector: DeviceSelector,
    settings: CaptureSettings,
    slot: Arc<ArcSwap<FramePair>>,
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl CapturePipeline {
    pub fn new(
        backend: Arc<dyn DeviceBackend>,
        selector: DeviceSelector,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            backend,
            selector,
            settings,
            slot: Arc::new(ArcSwap::from_pointee(FramePair::empty())),
            shared: Arc::new(Shared::default()),
            control: Mutex::new(Control {
                phase: PipelinePhase::Closed,
                source: None,
                worker: None,
            }),
        }
    }

    pub fn selector(&self) -> &DeviceSelector {
        &self.selector
    }

    pub fn phase(&self) -> PipelinePhase {
        let control = lock(&self.control);
        if lock(&self.shared.terminated).is_some() {
            PipelinePhase::Closed
        } else {
            control.phase
        }
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_published: self.shared.frames_published.load(Ordering::Relaxed),
            failed_reads: self.shared.failed_reads.load(Ordering::Relaxed),
        }
    }

    /// Find the selected device and connect to it. The pipeline is `Idle`
    /// afterwards.
    ///
    /// # Errors
    ///
    /// * [`CaptureError::AlreadyOpen`] if the pipeline is not closed
    /// * [`CaptureError::DeviceUnavailable`] if discovery does not find the device
    /// * [`CaptureError::ConnectionFailed`] if the device refuses the connection
    pub fn open(&self) -> Result<(), CaptureError> {
        {
            let mut control = lock(&self.control);
            self.reap(&mut control);
            if control.phase != PipelinePhase::Closed {
                return Err(CaptureError::AlreadyOpen { operation: "open" });
            }
            control.phase = PipelinePhase::Opening;
        }

        log::info!("Opening {}", self.selector);
        let result = self.connect();

        let mut control = lock(&self.control);
        match result {
            Ok(source) if control.phase == PipelinePhase::Opening => {
                self.slot.store(Arc::new(FramePair::empty()));
                self.shared.frames_published.store(0, Ordering::Relaxed);
                self.shared.failed_reads.store(0, Ordering::Relaxed);
                control.source = Some(source);
                control.phase = PipelinePhase::Idle;
                log::info!("Opened {}", self.selector);
                Ok(())
            }
            Ok(mut source) => {
                source.close();
                Err(CaptureError::ConnectionFailed {
                    operation: "open",
                    device: self.selector.to_string(),
                    reason: "pipeline was closed while opening".into(),
                })
            }
            Err(err) => {
                if control.phase == PipelinePhase::Opening {
                    control.phase = PipelinePhase::Closed;
                }
                log::warn!("{err}");
                Err(err)
            }
        }
    }

    fn connect(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let devices = self.backend.discover();
        log::debug!("Discovered {} devices", devices.len());
        let info = devices
            .into_iter()
            .find(|info| self.selector.matches(info))
            .ok_or_else(|| CaptureError::DeviceUnavailable {
                operation: "open",
                selector: self.selector.to_string(),
            })?;
        self.backend
            .connect(&info)
            .map_err(|err| CaptureError::ConnectionFailed {
                operation: "open",
                device: info.to_string(),
                reason: err.to_string(),
            })
    }

    /// Start or stop the recording thread. Returns the new phase.
    ///
    /// Stopping waits for the thread to exit.
    pub fn toggle_recording(&self) -> Result<PipelinePhase, CaptureError> {
        const OPERATION: &str = "toggle_recording";

        let mut control = lock(&self.control);
        if let Some(reason) = self.reap(&mut control) {
            return Err(CaptureError::StreamTerminated {
                operation: OPERATION,
                reason,
            });
        }

        match control.phase {
            PipelinePhase::Idle => {
                let source = control
                    .source
                    .take()
                    .ok_or(CaptureError::NotOpen { operation: OPERATION })?;
                self.shared.stop.store(false, Ordering::SeqCst);
                control.worker = Some(self.spawn_worker(source));
                control.phase = PipelinePhase::Recording;
                log::info!("Recording started");
            }
            PipelinePhase::Recording => {
                let source = self.stop_worker(&mut control);
                if let Some(reason) = lock(&self.shared.terminated).take() {
                    if let Some(mut source) = source {
                        source.close();
                    }
                    control.phase = PipelinePhase::Closed;
                    return Err(CaptureError::StreamTerminated {
                        operation: OPERATION,
                        reason,
                    });
                }
                match source {
                    Some(source) => {
                        control.source = Some(source);
                        control.phase = PipelinePhase::Idle;
                        log::info!("Recording stopped");
                    }
                    None => {
                        control.phase = PipelinePhase::Closed;
                        return Err(CaptureError::StreamTerminated {
                            operation: OPERATION,
                            reason: "recording thread panicked".into(),
                        });
                    }
                }
            }
            PipelinePhase::Closed | PipelinePhase::Opening => {
                return Err(CaptureError::NotOpen { operation: OPERATION });
            }
        }
        Ok(control.phase)
    }

    /// The current frame.
    ///
    /// While recording this is the most recently published frame (or the
    /// empty frame if none was published yet). While idle, one frame is read
    /// from the device, waiting at most the configured read timeout.
    ///
    /// # Errors
    ///
    /// * [`CaptureError::StreamTerminated`] once, after the recording thread
    ///   gave up
    /// * [`CaptureError::NotOpen`] if the pipeline is closed
    /// * [`CaptureError::ReadFailed`] if an idle read fails
    pub fn read(&self) -> Result<Arc<FramePair>, CaptureError> {
        let mut control = lock(&self.control);
        if let Some(reason) = self.reap(&mut control) {
            return Err(CaptureError::StreamTerminated {
                operation: "read",
                reason,
            });
        }

        match control.phase {
            PipelinePhase::Recording => Ok(self.slot.load_full()),
            PipelinePhase::Idle => {
                let source = control
                    .source
                    .as_mut()
                    .ok_or(CaptureError::NotOpen { operation: "read" })?;
                let frame = source
                    .read_frame(self.settings.read_timeout())
                    .map_err(|source| {
                        self.shared.failed_reads.fetch_add(1, Ordering::Relaxed);
                        CaptureError::ReadFailed {
                            operation: "read",
                            source,
                        }
                    })?;
                let frame = Arc::new(frame);
                self.slot.store(frame.clone());
                self.shared.frames_published.fetch_add(1, Ordering::Relaxed);
                Ok(frame)
            }
            PipelinePhase::Closed | PipelinePhase::Opening => {
                Err(CaptureError::NotOpen { operation: "read" })
            }
        }
    }

    /// The most recently published frame, without touching the device.
    pub fn latest(&self) -> Arc<FramePair> {
        self.slot.load_full()
    }

    /// Stop recording and release the device. Calling this on a closed
    /// pipeline does nothing.
    pub fn close(&self) {
        let mut control = lock(&self.control);
        self.reap(&mut control);

        let was_open = control.phase != PipelinePhase::Closed;
        if let Some(mut source) = self.stop_worker(&mut control) {
            source.close();
        }
        if let Some(mut source) = control.source.take() {
            source.close();
        }
        // The thread may have given up while it was being stopped
        lock(&self.shared.terminated).take();
        control.phase = PipelinePhase::Closed;

        if was_open {
            log::info!("Closed {}", self.selector);
        }
    }

    fn spawn_worker(&self, source: Box<dyn FrameSource>) -> JoinHandle<Box<dyn FrameSource>> {
        let slot = self.slot.clone();
        let shared = self.shared.clone();
        let timeout = self.settings.read_timeout();
        let max_errors = self.settings.max_consecutive_errors.max(1);
        thread::spawn(move || record(source, &slot, &shared, timeout, max_errors))
    }

    /// Signal the recording thread to stop and wait for it. Returns the device
    /// unless the thread panicked.
    fn stop_worker(&self, control: &mut Control) -> Option<Box<dyn FrameSource>> {
        let handle = control.worker.take()?;
        self.shared.stop.store(true, Ordering::SeqCst);
        match handle.join() {
            Ok(source) => Some(source),
            Err(_) => {
                log::error!("Recording thread panicked");
                None
            }
        }
    }

    /// If the recording thread gave up, join it, release the device and
    /// return the reason. The reason is reported only once.
    fn reap(&self, control: &mut Control) -> Option<String> {
        let reason = lock(&self.shared.terminated).take()?;
        if let Some(mut source) = self.stop_worker(control) {
            source.close();
        }
        if let Some(mut source) = control.source.take() {
            source.close();
        }
        control.phase = PipelinePhase::Closed;
        log::debug!("Recording thread exited: {reason}");
        Some(reason)
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.close();
    }
}

fn record(
    mut source: Box<dyn FrameSource>,
    slot: &ArcSwap<FramePair>,
    shared: &Shared,
    timeout: Duration,
    max_errors: u32,
) -> Box<dyn FrameSource> {
    let mut consecutive_errors = 0;
    while !shared.stop.load(Ordering::Acquire) {
        match source.read_frame(timeout) {
            Ok(frame) => {
                consecutive_errors = 0;
                slot.store(Arc::new(frame));
                shared.frames_published.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                consecutive_errors += 1;
                shared.failed_reads.fetch_add(1, Ordering::Relaxed);
                log::warn!("Failed to read frame ({consecutive_errors}/{max_errors}): {err}");
                if consecutive_errors >= max_errors {
                    let reason = format!("{consecutive_errors} consecutive read failures: {err}");
                    log::error!("Recording stopped: {reason}");
                    *lock(&shared.terminated) = Some(reason);
                    break;
                }
            }
        }
    }
    source
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
