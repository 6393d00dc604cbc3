use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use arc_swap::ArcSwap;
use cue_core::State;
use tokio::sync::{mpsc, oneshot};

use crate::{CaptureError, CapturePipeline, FramePair, PipelinePhase};

/// Turns a frame into a ball state.
pub trait Detector: Send + 'static {
    /// Detect the balls in `frame`. `previous` is the last detected state and
    /// can be used to keep ball ids stable.
    fn detect(&mut self, previous: &State, frame: &FramePair) -> State;
}

impl<F> Detector for F
where
    F: FnMut(&State, &FramePair) -> State + Send + 'static,
{
    fn detect(&mut self, previous: &State, frame: &FramePair) -> State {
        self(previous, frame)
    }
}

/// Runs a [`Detector`] on every new frame of a pipeline in a background
/// thread and keeps the latest state.
pub struct StateTracker {
    latest: Arc<ArcSwap<State>>,
    requests: mpsc::UnboundedSender<oneshot::Sender<State>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StateTracker {
    /// Start tracking. `idle_poll` is the pause between reads when no new
    /// frame is available.
    pub fn spawn(
        pipeline: Arc<CapturePipeline>,
        detector: impl Detector,
        idle_poll: Duration,
    ) -> Self {
        let latest = Arc::new(ArcSwap::from_pointee(State::default()));
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let latest = latest.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                track(
                    &pipeline,
                    detector,
                    requests_rx,
                    &latest,
                    &stop,
                    idle_poll,
                )
            })
        };

        Self {
            latest,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    /// The most recently detected state.
    pub fn latest(&self) -> Arc<State> {
        self.latest.load_full()
    }

    /// Wait for the state detected in the next new frame.
    ///
    /// # Errors
    ///
    /// [`CaptureError::StreamTerminated`] if tracking stopped before a state
    /// was detected. Tracking stops when the pipeline is closed or its stream
    /// ends.
    pub async fn capture(&self) -> Result<State, CaptureError> {
        let (tx, rx) = oneshot::channel();
        self.requests.send(tx).map_err(|_| tracker_stopped())?;
        rx.await.map_err(|_| tracker_stopped())
    }

    /// Stop the tracking thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("State tracker thread panicked");
            }
        }
    }
}

impl Drop for StateTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tracker_stopped() -> CaptureError {
    CaptureError::StreamTerminated {
        operation: "capture",
        reason: "state tracker stopped".into(),
    }
}

fn track(
    pipeline: &CapturePipeline,
    mut detector: impl Detector,
    mut requests: mpsc::UnboundedReceiver<oneshot::Sender<State>>,
    latest: &ArcSwap<State>,
    stop: &AtomicBool,
    idle_poll: Duration,
) {
    let mut pending = Vec::new();
    let mut last_frame: Option<Arc<FramePair>> = None;

    while !stop.load(Ordering::Acquire) {
        while let Ok(request) = requests.try_recv() {
            pending.push(request);
        }

        let frame = match pipeline.read() {
            Ok(frame) => frame,
            Err(err @ CaptureError::StreamTerminated { .. }) => {
                log::error!("Stopping state tracker: {err}");
                break;
            }
            Err(CaptureError::NotOpen { .. }) if pipeline.phase() == PipelinePhase::Opening => {
                thread::sleep(idle_poll);
                continue;
            }
            Err(err @ CaptureError::NotOpen { .. }) => {
                log::info!("Stopping state tracker: {err}");
                break;
            }
            Err(err) => {
                log::warn!("{err}");
                thread::sleep(idle_poll);
                continue;
            }
        };

        let seen = last_frame
            .as_ref()
            .is_some_and(|last| Arc::ptr_eq(last, &frame));
        if frame.is_empty() || seen {
            thread::sleep(idle_poll);
            continue;
        }

        let previous = latest.load_full();
        let state = detector.detect(&previous, &frame);
        let diff = previous.diff(&state);
        if !diff.is_empty() {
            log::debug!(
                "State changed: {} added, {} removed, {} moved",
                diff.added.len(),
                diff.removed.len(),
                diff.moved.len()
            );
        }

        for request in pending.drain(..) {
            request.send(state.clone()).ok();
        }
        latest.store(Arc::new(state));
        last_frame = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use cue_core::{Ball, BallId, BallType, CaptureSettings, Vector2};

    use super::*;
    use crate::{frame_index, SyntheticBackend, SyntheticConfig};

    fn recording_pipeline(config: SyntheticConfig) -> Arc<CapturePipeline> {
        let backend = Arc::new(SyntheticBackend::new(config));
        let settings = CaptureSettings {
            max_consecutive_errors: 2,
            ..Default::default()
        };
        let pipeline = Arc::new(CapturePipeline::new(
            backend.clone(),
            backend.selector(),
            settings,
        ));
        pipeline.open().unwrap();
        pipeline.toggle_recording().unwrap();
        pipeline
    }

    /// Places the cue ball at x = frame index.
    fn cue_ball_detector(_: &State, frame: &FramePair) -> State {
        let x = frame_index(frame).unwrap_or_default() as f64;
        State::from_balls([Ball::new(
            BallId::new(0),
            Vector2::new(x, 0.0),
            BallType::Cue,
        )])
        .unwrap_or_default()
    }

    #[test_log::test(tokio::test)]
    async fn test_capture_returns_next_state() {
        let pipeline = recording_pipeline(SyntheticConfig::default());
        let tracker = StateTracker::spawn(
            pipeline.clone(),
            cue_ball_detector,
            Duration::from_millis(1),
        );

        let first = tokio::time::timeout(Duration::from_secs(5), tracker.capture())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), tracker.capture())
            .await
            .unwrap()
            .unwrap();

        let x = |state: &State| state.find_type(BallType::Cue).unwrap().position.x;
        assert!(x(&second) > x(&first));
        assert!(x(tracker.latest().as_ref()) >= x(&second));
    }

    #[test_log::test(tokio::test)]
    async fn test_capture_fails_when_stream_ends() {
        let pipeline = recording_pipeline(SyntheticConfig {
            fail_from: Some(0),
            ..Default::default()
        });
        let tracker = StateTracker::spawn(pipeline, cue_ball_detector, Duration::from_millis(1));

        let result = tokio::time::timeout(Duration::from_secs(5), tracker.capture())
            .await
            .unwrap();
        assert!(matches!(
            result,
            Err(CaptureError::StreamTerminated {
                operation: "capture",
                ..
            })
        ));
        assert!(tracker.latest().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_capture_fails_when_pipeline_closed() {
        let pipeline = recording_pipeline(SyntheticConfig::default());
        let tracker = StateTracker::spawn(
            pipeline.clone(),
            cue_ball_detector,
            Duration::from_millis(1),
        );
        pipeline.close();

        let result = tokio::time::timeout(Duration::from_secs(2), tracker.capture())
            .await
            .unwrap();
        assert!(matches!(
            result,
            Err(CaptureError::StreamTerminated { .. })
        ));
    }

    #[test]
    fn test_drop_stops_thread() {
        let pipeline = recording_pipeline(SyntheticConfig::default());
        let tracker = StateTracker::spawn(
            pipeline.clone(),
            |_: &State, _: &FramePair| State::default(),
            Duration::from_millis(1),
        );
        drop(tracker);
        // The pipeline is released by the tracker thread
        assert_eq!(Arc::strong_count(&pipeline), 1);
    }
}
