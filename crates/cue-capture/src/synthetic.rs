use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    ColorImage, DepthImage, DeviceBackend, DeviceError, DeviceInfo, DeviceKind, DeviceSelector,
    FramePair, FrameSource,
};

/// Configuration of the synthetic camera.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Time the camera takes to deliver one frame
    pub frame_interval: Duration,
    /// Whether frames carry depth and colorized depth images
    pub with_depth: bool,
    /// Every read from this frame index on fails
    pub fail_from: Option<u64>,
    /// Every n-th read fails
    pub fail_every: Option<u64>,
    /// Make `connect` fail
    pub refuse_connection: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".into(),
            width: 64,
            height: 48,
            frame_interval: Duration::from_millis(10),
            with_depth: true,
            fail_from: None,
            fail_every: None,
            refuse_connection: false,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// A camera that generates frames in-process.
///
/// Every sample of frame `n` holds the same value derived from `n` (see
/// [`frame_index`]), so a frame mixing two captures is easy to spot.
#[derive(Debug)]
pub struct SyntheticBackend {
    config: SyntheticConfig,
    counters: Arc<Counters>,
}

impl SyntheticBackend {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    /// The selector that finds this camera.
    pub fn selector(&self) -> DeviceSelector {
        DeviceSelector::Synthetic {
            name: self.config.name.clone(),
        }
    }

    /// Number of successful connections so far.
    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    /// Number of times a connected device was released.
    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }
}

impl DeviceBackend for SyntheticBackend {
    fn discover(&self) -> Vec<DeviceInfo> {
        vec![DeviceInfo::new(
            DeviceKind::Synthetic,
            self.config.name.clone(),
            "synthetic",
        )]
    }

    fn connect(&self, info: &DeviceInfo) -> Result<Box<dyn FrameSource>, DeviceError> {
        if self.config.refuse_connection {
            return Err(DeviceError::Refused(format!("{} is busy", info.id)));
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        log::debug!("Connected to {info}");
        Ok(Box::new(SyntheticSource {
            config: self.config.clone(),
            counters: self.counters.clone(),
            next_index: 0,
            closed: false,
        }))
    }
}

struct SyntheticSource {
    config: SyntheticConfig,
    counters: Arc<Counters>,
    next_index: u64,
    closed: bool,
}

impl SyntheticSource {
    fn should_fail(&self, index: u64) -> bool {
        let from = self.config.fail_from.is_some_and(|n| index >= n);
        let every = self
            .config
            .fail_every
            .is_some_and(|n| n > 0 && (index + 1) % n == 0);
        from || every
    }
}

impl FrameSource for SyntheticSource {
    fn read_frame(&mut self, timeout: Duration) -> Result<FramePair, DeviceError> {
        if self.closed {
            return Err(DeviceError::Disconnected);
        }
        if self.config.frame_interval > timeout {
            std::thread::sleep(timeout);
            return Err(DeviceError::Timeout { timeout });
        }
        std::thread::sleep(self.config.frame_interval);

        let index = self.next_index;
        self.next_index += 1;
        if self.should_fail(index) {
            return Err(DeviceError::Frame(format!("injected failure at frame {index}")));
        }
        Ok(synthetic_frame(
            self.config.width,
            self.config.height,
            self.config.with_depth,
            index,
        ))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Frame number `index` of a synthetic camera.
pub fn synthetic_frame(width: usize, height: usize, with_depth: bool, index: u64) -> FramePair {
    let value = (index % 256) as u8;
    let color = ColorImage::filled(width, height, 3, value);
    if !with_depth {
        return FramePair::color_only(color);
    }
    let depth = DepthImage::filled(width, height, 1, index as f32);
    let colorized = ColorImage::filled(width, height, 3, 255 - value);
    FramePair::new(color, Some(depth), Some(colorized))
        .unwrap_or_else(|_| FramePair::empty())
}

/// The index of a synthetic frame, or `None` if the frame is empty or its
/// samples disagree.
pub fn frame_index(frame: &FramePair) -> Option<u64> {
    let color = uniform(frame.color().data())?;
    let Some(depth) = frame.depth() else {
        return Some(color as u64);
    };
    let index = uniform(depth.data())? as u64;
    let colorized = match frame.colorized_depth() {
        Some(image) => uniform(image.data())?,
        None => 255 - color,
    };
    (index % 256 == color as u64 && colorized == 255 - color).then_some(index)
}

fn uniform<T: Copy + PartialEq>(data: &[T]) -> Option<T> {
    let first = *data.first()?;
    data.iter().all(|v| *v == first).then_some(first)
}
