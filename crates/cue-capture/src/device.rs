use std::{fmt, time::Duration};

use crate::{DeviceError, FramePair};

/// The kind of camera behind a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    GigE,
    Usb3,
    Depth,
    Synthetic,
}

/// Which device to open. Decided once, when the pipeline is created.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceSelector {
    /// GigE Vision camera, identified by its MAC address
    GigE { mac: String },
    /// USB3 Vision camera, identified by its serial number
    Usb3 { serial: String },
    /// Color + depth sensor, identified by its serial number
    Depth { serial: String },
    /// In-process generated frames
    Synthetic { name: String },
}

impl DeviceSelector {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceSelector::GigE { .. } => DeviceKind::GigE,
            DeviceSelector::Usb3 { .. } => DeviceKind::Usb3,
            DeviceSelector::Depth { .. } => DeviceKind::Depth,
            DeviceSelector::Synthetic { .. } => DeviceKind::Synthetic,
        }
    }

    /// The address, serial or name the selector looks for.
    pub fn id(&self) -> &str {
        match self {
            DeviceSelector::GigE { mac } => mac,
            DeviceSelector::Usb3 { serial } | DeviceSelector::Depth { serial } => serial,
            DeviceSelector::Synthetic { name } => name,
        }
    }

    /// Whether a discovered device is the one selected. MAC addresses match
    /// regardless of case and separator (`00:1A:2B` == `00-1a-2b`).
    pub fn matches(&self, info: &DeviceInfo) -> bool {
        if self.kind() != info.kind {
            return false;
        }
        match self {
            DeviceSelector::GigE { mac } => normalize_mac(mac) == normalize_mac(&info.id),
            _ => self.id() == info.id,
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::GigE { mac } => write!(f, "GigE camera {mac}"),
            DeviceSelector::Usb3 { serial } => write!(f, "USB3 camera {serial}"),
            DeviceSelector::Depth { serial } => write!(f, "depth camera {serial}"),
            DeviceSelector::Synthetic { name } => write!(f, "synthetic camera {name}"),
        }
    }
}

fn normalize_mac(mac: &str) -> String {
    mac.chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A device found during discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    /// MAC address, serial number or name, depending on `kind`
    pub id: String,
    pub model: String,
}

impl DeviceInfo {
    pub fn new(kind: DeviceKind, id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?} {})", self.model, self.kind, self.id)
    }
}

/// An open device that produces frames.
pub trait FrameSource: Send {
    /// Block until the next frame is available, at most `timeout`.
    fn read_frame(&mut self, timeout: Duration) -> Result<FramePair, DeviceError>;

    /// Release the device. Called exactly once by the pipeline.
    fn close(&mut self) {}
}

/// Discovers and connects devices of one or more kinds.
pub trait DeviceBackend: Send + Sync {
    fn discover(&self) -> Vec<DeviceInfo>;

    fn connect(&self, info: &DeviceInfo) -> Result<Box<dyn FrameSource>, DeviceError>;
}
