use crate::CaptureError;

/// A dense image buffer in row-major, interleaved channel order.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<T>,
}

/// 8 bit color image (BGR or RGB, as delivered by the device).
pub type ColorImage = Image<u8>;
/// Single channel depth image, in mm.
pub type DepthImage = Image<f32>;

impl<T: Copy> Image<T> {
    /// Wrap an existing buffer.
    ///
    /// # Errors
    ///
    /// [`CaptureError::DimensionMismatch`] if the buffer length does not equal
    /// `width * height * channels`.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<T>,
    ) -> Result<Self, CaptureError> {
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(CaptureError::DimensionMismatch {
                operation: "Image::new",
                expected: format!("{expected} samples"),
                found: format!("{} samples", data.len()),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// An image with every sample set to `value`.
    pub fn filled(width: usize, height: usize, channels: usize, value: T) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![value; width * height * channels],
        }
    }

    /// A zero-sized image.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            channels: 0,
            data: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The channels of the pixel at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[T]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        self.data.get(start..start + self.channels)
    }
}

/// A color frame and the optional depth images captured with it.
///
/// All images that are present share the same width and height. Published
/// frames are never modified.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePair {
    color: ColorImage,
    depth: Option<DepthImage>,
    colorized_depth: Option<ColorImage>,
}

impl FramePair {
    /// # Errors
    ///
    /// [`CaptureError::DimensionMismatch`] if a depth image differs in size
    /// from the color image.
    pub fn new(
        color: ColorImage,
        depth: Option<DepthImage>,
        colorized_depth: Option<ColorImage>,
    ) -> Result<Self, CaptureError> {
        let size = color.dimensions();
        let sizes = depth
            .as_ref()
            .map(Image::dimensions)
            .into_iter()
            .chain(colorized_depth.as_ref().map(Image::dimensions));
        for other in sizes {
            if other != size {
                return Err(CaptureError::DimensionMismatch {
                    operation: "FramePair::new",
                    expected: format!("{}x{}", size.0, size.1),
                    found: format!("{}x{}", other.0, other.1),
                });
            }
        }
        Ok(Self {
            color,
            depth,
            colorized_depth,
        })
    }

    /// A frame from a device without a depth sensor.
    pub fn color_only(color: ColorImage) -> Self {
        Self {
            color,
            depth: None,
            colorized_depth: None,
        }
    }

    /// The frame returned before anything was captured.
    pub fn empty() -> Self {
        Self::color_only(ColorImage::empty())
    }

    /// Whether this is the "nothing captured yet" frame.
    pub fn is_empty(&self) -> bool {
        self.color.is_empty() && self.depth.is_none()
    }

    pub fn color(&self) -> &ColorImage {
        &self.color
    }

    pub fn depth(&self) -> Option<&DepthImage> {
        self.depth.as_ref()
    }

    pub fn colorized_depth(&self) -> Option<&ColorImage> {
        self.colorized_depth.as_ref()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.color.dimensions()
    }
}

impl Default for FramePair {
    fn default() -> Self {
        Self::empty()
    }
}
