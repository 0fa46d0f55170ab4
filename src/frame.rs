//! Camera frames and their conversion for detector submission.

use anyhow::bail;

use crate::resolution::Resolution;

/// Sensor-to-display rotation of a camera frame, in 90° steps.
///
/// Cameras report the rotation as plain degrees; [`Rotation::from_degrees`] maps them onto the
/// values the detector understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Maps rotation degrees as reported by the camera to the detector-facing enum.
    pub fn from_degrees(degrees: u32) -> anyhow::Result<Self> {
        Ok(match degrees {
            0 => Self::Deg0,
            90 => Self::Deg90,
            180 => Self::Deg180,
            270 => Self::Deg270,
            _ => bail!("unsupported sensor rotation of {degrees}°"),
        })
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether this rotation exchanges width and height on screen.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Pixel format tag forwarded to the detector alongside the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PixelFormat {
    Nv21,
    Yuv420,
    Bgra8888,
}

/// One plane of a camera frame.
#[derive(Debug, Clone)]
pub struct Plane {
    pub bytes: Vec<u8>,
    pub bytes_per_row: u32,
}

/// A frame as delivered by the camera stream, before conversion.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub planes: Vec<Plane>,
    pub width: u32,
    pub height: u32,
    /// Sensor rotation in degrees, one of 0/90/180/270.
    pub rotation_degrees: u32,
    pub format: PixelFormat,
}

impl RawFrame {
    /// Converts this frame into the flat representation submitted to the detector.
    ///
    /// Malformed frames (no planes, empty plane data, zero-sized image, unknown rotation) are
    /// conversion errors. Such frames are expected to be rare and transient; callers drop them
    /// and carry on without surfacing anything to the user.
    pub fn encode(&self) -> anyhow::Result<EncodedFrame> {
        if self.width == 0 || self.height == 0 {
            bail!("zero-sized frame ({}x{})", self.width, self.height);
        }
        if self.planes.is_empty() || self.planes.iter().any(|plane| plane.bytes.is_empty()) {
            bail!("frame has missing or empty plane data");
        }
        let rotation = Rotation::from_degrees(self.rotation_degrees)?;

        let total = self.planes.iter().map(|plane| plane.bytes.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for plane in &self.planes {
            bytes.extend_from_slice(&plane.bytes);
        }

        Ok(EncodedFrame {
            bytes,
            resolution: Resolution::new(self.width, self.height),
            rotation,
            format: self.format,
            bytes_per_row: self.planes[0].bytes_per_row,
        })
    }
}

/// A frame in the form the [`Detector`][crate::detection::Detector] consumes: the concatenated
/// plane bytes plus the metadata needed to interpret them.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    bytes: Vec<u8>,
    resolution: Resolution,
    rotation: Rotation,
    format: PixelFormat,
    bytes_per_row: u32,
}

impl EncodedFrame {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Row stride of the frame's first plane, in bytes.
    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

/// Geometry of the frames a camera session delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub resolution: Resolution,
    pub rotation: Rotation,
    /// `true` for front-facing cameras, whose previews are mirrored.
    pub mirrored: bool,
}

impl FrameGeometry {
    /// The extent the frame occupies on screen, after applying the sensor rotation.
    pub fn display_resolution(&self) -> Resolution {
        if self.rotation.is_quarter_turn() {
            self.resolution.swapped()
        } else {
            self.resolution
        }
    }
}
