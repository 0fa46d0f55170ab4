//! Detected-face records and the detector boundary.

use nalgebra::Point2;

use crate::frame::EncodedFrame;
use crate::rect::Rect;

/// The named landmark points a detector can locate on a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkKind {
    LeftEye = 0,
    RightEye = 1,
    NoseBase = 2,
    MouthLeft = 3,
    MouthRight = 4,
}

impl LandmarkKind {
    /// All landmark kinds, in the order detectors typically report them.
    pub const ALL: [LandmarkKind; 5] = [
        LandmarkKind::LeftEye,
        LandmarkKind::RightEye,
        LandmarkKind::NoseBase,
        LandmarkKind::MouthLeft,
        LandmarkKind::MouthRight,
    ];
}

/// A face located by a [`Detector`] in one frame, in frame-pixel coordinates.
///
/// Face records are value types: every processed frame produces a fresh list that supersedes the
/// previous one wholesale. There is no identity or tracking of faces across frames.
///
/// Not every detector reports every landmark, and smile classification may be disabled entirely,
/// so both are optional per face.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    bounding_rect: Rect,
    landmarks: [Option<Point2<f32>>; 5],
    smile: Option<f32>,
}

impl DetectedFace {
    pub fn new(bounding_rect: Rect) -> Self {
        Self {
            bounding_rect,
            landmarks: [None; 5],
            smile: None,
        }
    }

    /// Adds a landmark position, replacing any previous position of the same kind.
    pub fn with_landmark(mut self, kind: LandmarkKind, position: impl Into<Point2<f32>>) -> Self {
        self.landmarks[kind as usize] = Some(position.into());
        self
    }

    /// Sets the smile classification result, a probability in `[0, 1]`.
    pub fn with_smile(mut self, probability: f32) -> Self {
        self.smile = Some(probability);
        self
    }

    /// Returns the axis-aligned bounding rectangle containing the face.
    pub fn bounding_rect(&self) -> Rect {
        self.bounding_rect
    }

    /// Returns the position of the given landmark, if the detector reported it.
    pub fn landmark(&self, kind: LandmarkKind) -> Option<Point2<f32>> {
        self.landmarks[kind as usize]
    }

    /// Returns an iterator over the landmarks that are present on this face.
    ///
    /// Absent landmarks are skipped, not substituted.
    pub fn landmarks(&self) -> impl Iterator<Item = (LandmarkKind, Point2<f32>)> + '_ {
        LandmarkKind::ALL
            .into_iter()
            .filter_map(|kind| self.landmark(kind).map(|position| (kind, position)))
    }

    pub fn smile(&self) -> Option<f32> {
        self.smile
    }
}

/// Trait implemented by face detectors.
///
/// The [`FaceTracker`][crate::tracker::FaceTracker] moves its detector onto a worker thread,
/// hence the `Send + 'static` bound. Implementations receive one [`EncodedFrame`] at a time and
/// return every face found in it; an empty list is a successful result, not an error.
pub trait Detector: Send + 'static {
    fn detect(&mut self, frame: &EncodedFrame) -> anyhow::Result<Vec<DetectedFace>>;
}
