//! The overlay coordinate mapper.
//!
//! Detectors report geometry in frame-pixel coordinates, while the preview widget draws in
//! canvas coordinates. The preview scales the camera image with an aspect-fill ("cover") policy:
//! the image is scaled uniformly until it covers the whole canvas, the overflow is cropped
//! symmetrically, and front-camera previews are additionally mirrored horizontally.
//! [`ViewTransform`] reproduces exactly that mapping for detection results, so the drawn overlay
//! lines up with the video underneath it.
//!
//! [`render_overlay`] turns a detection list into [`Shape`]s, drawing primitives that are already
//! in canvas coordinates. Rasterizing them is the rendering surface's business.

use nalgebra::{point, Point2};

use crate::color::Color;
use crate::detection::DetectedFace;
use crate::rect::Rect;
use crate::resolution::Resolution;

/// Relative amount by which a detector bounding box is narrowed before display.
///
/// Detector boxes are visually looser horizontally and tighter vertically than a natural face
/// outline, so the displayed box is tightened around its unchanged center. The exact values are
/// presentation policy and must stay fixed for visual parity across releases.
pub const BOX_WIDTH_SHRINK: f32 = 0.15;

/// Relative amount by which a detector bounding box is lengthened before display.
pub const BOX_HEIGHT_GROW: f32 = 0.10;

/// Corner radius of the face rectangle, in canvas units.
pub const CORNER_RADIUS: f32 = 12.0;

/// Offset of the numbered badge from the face rectangle's top-left corner.
pub const BADGE_INSET: f32 = 8.0;

/// Gap between the face rectangle's bottom edge and the smile label.
pub const LABEL_GAP: f32 = 4.0;

/// Radius of a landmark dot, in canvas units.
pub const LANDMARK_RADIUS: f32 = 3.0;

/// Badge and box colors, assigned per face index in list order.
const FACE_COLORS: [Color; 6] = [
    Color::CYAN,
    Color::MAGENTA,
    Color::YELLOW,
    Color::GREEN,
    Color::BLUE,
    Color::RED,
];

/// Mapping from frame-pixel coordinates to canvas coordinates.
///
/// A [`ViewTransform`] is a pure value computed from the frame and canvas geometry; it holds no
/// other state and may be recomputed every paint pass. Within one render pass all faces must be
/// projected through the same transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    canvas_width: f32,
    mirrored: bool,
}

impl ViewTransform {
    /// Computes the cover-fit mapping of a `frame`-sized image onto a canvas.
    ///
    /// The scale factor is the larger of the two per-axis ratios, so the scaled frame always
    /// covers the canvas entirely and may overflow one axis; the centering offsets crop that
    /// overflow symmetrically.
    ///
    /// A zero-area frame or canvas yields non-finite outputs. Avoiding that is the caller's
    /// responsibility (a preview surface with zero extent has nothing to draw anyway).
    pub fn new(frame: Resolution, canvas_width: f32, canvas_height: f32, mirrored: bool) -> Self {
        let scale = f32::max(
            canvas_width / frame.width() as f32,
            canvas_height / frame.height() as f32,
        );
        Self {
            scale,
            offset_x: (canvas_width - frame.width() as f32 * scale) / 2.0,
            offset_y: (canvas_height - frame.height() as f32 * scale) / 2.0,
            canvas_width,
            mirrored,
        }
    }

    /// Computes the transform for frames described by `geometry`.
    ///
    /// The frame extent is taken after sensor rotation, and the mirror flag follows the camera's
    /// facing.
    pub fn for_frame(
        geometry: &crate::frame::FrameGeometry,
        canvas_width: f32,
        canvas_height: f32,
    ) -> Self {
        Self::new(
            geometry.display_resolution(),
            canvas_width,
            canvas_height,
            geometry.mirrored,
        )
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> (f32, f32) {
        (self.offset_x, self.offset_y)
    }

    /// Maps a face bounding box into canvas coordinates.
    ///
    /// Applies the fixed box adjustment, then the cover-fit scale and centering offsets, then the
    /// horizontal mirror if the source camera is front-facing. Edge ordering (`left < right`,
    /// `top < bottom`) is preserved; the vertical extent is never mirrored.
    pub fn project_rect(&self, rect: Rect) -> Rect {
        let adjusted = rect.scale_axes(1.0 - BOX_WIDTH_SHRINK, 1.0 + BOX_HEIGHT_GROW);
        let left = adjusted.left() * self.scale + self.offset_x;
        let right = adjusted.right() * self.scale + self.offset_x;
        let top = adjusted.top() * self.scale + self.offset_y;
        let width = right - left;
        let height = adjusted.height() * self.scale;
        if self.mirrored {
            // Reflect the horizontal extent about the canvas center; left and right swap roles.
            Rect::from_top_left(self.canvas_width - right, top, width, height)
        } else {
            Rect::from_top_left(left, top, width, height)
        }
    }

    /// Maps a single frame-pixel point (a landmark, usually) into canvas coordinates.
    ///
    /// Points receive no box adjustment.
    pub fn project_point(&self, pt: Point2<f32>) -> Point2<f32> {
        let x = pt.x * self.scale + self.offset_x;
        let y = pt.y * self.scale + self.offset_y;
        if self.mirrored {
            point![self.canvas_width - x, y]
        } else {
            point![x, y]
        }
    }
}

/// Smile-probability buckets shown in the overlay label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmileTier {
    VeryHappy,
    SlightSmile,
    Neutral,
}

impl SmileTier {
    /// Probability above which a face is labelled "very happy".
    pub const VERY_HAPPY_THRESHOLD: f32 = 0.7;
    /// Probability above which a face is labelled "slight smile".
    pub const SLIGHT_SMILE_THRESHOLD: f32 = 0.3;

    pub fn from_probability(probability: f32) -> Self {
        if probability > Self::VERY_HAPPY_THRESHOLD {
            Self::VeryHappy
        } else if probability > Self::SLIGHT_SMILE_THRESHOLD {
            Self::SlightSmile
        } else {
            Self::Neutral
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            Self::VeryHappy => "very happy",
            Self::SlightSmile => "slight smile",
            Self::Neutral => "neutral",
        }
    }

    fn color(self) -> Color {
        match self {
            Self::VeryHappy => Color::GREEN,
            Self::SlightSmile => Color::YELLOW,
            Self::Neutral => Color::RED,
        }
    }
}

/// Visual style of the rendered overlay.
///
/// Both skins share the same coordinate mapping; they only differ in which shapes are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Skin {
    /// Colored per-face boxes with numbered badges, smile labels and landmark dots.
    #[default]
    Badged,
    /// A plain green box per face, nothing else.
    Plain,
}

/// A drawing primitive in canvas coordinates, ready for the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A face bounding box, drawn with rounded corners.
    RoundedRect {
        rect: Rect,
        corner_radius: f32,
        color: Color,
    },
    /// A small filled circle marking a landmark.
    Dot {
        center: Point2<f32>,
        radius: f32,
        color: Color,
    },
    /// A numbered per-face badge.
    Badge {
        anchor: Point2<f32>,
        number: usize,
        color: Color,
    },
    /// A smile label.
    Label {
        anchor: Point2<f32>,
        text: String,
        color: Color,
    },
}

/// Turns the current detection list into canvas-space drawing primitives.
///
/// Faces are processed in list order. For each face this emits the adjusted, scaled and possibly
/// mirrored bounding rectangle; with [`Skin::Badged`] also a numbered badge anchored above the
/// rectangle's top-left corner, a smile label below its bottom-left corner (when the detector
/// classified a smile), and one dot per landmark the detector reported.
pub fn render_overlay(faces: &[DetectedFace], transform: &ViewTransform, skin: Skin) -> Vec<Shape> {
    let mut shapes = Vec::new();
    for (index, face) in faces.iter().enumerate() {
        let rect = transform.project_rect(face.bounding_rect());

        if skin == Skin::Plain {
            shapes.push(Shape::RoundedRect {
                rect,
                corner_radius: CORNER_RADIUS,
                color: Color::GREEN,
            });
            continue;
        }

        let face_color = FACE_COLORS[index % FACE_COLORS.len()];
        shapes.push(Shape::RoundedRect {
            rect,
            corner_radius: CORNER_RADIUS,
            color: face_color,
        });
        shapes.push(Shape::Badge {
            anchor: point![rect.left() - BADGE_INSET, rect.top() - BADGE_INSET],
            number: index + 1,
            color: face_color,
        });

        if let Some(probability) = face.smile() {
            let tier = SmileTier::from_probability(probability);
            shapes.push(Shape::Label {
                anchor: point![rect.left(), rect.bottom() + LABEL_GAP],
                text: format!(
                    "{} ({}%)",
                    tier.caption(),
                    (probability * 100.0).round() as u32
                ),
                color: tier.color(),
            });
        }

        for (_, position) in face.landmarks() {
            shapes.push(Shape::Dot {
                center: transform.project_point(position),
                radius: LANDMARK_RADIUS,
                color: Color::WHITE,
            });
        }
    }
    shapes
}
