//! Rectangle math for detection boxes and overlay geometry.

use std::{fmt, ops::RangeInclusive};

use nalgebra::{point, vector, Point2, Vector2};

/// An axis-aligned rectangle.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: Point2<f32>,
    size: Vector2<f32>,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: point![x_center, y_center],
            size: vector![width, height],
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Constructs a [`Rect`] that spans a range of X and Y coordinates.
    pub fn from_ranges(x: RangeInclusive<f32>, y: RangeInclusive<f32>) -> Self {
        let (x_min, x_max) = (*x.start(), *x.end());
        let (y_min, y_max) = (*y.start(), *y.end());
        assert!(x_min <= x_max, "x_min={}, x_max={}", x_min, x_max);
        assert!(y_min <= y_max, "y_min={}, y_max={}", y_min, y_max);
        Self::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min)
    }

    /// Resizes width and height by independent factors, keeping the center unchanged.
    #[must_use]
    pub fn scale_axes(&self, width_factor: f32, height_factor: f32) -> Self {
        Self {
            center: self.center,
            size: vector![self.size.x * width_factor, self.size.y * height_factor],
        }
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        self.center - self.size * 0.5
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.top_left().x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.top_left().y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x()
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y()
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x() + self.width()
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y() + self.height()
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.center
    }

    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.size
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    #[must_use]
    pub fn move_by(&self, offset: Vector2<f32>) -> Rect {
        Rect {
            center: self.center + offset,
            ..*self
        }
    }

    pub fn contains_point(&self, point: impl Into<Point2<f32>>) -> bool {
        let p: Point2<f32> = point.into();
        self.left() <= p.x && self.top() <= p.y && self.right() >= p.x && self.bottom() >= p.y
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.center.x, self.center.y, self.size.x, self.size.y
        )
    }
}
