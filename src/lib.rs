//! Facelens maps real-time face detection results onto live camera previews.
//!
//! A camera delivers frames, an external face detector locates faces in them, and this crate
//! turns the detector's output (bounding boxes, named landmarks, smile probability, all in
//! frame-pixel coordinates) into drawing primitives positioned in canvas coordinates. The
//! [`overlay`] module is the heart of the crate: it reproduces the preview widget's aspect-fill
//! ("cover") scaling and the horizontal mirroring applied to front-facing cameras, so that the
//! overlay lines up with the video underneath it.
//!
//! The [`tracker`] module provides the glue around the two external collaborators: a
//! [`tracker::FaceTracker`] owns the camera and detector lifecycles, runs detection on a worker
//! thread, and enforces a single-flight backpressure policy: at most one detection in flight,
//! newer frames are dropped rather than queued.

use log::LevelFilter;

pub mod color;
pub mod detection;
pub mod frame;
pub mod overlay;
pub mod rect;
pub mod resolution;
pub mod timer;
pub mod tracker;
pub mod worker;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and facelens will log at *debug* level; set `RUST_LOG` to override.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
