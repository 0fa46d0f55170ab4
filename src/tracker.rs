//! Camera and detector session control.
//!
//! [`FaceTracker`] ties the two external collaborators together: it owns the camera (a
//! [`FrameSource`]) and the face [`Detector`], runs detection on a worker thread, and keeps the
//! most recent complete detection result around for the rendering surface.
//!
//! Backpressure is a one-slot single-flight gate: while a detection is in flight, newly delivered
//! frames are dropped, never queued. This keeps latency bounded when inference is slower than the
//! camera's frame rate. No frame is ever buffered for later processing.

use anyhow::{bail, Context};

use crate::detection::{DetectedFace, Detector};
use crate::frame::{EncodedFrame, RawFrame};
use crate::timer::{FpsCounter, Timer};
use crate::worker::{promise, Promise, PromiseHandle, Worker};

/// Scoped acquisition of a camera stream.
///
/// `start` begins frame delivery; the source's delivery mechanism pushes each frame into
/// [`FaceTracker::process_frame`]. `stop` halts delivery and must tolerate being called when the
/// stream is not running.
pub trait FrameSource {
    fn start(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self);
}

type DetectionResult = anyhow::Result<Vec<DetectedFace>>;

/// Drives face detection over a live camera stream.
///
/// All mutable state lives in plain owned fields and every method runs on the caller's thread
/// (the UI loop); only the detector itself runs elsewhere. Construct one tracker per camera
/// session.
pub struct FaceTracker<S: FrameSource, D: Detector> {
    source: S,
    /// Present until `start` moves the detector onto the worker thread.
    detector: Option<D>,
    worker: Option<Worker<(EncodedFrame, Promise<DetectionResult>)>>,
    /// The single-flight slot. `Some` while a detection is in flight.
    pending: Option<PromiseHandle<DetectionResult>>,
    faces: Vec<DetectedFace>,
    generation: u64,
    dropped_frames: u64,
    running: bool,
    t_encode: Timer,
    fps: FpsCounter,
}

impl<S: FrameSource, D: Detector> FaceTracker<S, D> {
    pub fn new(source: S, detector: D) -> Self {
        Self {
            source,
            detector: Some(detector),
            worker: None,
            pending: None,
            faces: Vec::new(),
            generation: 0,
            dropped_frames: 0,
            running: false,
            t_encode: Timer::new("encode"),
            fps: FpsCounter::new("detector"),
        }
    }

    /// Acquires the camera and detector and begins streaming.
    ///
    /// On failure nothing is left running and the error is returned for the caller to surface as
    /// a "not ready" state. The tracker never retries on its own, and a stopped tracker cannot be
    /// started again (its detector now lives on the exited worker thread).
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.running {
            bail!("tracker already started");
        }
        let mut detector = self
            .detector
            .take()
            .context("tracker cannot be restarted after stop")?;
        let worker = Worker::spawn(
            "face detector",
            move |(frame, promise): (EncodedFrame, Promise<DetectionResult>)| {
                promise.fulfill(detector.detect(&frame));
            },
        )?;
        if let Err(e) = self.source.start() {
            // The worker is dropped here, which joins its thread.
            return Err(e).context("failed to start frame source");
        }
        self.worker = Some(worker);
        self.running = true;
        log::debug!("face tracker started");
        Ok(())
    }

    /// Entry point for the camera's per-frame callback.
    ///
    /// First collects a finished detection if one is ready, then either submits this frame to the
    /// detector or drops it when a detection is still in flight. Frames that fail conversion are
    /// skipped silently without occupying the in-flight slot.
    ///
    /// Returns `true` when the frame was submitted for detection.
    pub fn process_frame(&mut self, frame: &RawFrame) -> bool {
        if !self.running {
            return false;
        }
        self.poll();

        if self.pending.is_some() {
            self.dropped_frames += 1;
            log::trace!(
                "detector busy, dropping frame ({} dropped so far)",
                self.dropped_frames
            );
            return false;
        }

        let encoded = match self.t_encode.time(|| frame.encode()) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::trace!("skipping malformed frame: {e}");
                return false;
            }
        };

        let Some(worker) = self.worker.as_mut() else {
            // Detection died earlier in this session; the stale overlay stays up.
            return false;
        };
        let (promise, handle) = promise();
        worker.send((encoded, promise));
        self.pending = Some(handle);
        self.fps.tick_with([&self.t_encode]);
        true
    }

    /// Collects a finished detection result, if one is ready. Never blocks.
    ///
    /// Returns `true` when the face list was replaced with new content; rendering surfaces can
    /// skip repainting otherwise.
    pub fn poll(&mut self) -> bool {
        let Some(handle) = self.pending.take() else {
            return false;
        };
        let resolved = match handle.try_block() {
            Ok(resolved) => resolved,
            Err(pending) => {
                self.pending = Some(pending);
                return false;
            }
        };
        match resolved {
            Ok(Ok(faces)) => {
                if faces != self.faces {
                    self.faces = faces;
                    self.generation += 1;
                    return true;
                }
                false
            }
            Ok(Err(e)) => {
                // Keep showing the previous result; stale but valid beats a blank overlay.
                log::warn!("face detection failed: {e}");
                false
            }
            Err(_dropped) => {
                // The worker exited without answering, so the detector panicked. Release the
                // slot and reap the thread; its panic is logged, the session keeps running
                // with the stale overlay and detection disabled.
                log::error!("face detection worker died, detection disabled for this session");
                self.worker = None;
                false
            }
        }
    }

    /// The most recent complete detection result.
    ///
    /// The list is replaced wholesale whenever a detection finishes; it is never partially
    /// updated.
    pub fn faces(&self) -> &[DetectedFace] {
        &self.faces
    }

    /// Bumped every time [`FaceTracker::faces`] changes content.
    ///
    /// A rendering surface can remember the last generation it painted and skip repaints while it
    /// is unchanged.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of frames dropped by the single-flight gate since `start`.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Whether a detection is currently in flight.
    pub fn detection_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Halts the stream and releases the detector and camera.
    ///
    /// Safe to call any number of times. A detection in flight is allowed to finish; its result
    /// is discarded without touching tracker state.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.source.stop();
        // Dropping the handle first turns a late `Promise::fulfill` into a no-op; dropping the
        // worker then closes its channel and joins the thread.
        self.pending = None;
        self.worker = None;
        log::debug!("face tracker stopped");
    }
}

impl<S: FrameSource, D: Detector> Drop for FaceTracker<S, D> {
    fn drop(&mut self) {
        self.stop();
    }
}
