use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};

use facelens::detection::{DetectedFace, Detector};
use facelens::frame::{EncodedFrame, PixelFormat, Plane, RawFrame};
use facelens::rect::Rect;
use facelens::tracker::{FaceTracker, FrameSource};

fn test_frame() -> RawFrame {
    RawFrame {
        planes: vec![Plane {
            bytes: vec![0; 16],
            bytes_per_row: 4,
        }],
        width: 4,
        height: 4,
        rotation_degrees: 0,
        format: PixelFormat::Nv21,
    }
}

fn test_face() -> DetectedFace {
    DetectedFace::new(Rect::from_top_left(10.0, 10.0, 40.0, 40.0))
}

#[track_caller]
fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        thread::sleep(Duration::from_millis(1));
    }
}

#[derive(Clone, Default)]
struct FakeSource {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    fail_start: bool,
}

impl FrameSource for FakeSource {
    fn start(&mut self) -> anyhow::Result<()> {
        if self.fail_start {
            anyhow::bail!("camera unavailable");
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A detector that blocks inside `detect` until the test supplies an outcome.
struct GatedDetector {
    outcomes: Receiver<anyhow::Result<Vec<DetectedFace>>>,
    calls: Arc<AtomicUsize>,
}

impl Detector for GatedDetector {
    fn detect(&mut self, _frame: &EncodedFrame) -> anyhow::Result<Vec<DetectedFace>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // When the test is done and drops its sender, just report nothing.
        self.outcomes.recv().unwrap_or_else(|_| Ok(Vec::new()))
    }
}

/// A detector that instantly returns the same faces every time.
struct ConstDetector {
    faces: Vec<DetectedFace>,
}

impl Detector for ConstDetector {
    fn detect(&mut self, _frame: &EncodedFrame) -> anyhow::Result<Vec<DetectedFace>> {
        Ok(self.faces.clone())
    }
}

/// A detector that kills its worker thread on the first frame.
struct PanickyDetector;

impl Detector for PanickyDetector {
    fn detect(&mut self, _frame: &EncodedFrame) -> anyhow::Result<Vec<DetectedFace>> {
        // Bypasses the default panic hook so the test doesn't spam stderr.
        std::panic::resume_unwind(Box::new("inference backend crashed".to_string()));
    }
}

#[test]
fn single_flight_drops_frames_while_detection_is_pending() {
    facelens::init_logger!();

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = unbounded();
    let mut tracker = FaceTracker::new(
        FakeSource::default(),
        GatedDetector {
            outcomes: rx,
            calls: calls.clone(),
        },
    );
    tracker.start().unwrap();

    assert!(tracker.process_frame(&test_frame()));
    wait_until(|| calls.load(Ordering::SeqCst) == 1);

    // The detector is still busy with the first frame: these must be dropped, and the detector
    // must not be invoked again.
    assert!(!tracker.process_frame(&test_frame()));
    assert!(!tracker.process_frame(&test_frame()));
    assert_eq!(tracker.dropped_frames(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tx.send(Ok(vec![test_face()])).unwrap();
    wait_until(|| tracker.poll());
    assert_eq!(tracker.faces().to_vec(), vec![test_face()]);
    assert_eq!(tracker.generation(), 1);

    // The slot is free again, the next frame goes through.
    assert!(tracker.process_frame(&test_frame()));
    tx.send(Ok(Vec::new())).unwrap();
    wait_until(|| tracker.poll());
    assert_eq!(tracker.generation(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tracker.stop();
}

#[test]
fn detection_error_keeps_previous_overlay() {
    facelens::init_logger!();

    let (tx, rx) = unbounded();
    let mut tracker = FaceTracker::new(
        FakeSource::default(),
        GatedDetector {
            outcomes: rx,
            calls: Arc::new(AtomicUsize::new(0)),
        },
    );
    tracker.start().unwrap();

    assert!(tracker.process_frame(&test_frame()));
    tx.send(Ok(vec![test_face()])).unwrap();
    wait_until(|| tracker.poll());
    assert_eq!(tracker.generation(), 1);

    assert!(tracker.process_frame(&test_frame()));
    tx.send(Err(anyhow::anyhow!("inference failed"))).unwrap();
    wait_until(|| {
        tracker.poll();
        !tracker.detection_in_flight()
    });

    // Stale but valid: the previous result stays on screen.
    assert_eq!(tracker.faces().to_vec(), vec![test_face()]);
    assert_eq!(tracker.generation(), 1);

    tracker.stop();
}

#[test]
fn unchanged_results_do_not_bump_the_generation() {
    facelens::init_logger!();

    let mut tracker = FaceTracker::new(
        FakeSource::default(),
        ConstDetector {
            faces: vec![test_face()],
        },
    );
    tracker.start().unwrap();

    assert!(tracker.process_frame(&test_frame()));
    wait_until(|| tracker.poll());
    assert_eq!(tracker.generation(), 1);

    wait_until(|| tracker.process_frame(&test_frame()));
    wait_until(|| {
        tracker.poll();
        !tracker.detection_in_flight()
    });
    assert_eq!(tracker.generation(), 1);

    tracker.stop();
}

#[test]
fn results_arriving_after_stop_are_discarded() {
    facelens::init_logger!();

    let (tx, rx) = unbounded();
    let mut tracker = FaceTracker::new(
        FakeSource::default(),
        GatedDetector {
            outcomes: rx,
            calls: Arc::new(AtomicUsize::new(0)),
        },
    );
    tracker.start().unwrap();

    assert!(tracker.process_frame(&test_frame()));

    // Let the in-flight detection finish while `stop` is tearing the session down.
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        tx.send(Ok(vec![test_face()])).ok();
    });
    tracker.stop();
    releaser.join().unwrap();

    // The late result must not have touched any state.
    assert!(tracker.faces().is_empty());
    assert_eq!(tracker.generation(), 0);
    assert!(!tracker.is_running());
    assert!(!tracker.process_frame(&test_frame()));
}

#[test]
fn detector_panic_releases_the_slot_and_never_reaches_the_caller() {
    facelens::init_logger!();

    let source = FakeSource::default();
    let stops = source.stops.clone();
    let mut tracker = FaceTracker::new(source, PanickyDetector);
    tracker.start().unwrap();

    assert!(tracker.process_frame(&test_frame()));

    // The worker thread dies with the detector. Polling must notice that and free the
    // single-flight slot instead of holding it forever.
    wait_until(|| {
        tracker.poll();
        !tracker.detection_in_flight()
    });

    // Detection is gone for this session: frames are no longer submitted, the overlay state is
    // untouched, and the session itself stays up.
    assert!(!tracker.process_frame(&test_frame()));
    assert!(tracker.faces().is_empty());
    assert_eq!(tracker.generation(), 0);
    assert!(tracker.is_running());

    // Stopping must not rethrow the detector's panic on the calling thread.
    tracker.stop();
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_is_idempotent() {
    let source = FakeSource::default();
    let stops = source.stops.clone();
    let mut tracker = FaceTracker::new(source, ConstDetector { faces: Vec::new() });
    tracker.start().unwrap();

    tracker.stop();
    tracker.stop();
    tracker.stop();
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    // Dropping the tracker after an explicit stop must not stop the source again.
    drop(tracker);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn acquisition_failure_leaves_the_tracker_stopped() {
    let source = FakeSource {
        fail_start: true,
        ..FakeSource::default()
    };
    let mut tracker = FaceTracker::new(source, ConstDetector { faces: Vec::new() });

    assert!(tracker.start().is_err());
    assert!(!tracker.is_running());
    assert!(!tracker.process_frame(&test_frame()));
}

#[test]
fn starting_twice_is_an_error() {
    let mut tracker = FaceTracker::new(
        FakeSource::default(),
        ConstDetector { faces: Vec::new() },
    );
    tracker.start().unwrap();
    assert!(tracker.start().is_err());
    tracker.stop();
}

#[test]
fn malformed_frames_are_skipped_without_holding_the_slot() {
    facelens::init_logger!();

    let mut tracker = FaceTracker::new(
        FakeSource::default(),
        ConstDetector {
            faces: vec![test_face()],
        },
    );
    tracker.start().unwrap();

    let mut bad = test_frame();
    bad.planes.clear();
    assert!(!tracker.process_frame(&bad));
    assert!(!tracker.detection_in_flight());
    assert_eq!(tracker.dropped_frames(), 0);

    // A well-formed frame afterwards goes straight through.
    assert!(tracker.process_frame(&test_frame()));
    wait_until(|| tracker.poll());
    assert_eq!(tracker.faces().len(), 1);

    tracker.stop();
}
