//! The frame pump: admits frames into the inference stage, one at a time.

use std::{
    io,
    panic::resume_unwind,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};

use crate::{
    body::ColorTable,
    display::DisplaySurface,
    image::Image,
    image::Resolution,
    overlay,
    segment::{SegmentHandle, SegmentStage},
    timer::{FpsCounter, Timer},
    video::VideoSource,
};

/// Couples a video source to a segmentation stage and a display surface.
///
/// The pump guarantees that at most one inference is in flight at any time:
/// its pending result handle doubles as the busy flag. Frames that arrive
/// while an inference is running are dropped without being copied — under
/// load, correctness wins over completeness.
pub struct FramePump<T: SegmentStage, S: DisplaySurface> {
    stage: T,
    surface: S,
    colors: ColorTable,
    /// Off-screen copy of the admitted frame; what the stage actually sees.
    capture: Image,
    /// The raster buffer overlays are rendered into and published from.
    overlay: Image,
    /// `Some` while an inference is in flight.
    pending: Option<SegmentHandle>,
    sized: bool,
    t_grab: Timer,
    t_render: Timer,
    fps: FpsCounter,
}

impl<T: SegmentStage, S: DisplaySurface> FramePump<T, S> {
    /// Creates a pump publishing overlays in `colors` to `surface`.
    ///
    /// Buffers start out empty; they are sized once, when the source first
    /// reports real dimensions.
    pub fn new(stage: T, surface: S, colors: ColorTable) -> Self {
        Self {
            stage,
            surface,
            colors,
            capture: Image::new(Resolution::new(0, 0)),
            overlay: Image::new(Resolution::new(0, 0)),
            pending: None,
            sized: false,
            t_grab: Timer::new("grab"),
            t_render: Timer::new("render"),
            fps: FpsCounter::new("pump"),
        }
    }

    /// Returns whether an inference is currently in flight.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the display surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Runs one iteration of the acquisition loop.
    ///
    /// If an inference is still running, the current frame is dropped and
    /// nothing else happens. If one has completed, its overlay is rendered
    /// and published first. When idle (and the stage is ready and the source
    /// reports real dimensions), the current frame is copied off-screen and
    /// submitted.
    ///
    /// Failed inferences are logged and released; they never wedge the pump.
    /// Render precondition violations and a vanished stage are fatal and
    /// returned as errors.
    pub fn tick(&mut self, source: &mut impl VideoSource) -> anyhow::Result<()> {
        if let Some(handle) = &self.pending {
            if !handle.is_fulfilled() {
                return Ok(());
            }
            let handle = self.pending.take().unwrap();
            match handle.block() {
                Ok(Ok(segmentation)) => {
                    self.t_render
                        .time(|| overlay::render(&segmentation, &self.colors, &mut self.overlay))?;
                    self.surface.write(&self.overlay)?;
                }
                Ok(Err(e)) => {
                    // The pump stays usable after a failed inference; the
                    // next frame is free to submit.
                    log::error!("segmentation failed: {e:#}");
                }
                Err(_dropped) => {
                    anyhow::bail!("segmentation stage shut down with an inference in flight")
                }
            }
        }

        if !self.stage.is_ready() {
            return Ok(());
        }

        let resolution = source.resolution();
        if resolution.is_empty() {
            // The source has not decoded a real frame yet.
            return Ok(());
        }
        if !self.sized {
            self.capture = Image::new(resolution);
            self.overlay = Image::new(resolution);
            self.surface.resize(resolution)?;
            self.sized = true;
        }

        self.t_grab.time(|| source.grab(&mut self.capture))?;
        self.pending = Some(self.stage.submit(self.capture.clone()));
        self.fps.tick_with([&self.t_grab, &self.t_render]);

        Ok(())
    }
}

impl<T, S> FramePump<T, S>
where
    T: SegmentStage + Send + 'static,
    S: DisplaySurface + Send + 'static,
{
    /// Hands the pump to a thread that ticks it against `source` every
    /// `interval`, until the returned [`PumpDriver`] is stopped or dropped.
    ///
    /// A fatal `tick` error is logged and ends the loop early.
    pub fn drive<V>(mut self, mut source: V, interval: Duration) -> io::Result<PumpDriver>
    where
        V: VideoSource + Send + 'static,
    {
        let (stop, ticks) = bounded::<()>(0);
        let thread = thread::Builder::new()
            .name("frame-pump".into())
            .spawn(move || loop {
                match ticks.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = self.tick(&mut source) {
                            log::error!("frame pump stopped: {e:#}");
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(PumpDriver {
            stop: Some(stop),
            thread: Some(thread),
        })
    }
}

/// Teardown handle for a driven pump.
///
/// The acquisition loop runs until this is [stopped][Self::stop] or dropped;
/// both join the tick thread before returning.
pub struct PumpDriver {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PumpDriver {
    /// Stops the tick loop and waits for it to exit.
    ///
    /// An in-flight inference is not cancelled; it completes on its worker and
    /// its result is discarded.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.thread.take() {
            match handle.join() {
                Ok(()) => {}
                Err(payload) => {
                    if !thread::panicking() {
                        resume_unwind(payload);
                    }
                }
            }
        }
    }
}

impl Drop for PumpDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::VecDeque,
        rc::Rc,
        sync::{Arc, Mutex},
        time::Instant,
    };

    use super::*;
    use crate::{
        image::Color,
        segment::{PartSegmentation, PartSegmenter, SegmentWorker, SegmenterOptions, NO_DETECTION},
        worker::{promise, Promise},
    };

    type Reply = Promise<anyhow::Result<PartSegmentation>>;

    #[derive(Default)]
    struct StageState {
        replies: VecDeque<Reply>,
        submissions: usize,
        ready: bool,
    }

    /// A stage the test fulfills by hand, so every tick is deterministic.
    #[derive(Clone, Default)]
    struct ManualStage {
        state: Rc<RefCell<StageState>>,
    }

    impl ManualStage {
        fn ready() -> Self {
            let stage = Self::default();
            stage.state.borrow_mut().ready = true;
            stage
        }

        fn set_ready(&self) {
            self.state.borrow_mut().ready = true;
        }

        fn submissions(&self) -> usize {
            self.state.borrow().submissions
        }

        fn fulfill_next(&self, result: anyhow::Result<PartSegmentation>) {
            let reply = self.state.borrow_mut().replies.pop_front().unwrap();
            reply.fulfill(result);
        }

        fn drop_next(&self) {
            self.state.borrow_mut().replies.pop_front().unwrap();
        }
    }

    impl SegmentStage for ManualStage {
        fn is_ready(&self) -> bool {
            self.state.borrow().ready
        }

        fn submit(&mut self, _frame: Image) -> SegmentHandle {
            let (reply, handle) = promise();
            let mut state = self.state.borrow_mut();
            state.submissions += 1;
            state.replies.push_back(reply);
            handle
        }
    }

    #[derive(Default)]
    struct SurfaceState {
        resizes: Vec<Resolution>,
        writes: Vec<Vec<u8>>,
    }

    #[derive(Clone, Default)]
    struct RecordingSurface {
        state: Rc<RefCell<SurfaceState>>,
    }

    impl DisplaySurface for RecordingSurface {
        fn resize(&mut self, resolution: Resolution) -> anyhow::Result<()> {
            self.state.borrow_mut().resizes.push(resolution);
            Ok(())
        }

        fn write(&mut self, overlay: &Image) -> anyhow::Result<()> {
            self.state.borrow_mut().writes.push(overlay.data().to_vec());
            Ok(())
        }
    }

    struct FakeSource {
        resolution: Resolution,
        fill: Color,
        grabs: usize,
    }

    impl FakeSource {
        fn new(resolution: Resolution) -> Self {
            Self {
                resolution,
                fill: Color::WHITE,
                grabs: 0,
            }
        }
    }

    impl VideoSource for FakeSource {
        fn resolution(&self) -> Resolution {
            self.resolution
        }

        fn grab(&mut self, into: &mut Image) -> anyhow::Result<()> {
            self.grabs += 1;
            let mut frame = Image::new(self.resolution);
            frame.clear(self.fill);
            into.copy_from(&frame);
            Ok(())
        }
    }

    fn two_part_table() -> ColorTable {
        ColorTable::new([
            Color::from_rgba8(244, 67, 54, 255),
            Color::from_rgba8(183, 28, 28, 255),
        ])
    }

    fn blank_segmentation(resolution: Resolution) -> PartSegmentation {
        let count = resolution.num_pixels() as usize;
        PartSegmentation::new(resolution, vec![NO_DETECTION; count])
    }

    #[test]
    fn drops_frames_while_busy() {
        let stage = ManualStage::ready();
        let mut pump = FramePump::new(stage.clone(), RecordingSurface::default(), two_part_table());
        let mut source = FakeSource::new(Resolution::new(2, 2));

        pump.tick(&mut source).unwrap();
        assert_eq!(stage.submissions(), 1);
        assert_eq!(source.grabs, 1);
        assert!(pump.is_busy());

        // No completion in between: the second tick must not copy or submit.
        pump.tick(&mut source).unwrap();
        assert_eq!(stage.submissions(), 1);
        assert_eq!(source.grabs, 1);
    }

    #[test]
    fn failure_releases_the_pump() {
        let stage = ManualStage::ready();
        let surface = RecordingSurface::default();
        let mut pump = FramePump::new(stage.clone(), surface.clone(), two_part_table());
        let mut source = FakeSource::new(Resolution::new(2, 2));

        pump.tick(&mut source).unwrap();
        stage.fulfill_next(Err(anyhow::anyhow!("inference exploded")));

        // The very next tick is free to admit a new frame.
        pump.tick(&mut source).unwrap();
        assert_eq!(stage.submissions(), 2);
        assert!(surface.state.borrow().writes.is_empty());
    }

    #[test]
    fn renders_and_publishes_on_completion() {
        let stage = ManualStage::ready();
        let surface = RecordingSurface::default();
        let mut pump = FramePump::new(stage.clone(), surface.clone(), two_part_table());
        let mut source = FakeSource::new(Resolution::new(2, 2));

        pump.tick(&mut source).unwrap();
        stage.fulfill_next(Ok(PartSegmentation::new(
            Resolution::new(2, 2),
            vec![-1, 0, 1, -1],
        )));
        pump.tick(&mut source).unwrap();

        let state = surface.state.borrow();
        assert_eq!(state.writes.len(), 1);
        #[rustfmt::skip]
        assert_eq!(
            state.writes[0],
            vec![
                0, 0, 0, 0,
                244, 67, 54, 255,
                183, 28, 28, 255,
                0, 0, 0, 0,
            ],
        );
        // Publishing frees the pump for the next frame in the same tick.
        assert_eq!(stage.submissions(), 2);
    }

    #[test]
    fn sizes_surface_and_buffers_exactly_once() {
        let stage = ManualStage::ready();
        let surface = RecordingSurface::default();
        let mut pump = FramePump::new(stage.clone(), surface.clone(), two_part_table());
        let mut source = FakeSource::new(Resolution::new(0, 0));

        // Stream just started: no real frame, nothing to admit.
        pump.tick(&mut source).unwrap();
        pump.tick(&mut source).unwrap();
        assert_eq!(stage.submissions(), 0);
        assert_eq!(source.grabs, 0);
        assert!(surface.state.borrow().resizes.is_empty());

        source.resolution = Resolution::new(640, 480);
        pump.tick(&mut source).unwrap();
        stage.fulfill_next(Ok(blank_segmentation(Resolution::new(640, 480))));
        pump.tick(&mut source).unwrap();

        assert_eq!(stage.submissions(), 2);
        assert_eq!(
            surface.state.borrow().resizes,
            vec![Resolution::new(640, 480)],
        );
    }

    #[test]
    fn waits_for_stage_readiness() {
        let stage = ManualStage::default();
        let mut pump = FramePump::new(stage.clone(), RecordingSurface::default(), two_part_table());
        let mut source = FakeSource::new(Resolution::new(2, 2));

        pump.tick(&mut source).unwrap();
        pump.tick(&mut source).unwrap();
        assert_eq!(stage.submissions(), 0);
        assert_eq!(source.grabs, 0);

        stage.set_ready();
        pump.tick(&mut source).unwrap();
        assert_eq!(stage.submissions(), 1);
    }

    #[test]
    fn mismatched_segmentation_is_fatal() {
        let stage = ManualStage::ready();
        let mut pump = FramePump::new(stage.clone(), RecordingSurface::default(), two_part_table());
        let mut source = FakeSource::new(Resolution::new(2, 2));

        pump.tick(&mut source).unwrap();
        stage.fulfill_next(Ok(blank_segmentation(Resolution::new(1, 1))));
        pump.tick(&mut source).unwrap_err();
    }

    #[test]
    fn vanished_stage_is_fatal() {
        let stage = ManualStage::ready();
        let mut pump = FramePump::new(stage.clone(), RecordingSurface::default(), two_part_table());
        let mut source = FakeSource::new(Resolution::new(2, 2));

        pump.tick(&mut source).unwrap();
        stage.drop_next();
        pump.tick(&mut source).unwrap_err();
    }

    struct NoDetections;

    impl PartSegmenter for NoDetections {
        fn segment_parts(
            &mut self,
            frame: &Image,
            _options: &SegmenterOptions,
        ) -> anyhow::Result<PartSegmentation> {
            Ok(blank_segmentation(frame.resolution()))
        }
    }

    #[derive(Clone, Default)]
    struct CountingSurface {
        writes: Arc<Mutex<usize>>,
    }

    impl DisplaySurface for CountingSurface {
        fn resize(&mut self, _resolution: Resolution) -> anyhow::Result<()> {
            Ok(())
        }

        fn write(&mut self, _overlay: &Image) -> anyhow::Result<()> {
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn driver_ticks_until_stopped() {
        let stage = SegmentWorker::spawn(|| Ok(NoDetections), SegmenterOptions::default()).unwrap();
        let surface = CountingSurface::default();
        let writes = surface.writes.clone();
        let pump = FramePump::new(stage, surface, two_part_table());

        let driver = pump
            .drive(
                FakeSource::new(Resolution::new(2, 2)),
                Duration::from_millis(1),
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while *writes.lock().unwrap() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        driver.stop();

        assert!(*writes.lock().unwrap() > 0);
    }
}
