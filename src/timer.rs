//! Performance measurement tools.

use std::{
    fmt::{self, Arguments},
    mem,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Smoothing factor for the running average; recent measurements dominate.
const EMA_ALPHA: f32 = 0.3;

/// A timer that can measure and average the time an operation takes.
///
/// Measurements feed an exponential moving average, which is displayed (along
/// with the number of measurements since the last display) using `{}`
/// ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    state: Mutex<State>,
}

struct State {
    avg_secs: f32,
    primed: bool,
    count: usize,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State {
                avg_secs: 0.0,
                primed: false,
                count: 0,
            }),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call
    /// to `start` and the drop is measured and recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&self, start: Instant) {
        let secs = start.elapsed().as_secs_f32();
        let mut state = self.state.lock().unwrap();
        if state.primed {
            state.avg_secs += EMA_ALPHA * (secs - state.avg_secs);
        } else {
            state.avg_secs = secs;
            state.primed = true;
        }
        state.count += 1;
    }
}

/// Displays the average recorded time and resets the measurement counter.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = self.state.lock().unwrap();
        let count = mem::take(&mut state.count);
        write!(f, "{}: {}x{:.01}ms", self.name, count, state.avg_secs * 1000.0)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when
/// dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

/// Logs frames per second with optional extra data.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    pub fn tick(&mut self) {
        self.tick_impl(format_args!(""));
    }

    /// Advances the frame counter by 1 and logs FPS and the state of `timers`
    /// if one second has passed.
    pub fn tick_with<'a, T>(&mut self, timers: T)
    where
        T: IntoIterator<Item = &'a Timer>,
    {
        if self.due() {
            let timers = timers
                .into_iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.tick_impl(format_args!(" ({timers})"));
        } else {
            self.tick_impl(format_args!(""));
        }
    }

    fn due(&self) -> bool {
        self.start.elapsed() >= Duration::from_secs(1)
    }

    fn tick_impl(&mut self, extra: Arguments<'_>) {
        self.frames += 1;
        if self.due() {
            let secs = self.start.elapsed().as_secs_f32();
            log::debug!(
                "{}: {:.1} FPS{}",
                self.name,
                self.frames as f32 / secs,
                extra,
            );
            self.frames = 0;
            self.start = Instant::now();
        }
    }
}
