use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of wall-clock time in seconds since an arbitrary origin.
pub trait Clock {
    fn now(&self) -> f64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock. Clones share the same time, so a test platform and
/// a test application can both move it forward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Rolling frame-time average for the window title.
///
/// Frames are counted until either the window length has passed or the vsync
/// state differs from the one seen at the previous refresh. A refresh caused by
/// a vsync change reports 0 ms, since the frames in that window straddle both
/// presentation modes.
#[derive(Debug, Clone)]
pub struct TitleTimer {
    window_secs: f64,
    window_start: f64,
    frames: u32,
    last_vsync: bool,
}

impl TitleTimer {
    pub fn new(window_secs: f64, now: f64, vsync: bool) -> Self {
        Self {
            window_secs,
            window_start: now,
            frames: 0,
            last_vsync: vsync,
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Counts a completed frame. Returns the average frame time in milliseconds
    /// when the title is due for a refresh.
    pub fn frame_completed(&mut self, now: f64, vsync: bool) -> Option<f64> {
        self.frames += 1;

        let mut elapsed = now - self.window_start;
        let vsync_changed = vsync != self.last_vsync;
        if elapsed <= self.window_secs && !vsync_changed {
            return None;
        }
        if vsync_changed {
            elapsed = 0.0;
        }

        let average_ms = average_ms(elapsed, self.frames);
        self.frames = 0;
        self.window_start = now;
        self.last_vsync = vsync;
        Some(average_ms)
    }
}

pub fn average_ms(elapsed_secs: f64, frames: u32) -> f64 {
    if frames == 0 {
        return 0.0;
    }
    elapsed_secs * 1000.0 / f64::from(frames)
}

/// Formats a millisecond value with up to six significant digits and no
/// trailing zeros: `16.6667`, `15.625`, `0`.
pub fn format_ms(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
