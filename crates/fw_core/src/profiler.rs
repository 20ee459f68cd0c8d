//! Frame timing aggregator.
//!
//! Samples are collected through RAII scopes: [`Profiler::frame`] opens the
//! whole-frame scope and [`FrameScope::section`] opens named sections inside it.
//! Each scope adds its elapsed time when it is dropped, including on early return.
//!
//! Totals accumulate over a wall-clock window (2 seconds by default). The first
//! frame that closes after the window has elapsed reduces the totals into a report
//! string and starts a new window; every other frame produces nothing, so the
//! formatting cost is paid once per window.
//!
//! [`Profiler::reset`] invalidates everything in flight. Scopes that were open at
//! the time close without contributing, and the partial window is thrown away,
//! so a sample interrupted by input handling never reaches an average.

use std::fmt::Write as _;

use crate::time::Clock;

pub const DEFAULT_WINDOW_SECS: f64 = 2.0;

#[derive(Debug, Clone)]
struct SectionStats {
    name: &'static str,
    depth: usize,
    total: f64,
    count: u32,
}

#[derive(Debug)]
pub struct Profiler {
    window_secs: f64,
    window_start: Option<f64>,
    sections: Vec<SectionStats>,
    frame_total: f64,
    frames: u32,
    depth: usize,
    // Bumped by `reset`; scopes opened under an older generation are discarded.
    generation: u64,
    report: Option<String>,
}

impl Profiler {
    pub fn new(window_secs: f64) -> Self {
        Self {
            window_secs,
            window_start: None,
            sections: Vec::new(),
            frame_total: 0.0,
            frames: 0,
            depth: 0,
            generation: 0,
            report: None,
        }
    }

    /// Opens the whole-frame scope. The window clock starts with the first frame
    /// after construction or after a reset.
    pub fn frame<'a, C: Clock + ?Sized>(&'a mut self, clock: &'a C) -> FrameScope<'a, C> {
        let start = clock.now();
        if self.window_start.is_none() {
            self.window_start = Some(start);
        }
        let generation = self.generation;
        FrameScope {
            profiler: self,
            clock,
            start,
            generation,
            closed: false,
        }
    }

    /// Drops every in-flight sample and the partially accumulated window.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.sections.clear();
        self.frame_total = 0.0;
        self.frames = 0;
        self.window_start = None;
    }

    /// Report produced by the most recent window reduction, if not yet taken.
    pub fn take_report(&mut self) -> Option<String> {
        self.report.take()
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn section_total(&self, name: &str) -> f64 {
        self.find(name).map_or(0.0, |s| s.total)
    }

    pub fn section_count(&self, name: &str) -> u32 {
        self.find(name).map_or(0, |s| s.count)
    }

    /// True when nothing has been accumulated in the current window.
    pub fn is_idle(&self) -> bool {
        self.frames == 0 && self.sections.iter().all(|s| s.count == 0)
    }

    fn find(&self, name: &str) -> Option<&SectionStats> {
        self.sections.iter().find(|s| s.name == name)
    }

    // Sections are registered on open so the report lists parents before children.
    fn register_section(&mut self, name: &'static str, depth: usize) {
        if self.find(name).is_none() {
            self.sections.push(SectionStats {
                name,
                depth,
                total: 0.0,
                count: 0,
            });
        }
    }

    fn record_section(&mut self, name: &'static str, depth: usize, elapsed: f64) {
        self.register_section(name, depth);
        if let Some(stats) = self.sections.iter_mut().find(|s| s.name == name) {
            stats.total += elapsed;
            stats.count += 1;
        }
    }

    fn reduce_if_due(&mut self, now: f64) {
        let Some(window_start) = self.window_start else {
            return;
        };
        if now - window_start <= self.window_secs {
            return;
        }

        let report = self.format_report();
        self.sections.clear();
        self.frame_total = 0.0;
        self.frames = 0;
        self.window_start = Some(now);
        if !report.is_empty() {
            self.report = Some(report);
        }
    }

    fn format_report(&self) -> String {
        let mut out = String::new();
        if self.frames > 0 {
            let _ = write!(
                out,
                "profiler: {} frames, {:.3} [ms] per frame",
                self.frames,
                self.frame_total * 1000.0 / f64::from(self.frames)
            );
        }
        for section in self.sections.iter().filter(|s| s.count > 0) {
            if !out.is_empty() {
                out.push('\n');
            }
            let average_us = section.total * 1_000_000.0 / f64::from(section.count);
            let _ = write!(
                out,
                "{:indent$}Timer {};\t CPU {:.1} [us]; (avg {})",
                "",
                section.name,
                average_us,
                section.count,
                indent = section.depth * 2
            );
        }
        out
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS)
    }
}

/// Whole-frame timing scope returned by [`Profiler::frame`].
pub struct FrameScope<'a, C: Clock + ?Sized> {
    profiler: &'a mut Profiler,
    clock: &'a C,
    start: f64,
    generation: u64,
    closed: bool,
}

impl<'a, C: Clock + ?Sized> FrameScope<'a, C> {
    pub fn section(&mut self, name: &'static str) -> SectionGuard<'_, C> {
        SectionGuard::open(self.profiler, self.clock, name)
    }

    /// Invalidates the frame in progress; see [`Profiler::reset`].
    pub fn reset(&mut self) {
        self.profiler.reset();
    }

    /// Closes the frame and returns the window report if this frame completed it.
    pub fn finish(mut self) -> Option<String> {
        self.close();
        self.profiler.take_report()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let now = self.clock.now();
        if self.profiler.generation == self.generation {
            self.profiler.frame_total += now - self.start;
            self.profiler.frames += 1;
        }
        self.profiler.reduce_if_due(now);
    }
}

impl<C: Clock + ?Sized> Drop for FrameScope<'_, C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Named section scope. Sections nest; nested ones are indented in the report.
pub struct SectionGuard<'a, C: Clock + ?Sized> {
    profiler: &'a mut Profiler,
    clock: &'a C,
    name: &'static str,
    depth: usize,
    start: f64,
    generation: u64,
}

impl<'a, C: Clock + ?Sized> SectionGuard<'a, C> {
    fn open(profiler: &'a mut Profiler, clock: &'a C, name: &'static str) -> Self {
        let depth = profiler.depth;
        profiler.depth += 1;
        profiler.register_section(name, depth);
        let generation = profiler.generation;
        Self {
            profiler,
            clock,
            name,
            depth,
            start: clock.now(),
            generation,
        }
    }

    pub fn section(&mut self, name: &'static str) -> SectionGuard<'_, C> {
        SectionGuard::open(self.profiler, self.clock, name)
    }

    pub fn reset(&mut self) {
        self.profiler.reset();
    }
}

impl<C: Clock + ?Sized> Drop for SectionGuard<'_, C> {
    fn drop(&mut self) {
        self.profiler.depth -= 1;
        if self.profiler.generation != self.generation {
            return;
        }
        let elapsed = self.clock.now() - self.start;
        self.profiler.record_section(self.name, self.depth, elapsed);
    }
}
