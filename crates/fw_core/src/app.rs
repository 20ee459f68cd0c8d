//! Application driver.
//!
//! `AppRunner::run` walks the lifecycle Initializing -> Running -> Terminating:
//!
//!   1. activate the rendering context, call `Application::begin`
//!   2. loop: escape check, poll events (idle-wait while hidden), vsync toggle on V,
//!      timed `think`, clear input edges, present, stats, title refresh
//!   3. call `Application::end`
//!
//! The runner owns the input state and profiler for the whole run. Platform
//! callbacks reach them only through the dispatch closure handed to
//! `Platform::poll_events`, never through a global.

use serde::Deserialize;

use crate::error::SetupError;
use crate::input::{Event, InputHooks, InputState, Key};
use crate::profiler::{Profiler, DEFAULT_WINDOW_SECS};
use crate::time::{format_ms, Clock, TitleTimer};

const TITLE_WINDOW_SECS: f64 = 2.0;
const VSYNC_SUFFIX: &str = " (vsync on - V for toggle)";

/// Rendering context request handed to `Platform::activate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextFlags {
    pub major: u32,
    pub minor: u32,
    pub debug: bool,
    pub robust: bool,
    pub core: bool,
    /// Opaque handle of a context to share resources with.
    pub share: Option<usize>,
}

impl Default for ContextFlags {
    fn default() -> Self {
        Self {
            major: 4,
            minor: 5,
            debug: cfg!(debug_assertions),
            robust: false,
            core: false,
            share: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub context: ContextFlags,
    /// Present each frame. Off for offscreen or benchmark runs.
    pub present: bool,
    /// Log the profiler report at the end of every timing window.
    pub print_stats: bool,
    /// Ask the platform to pin the process to one core for steadier timings.
    pub single_threaded: bool,
    pub show_console: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            title: "framewright".to_string(),
            width: 1280,
            height: 720,
            context: ContextFlags::default(),
            present: true,
            print_stats: false,
            single_threaded: false,
            show_console: false,
        }
    }
}

/// Windowing and presentation services the runner drives.
pub trait Platform {
    type Error: std::error::Error + Send + Sync + 'static;

    fn activate(
        &mut self,
        width: u32,
        height: u32,
        title: &str,
        flags: &ContextFlags,
    ) -> Result<(), Self::Error>;

    fn set_swap_interval(&mut self, interval: u32);

    fn present_frame(&mut self);

    /// Delivers pending events to `dispatch`. Returns false once the window
    /// should close.
    fn poll_events(&mut self, blocking: bool, dispatch: &mut dyn FnMut(Event)) -> bool;

    /// Blocks until at least one event arrives.
    fn wait_events(&mut self, dispatch: &mut dyn FnMut(Event));

    /// False while the window is minimized or fully hidden.
    fn is_open(&self) -> bool;

    fn set_title(&mut self, title: &str);

    fn show_console(&mut self) {
        log::debug!("Console visibility hint not supported by this platform");
    }

    fn pin_to_single_core(&mut self) {
        log::debug!("CPU affinity hint not supported by this platform");
    }
}

/// The hosted application. Input hooks come from the [`InputHooks`] supertrait.
pub trait Application: InputHooks {
    fn begin(&mut self) -> bool {
        true
    }

    /// Per-frame step. `time` is seconds since the loop started; edges in
    /// `input` are cleared right after this returns.
    fn think(&mut self, time: f64, input: &InputState);

    fn end(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Escape,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub exit: ExitReason,
    /// Profiler reports written to the log; always 0 unless `print_stats` is set.
    pub stats_reports: u32,
}

pub struct AppRunner {
    config: RunConfig,
}

impl AppRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Drives the loop until Escape or a close request.
    ///
    /// `Application::end` runs only once `begin` has been called, so a failed
    /// context activation returns without touching the application.
    pub fn run<P, A, C>(
        &self,
        platform: &mut P,
        app: &mut A,
        clock: &C,
    ) -> Result<RunSummary, SetupError>
    where
        P: Platform + ?Sized,
        A: Application + ?Sized,
        C: Clock + ?Sized,
    {
        let config = &self.config;
        if config.show_console {
            platform.show_console();
        }
        if config.single_threaded {
            platform.pin_to_single_core();
        }

        let flags = &config.context;
        platform
            .activate(config.width, config.height, &config.title, flags)
            .map_err(|err| SetupError::Context {
                major: flags.major,
                minor: flags.minor,
                source: Box::new(err),
            })?;
        log::info!(
            "Context {}.{} active: {}x{}",
            flags.major,
            flags.minor,
            config.width,
            config.height
        );

        let mut input = InputState::with_viewport(config.width, config.height);
        if !app.begin() {
            log::error!("Application setup failed");
            app.end();
            return Err(SetupError::Begin);
        }

        let mut vsync = true;
        apply_vsync(platform, vsync);

        let mut profiler = Profiler::new(DEFAULT_WINDOW_SECS);
        let time_start = clock.now();
        let mut title_timer = TitleTimer::new(TITLE_WINDOW_SECS, time_start, vsync);
        let mut frames: u64 = 0;
        let mut stats_reports: u32 = 0;

        let exit = loop {
            if input.is_pressed(Key::Escape) {
                log::info!("Escape pressed, exiting.");
                break ExitReason::Escape;
            }

            let mut dispatch = |event: Event| input.dispatch(event, &mut *app, &mut profiler);
            if !platform.poll_events(false, &mut dispatch) {
                log::info!("Close requested, exiting.");
                break ExitReason::Closed;
            }
            while !platform.is_open() {
                platform.wait_events(&mut dispatch);
            }

            if input.on_press(Key::V) {
                vsync = !vsync;
                apply_vsync(platform, vsync);
            }

            let stats = {
                let mut frame = profiler.frame(clock);
                {
                    let _section = frame.section("Frame");
                    app.think(clock.now() - time_start, &input);
                }
                input.clear_toggles();
                if config.present {
                    platform.present_frame();
                }
                frame.finish()
            };
            if config.print_stats {
                if let Some(stats) = stats {
                    log::info!("{stats}");
                    stats_reports += 1;
                }
            }

            frames += 1;
            if let Some(average) = title_timer.frame_completed(clock.now(), vsync) {
                platform.set_title(&title_text(&config.title, average, vsync));
            }
        };

        app.end();
        Ok(RunSummary {
            frames,
            exit,
            stats_reports,
        })
    }
}

fn apply_vsync<P: Platform + ?Sized>(platform: &mut P, enabled: bool) {
    platform.set_swap_interval(u32::from(enabled));
    log::info!("vsync: {}", if enabled { "on" } else { "off" });
}

pub fn title_text(title: &str, average_ms: f64, vsync: bool) -> String {
    format!(
        "{title}: {} [ms]{}",
        format_ms(average_ms),
        if vsync { VSYNC_SUFFIX } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ButtonAction, Modifiers};
    use crate::time::ManualClock;
    use std::collections::VecDeque;

    #[derive(Debug, thiserror::Error)]
    #[error("no suitable adapter")]
    struct NoAdapter;

    #[derive(Default)]
    struct ScriptedPlatform {
        batches: VecDeque<Vec<Event>>,
        fail_activate: bool,
        hidden_for: u32,
        activated: Option<(u32, u32, String)>,
        swap_intervals: Vec<u32>,
        presents: u32,
        polls: u32,
        waits: u32,
        titles: Vec<String>,
        affinity_pinned: bool,
    }

    impl ScriptedPlatform {
        fn with_batches(batches: Vec<Vec<Event>>) -> Self {
            Self {
                batches: batches.into(),
                ..Default::default()
            }
        }
    }

    impl Platform for ScriptedPlatform {
        type Error = NoAdapter;

        fn activate(
            &mut self,
            width: u32,
            height: u32,
            title: &str,
            _flags: &ContextFlags,
        ) -> Result<(), NoAdapter> {
            if self.fail_activate {
                return Err(NoAdapter);
            }
            self.activated = Some((width, height, title.to_string()));
            Ok(())
        }

        fn set_swap_interval(&mut self, interval: u32) {
            self.swap_intervals.push(interval);
        }

        fn present_frame(&mut self) {
            self.presents += 1;
        }

        fn poll_events(&mut self, blocking: bool, dispatch: &mut dyn FnMut(Event)) -> bool {
            assert!(!blocking);
            self.polls += 1;
            match self.batches.pop_front() {
                Some(batch) => {
                    for event in batch {
                        dispatch(event);
                    }
                    true
                }
                None => false,
            }
        }

        fn wait_events(&mut self, _dispatch: &mut dyn FnMut(Event)) {
            self.waits += 1;
            self.hidden_for = self.hidden_for.saturating_sub(1);
        }

        fn is_open(&self) -> bool {
            self.hidden_for == 0
        }

        fn set_title(&mut self, title: &str) {
            self.titles.push(title.to_string());
        }

        fn pin_to_single_core(&mut self) {
            self.affinity_pinned = true;
        }
    }

    #[derive(Default)]
    struct TestApp {
        clock: ManualClock,
        frame_secs: f64,
        fail_begin: bool,
        consume_keys: bool,
        began: bool,
        ended: bool,
        times: Vec<f64>,
        // (fresh press of A, A held) as seen by each think
        edges: Vec<(bool, bool)>,
    }

    impl InputHooks for TestApp {
        fn key_button(&mut self, _key: Key, _action: ButtonAction, _mods: Modifiers) -> bool {
            self.consume_keys
        }
    }

    impl Application for TestApp {
        fn begin(&mut self) -> bool {
            self.began = true;
            !self.fail_begin
        }

        fn think(&mut self, time: f64, input: &InputState) {
            self.times.push(time);
            self.edges.push((input.on_press(Key::A), input.is_pressed(Key::A)));
            self.clock.advance(self.frame_secs);
        }

        fn end(&mut self) {
            self.ended = true;
        }
    }

    fn key(key: Key, action: ButtonAction) -> Event {
        Event::Key {
            key,
            action,
            mods: Modifiers::empty(),
        }
    }

    fn idle(frames: usize) -> Vec<Vec<Event>> {
        vec![Vec::new(); frames]
    }

    fn config() -> RunConfig {
        RunConfig {
            title: "demo".to_string(),
            ..RunConfig::default()
        }
    }

    fn run(
        config: RunConfig,
        platform: &mut ScriptedPlatform,
        app: &mut TestApp,
    ) -> Result<RunSummary, SetupError> {
        let clock = app.clock.clone();
        AppRunner::new(config).run(platform, app, &clock)
    }

    #[test]
    fn closes_when_polling_reports_close() {
        let mut platform = ScriptedPlatform::with_batches(idle(3));
        let mut app = TestApp::default();
        let summary = run(config(), &mut platform, &mut app).expect("run succeeds");

        assert_eq!(summary.exit, ExitReason::Closed);
        assert_eq!(summary.frames, 3);
        assert_eq!(app.times.len(), 3);
        assert_eq!(platform.presents, 3);
        assert_eq!(platform.activated, Some((1280, 720, "demo".to_string())));
        assert_eq!(platform.swap_intervals, vec![1]);
        assert!(app.began && app.ended);
    }

    #[test]
    fn context_failure_skips_application_hooks() {
        let mut platform = ScriptedPlatform {
            fail_activate: true,
            ..Default::default()
        };
        let mut app = TestApp::default();
        let err = run(config(), &mut platform, &mut app).expect_err("activation fails");

        assert!(matches!(
            err,
            SetupError::Context {
                major: 4,
                minor: 5,
                ..
            }
        ));
        assert_eq!(err.to_string(), "could not create rendering context 4.5");
        assert!(!app.began);
        assert!(!app.ended);
        assert_eq!(platform.polls, 0);
    }

    #[test]
    fn begin_failure_still_runs_end() {
        let mut platform = ScriptedPlatform::with_batches(idle(3));
        let mut app = TestApp {
            fail_begin: true,
            ..Default::default()
        };
        let err = run(config(), &mut platform, &mut app).expect_err("begin fails");

        assert!(matches!(err, SetupError::Begin));
        assert!(app.ended);
        assert!(app.times.is_empty());
        assert_eq!(platform.polls, 0);
    }

    #[test]
    fn escape_ends_run_on_next_iteration() {
        let mut batches = vec![vec![
            key(Key::Escape, ButtonAction::Press),
            Event::Wheel { delta: 3 },
        ]];
        batches.extend(idle(5));
        let mut platform = ScriptedPlatform::with_batches(batches);
        let mut app = TestApp::default();
        let summary = run(config(), &mut platform, &mut app).expect("run succeeds");

        assert_eq!(summary.exit, ExitReason::Escape);
        assert_eq!(summary.frames, 1);
        assert_eq!(platform.polls, 1);
        assert_eq!(platform.batches.len(), 5);
        assert!(app.ended);
    }

    #[test]
    fn edges_visible_to_think_then_cleared() {
        let mut platform = ScriptedPlatform::with_batches(vec![
            vec![key(Key::A, ButtonAction::Press)],
            vec![key(Key::A, ButtonAction::Repeat)],
            vec![key(Key::A, ButtonAction::Release)],
        ]);
        let mut app = TestApp::default();
        run(config(), &mut platform, &mut app).expect("run succeeds");

        assert_eq!(app.edges, vec![(true, true), (false, true), (false, false)]);
    }

    #[test]
    fn consumed_keys_never_reach_input_state() {
        let mut platform = ScriptedPlatform::with_batches(vec![
            vec![key(Key::Escape, ButtonAction::Press)],
            vec![key(Key::A, ButtonAction::Press)],
            vec![key(Key::V, ButtonAction::Press)],
        ]);
        let mut app = TestApp {
            consume_keys: true,
            ..Default::default()
        };
        let summary = run(config(), &mut platform, &mut app).expect("run succeeds");

        assert_eq!(summary.exit, ExitReason::Closed);
        assert_eq!(app.edges, vec![(false, false); 3]);
        assert_eq!(platform.swap_intervals, vec![1]);
    }

    #[test]
    fn v_toggles_vsync_and_forces_zero_title() {
        let mut platform = ScriptedPlatform::with_batches(vec![
            vec![key(Key::V, ButtonAction::Press)],
            vec![key(Key::V, ButtonAction::Release)],
            Vec::new(),
        ]);
        let mut app = TestApp {
            frame_secs: 0.01,
            ..Default::default()
        };
        run(config(), &mut platform, &mut app).expect("run succeeds");

        assert_eq!(platform.swap_intervals, vec![1, 0]);
        assert_eq!(platform.titles, vec!["demo: 0 [ms]".to_string()]);
    }

    #[test]
    fn title_shows_average_after_window() {
        let mut platform = ScriptedPlatform::with_batches(idle(130));
        let mut app = TestApp {
            frame_secs: 1.0 / 64.0,
            ..Default::default()
        };
        let summary = run(config(), &mut platform, &mut app).expect("run succeeds");

        // 129 frames take 2.015625s, the first span past the 2s window.
        assert_eq!(summary.frames, 130);
        assert_eq!(
            platform.titles,
            vec!["demo: 15.625 [ms] (vsync on - V for toggle)".to_string()]
        );
    }

    #[test]
    fn stats_logged_only_when_requested() {
        let window_of_frames = || TestApp {
            frame_secs: 1.0 / 64.0,
            ..Default::default()
        };

        let mut platform = ScriptedPlatform::with_batches(idle(130));
        let mut app = window_of_frames();
        let quiet = run(config(), &mut platform, &mut app).expect("run succeeds");
        assert_eq!(quiet.stats_reports, 0);

        let mut platform = ScriptedPlatform::with_batches(idle(130));
        let mut app = window_of_frames();
        let config = RunConfig {
            print_stats: true,
            ..config()
        };
        let verbose = run(config, &mut platform, &mut app).expect("run succeeds");
        assert_eq!(verbose.frames, 130);
        assert_eq!(verbose.stats_reports, 1);
    }

    #[test]
    fn think_time_is_relative_to_loop_start() {
        let mut platform = ScriptedPlatform::with_batches(idle(3));
        let mut app = TestApp {
            frame_secs: 0.25,
            ..Default::default()
        };
        app.clock.set(5.0);
        run(config(), &mut platform, &mut app).expect("run succeeds");

        assert_eq!(app.times, vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn hidden_window_blocks_on_wait() {
        let mut platform = ScriptedPlatform {
            hidden_for: 2,
            ..ScriptedPlatform::with_batches(idle(2))
        };
        let mut app = TestApp::default();
        let summary = run(config(), &mut platform, &mut app).expect("run succeeds");

        assert_eq!(platform.waits, 2);
        assert_eq!(summary.frames, 2);
    }

    #[test]
    fn presentation_can_be_disabled() {
        let mut platform = ScriptedPlatform::with_batches(idle(4));
        let mut app = TestApp::default();
        let config = RunConfig {
            present: false,
            single_threaded: true,
            ..config()
        };
        let summary = run(config, &mut platform, &mut app).expect("run succeeds");

        assert_eq!(summary.frames, 4);
        assert_eq!(platform.presents, 0);
        assert!(platform.affinity_pinned);
    }

    #[test]
    fn run_config_fills_defaults_from_json() {
        let config: RunConfig = serde_json::from_str(
            r#"{ "title": "bench", "width": 640, "context": { "major": 3, "minor": 3 } }"#,
        )
        .expect("config parses");

        assert_eq!(config.title, "bench");
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 720);
        assert!(config.present);
        assert_eq!(config.context.major, 3);
        assert_eq!(config.context.debug, cfg!(debug_assertions));
    }

    #[test]
    fn title_text_formats_average() {
        assert_eq!(
            title_text("demo", 2000.0 / 120.0, false),
            "demo: 16.6667 [ms]"
        );
        assert!(title_text("demo", 1.0, true).ends_with(VSYNC_SUFFIX));
    }
}
