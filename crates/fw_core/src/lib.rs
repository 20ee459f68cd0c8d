//! Run-loop and input-state core of the framewright application shell.
//!
//! The crate has no windowing dependency. A [`Platform`] implementation feeds
//! raw events in, a hosted [`Application`] receives setup, per-frame and
//! teardown calls, and [`AppRunner`] paces the loop between them.

pub mod app;
pub mod error;
pub mod input;
pub mod profiler;
pub mod time;

pub use app::{AppRunner, Application, ContextFlags, ExitReason, Platform, RunConfig, RunSummary};
pub use error::SetupError;
pub use input::{
    ButtonAction, Event, InputHooks, InputState, Key, Modifiers, MouseButton, MouseButtons,
    PassThrough,
};
pub use profiler::{FrameScope, Profiler, SectionGuard, DEFAULT_WINDOW_SECS};
pub use time::{Clock, ManualClock, SystemClock, TitleTimer};
