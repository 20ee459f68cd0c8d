//! winit-backed platform.
//!
//! The core loop pulls events rather than being driven by winit, so the event
//! loop is pumped: `poll_events` pumps with a zero timeout, `wait_events` pumps
//! with no timeout and blocks until the OS has something to deliver. Each pump
//! builds a short-lived `Pump` adapter around the runner's dispatch closure, so
//! winit callbacks reach the input state by reference.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fw_core::{ContextFlags, Event, Modifiers, Platform};
use fw_render::{GpuContext, GpuError, SharedGpu};
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::keymap::{self, WheelAccumulator};

const WINDOW_CREATE_TIMEOUT: Duration = Duration::from_secs(5);
const WINDOW_CREATE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    WindowCreation(#[from] winit::error::OsError),

    #[error("window was not created within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

pub fn window_attributes(title: &str, width: u32, height: u32) -> WindowAttributes {
    Window::default_attributes()
        .with_title(title)
        .with_inner_size(winit::dpi::LogicalSize::new(width, height))
}

struct WindowState {
    pending: Option<WindowAttributes>,
    window: Option<Arc<Window>>,
    creation_error: Option<winit::error::OsError>,
    close_requested: bool,
    exited: bool,
    occluded: bool,
    size: (u32, u32),
    modifiers: Modifiers,
    wheel: WheelAccumulator,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            pending: None,
            window: None,
            creation_error: None,
            close_requested: false,
            exited: false,
            occluded: false,
            size: (0, 0),
            modifiers: Modifiers::empty(),
            wheel: WheelAccumulator::default(),
        }
    }
}

impl WindowState {
    fn hidden(&self) -> bool {
        let minimized = self
            .window
            .as_ref()
            .and_then(|w| w.is_minimized())
            .unwrap_or(false);
        self.occluded || minimized || self.size == (0, 0)
    }

    fn translate(&mut self, event: WindowEvent, dispatch: &mut dyn FnMut(Event)) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.close_requested = true;
            }

            WindowEvent::Occluded(occluded) => {
                self.occluded = occluded;
            }

            WindowEvent::Resized(size) => {
                self.size = (size.width, size.height);
                log::debug!("Resized to {}x{}", size.width, size.height);
                dispatch(Event::Resize {
                    width: size.width,
                    height: size.height,
                });
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = keymap::map_modifiers(modifiers.state());
            }

            WindowEvent::CursorMoved { position, .. } => {
                dispatch(Event::Motion {
                    x: position.x as i32,
                    y: position.y as i32,
                });
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = keymap::map_mouse_button(button) {
                    dispatch(Event::MouseButton {
                        button,
                        action: keymap::map_action(state, false),
                        mods: self.modifiers,
                    });
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let steps = self.wheel.feed(delta);
                if steps != 0 {
                    dispatch(Event::Wheel { delta: steps });
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let mods = self.modifiers;
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(key) = keymap::map_key(key_code) {
                        dispatch(Event::Key {
                            key,
                            action: keymap::map_action(event.state, event.repeat),
                            mods,
                        });
                    }
                }
                if event.state == ElementState::Pressed {
                    if let Some(text) = &event.text {
                        for ch in text.chars() {
                            dispatch(Event::Char { ch, mods });
                        }
                    }
                }
            }

            _ => {}
        }
    }
}

struct Pump<'a, 'b> {
    state: &'a mut WindowState,
    dispatch: &'a mut (dyn FnMut(Event) + 'b),
}

impl ApplicationHandler for Pump<'_, '_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attrs) = self.state.pending.take() else {
            return;
        };
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let size = window.inner_size();
                self.state.size = (size.width, size.height);
                self.state.window = Some(Arc::new(window));
            }
            Err(err) => self.state.creation_error = Some(err),
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.state.translate(event, self.dispatch);
    }
}

pub struct WinitPlatform {
    event_loop: EventLoop<()>,
    state: WindowState,
    gpu: SharedGpu,
}

impl WinitPlatform {
    pub fn new() -> Result<Self, PlatformError> {
        Ok(Self {
            event_loop: EventLoop::new()?,
            state: WindowState::default(),
            gpu: Rc::new(RefCell::new(None)),
        })
    }

    /// Handle to the rendering context, filled in by `activate`.
    pub fn gpu(&self) -> SharedGpu {
        self.gpu.clone()
    }

    fn pump(&mut self, timeout: Option<Duration>, dispatch: &mut dyn FnMut(Event)) -> bool {
        let mut pump = Pump {
            state: &mut self.state,
            dispatch,
        };
        match self.event_loop.pump_app_events(timeout, &mut pump) {
            PumpStatus::Continue => true,
            PumpStatus::Exit(code) => {
                log::debug!("Event loop exited with code {code}");
                self.state.exited = true;
                false
            }
        }
    }
}

impl Platform for WinitPlatform {
    type Error = PlatformError;

    fn activate(
        &mut self,
        width: u32,
        height: u32,
        title: &str,
        flags: &ContextFlags,
    ) -> Result<(), PlatformError> {
        self.state.pending = Some(window_attributes(title, width, height));

        // Events before the window exists have nothing to update.
        let started = Instant::now();
        let window = loop {
            self.pump(Some(WINDOW_CREATE_POLL), &mut |_| {});
            if let Some(err) = self.state.creation_error.take() {
                return Err(err.into());
            }
            if let Some(window) = &self.state.window {
                break window.clone();
            }
            if started.elapsed() > WINDOW_CREATE_TIMEOUT {
                return Err(PlatformError::Timeout(WINDOW_CREATE_TIMEOUT));
            }
        };
        log::info!("Window created: {}x{}", width, height);

        let gpu = GpuContext::new(window, flags)?;
        *self.gpu.borrow_mut() = Some(gpu);
        Ok(())
    }

    fn set_swap_interval(&mut self, interval: u32) {
        if let Some(gpu) = self.gpu.borrow_mut().as_mut() {
            gpu.set_vsync(interval > 0);
        }
    }

    fn present_frame(&mut self) {
        if let Some(gpu) = self.gpu.borrow_mut().as_mut() {
            gpu.present();
        }
    }

    fn poll_events(&mut self, blocking: bool, dispatch: &mut dyn FnMut(Event)) -> bool {
        let timeout = if blocking { None } else { Some(Duration::ZERO) };
        self.pump(timeout, dispatch) && !self.state.close_requested
    }

    fn wait_events(&mut self, dispatch: &mut dyn FnMut(Event)) {
        self.pump(None, dispatch);
    }

    fn is_open(&self) -> bool {
        // A pending close counts as open so the next poll can report it.
        self.state.close_requested || self.state.exited || !self.state.hidden()
    }

    fn set_title(&mut self, title: &str) {
        if let Some(window) = &self.state.window {
            window.set_title(title);
        }
    }
}
