//! Hosted sample application: an animated clear color driven by the input state.
//!
//! Space pauses the animation, the wheel changes brightness, and the cursor's
//! horizontal position shifts the hue. While the left button is held the color
//! freezes, which makes drag tracking visible.

use std::f64::consts::TAU;

use fw_core::{Application, InputHooks, InputState, Key, Modifiers, MouseButton};
use fw_render::SharedGpu;

const BRIGHTNESS_BASE: f64 = 0.6;
const BRIGHTNESS_PER_STEP: f64 = 0.05;

pub struct SampleApp {
    gpu: SharedGpu,
    paused: bool,
    animation_time: f64,
    last_time: f64,
}

impl SampleApp {
    pub fn new(gpu: SharedGpu) -> Self {
        Self {
            gpu,
            paused: false,
            animation_time: 0.0,
            last_time: 0.0,
        }
    }
}

impl InputHooks for SampleApp {
    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.borrow_mut().as_mut() {
            gpu.resize(width, height);
        }
    }

    fn key_char(&mut self, ch: char, _mods: Modifiers) -> bool {
        log::trace!("char input {ch:?}");
        false
    }
}

impl Application for SampleApp {
    fn begin(&mut self) -> bool {
        if self.gpu.borrow().is_none() {
            log::error!("No rendering context available");
            return false;
        }
        log::info!("Sample ready: Space pauses, wheel sets brightness, V toggles vsync");
        true
    }

    fn think(&mut self, time: f64, input: &InputState) {
        if input.on_press(Key::Space) {
            self.paused = !self.paused;
            log::info!("Animation {}", if self.paused { "paused" } else { "resumed" });
        }

        let dt = time - self.last_time;
        self.last_time = time;
        if !self.paused && !input.is_mouse_held(MouseButton::Left) {
            self.animation_time += dt;
        }

        let brightness = wheel_brightness(input.wheel());
        let hue_shift = cursor_hue_shift(input.cursor().0, input.viewport().0);
        let color = clear_color(self.animation_time, hue_shift, brightness);

        if let Some(gpu) = self.gpu.borrow_mut().as_mut() {
            gpu.clear(color);
        }
    }

    fn end(&mut self) {
        log::info!("Sample finished after {:.2}s of animation", self.animation_time);
    }
}

fn wheel_brightness(wheel: i32) -> f64 {
    (BRIGHTNESS_BASE + f64::from(wheel) * BRIGHTNESS_PER_STEP).clamp(0.1, 1.0)
}

fn cursor_hue_shift(x: i32, width: u32) -> f64 {
    if width == 0 {
        return 0.0;
    }
    (f64::from(x) / f64::from(width)).clamp(0.0, 1.0)
}

/// Three phase-shifted sine waves, one per channel, cycling every 8 seconds.
fn clear_color(time: f64, hue_shift: f64, brightness: f64) -> wgpu::Color {
    let phase = (time / 8.0 + hue_shift) * TAU;
    let channel = |offset: f64| (0.5 + 0.5 * (phase + offset * TAU).sin()) * brightness;
    wgpu::Color {
        r: channel(0.0),
        g: channel(1.0 / 3.0),
        b: channel(2.0 / 3.0),
        a: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_is_clamped() {
        assert!((wheel_brightness(0) - BRIGHTNESS_BASE).abs() < 1e-12);
        assert!((wheel_brightness(100) - 1.0).abs() < 1e-12);
        assert!((wheel_brightness(-100) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn hue_shift_follows_cursor() {
        assert_eq!(cursor_hue_shift(0, 0), 0.0);
        assert!((cursor_hue_shift(320, 640) - 0.5).abs() < 1e-12);
        assert_eq!(cursor_hue_shift(-10, 640), 0.0);
        assert_eq!(cursor_hue_shift(900, 640), 1.0);
    }

    #[test]
    fn clear_color_stays_in_range() {
        for step in 0..64 {
            let c = clear_color(f64::from(step) * 0.37, 0.2, 0.8);
            for v in [c.r, c.g, c.b] {
                assert!((0.0..=0.8 + 1e-12).contains(&v));
            }
            assert_eq!(c.a, 1.0);
        }
    }

    #[test]
    fn clear_color_repeats_every_cycle() {
        let a = clear_color(1.0, 0.0, 1.0);
        let b = clear_color(9.0, 0.0, 1.0);
        assert!((a.r - b.r).abs() < 1e-9);
        assert!((a.g - b.g).abs() < 1e-9);
    }

    #[test]
    fn begin_fails_without_context() {
        let mut app = SampleApp::new(SharedGpu::default());
        assert!(!app.begin());
    }
}
