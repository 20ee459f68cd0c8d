use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use fw_core::ContextFlags;
use thiserror::Error;
use winit::window::Window;

/// Context slot shared by the platform (which creates, presents and switches
/// vsync) and the hosted application (which renders into the acquired frame).
pub type SharedGpu = Rc<RefCell<Option<GpuContext>>>;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
    pub size: (u32, u32),
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

impl GpuContext {
    pub fn new(window: Arc<Window>, flags: &ContextFlags) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: instance_flags(flags),
            ..Default::default()
        });

        if flags.robust {
            log::debug!("Robust access requested; wgpu bounds-checks shader accesses by default");
        }
        if flags.share.is_some() {
            log::warn!("Context sharing is not supported by the wgpu provider, ignoring share handle");
        }

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {:?} ({:?})", info.name, info.backend);

        let required_limits = if flags.core {
            wgpu::Limits::default()
        } else {
            wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits())
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("framewright device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                ..Default::default()
            },
            None,
        ))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(true),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            surface_format,
            size: (size.width, size.height),
            frame: None,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        // A frame acquired at the old size cannot be presented after reconfigure.
        self.frame = None;
        self.size = (width, height);
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        let mode = present_mode(enabled);
        if self.config.present_mode == mode {
            return;
        }
        self.frame = None;
        self.config.present_mode = mode;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquires the frame to render into, reusing it until it is presented.
    pub fn acquire(&mut self) -> Option<&wgpu::TextureView> {
        if self.frame.is_none() {
            self.frame = self.begin_frame();
        }
        self.frame.as_ref().map(|(_, view)| view)
    }

    pub fn clear(&mut self, color: wgpu::Color) {
        if self.acquire().is_none() {
            return;
        }
        let Some((_, view)) = self.frame.as_ref() else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Presents the acquired frame, if any. Nothing rendered means nothing to show.
    pub fn present(&mut self) {
        if let Some((output, _view)) = self.frame.take() {
            output.present();
        }
    }

    fn begin_frame(&self) -> Option<(wgpu::SurfaceTexture, wgpu::TextureView)> {
        let output = match self.surface.get_current_texture() {
            Ok(tex) => tex,
            Err(wgpu::SurfaceError::Lost) => {
                self.surface.configure(&self.device, &self.config);
                return None;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                return None;
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                return None;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Some((output, view))
    }
}

pub fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

pub fn instance_flags(flags: &ContextFlags) -> wgpu::InstanceFlags {
    if flags.debug {
        wgpu::InstanceFlags::DEBUG | wgpu::InstanceFlags::VALIDATION
    } else {
        wgpu::InstanceFlags::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_maps_to_fifo() {
        assert_eq!(present_mode(true), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn debug_context_enables_validation() {
        let debug = ContextFlags {
            debug: true,
            ..ContextFlags::default()
        };
        assert!(instance_flags(&debug).contains(wgpu::InstanceFlags::VALIDATION));

        let release = ContextFlags {
            debug: false,
            ..ContextFlags::default()
        };
        assert!(instance_flags(&release).is_empty());
    }
}
