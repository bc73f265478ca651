//! Core GPU context and device management.
//!
//! This module provides [`GpuContext`], the central struct that holds the wgpu device
//! and queue used by every pass in the crate. The context is created headlessly: gobo
//! renders into offscreen targets, and presenting to a window (if any) is the host
//! application's concern.

/// Core GPU context holding wgpu resources.
///
/// Owns the logical device, the command queue, the color format shared by all render
/// targets, and the current logical surface size. All fields needed for direct wgpu
/// access are public; the context is created once and passed by reference to passes.
///
/// # Example
///
/// ```no_run
/// use gobo::GpuContext;
///
/// let mut gpu = GpuContext::headless(800, 600);
///
/// // Handle a viewport resize
/// gpu.resize(1024, 768);
/// assert_eq!((gpu.width(), gpu.height()), (1024, 768));
/// ```
pub struct GpuContext {
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Color format used by all render targets created from this context.
    pub format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl GpuContext {
    /// Create a headless GPU context with the given logical surface size.
    ///
    /// Performs the wgpu initialization sequence: instance, adapter, device and
    /// queue. No window surface is involved; render targets are offscreen textures
    /// in [`Self::format`].
    ///
    /// # Panics
    ///
    /// Panics if no suitable GPU adapter is found or device creation fails.
    pub fn headless(width: u32, height: u32) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .expect("Failed to find a suitable GPU adapter");

        let info = adapter.get_info();
        log::info!("using adapter {:?} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Gobo Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .expect("Failed to create device");

        Self {
            device,
            queue,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width,
            height,
        }
    }

    /// Resize the logical surface to new dimensions.
    ///
    /// Render targets and depth buffers pick the new size up on their next
    /// `ensure_size` call. Zero-sized dimensions are ignored to avoid wgpu
    /// validation errors.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    /// Returns the current logical surface width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the current logical surface height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
