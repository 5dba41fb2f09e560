/// Owned access to the device a layer allocates on.
///
/// Cloning is cheap (wgpu objects are reference counted). A layer's GPU
/// resource manager takes one at construction and releases everything it
/// allocated through it on teardown.
#[derive(Debug, Clone)]
pub struct GpuHandle {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
}

impl GpuHandle {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, target_format: wgpu::TextureFormat) -> Self {
        Self { device, queue, target_format }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Format layer canvases are created in (the surface format).
    #[inline]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }
}
