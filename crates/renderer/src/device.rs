//! The slice of the graphics device that geometry upload needs.

use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Creates vertex buffers. Implemented for [`wgpu::Device`]; tests use a recording device.
pub trait GraphicsDevice {
    /// Shared handle to an uploaded buffer. Clones refer to the same GPU memory.
    type Buffer: Clone;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Self::Buffer;
}

/// Shared wgpu vertex buffer.
pub type GpuBuffer = Arc<wgpu::Buffer>;

impl GraphicsDevice for wgpu::Device {
    type Buffer = GpuBuffer;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> GpuBuffer {
        // Zero-sized buffers cannot be sliced; keep a small placeholder instead.
        const EMPTY: [u8; 16] = [0; 16];
        let contents = if contents.is_empty() { &EMPTY[..] } else { contents };
        Arc::new(self.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        }))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::GraphicsDevice;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Buffer handle recorded by [`RecordingDevice`]: the upload's sequence number and bytes.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedBuffer {
        pub id: usize,
        pub label: String,
        pub bytes: Rc<Vec<u8>>,
    }

    /// Counts every buffer creation so tests can check upload-once behaviour.
    #[derive(Debug, Default)]
    pub struct RecordingDevice {
        pub uploads: RefCell<Vec<String>>,
    }

    impl RecordingDevice {
        pub fn upload_count(&self) -> usize {
            self.uploads.borrow().len()
        }
    }

    impl GraphicsDevice for RecordingDevice {
        type Buffer = RecordedBuffer;

        fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> RecordedBuffer {
            let mut uploads = self.uploads.borrow_mut();
            uploads.push(label.to_string());
            RecordedBuffer {
                id: uploads.len() - 1,
                label: label.to_string(),
                bytes: Rc::new(contents.to_vec()),
            }
        }
    }
}
