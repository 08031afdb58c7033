use thiserror::Error;

/// Failure reported by a [`GraphicsDevice`](super::GraphicsDevice) resource operation.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Shader source failed to compile or the stages failed to link.
    #[error("program '{label}' failed to compile: {details}")]
    Compilation { label: String, details: String },

    /// GPU memory or a backend object could not be allocated.
    #[error("failed to allocate '{label}': {details}")]
    Allocation { label: String, details: String },

    /// The request is valid but not supported by this device.
    #[error("unsupported by this device: {0}")]
    Unsupported(String),

    /// Malformed input (wrong data length, zero size, ...).
    #[error("invalid descriptor for '{label}': {details}")]
    InvalidDescriptor { label: String, details: String },
}
