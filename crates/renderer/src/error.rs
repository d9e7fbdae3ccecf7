//! Error types for asset ingestion and GPU resource management.
//!
//! None of these are fatal to the frame loop: callers log them and keep rendering with
//! whatever they had before.

use thiserror::Error;

/// A mesh asset could not be read.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset {identity:?} is unreachable: {source}")]
    Unreachable {
        identity: String,
        #[source]
        source: std::io::Error,
    },
}

/// A GPU target failed validation when it was created.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{label} failed validation: {message}")]
    Validation { label: String, message: String },
}

impl ResourceError {
    pub(crate) fn from_wgpu(label: &str, error: wgpu::Error) -> Self {
        Self::Validation {
            label: label.to_string(),
            message: error.to_string(),
        }
    }
}

/// Shader reflection failures hit while building pipelines.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{program} shader failed to parse: {message}")]
    ShaderParse { program: &'static str, message: String },
    #[error("{program} shader has no binding named {name:?}")]
    MissingBinding { program: &'static str, name: &'static str },
    #[error("{program} bindings {names:?} are expected in one group but span several")]
    BindingGroupMismatch { program: &'static str, names: Vec<&'static str> },
    #[error("{program} bind groups {groups:?} do not form a contiguous range from 0")]
    GroupGap { program: &'static str, groups: Vec<u32> },
}
