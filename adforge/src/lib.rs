//! Product advertisement generator: Cloud Storage staging, Gemini prompt synthesis and
//! Imagen rendering behind a single pipeline call.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod render;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use adforge_types as types;

pub use client::{Client, ClientBuilder, ClientProvider, Credentials, HttpOptions, VertexConfig};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use pipeline::{GenerationRequest, GenerationResult, Pipeline, PipelineError, Stage};
pub use render::RenderedImage;
pub use storage::{Locator, Storage};
