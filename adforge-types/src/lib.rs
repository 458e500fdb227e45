//! Wire types for the adforge Vertex AI and Cloud Storage client.

mod base64_serde;

pub mod config;
pub mod content;
pub mod enums;
pub mod models;
pub mod response;
pub mod storage;
