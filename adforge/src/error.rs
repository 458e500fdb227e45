//! Error definitions for the client layer.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP client error: {source}")]
    HttpClient {
        #[from]
        source: reqwest::Error,
    },

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Auth error: {message}")]
    Auth { message: String },

    #[error("Transfer error: {message}")]
    Transfer { message: String },
}

impl Error {
    /// 包装为对象存储传输错误，附带上下文。
    pub(crate) fn transfer(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Transfer {
            message: format!("{context}: {err}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// 非 2xx 响应转为 `ApiError`。
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(Error::ApiError {
        status: response.status().as_u16(),
        message: response.text().await.unwrap_or_default(),
    })
}

/// 读取完整响应体并按 JSON 解析。
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
