//! Blob store gateway: Cloud Storage uploads/downloads with a local-path fallback.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use adforge_types::storage::StorageObject;
use reqwest::header::CONTENT_TYPE;

use crate::client::ClientInner;
use crate::error::{ensure_success, read_json, Error, Result};

const GCS_SCHEME: &str = "gs://";

/// 资源定位：远端对象或本地文件，二者必居其一。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Gcs { bucket: String, key: String },
    Local(PathBuf),
}

impl Locator {
    /// 构造 `gs://bucket/key` 形式的 locator。
    pub fn gcs(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Gcs {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Gcs { .. })
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let Some(rest) = value.strip_prefix(GCS_SCHEME) else {
            return Ok(Self::Local(PathBuf::from(value)));
        };
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(Self::gcs(bucket, key))
            }
            _ => Err(Error::Transfer {
                message: format!("invalid object locator `{value}`: expected gs://bucket/key"),
            }),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gcs { bucket, key } => write!(f, "{GCS_SCHEME}{bucket}/{key}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 按文件名推断 MIME 类型，未知时为 `application/octet-stream`。
#[must_use]
pub fn guess_mime_type(path: impl AsRef<Path>) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// 单个 bucket 上的对象存储操作。
#[derive(Clone)]
pub struct Storage {
    pub(crate) inner: Arc<ClientInner>,
    bucket: String,
}

impl Storage {
    pub(crate) fn new(inner: Arc<ClientInner>, bucket: impl Into<String>) -> Self {
        Self {
            inner,
            bucket: bucket.into(),
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// 上传本地文件到 `destination_key`。
    ///
    /// # Errors
    /// 源文件不可读或对象存储不可达时返回 [`Error::Transfer`]。
    pub async fn upload(
        &self,
        local_path: impl AsRef<Path>,
        destination_key: &str,
    ) -> Result<Locator> {
        let local_path = local_path.as_ref();
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|err| Error::transfer(format!("read {}", local_path.display()), err))?;
        let content_type = guess_mime_type(local_path);
        let locator = self
            .upload_bytes(data, destination_key, &content_type)
            .await?;
        tracing::info!(source = %local_path.display(), %locator, "uploaded file");
        Ok(locator)
    }

    /// 上传内存中的字节。
    ///
    /// # Errors
    /// 对象存储不可达或返回非 2xx 时返回 [`Error::Transfer`]。
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        destination_key: &str,
        content_type: &str,
    ) -> Result<Locator> {
        let locator = Locator::gcs(&self.bucket, destination_key);
        let object = self
            .put_object(data, destination_key, content_type)
            .await
            .map_err(|err| Error::transfer(format!("upload {locator}"), err))?;
        tracing::debug!(
            %locator,
            size = object.size_bytes(),
            generation = object.generation.as_deref(),
            "stored object"
        );
        Ok(locator)
    }

    /// 读取 locator 指向的全部字节。
    ///
    /// # Errors
    /// 对象不存在、存储不可达或本地文件不可读时返回 [`Error::Transfer`]。
    pub async fn download(&self, locator: &Locator) -> Result<Vec<u8>> {
        match locator {
            Locator::Gcs { bucket, key } => {
                tracing::debug!(%locator, "downloading object");
                self.get_object(bucket, key)
                    .await
                    .map_err(|err| Error::transfer(format!("download {locator}"), err))
            }
            Locator::Local(path) => {
                tracing::debug!(path = %path.display(), "reading local file");
                tokio::fs::read(path)
                    .await
                    .map_err(|err| Error::transfer(format!("read {}", path.display()), err))
            }
        }
    }

    /// 生成带命名空间的对象 key：`{prefix}/{category}/{id}_{name}`。
    #[must_use]
    pub fn upload_key(prefix: &str, category: &str, id: &str, name: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{category}/{id}_{name}")
        } else {
            format!("{prefix}/{category}/{id}_{name}")
        }
    }

    async fn put_object(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<StorageObject> {
        let mut url = self.bucket_url("upload/storage/v1/b")?;
        url.path_segments_mut()
            .map_err(|()| invalid_base_url(&self.inner.api_client.storage_base_url))?
            .push("o");
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);

        let request = self
            .inner
            .http
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(data);
        let response = ensure_success(self.inner.send(request).await?).await?;
        read_json(response).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let mut url = self.object_url(bucket, key)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let request = self.inner.http.get(url);
        let response = ensure_success(self.inner.send(request).await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn bucket_url(&self, api_path: &str) -> Result<reqwest::Url> {
        let base = &self.inner.api_client.storage_base_url;
        let mut url = reqwest::Url::parse(&format!("{base}{api_path}")).map_err(|err| {
            Error::InvalidConfig {
                message: format!("Invalid storage base URL {base}: {err}"),
            }
        })?;
        url.path_segments_mut()
            .map_err(|()| invalid_base_url(base))?
            .push(&self.bucket);
        Ok(url)
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<reqwest::Url> {
        let base = &self.inner.api_client.storage_base_url;
        let mut url = reqwest::Url::parse(&format!("{base}storage/v1/b")).map_err(|err| {
            Error::InvalidConfig {
                message: format!("Invalid storage base URL {base}: {err}"),
            }
        })?;
        // 对象名整体作为一个路径段，`/` 需编码为 `%2F`。
        url.path_segments_mut()
            .map_err(|()| invalid_base_url(base))?
            .push(bucket)
            .push("o")
            .push(key);
        Ok(url)
    }
}

fn invalid_base_url(base: &str) -> Error {
    Error::InvalidConfig {
        message: format!("Storage base URL cannot be a base: {base}"),
    }
}
