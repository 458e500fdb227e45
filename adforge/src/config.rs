//! Process configuration, loaded once at start-up.

use crate::client::{Client, ClientBuilder, Credentials};
use crate::error::{Error, Result};
use crate::storage::Locator;

/// 默认区域。
pub const DEFAULT_LOCATION: &str = "us-central1";
/// 默认风格参考图（相对当前目录的本地文件）。
pub const DEFAULT_STYLE_REFERENCE: &str = "Reference_Image.png";
/// 默认 prompt 生成模型。
pub const DEFAULT_PROMPT_MODEL: &str = "gemini-2.5-flash";
/// 默认图像生成模型。
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-preview-06-06";
/// 上传对象的默认 key 前缀。
pub const DEFAULT_UPLOAD_PREFIX: &str = "uploads";

/// 应用配置。构建后不再修改。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_id: String,
    pub location: String,
    pub bucket: String,
    /// 风格参考图的 locator（`gs://` 或本地路径）。
    pub style_reference: String,
    /// 风格参考图的 MIME 类型；未设置时按扩展名推断。
    pub style_reference_mime: Option<String>,
    pub prompt_model: String,
    pub image_model: String,
    pub upload_prefix: String,
    /// 单次请求超时（秒）。
    pub timeout_secs: Option<u64>,
    pub vertex_base_url: Option<String>,
    pub storage_base_url: Option<String>,
    /// 固定 access token；为空时使用 ADC。
    pub access_token: Option<String>,
}

impl AppConfig {
    /// 以必填项构造，其余取默认值。
    pub fn new(project_id: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: DEFAULT_LOCATION.to_string(),
            bucket: bucket.into(),
            style_reference: DEFAULT_STYLE_REFERENCE.to_string(),
            style_reference_mime: None,
            prompt_model: DEFAULT_PROMPT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
            timeout_secs: None,
            vertex_base_url: None,
            storage_base_url: None,
            access_token: None,
        }
    }

    /// 从环境变量读取配置。空白值视为未设置。
    ///
    /// # Errors
    /// 当 `GCP_PROJECT_ID` / `GCS_BUCKET_NAME` 缺失或数值无法解析时返回错误。
    pub fn from_env() -> Result<Self> {
        let project_id = required_env("GCP_PROJECT_ID")?;
        let bucket = required_env("GCS_BUCKET_NAME")?;
        let mut config = Self::new(project_id, bucket);

        if let Some(location) = optional_env("GCP_LOCATION") {
            config.location = location;
        }
        if let Some(reference) = optional_env("ADFORGE_STYLE_REFERENCE") {
            config.style_reference = reference;
        }
        config.style_reference_mime = optional_env("ADFORGE_STYLE_REFERENCE_MIME");
        if let Some(model) = optional_env("ADFORGE_PROMPT_MODEL") {
            config.prompt_model = model;
        }
        if let Some(model) = optional_env("ADFORGE_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(prefix) = optional_env("ADFORGE_UPLOAD_PREFIX") {
            config.upload_prefix = prefix.trim_matches('/').to_string();
        }
        if let Some(timeout) = optional_env("ADFORGE_TIMEOUT_SECS") {
            let secs = timeout.parse::<u64>().map_err(|err| Error::InvalidConfig {
                message: format!("ADFORGE_TIMEOUT_SECS must be a whole number of seconds: {err}"),
            })?;
            config.timeout_secs = Some(secs);
        }
        config.vertex_base_url = optional_env("ADFORGE_VERTEX_BASE_URL");
        config.storage_base_url = optional_env("ADFORGE_STORAGE_BASE_URL");
        config.access_token = optional_env("ADFORGE_ACCESS_TOKEN");
        Ok(config)
    }

    /// 风格参考图 locator。
    ///
    /// # Errors
    /// 当 `gs://` locator 缺少 bucket 或 key 时返回错误。
    pub fn style_reference_locator(&self) -> Result<Locator> {
        self.style_reference.parse()
    }

    /// 风格参考图的 MIME 类型。
    #[must_use]
    pub fn style_reference_mime(&self) -> String {
        self.style_reference_mime
            .clone()
            .unwrap_or_else(|| crate::storage::guess_mime_type(&self.style_reference))
    }

    /// 按配置准备客户端 Builder。
    #[must_use]
    pub fn client_builder(&self) -> ClientBuilder {
        let mut builder = Client::builder()
            .vertex_project(&self.project_id)
            .vertex_location(&self.location);
        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(timeout);
        }
        if let Some(base_url) = &self.vertex_base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(base_url) = &self.storage_base_url {
            builder = builder.storage_base_url(base_url);
        }
        if let Some(token) = &self.access_token {
            builder = builder.credentials(Credentials::AccessToken(token.clone()));
        }
        builder
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required_env(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| Error::InvalidConfig {
        message: format!("{key} not found"),
    })
}
