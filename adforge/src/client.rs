//! Client configuration and transport layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use google_cloud_auth::credentials::{
    Builder as AuthBuilder, CacheableResource, Credentials as GoogleCredentials,
};
use http::Extensions;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client as HttpClient, Proxy};
use tokio::sync::OnceCell;

use crate::config::AppConfig;
use crate::error::{Error, Result};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com/";
const DEFAULT_VERTEX_API_VERSION: &str = "v1beta1";

/// Vertex AI + Cloud Storage 客户端。
///
/// 内部为 `Arc`，克隆开销很小，可在并发请求间共享。
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub http: HttpClient,
    pub config: ClientConfig,
    pub api_client: ApiClient,
    pub(crate) auth_provider: AuthProvider,
}

/// 客户端配置。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Vertex AI 配置。
    pub vertex_config: VertexConfig,
    /// HTTP 配置。
    pub http_options: HttpOptions,
    /// 认证信息。
    pub credentials: Credentials,
    /// OAuth scopes（ADC 使用）。
    pub auth_scopes: Vec<String>,
}

/// 认证方式。
#[derive(Clone)]
pub enum Credentials {
    /// 预先获取的 Bearer token。
    AccessToken(String),
    /// Application Default Credentials (ADC)。
    ApplicationDefault,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Self::ApplicationDefault => f.write_str("ApplicationDefault"),
        }
    }
}

/// Vertex AI 配置。
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project: String,
    pub location: String,
}

/// HTTP 配置。
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// 单次请求超时（秒）。
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub headers: HashMap<String, String>,
    /// Vertex AI 基础 URL。
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    /// Cloud Storage 基础 URL。
    pub storage_base_url: Option<String>,
}

impl Client {
    /// 创建 Vertex AI 客户端（ADC 认证）。
    ///
    /// # Errors
    /// 当配置无效或构建客户端失败时返回错误。
    pub fn new_vertex(project: impl Into<String>, location: impl Into<String>) -> Result<Self> {
        Self::builder()
            .vertex_project(project)
            .vertex_location(location)
            .build()
    }

    /// 创建 Builder。
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// 访问模型 API。
    #[must_use]
    pub fn models(&self) -> crate::models::Models {
        crate::models::Models::new(self.inner.clone())
    }

    /// 访问指定 bucket 的对象存储。
    #[must_use]
    pub fn storage(&self, bucket: impl Into<String>) -> crate::storage::Storage {
        crate::storage::Storage::new(self.inner.clone(), bucket)
    }

    /// 客户端配置。
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

/// 客户端 Builder。
#[derive(Default)]
pub struct ClientBuilder {
    credentials: Option<Credentials>,
    vertex_project: Option<String>,
    vertex_location: Option<String>,
    http_options: HttpOptions,
    auth_scopes: Option<Vec<String>>,
}

impl ClientBuilder {
    /// 设置认证方式。
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// 使用固定的 access token。
    #[must_use]
    pub fn access_token(self, token: impl Into<String>) -> Self {
        self.credentials(Credentials::AccessToken(token.into()))
    }

    /// 设置 Vertex AI 项目 ID。
    #[must_use]
    pub fn vertex_project(mut self, project: impl Into<String>) -> Self {
        self.vertex_project = Some(project.into());
        self
    }

    /// 设置 Vertex AI 区域。
    #[must_use]
    pub fn vertex_location(mut self, location: impl Into<String>) -> Self {
        self.vertex_location = Some(location.into());
        self
    }

    /// 设置请求超时（秒）。
    #[must_use]
    pub const fn timeout(mut self, secs: u64) -> Self {
        self.http_options.timeout = Some(secs);
        self
    }

    /// 设置代理。
    #[must_use]
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.http_options.proxy = Some(url.into());
        self
    }

    /// 增加默认 HTTP 头。
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_options.headers.insert(key.into(), value.into());
        self
    }

    /// 设置 Vertex AI 基础 URL。
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_options.base_url = Some(base_url.into());
        self
    }

    /// 设置 API 版本。
    #[must_use]
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.http_options.api_version = Some(api_version.into());
        self
    }

    /// 设置 Cloud Storage 基础 URL。
    #[must_use]
    pub fn storage_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_options.storage_base_url = Some(base_url.into());
        self
    }

    /// 设置 OAuth scopes。
    #[must_use]
    pub fn auth_scopes(mut self, scopes: Vec<String>) -> Self {
        self.auth_scopes = Some(scopes);
        self
    }

    /// 构建客户端。
    ///
    /// # Errors
    /// 当项目/区域缺失、参数无效或构建 HTTP 客户端失败时返回错误。
    pub fn build(self) -> Result<Client> {
        let Self {
            credentials,
            vertex_project,
            vertex_location,
            http_options,
            auth_scopes,
        } = self;

        let vertex_config = Self::build_vertex_config(vertex_project, vertex_location)?;
        let credentials = credentials.unwrap_or(Credentials::ApplicationDefault);
        let headers = Self::build_headers(&http_options)?;
        let http = Self::build_http_client(&http_options, headers)?;
        let auth_provider = AuthProvider::new(&credentials)?;

        let config = ClientConfig {
            vertex_config,
            http_options,
            credentials,
            auth_scopes: auth_scopes.unwrap_or_else(|| vec![CLOUD_PLATFORM_SCOPE.to_string()]),
        };
        let api_client = ApiClient::new(&config);

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                config,
                api_client,
                auth_provider,
            }),
        })
    }

    fn build_vertex_config(
        vertex_project: Option<String>,
        vertex_location: Option<String>,
    ) -> Result<VertexConfig> {
        let project = vertex_project
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig {
                message: "Project and location required for Vertex AI".into(),
            })?;
        let location = vertex_location
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig {
                message: "Project and location required for Vertex AI".into(),
            })?;
        Ok(VertexConfig { project, location })
    }

    fn build_headers(http_options: &HttpOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &http_options.headers {
            let name =
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidConfig {
                    message: format!("Invalid header name: {key}"),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidConfig {
                message: format!("Invalid header value for {key}"),
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn build_http_client(http_options: &HttpOptions, headers: HeaderMap) -> Result<HttpClient> {
        let mut http_builder = HttpClient::builder();
        if let Some(timeout) = http_options.timeout {
            http_builder = http_builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(proxy_url) = &http_options.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| Error::InvalidConfig {
                message: format!("Invalid proxy: {e}"),
            })?;
            http_builder = http_builder.proxy(proxy);
        }

        if !headers.is_empty() {
            http_builder = http_builder.default_headers(headers);
        }

        Ok(http_builder.build()?)
    }
}

pub(crate) enum AuthProvider {
    Static(HeaderValue),
    ApplicationDefault(OnceCell<Arc<GoogleCredentials>>),
}

impl AuthProvider {
    fn new(credentials: &Credentials) -> Result<Self> {
        match credentials {
            Credentials::AccessToken(token) => {
                let mut header =
                    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                        Error::InvalidConfig {
                            message: "Invalid access token value".into(),
                        }
                    })?;
                header.set_sensitive(true);
                Ok(Self::Static(header))
            }
            Credentials::ApplicationDefault => Ok(Self::ApplicationDefault(OnceCell::new())),
        }
    }

    async fn headers(&self, scopes: &[String]) -> Result<HeaderMap> {
        match self {
            Self::Static(value) => {
                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value.clone());
                Ok(headers)
            }
            Self::ApplicationDefault(cell) => {
                let credentials = cell
                    .get_or_try_init(|| async {
                        AuthBuilder::default()
                            .with_scopes(scopes.iter().map(String::as_str))
                            .build()
                            .map(Arc::new)
                            .map_err(|err| Error::Auth {
                                message: format!("ADC init failed: {err}"),
                            })
                    })
                    .await?;
                let headers = credentials
                    .headers(Extensions::new())
                    .await
                    .map_err(|err| Error::Auth {
                        message: format!("ADC header fetch failed: {err}"),
                    })?;
                match headers {
                    CacheableResource::New { data, .. } => Ok(data),
                    CacheableResource::NotModified => Err(Error::Auth {
                        message: "ADC header fetch returned NotModified without cached headers"
                            .into(),
                    }),
                }
            }
        }
    }
}

impl ClientInner {
    /// 发送请求并自动注入鉴权头。
    ///
    /// # Errors
    /// 当请求构建、鉴权头获取或网络请求失败时返回错误。
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut request = request.build()?;
        let headers = self.auth_provider.headers(&self.config.auth_scopes).await?;
        for (name, value) in &headers {
            if request.headers().contains_key(name) {
                continue;
            }
            let mut value = value.clone();
            if name == AUTHORIZATION {
                value.set_sensitive(true);
            }
            request.headers_mut().insert(name.clone(), value);
        }
        tracing::debug!(method = %request.method(), url = %request.url(), "sending request");
        Ok(self.http.execute(request).await?)
    }
}

pub(crate) struct ApiClient {
    pub base_url: String,
    pub api_version: String,
    pub storage_base_url: String,
}

impl ApiClient {
    fn new(config: &ClientConfig) -> Self {
        let base_url = config.http_options.base_url.as_deref().map_or_else(
            || {
                format!(
                    "https://{}-aiplatform.googleapis.com/",
                    config.vertex_config.location
                )
            },
            normalize_base_url,
        );
        let api_version = config
            .http_options
            .api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_VERTEX_API_VERSION.to_string());
        let storage_base_url = config
            .http_options
            .storage_base_url
            .as_deref()
            .map_or_else(|| DEFAULT_STORAGE_BASE_URL.to_string(), normalize_base_url);

        Self {
            base_url,
            api_version,
            storage_base_url,
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let mut value = base_url.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

/// 进程级、惰性初始化的客户端句柄。
///
/// `init` 可重复调用：只有第一次会真正构建客户端，之后返回同一个实例。
pub struct ClientProvider {
    cell: OnceCell<Client>,
}

static GLOBAL_PROVIDER: ClientProvider = ClientProvider::new();

impl ClientProvider {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// 进程共享的实例。
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_PROVIDER
    }

    /// 按配置初始化客户端（幂等）。
    ///
    /// # Errors
    /// 首次构建客户端失败时返回错误；失败后可再次调用重试。
    pub async fn init(&self, config: &AppConfig) -> Result<Client> {
        let client = self
            .cell
            .get_or_try_init(|| async {
                let client = config.client_builder().build()?;
                tracing::info!(
                    project = %config.project_id,
                    location = %config.location,
                    bucket = %config.bucket,
                    "initialized cloud clients"
                );
                Ok::<_, Error>(client)
            })
            .await?;
        Ok(client.clone())
    }

    /// 已初始化的客户端。
    #[must_use]
    pub fn get(&self) -> Option<Client> {
        self.cell.get().cloned()
    }
}

impl Default for ClientProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_app_config;

    #[test]
    fn test_vertex_client_defaults() {
        let client = Client::new_vertex("my-project", "us-central1").unwrap();
        assert_eq!(
            client.inner.api_client.base_url,
            "https://us-central1-aiplatform.googleapis.com/"
        );
        assert_eq!(client.inner.api_client.api_version, "v1beta1");
        assert_eq!(
            client.inner.api_client.storage_base_url,
            "https://storage.googleapis.com/"
        );
        assert!(matches!(
            client.inner.config.credentials,
            Credentials::ApplicationDefault
        ));
        assert_eq!(
            client.inner.config.auth_scopes,
            vec![CLOUD_PLATFORM_SCOPE.to_string()]
        );
    }

    #[test]
    fn test_base_url_normalization() {
        let client = Client::builder()
            .vertex_project("proj")
            .vertex_location("loc")
            .base_url("https://vertex.example.com")
            .storage_base_url(" https://gcs.example.com ")
            .build()
            .unwrap();
        assert_eq!(client.inner.api_client.base_url, "https://vertex.example.com/");
        assert_eq!(
            client.inner.api_client.storage_base_url,
            "https://gcs.example.com/"
        );
    }

    #[test]
    fn test_project_and_location_required() {
        let err = Client::builder().vertex_location("loc").build().err().unwrap();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        let err = Client::builder()
            .vertex_project("proj")
            .vertex_location("  ")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = Client::builder()
            .vertex_project("proj")
            .vertex_location("loc")
            .header("bad header", "value")
            .build();
        assert!(result.is_err());
        let result = Client::builder()
            .vertex_project("proj")
            .vertex_location("loc")
            .header("x-test", "bad\nvalue")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_access_token_is_rejected() {
        let err = Client::builder()
            .vertex_project("proj")
            .vertex_location("loc")
            .access_token("bad\ntoken")
            .build()
            .err()
            .unwrap();
        assert!(
            matches!(err, Error::InvalidConfig { message } if message.contains("access token"))
        );
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = Client::builder()
            .vertex_project("proj")
            .vertex_location("loc")
            .proxy("not a url")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let rendered = format!("{:?}", Credentials::AccessToken("secret".into()));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn test_static_token_header() {
        let provider = AuthProvider::new(&Credentials::AccessToken("tok".into())).unwrap();
        let headers = provider.headers(&[]).await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
    }

    #[tokio::test]
    async fn test_provider_init_is_idempotent() {
        let provider = ClientProvider::new();
        assert!(provider.get().is_none());

        let config = test_app_config("http://127.0.0.1:9");
        let first = provider.init(&config).await.unwrap();

        let mut other = config.clone();
        other.project_id = "other-project".into();
        let second = provider.init(&other).await.unwrap();

        assert!(Arc::ptr_eq(&first.inner, &second.inner));
        assert_eq!(second.config().vertex_config.project, "proj");
        assert!(provider.get().is_some());
    }

    #[tokio::test]
    async fn test_provider_init_failure_can_be_retried() {
        let provider = ClientProvider::new();
        let mut config = test_app_config("http://127.0.0.1:9");
        config.project_id = String::new();
        assert!(provider.init(&config).await.is_err());
        assert!(provider.get().is_none());

        config.project_id = "proj".into();
        assert!(provider.init(&config).await.is_ok());
    }
}
