//! Models API surface (Vertex AI publisher models).

use std::sync::Arc;

use adforge_types::content::Content;
use adforge_types::models::{
    GenerateContentConfig, GenerateContentRequest, GenerateImagesConfig, GenerateImagesRequest,
    GenerateImagesResponse,
};
use adforge_types::response::GenerateContentResponse;

use crate::client::ClientInner;
use crate::error::{ensure_success, read_json, Result};

#[derive(Clone)]
pub struct Models {
    pub(crate) inner: Arc<ClientInner>,
}

impl Models {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 生成内容（默认配置）。
    pub async fn generate_content(
        &self,
        model: impl Into<String>,
        contents: Vec<Content>,
    ) -> Result<GenerateContentResponse> {
        self.generate_content_with_config(model, contents, GenerateContentConfig::default())
            .await
    }

    /// 生成内容（自定义配置）。
    pub async fn generate_content_with_config(
        &self,
        model: impl Into<String>,
        contents: Vec<Content>,
        config: GenerateContentConfig,
    ) -> Result<GenerateContentResponse> {
        let model = model.into();
        let request = GenerateContentRequest::new(contents, config);
        let url = build_model_method_url(&self.inner, &model, "generateContent");

        let request = self.inner.http.post(url).json(&request);
        let response = ensure_success(self.inner.send(request).await?).await?;
        read_json(response).await
    }

    /// 生成图像。
    pub async fn generate_images(
        &self,
        model: impl Into<String>,
        prompt: impl Into<String>,
        config: GenerateImagesConfig,
    ) -> Result<GenerateImagesResponse> {
        let model = model.into();
        let body = GenerateImagesRequest::new(prompt, config);
        let url = build_model_method_url(&self.inner, &model, "predict");

        let request = self.inner.http.post(url).json(&body);
        let response = ensure_success(self.inner.send(request).await?).await?;
        read_json(response).await
    }
}

fn transform_model_name(model: &str) -> String {
    if model.starts_with("projects/") || model.starts_with("publishers/") {
        model.to_string()
    } else {
        format!("publishers/google/models/{model}")
    }
}

fn build_model_method_url(inner: &ClientInner, model: &str, method: &str) -> String {
    let model = transform_model_name(model);
    let base = &inner.api_client.base_url;
    let version = &inner.api_client.api_version;
    if model.starts_with("projects/") {
        return format!("{base}{version}/{model}:{method}");
    }
    let vertex = &inner.config.vertex_config;
    format!(
        "{base}{version}/projects/{}/locations/{}/{model}:{method}",
        vertex.project, vertex.location
    )
}
