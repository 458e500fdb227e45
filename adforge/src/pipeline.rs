//! Pipeline orchestration: validate → upload → synthesize prompt → render image.

use std::fmt;
use std::path::Path;

use crate::client::Client;
use crate::config::AppConfig;
use crate::error::Result;
use crate::prompt::PromptSynthesizer;
use crate::render::{ImageRenderer, RenderedImage};
use crate::storage::{guess_mime_type, Locator, Storage};

const ATTRIBUTE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// 一次生成所需的全部输入，构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub style_reference: Locator,
    pub product_image: Locator,
    pub attributes: Locator,
    pub style_reference_mime: String,
    pub product_image_mime: String,
}

impl GenerationRequest {
    pub fn new(
        style_reference: Locator,
        style_reference_mime: impl Into<String>,
        product_image: Locator,
        product_image_mime: impl Into<String>,
        attributes: Locator,
    ) -> Self {
        Self {
            style_reference,
            product_image,
            attributes,
            style_reference_mime: style_reference_mime.into(),
            product_image_mime: product_image_mime.into(),
        }
    }
}

/// 流水线阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesizing,
    Rendering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synthesizing => f.write_str("synthesizing"),
            Self::Rendering => f.write_str("rendering"),
        }
    }
}

/// 流水线失败。每个变体只携带一条诊断信息。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Transfer failed: {message}")]
    Transfer { message: String },

    #[error("Prompt synthesis failed: {message}")]
    PromptSynthesis { message: String },

    #[error("No image produced: {message}")]
    NoImageProduced { message: String },

    #[error("Image rendering failed: {message}")]
    Render { message: String },
}

impl PipelineError {
    /// 失败发生的阶段；输入校验与上传发生在阶段开始之前。
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::InvalidInput { .. } | Self::Transfer { .. } => None,
            Self::PromptSynthesis { .. } => Some(Stage::Synthesizing),
            Self::NoImageProduced { .. } | Self::Render { .. } => Some(Stage::Rendering),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput { message }
            | Self::Transfer { message }
            | Self::PromptSynthesis { message }
            | Self::NoImageProduced { message }
            | Self::Render { message } => message,
        }
    }

    fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// 成功时为渲染结果句柄，失败时为 [`PipelineError`]。
pub type GenerationResult = std::result::Result<RenderedImage, PipelineError>;

/// 广告图生成流水线。
#[derive(Clone)]
pub struct Pipeline {
    storage: Storage,
    synthesizer: PromptSynthesizer,
    renderer: ImageRenderer,
    style_reference: Locator,
    style_reference_mime: String,
    upload_prefix: String,
}

impl Pipeline {
    /// 基于共享客户端与配置构建流水线。
    ///
    /// # Errors
    /// 风格参考图 locator 无法解析时返回错误。
    pub fn new(client: &Client, config: &AppConfig) -> Result<Self> {
        let storage = client.storage(&config.bucket);
        let models = client.models();
        Ok(Self {
            synthesizer: PromptSynthesizer::new(
                models.clone(),
                storage.clone(),
                &config.prompt_model,
            ),
            renderer: ImageRenderer::new(models, &config.image_model),
            storage,
            style_reference: config.style_reference_locator()?,
            style_reference_mime: config.style_reference_mime(),
            upload_prefix: config.upload_prefix.clone(),
        })
    }

    /// 运行两个阶段；任一阶段失败即终止，已上传的对象保持原样。
    pub async fn run(&self, request: &GenerationRequest) -> GenerationResult {
        tracing::info!(stage = %Stage::Synthesizing, "pipeline stage started");
        let prompt = self.synthesizer.synthesize(request).await?;

        tracing::info!(stage = %Stage::Rendering, "pipeline stage started");
        let image = self.renderer.render(&prompt).await?;

        tracing::info!(path = %image.path().display(), "pipeline succeeded");
        Ok(image)
    }

    /// 生成广告图；失败时记录诊断信息并返回 `None`。
    pub async fn generate(
        &self,
        product_image: impl AsRef<Path>,
        attribute_text: &str,
    ) -> Option<RenderedImage> {
        match self.generate_detailed(product_image, attribute_text).await {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::error!(stage = ?err.stage(), error = %err, "ad generation failed");
                None
            }
        }
    }

    /// 与 [`Pipeline::generate`] 流程相同，但把错误交还给调用方。
    pub async fn generate_detailed(
        &self,
        product_image: impl AsRef<Path>,
        attribute_text: &str,
    ) -> GenerationResult {
        let product_image = product_image.as_ref();
        validate_inputs(product_image, attribute_text)?;

        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(%request_id, "starting ad generation");
        let request = self
            .stage_inputs(&request_id, product_image, attribute_text)
            .await
            .map_err(|err| PipelineError::Transfer {
                message: err.to_string(),
            })?;
        self.run(&request).await
    }

    async fn stage_inputs(
        &self,
        request_id: &str,
        product_image: &Path,
        attribute_text: &str,
    ) -> Result<GenerationRequest> {
        let file_name = product_image
            .file_name()
            .map_or_else(|| "product".into(), |name| name.to_string_lossy());
        let product_key =
            Storage::upload_key(&self.upload_prefix, "product_image", request_id, &file_name);
        let product_locator = self.storage.upload(product_image, &product_key).await?;

        let text_key =
            Storage::upload_key(&self.upload_prefix, "text", request_id, "attributes.txt");
        let text_locator = self
            .storage
            .upload_bytes(
                attribute_text.trim().as_bytes().to_vec(),
                &text_key,
                ATTRIBUTE_CONTENT_TYPE,
            )
            .await?;

        Ok(GenerationRequest::new(
            self.style_reference.clone(),
            &self.style_reference_mime,
            product_locator,
            guess_mime_type(product_image),
            text_locator,
        ))
    }
}

fn validate_inputs(
    product_image: &Path,
    attribute_text: &str,
) -> std::result::Result<(), PipelineError> {
    if product_image.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(PipelineError::invalid_input("a product image is required"));
    }
    if !product_image.is_file() {
        return Err(PipelineError::invalid_input(format!(
            "product image {} does not exist",
            product_image.display()
        )));
    }
    if attribute_text.trim().is_empty() {
        return Err(PipelineError::invalid_input(
            "a text description of the product is required",
        ));
    }
    Ok(())
}
