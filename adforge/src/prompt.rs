//! Prompt synthesis: style reference + product photo + attributes → image prompt.

use adforge_types::config::GenerationConfig;
use adforge_types::content::{Content, Part, Role};
use adforge_types::models::GenerateContentConfig;
use adforge_types::response::GenerateContentResponse;

use crate::error::{Error, Result};
use crate::models::Models;
use crate::pipeline::{GenerationRequest, PipelineError};
use crate::storage::Storage;

/// 固定的低温度，偏向字面、稳定的输出。
pub const PROMPT_TEMPERATURE: f32 = 0.2;

const SYSTEM_FRAMING: &str = "You are an expert creative director for product advertising. \
Your job is to produce precise, effective visual concepts for ad campaigns.";

const STYLE_CONTEXT: &str = "The first image is a style reference: a product silhouette \
filled with a word cloud. The second image is the user's product; use only its outline.";

const AD_BRIEF: &str = "Create an advertisement showing the smoothed silhouette of the product, \
filled with a word cloud built from its key attributes. Make the brand name prominent. Keep the \
word cloud legible and uncrowded, color-code the attribute categories, and show nothing but the \
product silhouette.";

const CLOSING_DIRECTIVE: &str = "Using the reference style, the silhouette of the product image \
and the attributes above, write one detailed prompt for a text-to-image model that describes \
every visual element of the word cloud inside the product silhouette. Reply with the prompt only.";

/// 组装发送给多模态模型的完整指令。
#[must_use]
pub fn build_instruction(attributes: &str) -> String {
    format!(
        "{SYSTEM_FRAMING}\n\
         Reference image context: {STYLE_CONTEXT}\n\
         Product attributes: {attributes}\n\
         Advertisement brief: {AD_BRIEF}\n\
         {CLOSING_DIRECTIVE}"
    )
}

/// 第一阶段：由多模态模型生成图像 prompt。
#[derive(Clone)]
pub struct PromptSynthesizer {
    models: Models,
    storage: Storage,
    model: String,
}

impl PromptSynthesizer {
    pub fn new(models: Models, storage: Storage, model: impl Into<String>) -> Self {
        Self {
            models,
            storage,
            model: model.into(),
        }
    }

    /// 生成 prompt。任何下载、解码或模型调用失败都归为
    /// [`PipelineError::PromptSynthesis`]，不重试。
    pub async fn synthesize(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, PipelineError> {
        self.try_synthesize(request)
            .await
            .map_err(|err| PipelineError::PromptSynthesis {
                message: err.to_string(),
            })
    }

    async fn try_synthesize(&self, request: &GenerationRequest) -> Result<String> {
        let style_image = self.storage.download(&request.style_reference).await?;
        let product_image = self.storage.download(&request.product_image).await?;
        let attributes = String::from_utf8(self.storage.download(&request.attributes).await?)
            .map_err(|err| Error::Parse {
                message: format!("attribute text at {} is not UTF-8: {err}", request.attributes),
            })?;

        let contents = vec![Content::from_parts(
            vec![
                Part::inline_data(style_image, &request.style_reference_mime),
                Part::inline_data(product_image, &request.product_image_mime),
                Part::text(build_instruction(&attributes)),
            ],
            Role::User,
        )];
        let config = GenerateContentConfig {
            generation_config: Some(GenerationConfig {
                temperature: Some(PROMPT_TEMPERATURE),
                ..Default::default()
            }),
            ..Default::default()
        };

        tracing::info!(model = %self.model, "requesting prompt synthesis");
        let response = self
            .models
            .generate_content_with_config(&self.model, contents, config)
            .await?;
        let prompt = extract_prompt(&response)?;
        tracing::info!(chars = prompt.chars().count(), prompt = %prompt, "synthesized image prompt");
        Ok(prompt)
    }
}

fn extract_prompt(response: &GenerateContentResponse) -> Result<String> {
    if let Some(text) = response.text().filter(|text| !text.trim().is_empty()) {
        return Ok(text);
    }

    let mut message = String::from("model returned no prompt text");
    if let Some(reason) = response.block_reason() {
        message.push_str(&format!("; prompt blocked: {reason:?}"));
    }
    if let Some(detail) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason_message.as_deref())
    {
        message.push_str(&format!(" ({detail})"));
    }
    if let Some(reason) = response.finish_reason() {
        message.push_str(&format!("; finish reason: {reason:?}"));
    }
    tracing::warn!(%message, "empty prompt synthesis response");
    Err(Error::Parse { message })
}
