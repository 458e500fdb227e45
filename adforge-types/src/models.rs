use std::collections::HashMap;

use crate::base64_serde;
use crate::config::GenerationConfig;
use crate::content::Content;
use crate::enums::{PersonGeneration, SafetyFilterLevel};
use serde::{Deserialize, Serialize};

/// `GenerateContent` 请求配置。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// `GenerateContent` 请求体。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

impl GenerateContentRequest {
    /// 由内容与配置组装请求体。
    #[must_use]
    pub fn new(contents: Vec<Content>, config: GenerateContentConfig) -> Self {
        Self {
            contents,
            system_instruction: config.system_instruction,
            generation_config: config.generation_config,
            labels: config.labels,
        }
    }
}

/// 图像生成配置。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImagesConfig {
    #[serde(rename = "sampleCount", skip_serializing_if = "Option::is_none")]
    pub number_of_images: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i32>,
    #[serde(rename = "safetySetting", skip_serializing_if = "Option::is_none")]
    pub safety_filter_level: Option<SafetyFilterLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_generation: Option<PersonGeneration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_rai_reason: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_watermark: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhance_prompt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_options: Option<ImageOutputOptions>,
}

/// 输出图像编码选项。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImageOutputOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_quality: Option<i32>,
}

/// Imagen `predict` 请求体。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImagesRequest {
    pub instances: Vec<ImagePromptInstance>,
    pub parameters: GenerateImagesConfig,
}

impl GenerateImagesRequest {
    /// 单条 prompt 的请求。
    pub fn new(prompt: impl Into<String>, config: GenerateImagesConfig) -> Self {
        Self {
            instances: vec![ImagePromptInstance {
                prompt: prompt.into(),
            }],
            parameters: config,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePromptInstance {
    pub prompt: String,
}

/// 单张生成结果。被安全策略过滤的条目只有 `rai_filtered_reason`。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    #[serde(
        default,
        rename = "bytesBase64Encoded",
        skip_serializing_if = "Option::is_none",
        with = "base64_serde::option"
    )]
    pub image_bytes: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rai_filtered_reason: Option<String>,
    #[serde(rename = "prompt", skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
}

impl GeneratedImage {
    /// 是否携带非空图像数据。
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image_bytes.as_ref().is_some_and(|bytes| !bytes.is_empty())
    }
}

/// 图像生成响应。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImagesResponse {
    #[serde(rename = "predictions", default)]
    pub generated_images: Vec<GeneratedImage>,
}

impl GenerateImagesResponse {
    /// 第一张带图像数据的结果。
    #[must_use]
    pub fn first_image(&self) -> Option<&GeneratedImage> {
        self.generated_images.iter().find(|image| image.has_image())
    }

    /// 被过滤条目的原因（去重，按出现顺序）。
    #[must_use]
    pub fn rai_filtered_reasons(&self) -> Vec<&str> {
        let mut reasons: Vec<&str> = Vec::new();
        for reason in self
            .generated_images
            .iter()
            .filter_map(|image| image.rai_filtered_reason.as_deref())
        {
            if !reasons.contains(&reason) {
                reasons.push(reason);
            }
        }
        reasons
    }
}
