//! Image rendering: synthesized prompt → one generated image on local disk.

use std::path::{Path, PathBuf};

use adforge_types::models::{GenerateImagesConfig, GenerateImagesResponse};
use tempfile::TempDir;

use crate::error::Result;
use crate::models::Models;
use crate::pipeline::PipelineError;

const NO_IMAGE_GUIDANCE: &str = "The image model did not return any images. This is often \
caused by safety filters blocking the generated prompt; try modifying the product attributes.";

/// 渲染结果的作用域句柄：drop 时删除临时目录，`keep` 后由调用方负责清理。
#[derive(Debug)]
pub struct RenderedImage {
    dir: TempDir,
    path: PathBuf,
    mime_type: String,
    bytes_len: u64,
}

impl RenderedImage {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub const fn bytes_len(&self) -> u64 {
        self.bytes_len
    }

    /// 复制到 `destination`（父目录需已存在），临时文件仍随句柄释放。
    ///
    /// # Errors
    /// 复制失败时返回 IO 错误。
    pub fn persist_to(&self, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let destination = destination.as_ref().to_path_buf();
        std::fs::copy(&self.path, &destination)?;
        Ok(destination)
    }

    /// 放弃自动清理，返回文件路径。
    #[must_use]
    pub fn keep(self) -> PathBuf {
        let Self { dir, path, .. } = self;
        // 目录路径即 `path` 的父目录，无需另存。
        drop(dir.keep());
        path
    }
}

/// 第二阶段：调用文生图模型并落盘。
#[derive(Clone)]
pub struct ImageRenderer {
    models: Models,
    model: String,
}

impl ImageRenderer {
    pub fn new(models: Models, model: impl Into<String>) -> Self {
        Self {
            models,
            model: model.into(),
        }
    }

    /// 请求一张图像。模型正常返回但没有图像时为
    /// [`PipelineError::NoImageProduced`]，其余失败为 [`PipelineError::Render`]。
    pub async fn render(&self, prompt: &str) -> std::result::Result<RenderedImage, PipelineError> {
        let config = GenerateImagesConfig {
            number_of_images: Some(1),
            include_rai_reason: Some(true),
            ..Default::default()
        };

        tracing::info!(model = %self.model, "requesting image generation");
        let response = self
            .models
            .generate_images(&self.model, prompt, config)
            .await
            .map_err(|err| PipelineError::Render {
                message: err.to_string(),
            })?;

        save_first_image(&response)?.ok_or_else(|| {
            let message = no_image_message(&response);
            tracing::warn!(%message, "image model returned no images");
            PipelineError::NoImageProduced { message }
        })
    }
}

fn no_image_message(response: &GenerateImagesResponse) -> String {
    let reasons = response.rai_filtered_reasons();
    if reasons.is_empty() {
        NO_IMAGE_GUIDANCE.to_string()
    } else {
        format!("{NO_IMAGE_GUIDANCE} Filter reason: {}", reasons.join("; "))
    }
}

fn save_first_image(
    response: &GenerateImagesResponse,
) -> std::result::Result<Option<RenderedImage>, PipelineError> {
    let Some(image) = response.first_image() else {
        return Ok(None);
    };
    let Some(bytes) = image.image_bytes.as_deref() else {
        return Ok(None);
    };
    let mime_type = image
        .mime_type
        .clone()
        .unwrap_or_else(|| "image/png".to_string());

    write_temp_image(bytes, &mime_type)
        .map(Some)
        .map_err(|err| PipelineError::Render {
            message: format!("failed to save generated image: {err}"),
        })
}

fn write_temp_image(bytes: &[u8], mime_type: &str) -> Result<RenderedImage> {
    let dir = tempfile::Builder::new().prefix("adforge-").tempdir()?;
    let file_name = format!(
        "generated_ad_{}.{}",
        uuid::Uuid::new_v4(),
        extension_from_mime(mime_type)
    );
    let path = dir.path().join(file_name);
    std::fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved generated image");

    Ok(RenderedImage {
        dir,
        path,
        mime_type: mime_type.to_string(),
        bytes_len: bytes.len() as u64,
    })
}

fn extension_from_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
