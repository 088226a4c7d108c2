//! 查询嵌入器
//!
//! 把文本或图片查询映射到同一个文本嵌入空间：
//! - 文本查询直接走文本嵌入模型
//! - 图片查询先经过 **描述桥接**（caption bridge）：用图片描述模型生成
//!   一句自然语言描述，再把描述当作文本嵌入
//!
//! 描述桥接是刻意的近似——它让单一文本嵌入空间同时服务两种模态，
//! 代价是丢失无法用语言表达的视觉细节。桥接保持为显式的具名步骤，
//! 之后可替换为原生多模态嵌入模型而不改变编排器契约。
//!
//! 模型句柄在进程启动时构造一次、只读共享，由调用方依赖注入。

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{RagError, Result};
use crate::types::{Embedding, Query, QueryKind};

/// 文本嵌入模型句柄
///
/// 归一化策略由模型自身定义，必须与索引构建时保持一致——这是核心
/// 只能遵守、无法改变的外部不变量。
#[async_trait]
pub trait TextEmbeddingModel: Send + Sync {
    /// 把文本编码为固定维度向量
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// 模型是否已加载就绪
    fn is_ready(&self) -> bool {
        true
    }
}

/// 图片描述模型句柄
#[async_trait]
pub trait ImageCaptioningModel: Send + Sync {
    /// 为图片生成一句简短的自然语言描述
    async fn caption(&self, image_base64: &str, media_type: &str) -> Result<String>;

    /// 模型是否已加载就绪
    fn is_ready(&self) -> bool {
        true
    }
}

/// 查询嵌入器
pub struct Embedder {
    text_model: Arc<dyn TextEmbeddingModel>,
    caption_model: Arc<dyn ImageCaptioningModel>,
}

impl Embedder {
    /// 创建嵌入器，两个模型句柄均由调用方注入
    pub fn new(
        text_model: Arc<dyn TextEmbeddingModel>,
        caption_model: Arc<dyn ImageCaptioningModel>,
    ) -> Self {
        Self {
            text_model,
            caption_model,
        }
    }

    /// 把查询编码为嵌入向量
    ///
    /// 图片查询的描述文本会被逐字嵌入，不掺入任何额外内容。
    pub async fn embed(&self, query: &Query) -> Result<Embedding> {
        match query.kind()? {
            QueryKind::Text(text) => self.embed_text(text).await,
            QueryKind::Image(bytes) => {
                let caption = self.caption_bridge(bytes).await?;
                self.embed_text(&caption).await
            }
        }
    }

    /// 描述桥接：图片字节 → 一句自然语言描述
    ///
    /// 先用 `image` crate 校验字节确实是可解码的图片（否则 `Decode`），
    /// 再交给描述模型。返回的描述与送入嵌入的文本完全一致。
    pub async fn caption_bridge(&self, bytes: &[u8]) -> Result<String> {
        if !self.caption_model.is_ready() {
            return Err(RagError::ModelUnavailable(
                "图片描述模型未加载".to_string(),
            ));
        }

        image::load_from_memory(bytes)
            .map_err(|e| RagError::Decode(format!("图片字节解码失败: {}", e)))?;

        let media_type = sniff_media_type(bytes);
        let image_base64 = BASE64.encode(bytes);

        let caption = self
            .caption_model
            .caption(&image_base64, media_type)
            .await?;
        log::info!("图片描述生成: '{}'", caption);

        Ok(caption)
    }

    async fn embed_text(&self, text: &str) -> Result<Embedding> {
        if !self.text_model.is_ready() {
            return Err(RagError::ModelUnavailable(
                "文本嵌入模型未加载".to_string(),
            ));
        }
        self.text_model.embed(text).await
    }
}

/// 从图片字节推断 MIME 类型，无法识别时回退 image/png
fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        _ => "image/png",
    }
}
