//! HTTP 模型提供方
//!
//! [`TextEmbeddingModel`] 与 [`ImageCaptioningModel`] 的 OpenAI 兼容
//! HTTP 实现。模型推理由外部服务承载，本模块只做请求构造、状态码
//! 处理和响应解析；句柄在进程启动时构造一次，之后只读共享。
//!
//! 注意：这两个实现挂在 trait 接缝上——换成进程内推理或原生多模态
//! 嵌入模型时，嵌入器与编排器都无需改动。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::embedder::{ImageCaptioningModel, TextEmbeddingModel};
use crate::error::{RagError, Result};
use crate::types::Embedding;
use crate::util::endpoint_url;

/// 模型服务调用默认超时
const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// 图片描述指令（描述桥接要求一句简短描述，对齐 BLIP 约 50 token 的上限）
const CAPTION_PROMPT: &str = "Describe this image in one short sentence.";

/// 描述生成的 token 上限
const CAPTION_MAX_TOKENS: u32 = 64;

// ============================================================================
// 文本嵌入
// ============================================================================

/// OpenAI 兼容 `/embeddings` 端点的文本嵌入模型
pub struct HttpTextEmbeddingModel {
    embeddings_url: Url,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Embedding,
}

impl HttpTextEmbeddingModel {
    /// 创建嵌入模型句柄
    ///
    /// `base_url` 指向 OpenAI 兼容 API 根（如 `https://host/v1`），
    /// `model` 为模型名，`api_key` 可选。
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let embeddings_url = endpoint_url(base_url, "embeddings")?;
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_MODEL_TIMEOUT)
            .build()
            .map_err(|e| {
                RagError::ModelUnavailable(format!("创建 HTTP 客户端失败: {}", e))
            })?;

        Ok(Self {
            embeddings_url,
            model: model.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl TextEmbeddingModel for HttpTextEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let body = json!({
            "model": self.model,
            "input": [text],
        });

        let mut rb = self.client.post(self.embeddings_url.clone()).json(&body);
        if let Some(ref key) = self.api_key {
            rb = rb.bearer_auth(key);
        }

        let response = rb.send().await.map_err(|e| {
            RagError::ModelUnavailable(format!("嵌入模型请求失败: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 字符边界安全截断，错误页可能是多字节文本
            let preview: String = body.chars().take(200).collect();
            return Err(RagError::ModelUnavailable(format!(
                "嵌入模型返回 {}: {}",
                status, preview
            )));
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            RagError::ModelUnavailable(format!("嵌入模型响应解析失败: {}", e))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| {
                RagError::ModelUnavailable("嵌入模型返回空结果".to_string())
            })
    }

    fn is_ready(&self) -> bool {
        !self.model.is_empty()
    }
}

// ============================================================================
// 图片描述
// ============================================================================

/// OpenAI 兼容 `/chat/completions` 端点的图片描述模型
///
/// 消息体使用 `image_url` data URL 内容块承载图片，与视觉模型的
/// 标准多模态消息格式一致。
pub struct HttpCaptioningModel {
    chat_url: Url,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

impl HttpCaptioningModel {
    /// 创建描述模型句柄
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let chat_url = endpoint_url(base_url, "chat/completions")?;
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_MODEL_TIMEOUT)
            .build()
            .map_err(|e| {
                RagError::ModelUnavailable(format!("创建 HTTP 客户端失败: {}", e))
            })?;

        Ok(Self {
            chat_url,
            model: model.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl ImageCaptioningModel for HttpCaptioningModel {
    async fn caption(&self, image_base64: &str, media_type: &str) -> Result<String> {
        let data_url = format!("data:{};base64,{}", media_type, image_base64);
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": { "url": data_url } },
                    { "type": "text", "text": CAPTION_PROMPT }
                ]
            }],
            "temperature": 0.1,
            "max_tokens": CAPTION_MAX_TOKENS,
            "stream": false,
        });

        let mut rb = self.client.post(self.chat_url.clone()).json(&body);
        if let Some(ref key) = self.api_key {
            rb = rb.bearer_auth(key);
        }

        let response = rb.send().await.map_err(|e| {
            RagError::ModelUnavailable(format!("描述模型请求失败: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 字符边界安全截断，错误页可能是多字节文本
            let preview: String = body.chars().take(200).collect();
            return Err(RagError::ModelUnavailable(format!(
                "描述模型返回 {}: {}",
                status, preview
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            RagError::ModelUnavailable(format!("描述模型响应解析失败: {}", e))
        })?;

        let caption = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                RagError::ModelUnavailable("描述模型返回空结果".to_string())
            })?;

        Ok(caption)
    }

    fn is_ready(&self) -> bool {
        !self.model.is_empty()
    }
}
