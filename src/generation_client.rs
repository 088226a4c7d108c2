//! 提示词组装与生成服务客户端
//!
//! 把归一化记录的文档文本拼成上下文块，套上研究助手指令模板，
//! 以单次同步请求-响应发给外部生成服务：
//!
//! - `POST {endpoint}/generate` 请求 `{prompt, max_tokens}`，
//!   200 时响应 `{response}`；其余状态一律是错误
//! - `GET {endpoint}/docs` 作为存活探测（FastAPI 文档页）
//!
//! 生成请求可能耗时数十秒，默认超时留足 120 秒；契约内不重试、
//! 不流式。

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::error::{RagError, Result};
use crate::types::CanonicalRecord;
use crate::util::endpoint_url;

/// 生成请求默认超时（模型推理本身就慢，超时按分钟级留）
const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// 存活探测超时
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 生成的默认 token 上限
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// 图片查询使用的固定分析指令（代替用户原文）
pub const IMAGE_ANALYSIS_PROMPT: &str =
    "Based on the retrieved context, describe what information is related to the image I have uploaded.";

/// 成功响应缺少 `response` 字段时的占位回答
const MISSING_ANSWER_PLACEHOLDER: &str = "The model did not return a valid response.";

/// 指令序言：先凭通识作答，再用上下文校验补充
const PROMPT_PREAMBLE: &str = "You are an expert research assistant. Your goal is to provide a comprehensive and accurate answer to the user's question. Follow these steps:\n\
1. First, formulate a concise answer based on your general knowledge.\n\
2. Second, carefully review the provided context to verify, correct, and enrich your initial answer.\n";

/// 回答起始提示
const ANSWER_CUE: &str = "Assistant's Final Answer:";

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// 生成服务客户端
pub struct GenerationClient {
    generate_url: Url,
    docs_url: Url,
    client: reqwest::Client,
    probe_client: reqwest::Client,
}

impl GenerationClient {
    /// 创建客户端，端点由展示层注入
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_GENERATION_TIMEOUT)
    }

    /// 创建客户端并指定生成请求超时
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let generate_url = endpoint_url(endpoint, "generate")?;
        let docs_url = endpoint_url(endpoint, "docs")?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Generation(format!("创建 HTTP 客户端失败: {}", e)))?;
        let probe_client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| RagError::Generation(format!("创建 HTTP 客户端失败: {}", e)))?;

        info!("生成服务客户端初始化: endpoint={}", endpoint);

        Ok(Self {
            generate_url,
            docs_url,
            client,
            probe_client,
        })
    }

    /// 基于上下文记录请求一次回答
    ///
    /// `user_prompt` 对文本查询是用户原文，对图片查询是
    /// [`IMAGE_ANALYSIS_PROMPT`]。上下文为空时仍正常发起生成，
    /// 上下文块为空串而非报错。
    pub async fn ask(
        &self,
        user_prompt: &str,
        context: &[CanonicalRecord],
        max_tokens: u32,
    ) -> Result<String> {
        let full_prompt = build_prompt(user_prompt, context);
        let payload = json!({
            "prompt": full_prompt,
            "max_tokens": max_tokens,
        });

        info!("发送生成请求: {}", self.generate_url);

        let response = self
            .client
            .post(self.generate_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("生成服务请求失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 字符边界安全截断，错误页可能是多字节文本
            let preview: String = body.chars().take(200).collect();
            return Err(RagError::Generation(format!(
                "生成服务返回 {}: {}",
                status, preview
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            RagError::Generation(format!("生成服务响应解析失败: {}", e))
        })?;

        // 仅在成功响应缺字段时才用占位文本，绝不吞掉失败
        Ok(parsed.response.unwrap_or_else(|| {
            warn!("生成服务 200 响应缺少 response 字段，返回占位回答");
            MISSING_ANSWER_PLACEHOLDER.to_string()
        }))
    }

    /// 存活探测：API 文档路径返回 200 即视为在线
    ///
    /// 任何失败都返回 false，从不报错。
    pub async fn test_connection(&self) -> bool {
        match self.probe_client.get(self.docs_url.clone()).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }
}

/// 拼接上下文块：跳过空文档，保序，用空行分隔
pub fn build_context_block(context: &[CanonicalRecord]) -> String {
    context
        .iter()
        .map(|record| record.document.as_str())
        .filter(|doc| !doc.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 组装完整提示词：序言 + 上下文块 + 用户问题 + 回答提示
pub fn build_prompt(user_prompt: &str, context: &[CanonicalRecord]) -> String {
    let context_block = build_context_block(context);
    format!(
        "{}\n\n--- Context from Knowledge Base ---\n{}\n\n--- User's Question ---\n{}\n\n{}",
        PROMPT_PREAMBLE, context_block, user_prompt, ANSWER_CUE
    )
}
