//! 检索-生成编排器
//!
//! 核心对外的唯一入口，把一次调用串成固定流水线：
//!
//! 1. **Embedding**: 查询向量化（图片先过描述桥接）
//! 2. **Retrieving**: 向量索引最近邻查询
//! 3. **Normalizing**: 原始结果归一化为规范记录
//! 4. **Generating**: 拼接提示词并请求生成服务
//!
//! 任一阶段失败即以对应的错误变体终止，不做部分重试；调用之间
//! 不保留任何状态。归一化记录总是随回答一并返回，供展示层渲染
//! 上下文图片与相关度，即使生成只消费文档文本。

use std::sync::Arc;

use crate::embedder::Embedder;
use crate::error::Result;
use crate::generation_client::{GenerationClient, DEFAULT_MAX_TOKENS, IMAGE_ANALYSIS_PROMPT};
use crate::index_client::VectorIndexClient;
use crate::normalizer::normalize;
use crate::types::{CanonicalRecord, Query, QueryKind};

/// 默认召回数量
pub const DEFAULT_MAX_RESULTS: usize = 11;

/// 单次调用的流水线阶段，仅作日志上下文；Done/Failed 随调用结束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Embedding,
    Retrieving,
    Normalizing,
    Generating,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::Normalizing => "normalizing",
            Stage::Generating => "generating",
        }
    }
}

/// 检索-生成编排器
///
/// 所有依赖在进程启动时构造一次、只读注入；`Arc` 共享，调用间
/// 无共享可变状态，可安全跨任务复用。
pub struct Orchestrator {
    embedder: Arc<Embedder>,
    index: Arc<VectorIndexClient>,
    generation: Arc<GenerationClient>,
    max_results: usize,
    max_tokens: u32,
}

impl Orchestrator {
    /// 创建编排器
    pub fn new(
        embedder: Arc<Embedder>,
        index: Arc<VectorIndexClient>,
        generation: Arc<GenerationClient>,
    ) -> Self {
        Self {
            embedder,
            index,
            generation,
            max_results: DEFAULT_MAX_RESULTS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// 设置默认召回数量
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// 设置生成 token 上限
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// 回答一次查询
    ///
    /// `k` 为 `None` 时使用默认召回数量。返回 (回答, 规范记录序列)；
    /// 零匹配仍然成功，上下文块为空。
    pub async fn answer(
        &self,
        query: &Query,
        k: Option<usize>,
    ) -> Result<(String, Vec<CanonicalRecord>)> {
        let k = k.unwrap_or(self.max_results);
        // 入口校验：恰好一种查询模式被激活
        let kind = query.kind()?;

        let mut stage = Stage::Embedding;
        log::info!("开始检索-生成流水线 (k={})", k);

        log::debug!("  Step 1 [{}]: 查询向量化", stage.as_str());
        let embedding = self.embedder.embed(query).await.map_err(|e| {
            log::warn!("流水线在 {} 阶段失败: {}", stage.as_str(), e);
            e
        })?;

        stage = Stage::Retrieving;
        log::debug!(
            "  Step 2 [{}]: 索引查询 (dim={})",
            stage.as_str(),
            embedding.len()
        );
        let raw = self.index.query(&embedding, k).await.map_err(|e| {
            log::warn!("流水线在 {} 阶段失败: {}", stage.as_str(), e);
            e
        })?;

        stage = Stage::Normalizing;
        log::debug!("  Step 3 [{}]: 结果归一化", stage.as_str());
        let records = normalize(&raw);
        if records.is_empty() {
            log::info!("  索引零匹配，继续以空上下文生成");
        }

        stage = Stage::Generating;
        log::debug!(
            "  Step 4 [{}]: 生成回答 ({} 条上下文)",
            stage.as_str(),
            records.len()
        );
        // 图片查询用固定分析指令；描述文本只用于嵌入，不进提示词
        let user_prompt = match kind {
            QueryKind::Text(text) => text,
            QueryKind::Image(_) => IMAGE_ANALYSIS_PROMPT,
        };
        let answer = self
            .generation
            .ask(user_prompt, &records, self.max_tokens)
            .await
            .map_err(|e| {
                log::warn!("流水线在 {} 阶段失败: {}", stage.as_str(), e);
                e
            })?;

        log::info!("流水线完成: {} 条记录, 回答 {} 字符", records.len(), answer.len());
        Ok((answer, records))
    }

    /// 向量索引是否在线（展示层状态栏用）
    pub async fn index_is_up(&self) -> bool {
        self.index.test_connection().await
    }

    /// 生成服务是否在线（展示层状态栏用）
    pub async fn generation_is_up(&self) -> bool {
        self.generation.test_connection().await
    }
}
