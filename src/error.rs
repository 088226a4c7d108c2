//! RAG 流水线统一错误类型
//!
//! 每个组件以各自的错误变体快速失败；编排器不重试、不把一种失败
//! 降级成另一种。错误可序列化，展示层直接原样呈现。

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

/// RAG 核心错误分类
#[derive(Debug, Clone, Error, Serialize)]
pub enum RagError {
    /// 无效输入（查询既无文本也无图片，或两者同时提供）
    #[error("Invalid input: {0}")]
    Input(String),

    /// 嵌入/描述模型未就绪或调用失败
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// 查询向量维度与索引配置维度不一致
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 向量索引服务不可达、返回非成功状态或响应不可解析
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// 生成服务不可达、返回非 200 或传输失败（含超时）
    #[error("Generation failed: {0}")]
    Generation(String),

    /// 图片字节或内嵌 base64 图片无法解码
    #[error("Decode error: {0}")]
    Decode(String),
}

impl RagError {
    /// 稳定的错误类别标签，供展示层做状态提示
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Input(_) => "input",
            RagError::ModelUnavailable(_) => "model_unavailable",
            RagError::DimensionMismatch { .. } => "dimension_mismatch",
            RagError::IndexUnavailable(_) => "index_unavailable",
            RagError::Generation(_) => "generation",
            RagError::Decode(_) => "decode",
        }
    }
}
