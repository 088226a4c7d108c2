//! Multimodal Assistant — 多模态知识库 RAG 核心
//!
//! 用户提出文本问题或上传图片，得到一条基于预建多模态知识库的
//! 自然语言回答。本库覆盖检索增强生成的核心数据流：
//!
//! 1. 文本/图片查询映射到同一个嵌入空间（图片走描述桥接）
//! 2. 外部向量索引最近邻查询
//! 3. 异构原始结果归一化为规范记录
//! 4. 提示词组装与生成服务调用
//!
//! 展示层（仪表盘、上传控件、状态栏）是外部协作方：它负责把配置
//! 注入各客户端构造函数并渲染输出，本库自身不读环境变量、不做
//! 持久化、不提供 CLI。
//!
//! ## 最小用法
//!
//! ```no_run
//! use std::sync::Arc;
//! use multimodal_assistant_lib::{
//!     Embedder, GenerationClient, IndexConfig, Orchestrator, Query, VectorIndexClient,
//! };
//! use multimodal_assistant_lib::model_providers::{HttpCaptioningModel, HttpTextEmbeddingModel};
//!
//! # async fn run() -> multimodal_assistant_lib::Result<()> {
//! let embedder = Arc::new(Embedder::new(
//!     Arc::new(HttpTextEmbeddingModel::new("http://models:9000/v1", "all-minilm-l6-v2", None)?),
//!     Arc::new(HttpCaptioningModel::new("http://models:9000/v1", "blip-caption", None)?),
//! ));
//! let index = Arc::new(VectorIndexClient::new(IndexConfig::default())?);
//! let generation = Arc::new(GenerationClient::new("http://llm:8080")?);
//!
//! let orchestrator = Orchestrator::new(embedder, index, generation);
//! let (answer, records) = orchestrator
//!     .answer(&Query::text("What is a carbon footprint?"), None)
//!     .await?;
//! # let _ = (answer, records);
//! # Ok(())
//! # }
//! ```

pub mod embedder;
pub mod error;
pub mod generation_client;
pub mod index_client;
pub mod model_providers;
pub mod normalizer;
pub mod orchestrator;
pub mod types;

mod util;

pub use embedder::{Embedder, ImageCaptioningModel, TextEmbeddingModel};
pub use error::{RagError, Result};
pub use generation_client::{GenerationClient, DEFAULT_MAX_TOKENS, IMAGE_ANALYSIS_PROMPT};
pub use index_client::{IndexConfig, VectorIndexClient};
pub use normalizer::normalize;
pub use orchestrator::{Orchestrator, DEFAULT_MAX_RESULTS};
pub use types::{
    decode_image_base64, CanonicalRecord, Embedding, Query, QueryKind, RawNeighborSet,
    IMAGE_METADATA_KEY,
};
