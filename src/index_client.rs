//! 向量索引客户端
//!
//! 封装对外部向量索引服务的最近邻查询与心跳探测。索引的存储引擎
//! 不在本库范围内——这里只负责 HTTP 查询协议：
//!
//! - `POST {base}/api/v1/collections/{collection}/query`
//!   请求 `{embeddings, n_results, include}`，
//!   响应 `{ids, documents, metadatas, distances}`（外层数组长度 1）
//! - `GET {base}/api/v1/heartbeat` 作为存活探测
//!
//! 零匹配是合法的可表示结果，与"索引不可达"严格区分。

use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::{RagError, Result};
use crate::types::RawNeighborSet;
use crate::util::endpoint_url;

/// 默认索引查询超时
const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(30);

/// 存活探测超时（状态栏展示用，不能跟着查询超时拖住）
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 向量索引连接配置
///
/// 由展示层注入，核心不读取环境变量或配置文件。
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// 索引服务根地址，如 `http://172.31.16.55:8000`
    pub base_url: String,
    /// 集合名
    pub collection: String,
    /// 索引配置的向量维度；查询向量维度必须与之一致
    pub dimension: usize,
    /// 请求超时
    pub timeout: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            collection: "knowledge_base".to_string(),
            // all-MiniLM-L6-v2 输出维度
            dimension: 384,
            timeout: DEFAULT_INDEX_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    embeddings: Vec<&'a [f32]>,
    n_results: usize,
    include: [&'static str; 3],
}

/// 向量索引客户端
pub struct VectorIndexClient {
    dimension: usize,
    query_url: Url,
    heartbeat_url: Url,
    client: reqwest::Client,
    probe_client: reqwest::Client,
}

impl VectorIndexClient {
    /// 创建索引客户端
    pub fn new(config: IndexConfig) -> Result<Self> {
        let query_url = endpoint_url(
            &config.base_url,
            &format!("api/v1/collections/{}/query", config.collection),
        )?;
        let heartbeat_url = endpoint_url(&config.base_url, "api/v1/heartbeat")?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                RagError::IndexUnavailable(format!("创建 HTTP 客户端失败: {}", e))
            })?;
        let probe_client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| {
                RagError::IndexUnavailable(format!("创建 HTTP 客户端失败: {}", e))
            })?;

        log::info!(
            "向量索引客户端初始化: collection={}, dimension={}",
            config.collection,
            config.dimension
        );

        Ok(Self {
            dimension: config.dimension,
            query_url,
            heartbeat_url,
            client,
            probe_client,
        })
    }

    /// 用预计算的查询向量做最近邻查询
    ///
    /// 索引可以返回少于 `k` 条（包括零条）匹配，这不是错误。
    pub async fn query(&self, embedding: &[f32], k: usize) -> Result<RawNeighborSet> {
        if k == 0 {
            return Err(RagError::Input(
                "n_results 必须为正整数".to_string(),
            ));
        }
        if embedding.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let body = QueryRequest {
            embeddings: vec![embedding],
            n_results: k,
            include: ["metadatas", "documents", "distances"],
        };

        let response = self
            .client
            .post(self.query_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RagError::IndexUnavailable(format!("向量索引请求失败: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 字符边界安全截断，错误页可能是多字节文本
            let preview: String = body.chars().take(200).collect();
            return Err(RagError::IndexUnavailable(format!(
                "向量索引返回 {}: {}",
                status, preview
            )));
        }

        let raw: RawNeighborSet = response.json().await.map_err(|e| {
            RagError::IndexUnavailable(format!("向量索引响应解析失败: {}", e))
        })?;

        log::debug!(
            "索引查询完成: 请求 {} 条，召回 {} 条",
            k,
            raw.ids.first().map_or(0, |ids| ids.len())
        );

        Ok(raw)
    }

    /// 心跳探测，供展示层显示服务状态
    ///
    /// 任何失败都返回 false，从不报错；不在编排路径上。
    pub async fn test_connection(&self) -> bool {
        match self.probe_client.get(self.heartbeat_url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("索引心跳失败: {}", e);
                false
            }
        }
    }
}
