//! 多模态 RAG 核心类型定义
//!
//! 本模块定义了检索流水线的核心数据类型，包括：
//! - Query: 统一的查询输入表示（文本 / 图片二选一）
//! - RawNeighborSet: 向量索引原始返回结构
//! - CanonicalRecord: 归一化后的检索结果记录
//!
//! 所有类型的生命周期仅覆盖一次编排调用，核心不做任何持久化。

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RagError, Result};

/// 嵌入向量，维度 `D` 由嵌入模型决定
pub type Embedding = Vec<f32>;

/// 结果元数据中内嵌图片所在的字段名
pub const IMAGE_METADATA_KEY: &str = "image_base64";

// ============================================================================
// 查询输入
// ============================================================================

/// 查询输入
///
/// 每次调用必须且只能激活一种模式：
/// 1. 纯文本: 仅包含 text
/// 2. 纯图片: 仅包含 image（原始图片字节，由展示层解码上传文件得到）
///
/// 字段私有，通过 [`Query::text`] / [`Query::image`] 构造时恒为合法；
/// [`Query::new`] 供展示层传入两个可选参数时做 XOR 校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// 文本内容（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// 图片原始字节（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<Vec<u8>>,
}

/// 查询的只读视图，供各组件按模式分派
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind<'a> {
    Text(&'a str),
    Image(&'a [u8]),
}

impl Query {
    /// 创建纯文本查询
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    /// 创建纯图片查询
    pub fn image(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            text: None,
            image: Some(bytes.into()),
        }
    }

    /// 从两个可选参数构造，校验恰好一种模式被激活
    pub fn new(text: Option<String>, image: Option<Vec<u8>>) -> Result<Self> {
        match (&text, &image) {
            (Some(_), Some(_)) => Err(RagError::Input(
                "查询不能同时包含文本和图片".to_string(),
            )),
            (None, None) => Err(RagError::Input(
                "必须提供文本或图片之一".to_string(),
            )),
            _ => Ok(Self { text, image }),
        }
    }

    /// 获取查询视图；不合法的组合返回 `Input` 错误
    ///
    /// 通过构造函数创建的 Query 恒为合法，这里的校验是编排器入口的
    /// 最后一道防线（例如展示层反序列化出的请求）。
    pub fn kind(&self) -> Result<QueryKind<'_>> {
        match (&self.text, &self.image) {
            (Some(text), None) => Ok(QueryKind::Text(text)),
            (None, Some(bytes)) => Ok(QueryKind::Image(bytes)),
            (Some(_), Some(_)) => Err(RagError::Input(
                "查询不能同时包含文本和图片".to_string(),
            )),
            (None, None) => Err(RagError::Input(
                "必须提供文本或图片之一".to_string(),
            )),
        }
    }

    /// 判断是否为纯文本查询
    pub fn is_text_only(&self) -> bool {
        self.text.is_some() && self.image.is_none()
    }

    /// 判断是否包含图片
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

// ============================================================================
// 向量索引原始结果
// ============================================================================

/// 向量索引的原始返回结构
///
/// 外层数组对应查询向量个数，单向量查询时长度恒为 1。
/// 四个并行数组非空时长度一致；任意字段可能整体缺失（反序列化为
/// 空数组）或单元素缺失（`None`），均在归一化边界处补默认值。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNeighborSet {
    #[serde(default)]
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    pub metadatas: Vec<Vec<Option<Map<String, Value>>>>,
    #[serde(default)]
    pub distances: Vec<Vec<f32>>,
}

impl RawNeighborSet {
    /// 是否没有任何匹配（合法结果，不是错误）
    pub fn is_empty(&self) -> bool {
        self.ids.first().map_or(true, |ids| ids.is_empty())
    }
}

// ============================================================================
// 归一化记录
// ============================================================================

/// 归一化后的检索结果记录
///
/// 由 [`crate::normalizer::normalize`] 统一产出，下游组件只依赖
/// 这个形状，不再各自推导"是否带图"等逻辑。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    /// 文档文本，缺失时为空字符串
    pub document: String,
    /// 不相似度分值，索引返回顺序即相关性排序
    pub distance: f32,
    /// 原始元数据映射
    pub metadata: Map<String, Value>,
    /// 元数据中内嵌的 base64 图片负载（可含 data: 前缀）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// 恒等于 `image.is_some()`
    pub has_image: bool,
}

impl CanonicalRecord {
    /// 展示用相关度: `1 - distance`
    ///
    /// 仅当索引配置的距离度量归一化到 [0,1] 时有意义；这是索引侧的
    /// 外部契约，核心不校验也不截断（距离未归一化时百分比会越界）。
    pub fn relevance(&self) -> f32 {
        1.0 - self.distance
    }
}

// ============================================================================
// 内嵌图片解码
// ============================================================================

/// 解码记录中内嵌的 base64 图片负载
///
/// 支持裸 base64 与 `data:image/png;base64,...` 两种形式，
/// 返回原始图片字节。
pub fn decode_image_base64(payload: &str) -> Result<Vec<u8>> {
    let payload = if payload.starts_with("data:image") {
        payload
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| {
                RagError::Decode("data URL 缺少 base64 负载部分".to_string())
            })?
    } else {
        payload
    };

    BASE64
        .decode(payload.trim())
        .map_err(|e| RagError::Decode(format!("base64 图片解码失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_query_new_requires_exactly_one_variant() {
        assert_matches!(Query::new(None, None), Err(RagError::Input(_)));
        assert_matches!(
            Query::new(Some("hi".into()), Some(vec![1, 2, 3])),
            Err(RagError::Input(_))
        );
        assert!(Query::new(Some("hi".into()), None).is_ok());
        assert!(Query::new(None, Some(vec![1, 2, 3])).is_ok());
    }

    #[test]
    fn test_query_kind_views() {
        let q = Query::text("什么是碳足迹？");
        assert_matches!(q.kind(), Ok(QueryKind::Text("什么是碳足迹？")));
        assert!(q.is_text_only());

        let q = Query::image(vec![0xFF, 0xD8]);
        assert_matches!(q.kind(), Ok(QueryKind::Image(&[0xFF, 0xD8])));
        assert!(q.has_image());
    }

    #[test]
    fn test_raw_neighbor_set_empty_detection() {
        assert!(RawNeighborSet::default().is_empty());

        let with_empty_inner = RawNeighborSet {
            ids: vec![vec![]],
            ..Default::default()
        };
        assert!(with_empty_inner.is_empty());

        let non_empty = RawNeighborSet {
            ids: vec![vec!["doc_1".into()]],
            ..Default::default()
        };
        assert!(!non_empty.is_empty());
    }

    #[test]
    fn test_raw_neighbor_set_tolerates_missing_arrays() {
        // documents/metadatas/distances 缺失时反序列化为空数组
        let raw: RawNeighborSet =
            serde_json::from_str(r#"{"ids": [["a", "b"]]}"#).unwrap();
        assert_eq!(raw.ids[0].len(), 2);
        assert!(raw.documents.is_empty());
        assert!(raw.metadatas.is_empty());
        assert!(raw.distances.is_empty());
    }

    #[test]
    fn test_relevance_scenario_distances() {
        // 距离 0.1 / 0.4 对应展示相关度 90% / 60%
        let mut record = CanonicalRecord {
            id: "r1".into(),
            document: String::new(),
            distance: 0.1,
            metadata: Map::new(),
            image: None,
            has_image: false,
        };
        assert!((record.relevance() - 0.9).abs() < 1e-6);

        record.distance = 0.4;
        assert!((record.relevance() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_decode_image_base64_round_trip() {
        let original: Vec<u8> = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        let encoded = BASE64.encode(&original);

        let decoded = decode_image_base64(&encoded).unwrap();
        assert_eq!(decoded, original);

        // data URL 前缀形式同样应该字节级还原
        let data_url = format!("data:image/png;base64,{}", encoded);
        let decoded = decode_image_base64(&data_url).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_image_base64_invalid_payload() {
        assert_matches!(
            decode_image_base64("not valid base64!!!"),
            Err(RagError::Decode(_))
        );
        assert_matches!(
            decode_image_base64("data:image/png;base64"),
            Err(RagError::Decode(_))
        );
    }
}
