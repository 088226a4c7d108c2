//! 检索结果归一化边界
//!
//! 向量索引返回的原始结构字段可缺失、嵌套比需要的深一层；本模块把它
//! 一次性压平成 [`CanonicalRecord`] 序列，下游只见规范形状。

use serde_json::Map;

use crate::types::{CanonicalRecord, RawNeighborSet, IMAGE_METADATA_KEY};

/// 把原始邻居集合归一化为有序的规范记录序列
///
/// - 空集或缺少主 id 数组时返回空序列，"无结果"不是错误
/// - 输出顺序与索引返回顺序一致（假定最佳匹配在前），不重排
/// - 纯函数：不做 I/O，不修改输入
pub fn normalize(raw: &RawNeighborSet) -> Vec<CanonicalRecord> {
    let ids = match raw.ids.first() {
        Some(ids) if !ids.is_empty() => ids,
        _ => return Vec::new(),
    };

    let documents = raw.documents.first();
    let metadatas = raw.metadatas.first();
    let distances = raw.distances.first();

    let records: Vec<CanonicalRecord> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let document = documents
                .and_then(|docs| docs.get(i))
                .and_then(|doc| doc.clone())
                .unwrap_or_default();

            let metadata = metadatas
                .and_then(|metas| metas.get(i))
                .and_then(|meta| meta.clone())
                .unwrap_or_else(Map::new);

            let distance = distances
                .and_then(|dists| dists.get(i))
                .copied()
                .unwrap_or(0.0);

            let image = metadata
                .get(IMAGE_METADATA_KEY)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let has_image = image.is_some();

            CanonicalRecord {
                id: id.clone(),
                document,
                distance,
                metadata,
                image,
                has_image,
            }
        })
        .collect();

    log::debug!("归一化索引结果: {} 条记录", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta_with_image(b64: &str) -> Map<String, serde_json::Value> {
        let mut meta = Map::new();
        meta.insert("source".to_string(), json!("kb"));
        meta.insert(IMAGE_METADATA_KEY.to_string(), json!(b64));
        meta
    }

    #[test]
    fn test_normalize_empty_input() {
        assert!(normalize(&RawNeighborSet::default()).is_empty());

        // 外层有数组但内层为空，同样视为无结果
        let raw = RawNeighborSet {
            ids: vec![vec![]],
            ..Default::default()
        };
        assert!(normalize(&raw).is_empty());
    }

    #[test]
    fn test_normalize_preserves_order_and_length() {
        let raw = RawNeighborSet {
            ids: vec![vec!["a".into(), "b".into(), "c".into()]],
            documents: vec![vec![
                Some("doc a".into()),
                Some("doc b".into()),
                Some("doc c".into()),
            ]],
            metadatas: vec![vec![None, None, None]],
            distances: vec![vec![0.1, 0.2, 0.3]],
        };

        let records = normalize(&raw);
        assert_eq!(records.len(), 3);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(records[1].document, "doc b");
        assert!((records[2].distance - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_defaults_for_ragged_arrays() {
        // documents/distances 比 ids 短，metadatas 整体缺失
        let raw = RawNeighborSet {
            ids: vec![vec!["a".into(), "b".into()]],
            documents: vec![vec![Some("only first".into())]],
            distances: vec![vec![0.25]],
            ..Default::default()
        };

        let records = normalize(&raw);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].document, "only first");
        assert_eq!(records[1].document, "");
        assert!((records[1].distance - 0.0).abs() < 1e-6);
        assert!(records[1].metadata.is_empty());
        assert!(!records[1].has_image);
    }

    #[test]
    fn test_normalize_extracts_embedded_image() {
        let raw = RawNeighborSet {
            ids: vec![vec!["with".into(), "without".into()]],
            documents: vec![vec![Some("x".into()), Some("y".into())]],
            metadatas: vec![vec![Some(meta_with_image("aGVsbG8=")), None]],
            distances: vec![vec![0.1, 0.4]],
        };

        let records = normalize(&raw);
        assert_eq!(records[0].image.as_deref(), Some("aGVsbG8="));
        assert!(records[0].has_image);
        assert!(records[1].image.is_none());
        assert!(!records[1].has_image);

        // has_image 与 image 始终一致
        for r in &records {
            assert_eq!(r.has_image, r.image.is_some());
        }
    }

    #[test]
    fn test_normalize_ignores_non_string_image_field() {
        let mut meta = Map::new();
        meta.insert(IMAGE_METADATA_KEY.to_string(), json!(42));

        let raw = RawNeighborSet {
            ids: vec![vec!["n1".into()]],
            metadatas: vec![vec![Some(meta)]],
            ..Default::default()
        };

        let records = normalize(&raw);
        assert!(records[0].image.is_none());
        assert!(!records[0].has_image);
    }
}
