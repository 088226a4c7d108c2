//! 内部工具函数

use url::Url;

use crate::error::{RagError, Result};

/// 在服务基地址上拼接相对路径
///
/// 基地址末尾是否带 `/` 不影响结果；`path` 不以 `/` 开头。
pub(crate) fn endpoint_url(base: &str, path: &str) -> Result<Url> {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RagError::Input("服务端点不能为空".to_string()));
    }

    let base_url = Url::parse(&format!("{}/", trimmed))
        .map_err(|e| RagError::Input(format!("无效的服务端点 '{}': {}", base, e)))?;
    base_url
        .join(path)
        .map_err(|e| RagError::Input(format!("无效的服务路径 '{}': {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_endpoint_url_trailing_slash_agnostic() {
        let a = endpoint_url("http://127.0.0.1:8000", "api/v1/heartbeat").unwrap();
        let b = endpoint_url("http://127.0.0.1:8000/", "api/v1/heartbeat").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "http://127.0.0.1:8000/api/v1/heartbeat");
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let url = endpoint_url("http://host:9000/chroma", "api/v1/heartbeat").unwrap();
        assert_eq!(url.as_str(), "http://host:9000/chroma/api/v1/heartbeat");
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert_matches!(endpoint_url("", "x"), Err(RagError::Input(_)));
        assert_matches!(endpoint_url("not a url", "x"), Err(RagError::Input(_)));
    }
}
