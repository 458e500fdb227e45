use serde::{Deserialize, Serialize};

/// Cloud Storage 对象元数据（JSON API `objects` 资源）。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// JSON API 以十进制字符串返回大小。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,
}

impl StorageObject {
    /// 对象大小（字节）。
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|size| size.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_resource() {
        let object: StorageObject = serde_json::from_value(json!({
            "kind": "storage#object",
            "name": "uploads/text/1_attributes.txt",
            "bucket": "ads",
            "size": "3",
            "contentType": "text/plain; charset=utf-8",
            "generation": "1700000000000000"
        }))
        .unwrap();
        assert_eq!(object.size_bytes(), Some(3));
        assert_eq!(object.bucket.as_deref(), Some("ads"));
        assert_eq!(
            object.content_type.as_deref(),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn malformed_size_is_ignored() {
        let object = StorageObject {
            size: Some("n/a".into()),
            ..Default::default()
        };
        assert_eq!(object.size_bytes(), None);
    }
}
