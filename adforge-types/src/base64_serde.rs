use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

/// 字节以 base64 字符串形式序列化。
pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// 从 base64 字符串反序列化字节。
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

/// `Option<Vec<u8>>` 版本，字段缺失或为 null 时得到 `None`。
pub mod option {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded.as_bytes()))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "crate::base64_serde")]
        data: Vec<u8>,
        #[serde(default, with = "crate::base64_serde::option")]
        extra: Option<Vec<u8>>,
    }

    #[test]
    fn bytes_are_written_as_base64() {
        let value = serde_json::to_value(Wrapper {
            data: b"ad".to_vec(),
            extra: None,
        })
        .unwrap();
        assert_eq!(value["data"], "YWQ=");
        assert!(value["extra"].is_null());
    }

    #[test]
    fn missing_optional_field_is_none() {
        let parsed: Wrapper = serde_json::from_str(r#"{"data":"YWQ="}"#).unwrap();
        assert_eq!(parsed.data, b"ad");
        assert!(parsed.extra.is_none());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = serde_json::from_str::<Wrapper>(r#"{"data":"***"}"#);
        assert!(err.is_err());
    }
}
