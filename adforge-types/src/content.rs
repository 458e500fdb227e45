use crate::base64_serde;
use serde::{Deserialize, Serialize};

/// 对话内容。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// 角色：user/model。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// 消息内容片段。
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// 创建用户文本消息。
    pub fn user(text: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::text(text)], Role::User)
    }

    /// 从 parts 构建内容。
    #[must_use]
    pub const fn from_parts(parts: Vec<Part>, role: Role) -> Self {
        Self {
            role: Some(role),
            parts,
        }
    }

    /// 拼接全部文本片段（跳过思考内容）。
    #[must_use]
    pub fn joined_text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter(|part| part.thought != Some(true))
            .filter_map(Part::text_value)
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

/// 内容角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// 内容部分。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(flatten)]
    pub kind: PartKind,
    /// 是否为思考内容。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    /// 思考签名（base64）。
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_serde::option"
    )]
    pub thought_signature: Option<Vec<u8>>,
}

impl Part {
    /// 创建文本 Part。
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: PartKind::Text { text: text.into() },
            thought: None,
            thought_signature: None,
        }
    }

    /// 创建内联二进制数据 Part。
    pub fn inline_data(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            kind: PartKind::InlineData {
                inline_data: Blob {
                    mime_type: mime_type.into(),
                    data,
                },
            },
            thought: None,
            thought_signature: None,
        }
    }

    /// 获取文本内容（仅当为 Text Part）。
    #[must_use]
    pub const fn text_value(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Text { text } => Some(text.as_str()),
            PartKind::InlineData { .. } | PartKind::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartKind {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    /// 未建模的 part（如函数调用、仅含签名的 part），原样保留。
    Other(serde_json::Map<String, serde_json::Value>),
}

/// 内联二进制数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    #[serde(with = "base64_serde")]
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inline_data_part_uses_wire_names() {
        let content = Content::from_parts(
            vec![Part::inline_data(vec![0xff, 0xd8], "image/jpeg"), Part::text("hi")],
            Role::User,
        );
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "parts": [
                    {"inlineData": {"mimeType": "image/jpeg", "data": "/9g="}},
                    {"text": "hi"}
                ]
            })
        );
    }

    #[test]
    fn joined_text_skips_thoughts_and_media() {
        let value = json!({
            "role": "model",
            "parts": [
                {"text": "thinking...", "thought": true},
                {"text": "A word cloud "},
                {"inlineData": {"mimeType": "image/png", "data": "AA=="}},
                {"text": "shaped like a backpack."}
            ]
        });
        let content: Content = serde_json::from_value(value).unwrap();
        assert_eq!(
            content.joined_text().as_deref(),
            Some("A word cloud shaped like a backpack.")
        );
    }

    #[test]
    fn unmodeled_parts_do_not_break_parsing() {
        let value = json!({
            "role": "model",
            "parts": [
                {"thoughtSignature": "c2ln"},
                {"functionCall": {"name": "lookup", "args": {}}},
                {"text": "A bold silhouette.", "thoughtSignature": "AQI="}
            ]
        });
        let content: Content = serde_json::from_value(value).unwrap();
        assert_eq!(content.parts.len(), 3);
        assert_eq!(content.parts[0].thought_signature.as_deref(), Some(&b"sig"[..]));
        assert!(matches!(&content.parts[0].kind, PartKind::Other(map) if map.is_empty()));
        assert!(
            matches!(&content.parts[1].kind, PartKind::Other(map) if map.contains_key("functionCall"))
        );
        assert_eq!(content.parts[2].thought_signature.as_deref(), Some(&[1u8, 2][..]));
        assert_eq!(content.joined_text().as_deref(), Some("A bold silhouette."));
    }

    #[test]
    fn user_content_is_a_single_text_part() {
        let value = serde_json::to_value(Content::user("hello")).unwrap();
        assert_eq!(value, json!({"role": "user", "parts": [{"text": "hello"}]}));
    }

    #[test]
    fn joined_text_is_none_without_text_parts() {
        let content = Content::from_parts(vec![Part::inline_data(vec![1], "image/png")], Role::Model);
        assert!(content.joined_text().is_none());
    }
}
