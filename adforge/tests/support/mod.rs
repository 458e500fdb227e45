#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use http::Method;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use adforge::{AppConfig, Client, Pipeline};

pub const BUCKET: &str = "ads";
pub const PROMPT_MODEL_PATH: &str =
    "/v1beta1/projects/proj/locations/loc/publishers/google/models/gemini-2.5-flash:generateContent";
pub const IMAGE_MODEL_PATH: &str =
    "/v1beta1/projects/proj/locations/loc/publishers/google/models/imagen-4.0-generate-preview-06-06:predict";

pub const STYLE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x01];
pub const PRODUCT_JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub const RENDERED_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x02, 0x03];

pub fn test_config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::new("proj", BUCKET);
    config.location = "loc".into();
    config.vertex_base_url = Some(base_url.to_string());
    config.storage_base_url = Some(base_url.to_string());
    config.access_token = Some("test-token".into());
    config
}

pub fn build_client(config: &AppConfig) -> Client {
    config.client_builder().build().unwrap()
}

/// 内存中的单 bucket 对象存储，挂在 mock server 上。
#[derive(Clone, Default)]
pub struct FakeBucket {
    objects: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
}

impl FakeBucket {
    pub async fn mount(&self, server: &MockServer) {
        let bucket = self.clone();
        Mock::given(method("POST"))
            .and(path(format!("/upload/storage/v1/b/{BUCKET}/o")))
            .respond_with(move |req: &Request| bucket.put(req))
            .mount(server)
            .await;

        let bucket = self.clone();
        Mock::given(method("GET"))
            .and(path_regex(format!(r"^/storage/v1/b/{BUCKET}/o/.+$")))
            .respond_with(move |req: &Request| bucket.get(req))
            .mount(server)
            .await;
    }

    pub fn insert(&self, key: &str, data: &[u8], content_type: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
    }

    pub fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn put(&self, req: &Request) -> ResponseTemplate {
        let name = req
            .url
            .query_pairs()
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value.into_owned());
        let Some(name) = name else {
            return ResponseTemplate::new(400);
        };
        let content_type = req
            .headers
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        self.insert(&name, &req.body, &content_type);
        ResponseTemplate::new(200).set_body_json(json!({
            "kind": "storage#object",
            "name": name,
            "bucket": BUCKET,
            "size": req.body.len().to_string(),
            "contentType": content_type,
            "generation": "1"
        }))
    }

    fn get(&self, req: &Request) -> ResponseTemplate {
        let key = req
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(percent_decode)
            .unwrap_or_default();
        match self.object(&key) {
            Some((data, _)) => ResponseTemplate::new(200).set_body_bytes(data),
            None => ResponseTemplate::new(404)
                .set_body_json(json!({"error": {"code": 404, "message": "No such object"}})),
        }
    }
}

fn percent_decode(segment: &str) -> String {
    percent_encoding::percent_decode_str(segment)
        .decode_utf8()
        .unwrap()
        .into_owned()
}

pub fn prompt_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "modelVersion": "gemini-2.5-flash"
    })
}

pub fn image_response(bytes: &[u8]) -> Value {
    json!({
        "predictions": [{
            "bytesBase64Encoded": base64::engine::general_purpose::STANDARD.encode(bytes),
            "mimeType": "image/png"
        }]
    })
}

pub async fn mount_prompt_model(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(PROMPT_MODEL_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_image_model(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(IMAGE_MODEL_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

/// 请求体 JSON，按路径过滤。
pub async fn request_bodies(server: &MockServer, request_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.method == Method::POST && req.url.path() == request_path)
        .map(|req| serde_json::from_slice(&req.body).unwrap())
        .collect()
}

/// 一次完整流水线测试所需的环境：mock server、内存 bucket、本地素材。
pub struct Fixture {
    pub server: MockServer,
    pub bucket: FakeBucket,
    pub dir: TempDir,
    pub config: AppConfig,
    pub product_image: PathBuf,
}

impl Fixture {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let bucket = FakeBucket::default();
        bucket.mount(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let style_reference = dir.path().join("Reference_Image.png");
        std::fs::write(&style_reference, STYLE_PNG).unwrap();
        let product_image = dir.path().join("backpack.jpg");
        std::fs::write(&product_image, PRODUCT_JPEG).unwrap();

        let mut config = test_config(&server.uri());
        config.style_reference = style_reference.to_string_lossy().into_owned();

        Self {
            server,
            bucket,
            dir,
            config,
            product_image,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(&build_client(&self.config), &self.config).unwrap()
    }
}
