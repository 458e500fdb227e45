use crate::client::{Client, ClientInner};
use crate::config::AppConfig;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let backup: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| ((*key).to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    f();
    for (key, value) in backup {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

/// 指向本地假服务的配置（固定 token，不触发 ADC）。
pub fn test_app_config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::new("proj", "ads");
    config.location = "loc".into();
    config.vertex_base_url = Some(base_url.to_string());
    config.storage_base_url = Some(base_url.to_string());
    config.access_token = Some("test-token".into());
    config
}

pub fn test_client(base_url: &str) -> Client {
    test_app_config(base_url)
        .client_builder()
        .build()
        .unwrap()
}

pub fn test_client_inner(base_url: &str) -> ClientInner {
    take_inner(test_client(base_url))
}

pub fn test_client_inner_with_base(base_url: &str, api_version: &str) -> ClientInner {
    take_inner(
        test_app_config(base_url)
            .client_builder()
            .api_version(api_version)
            .build()
            .unwrap(),
    )
}

fn take_inner(client: Client) -> ClientInner {
    match std::sync::Arc::try_unwrap(client.inner) {
        Ok(inner) => inner,
        Err(_) => unreachable!("freshly built client has a single owner"),
    }
}
