use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use simo_chat::config::ChatConfig;
use simo_chat::transport::http::HttpChatTransport;

/// Build a `data:` stream body carrying one content fragment per item,
/// terminated with `[DONE]`.
#[allow(dead_code)]
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let payload = serde_json::json!({ "choices": [{ "delta": { "content": fragment } }] });
        body.push_str(&format!("data: {}\n\n", payload));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Chat configuration pointing at a mock server
#[allow(dead_code)]
pub fn chat_config(endpoint: &str, api_key: Option<&str>) -> ChatConfig {
    ChatConfig {
        endpoint: endpoint.to_string(),
        api_key: api_key.map(str::to_string),
        idle_timeout_seconds: 5,
        connect_timeout_seconds: 5,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn make_transport(endpoint: &str, api_key: Option<&str>) -> HttpChatTransport {
    HttpChatTransport::new(&chat_config(endpoint, api_key)).expect("valid transport config")
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
