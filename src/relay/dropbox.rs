//! Dropbox 后端
//! 令牌获取与对象写入，全部走公开 HTTP API

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{ObjectStore, TokenSource};
use crate::core::error::RelayError;
use crate::core::models::DropboxCredentials;

const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";
const CREATE_FOLDER_URL: &str = "https://api.dropboxapi.com/2/files/create_folder_v2";
const UPLOAD_URL: &str = "https://content.dropboxapi.com/2/files/upload";
const CREATE_SHARED_LINK_URL: &str =
    "https://api.dropboxapi.com/2/sharing/create_shared_link_with_settings";
const LIST_SHARED_LINKS_URL: &str = "https://api.dropboxapi.com/2/sharing/list_shared_links";

/// Token 响应
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// 优先使用静态配置的 access token,否则用 refresh token 换取
pub struct DropboxTokenSource {
    client: reqwest::Client,
    credentials: DropboxCredentials,
}

impl DropboxTokenSource {
    pub fn new(client: reqwest::Client, credentials: DropboxCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

impl TokenSource for DropboxTokenSource {
    async fn access_token(&self) -> Result<String, RelayError> {
        if let Some(token) = &self.credentials.access_token {
            return Ok(token.clone());
        }

        let (refresh, key, secret) = match (
            &self.credentials.refresh_token,
            &self.credentials.app_key,
            &self.credentials.app_secret,
        ) {
            (Some(refresh), Some(key), Some(secret)) => (refresh, key, secret),
            _ => {
                return Err(RelayError::upstream_auth(
                    "Dropbox credentials are not configured",
                ))
            }
        };

        let basic = BASE64.encode(format!("{}:{}", key, secret));
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
        ];

        tracing::debug!("正在刷新 Dropbox access token...");

        let response = self
            .client
            .post(TOKEN_URL)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                RelayError::upstream_auth(format!("Dropbox token refresh failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let details = safe_read_text(response).await;
            return Err(RelayError::upstream_auth(format!(
                "Dropbox token refresh failed ({}): {}",
                status, details
            )));
        }

        let data: TokenResponse = response.json().await.map_err(|e| {
            RelayError::upstream_auth(format!("Dropbox token response parse failed: {}", e))
        })?;

        data.access_token.ok_or_else(|| {
            RelayError::upstream_auth("Dropbox token refresh did not return access token")
        })
    }
}

/// Dropbox 文件写入
pub struct DropboxStore {
    client: reqwest::Client,
}

impl DropboxStore {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for DropboxStore {
    async fn ensure_folder(&self, token: &str, path: &str) -> Result<(), RelayError> {
        let response = self
            .client
            .post(CREATE_FOLDER_URL)
            .bearer_auth(token)
            .json(&serde_json::json!({ "path": path, "autorename": false }))
            .send()
            .await
            .map_err(|e| RelayError::upstream(format!("Dropbox folder setup failed: {}", e)))?;

        let status = response.status();
        if folder_status_ok(status) {
            return Ok(());
        }

        let details = safe_read_text(response).await;
        Err(RelayError::upstream(format!(
            "Dropbox folder setup failed ({}): {}",
            status, details
        )))
    }

    async fn put_object(
        &self,
        token: &str,
        path: &str,
        content: Bytes,
    ) -> Result<String, RelayError> {
        // autorename 交给 Dropbox,重名永远不会让请求失败
        let api_arg = serde_json::json!({
            "path": path,
            "mode": "add",
            "autorename": true,
            "mute": true,
            "strict_conflict": false,
        });

        let response = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(token)
            .header("Dropbox-API-Arg", api_arg.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await
            .map_err(|e| RelayError::upstream(format!("Dropbox upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let details = safe_read_text(response).await;
            return Err(RelayError::upstream(format!(
                "Dropbox upload failed ({}): {}",
                status, details
            )));
        }

        let meta: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RelayError::upstream(format!("Dropbox upload parse failed: {}", e)))?;

        Ok(stored_path(&meta, path))
    }

    async fn folder_link(&self, token: &str, path: &str) -> Result<String, RelayError> {
        let response = self
            .client
            .post(CREATE_SHARED_LINK_URL)
            .bearer_auth(token)
            .json(&serde_json::json!({ "path": path }))
            .send()
            .await
            .map_err(|e| RelayError::upstream(format!("Dropbox shared link failed: {}", e)))?;

        if response.status().is_success() {
            let data: serde_json::Value = response.json().await.map_err(|e| {
                RelayError::upstream(format!("Dropbox shared link parse failed: {}", e))
            })?;
            return Ok(link_url(&data));
        }

        if response.status() != StatusCode::CONFLICT {
            let status = response.status();
            let details = safe_read_text(response).await;
            return Err(RelayError::upstream(format!(
                "Dropbox shared link failed ({}): {}",
                status, details
            )));
        }

        // 链接已存在,改为查询现有链接
        let response = self
            .client
            .post(LIST_SHARED_LINKS_URL)
            .bearer_auth(token)
            .json(&serde_json::json!({ "path": path, "direct_only": true }))
            .send()
            .await
            .map_err(|e| RelayError::upstream(format!("Dropbox link lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Ok(String::new());
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RelayError::upstream(format!("Dropbox link lookup parse failed: {}", e)))?;

        Ok(data
            .get("links")
            .and_then(|links| links.as_array())
            .and_then(|links| links.first())
            .map(link_url)
            .unwrap_or_default())
    }
}

/// 409 conflict 意味着文件夹已存在,对幂等的创建来说就是成功
fn folder_status_ok(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::CONFLICT
}

fn stored_path(meta: &serde_json::Value, fallback: &str) -> String {
    meta.get("path_display")
        .and_then(|v| v.as_str())
        .or_else(|| meta.get("path_lower").and_then(|v| v.as_str()))
        .unwrap_or(fallback)
        .to_string()
}

fn link_url(data: &serde_json::Value) -> String {
    data.get("url")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

async fn safe_read_text(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(text) => text.chars().take(400).collect(),
        Err(_) => String::new(),
    }
}
