use std::time::Duration;

use crate::core::models::RelayConfig;
use crate::relay::dropbox::{DropboxStore, DropboxTokenSource};
use crate::relay::notify::AnyNotifier;

/// Web 应用状态
/// 只读配置加上游客户端,请求之间没有共享可变状态
pub struct AppState {
    pub config: RelayConfig,
    pub token_source: DropboxTokenSource,
    pub store: DropboxStore,
    pub notifier: AnyNotifier,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("创建 HTTP 客户端失败: {}", e))?;

        Ok(Self {
            token_source: DropboxTokenSource::new(client.clone(), config.dropbox.clone()),
            store: DropboxStore::new(client.clone()),
            notifier: AnyNotifier::from_config(client, &config.notify),
            config,
        })
    }
}
