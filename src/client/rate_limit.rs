//! 本地提交限频器
//! 与页面版本同构:键 -> 时间戳列表,窗口外的条目被丢弃
//! 纯劝阻性质 — 删掉记录文件即可绕过,不是安全控制

use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct SubmitTracker {
    entries: DashMap<String, Vec<i64>>,
    path: PathBuf,
}

impl SubmitTracker {
    /// 从 JSON 文件加载;文件缺失或损坏时从空表开始
    pub fn open(path: PathBuf) -> Self {
        let entries = DashMap::new();
        if let Ok(content) = std::fs::read_to_string(&path) {
            if let Ok(map) = serde_json::from_str::<HashMap<String, Vec<i64>>>(&content) {
                for (key, events) in map {
                    entries.insert(key, events);
                }
            }
        }
        Self { entries, path }
    }

    /// 窗口内的提交次数是否已达上限;顺带裁剪过期条目并持久化
    pub fn is_limited(&self, key: &str, limit: usize, window_ms: i64) -> bool {
        let now = chrono::Utc::now().timestamp_millis();
        let count = {
            let mut events = self.entries.entry(key.to_string()).or_default();
            events.retain(|time| now - *time < window_ms);
            events.len()
        };
        self.persist();
        count >= limit
    }

    /// 记录一次成功提交
    pub fn record(&self, key: &str) {
        let now = chrono::Utc::now().timestamp_millis();
        self.entries.entry(key.to_string()).or_default().push(now);
        self.persist();
    }

    fn persist(&self) {
        let map: HashMap<String, Vec<i64>> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        match serde_json::to_string(&map) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&self.path, content) {
                    tracing::warn!("限频记录写入失败: {}", e);
                }
            }
            Err(e) => tracing::warn!("限频记录序列化失败: {}", e),
        }
    }
}
