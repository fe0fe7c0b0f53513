//! 中继服务配置
//! 全部来自环境变量，进程启动时读取一次

pub const DEFAULT_MAX_FILE_MB: usize = 10;
pub const DEFAULT_BASE_PATH: &str = "/EMDP-Lab-Applications";
pub const DEFAULT_NOTIFY_FROM: &str = "EMDP Lab <onboarding@resend.dev>";

/// Dropbox 凭据：静态 token 或 refresh token 三元组
#[derive(Debug, Clone, Default)]
pub struct DropboxCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
}

/// 邮件通知配置（Resend）
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub resend_api_key: Option<String>,
    pub notify_to: Option<String>,
    pub notify_from: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            notify_to: None,
            notify_from: DEFAULT_NOTIFY_FROM.to_string(),
        }
    }
}

/// 中继服务配置
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// 允许的来源列表；为空时放行所有来源
    pub allowed_origins: Vec<String>,
    pub max_file_bytes: usize,
    pub dropbox_base_path: String,
    pub dropbox: DropboxCredentials,
    pub notify: NotifyConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_MB * 1024 * 1024,
            dropbox_base_path: DEFAULT_BASE_PATH.to_string(),
            dropbox: DropboxCredentials::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl RelayConfig {
    /// 从环境变量读取配置
    pub fn from_env() -> Self {
        let allowed_origins = env_trimmed("ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let max_file_mb = env_trimmed("MAX_FILE_MB")
            .and_then(|value| match value.parse::<usize>() {
                Ok(mb) if mb > 0 => Some(mb),
                _ => {
                    tracing::warn!("MAX_FILE_MB 无效: {},使用默认值 {}", value, DEFAULT_MAX_FILE_MB);
                    None
                }
            })
            .unwrap_or(DEFAULT_MAX_FILE_MB);

        let dropbox = DropboxCredentials {
            access_token: env_trimmed("DROPBOX_ACCESS_TOKEN"),
            refresh_token: env_trimmed("DROPBOX_REFRESH_TOKEN"),
            app_key: env_trimmed("DROPBOX_APP_KEY"),
            app_secret: env_trimmed("DROPBOX_APP_SECRET"),
        };

        let notify = NotifyConfig {
            resend_api_key: env_trimmed("RESEND_API_KEY"),
            notify_to: env_trimmed("NOTIFY_TO"),
            notify_from: env_trimmed("NOTIFY_FROM")
                .unwrap_or_else(|| DEFAULT_NOTIFY_FROM.to_string()),
        };

        Self {
            allowed_origins,
            max_file_bytes: max_file_mb * 1024 * 1024,
            dropbox_base_path: env_trimmed("DROPBOX_BASE_PATH")
                .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
            dropbox,
            notify,
        }
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
