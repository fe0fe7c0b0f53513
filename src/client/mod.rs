//! 浏览器表单控制器的命令行对应实现
//! 提交前校验、本地限频、按端点选择上传策略

pub mod form;
pub mod interest;
pub mod rate_limit;
pub mod submit;

pub use form::{FormDraft, FormSession};
pub use rate_limit::SubmitTracker;
pub use submit::{ApplyClient, SubmitOutcome, SubmitStrategy};

/// 本地限频的固定键
pub const APPLY_RATE_KEY: &str = "emdp_apply_submit";
pub const INTEREST_RATE_KEY: &str = "emdp_interest_submit";

/// 24 小时窗口内最多 3 次提交
pub const RATE_LIMIT: usize = 3;
pub const RATE_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// 客户端数据目录 (~/.emdp_apply)
pub fn default_data_dir() -> Result<std::path::PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "无法获取用户主目录".to_string())?;
    let dir = home.join(".emdp_apply");
    std::fs::create_dir_all(&dir).map_err(|e| format!("创建数据目录失败: {}", e))?;
    Ok(dir)
}
