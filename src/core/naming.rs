//! 提交 ID 与 Dropbox 路径的命名规则

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\-_]+").expect("无效的正则"));
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("无效的正则"));
static SLASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").expect("无效的正则"));

const NONCE_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SEGMENT_MAX_LEN: usize = 80;

/// 把任意输入压成可用作路径段的 slug
pub fn sanitize_segment(value: &str) -> String {
    let lowered = value.to_lowercase();
    let replaced = NON_SLUG.replace_all(&lowered, "-");
    let collapsed = DASH_RUN.replace_all(&replaced, "-");
    collapsed
        .trim_matches('-')
        .chars()
        .take(SEGMENT_MAX_LEN)
        .collect()
}

/// 文件扩展名（小写）；无扩展名时返回空串
pub fn file_extension(name: &str) -> String {
    let lowered = name.to_lowercase();
    let parts: Vec<&str> = lowered.split('.').collect();
    if parts.len() < 2 {
        return String::new();
    }
    parts[parts.len() - 1].to_string()
}

/// 去掉文件名最后一个扩展名
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}

/// 随机 nonce（0-9a-z）
pub fn nonce(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| NONCE_CHARS[rng.gen_range(0..NONCE_CHARS.len())] as char)
        .collect()
}

/// 提交 ID：`YYYYMMDD-HHMMSS-<slug>-<nonce>`
/// 同一秒内同名的两次提交靠 nonce 区分
pub fn build_submission_id(applicant_name: &str, now: DateTime<Utc>) -> String {
    let slug = sanitize_segment(applicant_name);
    let base = if slug.is_empty() {
        "applicant".to_string()
    } else {
        slug
    };
    format!("{}-{}-{}", now.format("%Y%m%d-%H%M%S"), base, nonce(6))
}

/// 规整 Dropbox 基础路径：单个前导 `/`，无重复或尾部 `/`
pub fn clean_base_path(path: &str) -> String {
    let value = path.trim();
    let with_leading = if value.starts_with('/') {
        value.to_string()
    } else {
        format!("/{}", value)
    };
    let collapsed = SLASH_RUN.replace_all(&with_leading, "/");
    let stripped = collapsed.trim_end_matches('/');
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

/// 目标文件夹：`<base>/<YYYY-MM-DD>/<submission_id>`
pub fn folder_path(base: &str, date: NaiveDate, submission_id: &str) -> String {
    let root = clean_base_path(base);
    let prefix = if root == "/" { String::new() } else { root };
    format!("{}/{}/{}", prefix, date.format("%Y-%m-%d"), submission_id)
}

/// 存储文件名：`<prefix>-<sanitized-stem>.<ext>`
pub fn stored_file_name(prefix: &str, original_name: &str) -> String {
    let ext = file_extension(original_name);
    let stem = sanitize_segment(strip_extension(original_name));
    let safe = if stem.is_empty() {
        "file".to_string()
    } else {
        stem
    };
    format!("{}-{}.{}", prefix, safe, ext)
}
