//! 上传编排器
//! 按端点配置选择提交策略,一个页面/会话同时只有一种策略生效

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::models::{ApplyPayload, ApplyResponse, FilePart};
use crate::core::naming;

static APPS_SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)script\.google\.com/macros/s/.+/exec").expect("无效的正则"));

/// 页面模板里未替换的占位端点
const PLACEHOLDER_MARKERS: &[&str] = &[
    "REPLACE-WITH-YOUR-UPLOAD-BACKEND",
    "REPLACE-WITH-YOUR-WEB-APP-ID",
];

const NOT_CONFIGURED: &str = "Upload endpoint is not configured yet. Please contact lab admin.";

/// 提交策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStrategy {
    /// 原生 multipart 提交到自建中继,有真实的成功确认
    Multipart { endpoint: String },
    /// base64-JSON 投递到脚本端点
    /// at-most-once、无确认 — 只知道请求发出去了,不知道写入是否成功
    ScriptRelay { endpoint: String },
}

impl SubmitStrategy {
    /// 依据端点字符串选择策略;占位符或非 http(s) 端点视为未配置
    pub fn detect(endpoint: &str) -> Result<Self, String> {
        let endpoint = endpoint.trim();
        let lower = endpoint.to_lowercase();
        let configured = (lower.starts_with("http://") || lower.starts_with("https://"))
            && !PLACEHOLDER_MARKERS
                .iter()
                .any(|marker| endpoint.contains(marker));
        if !configured {
            return Err(NOT_CONFIGURED.to_string());
        }

        if APPS_SCRIPT_RE.is_match(endpoint) {
            Ok(Self::ScriptRelay {
                endpoint: endpoint.to_string(),
            })
        } else {
            Ok(Self::Multipart {
                endpoint: endpoint.to_string(),
            })
        }
    }

    /// 策略允许的单文件大小上限 (MB);脚本端点因 base64 膨胀限制更紧
    pub fn max_file_mb(&self) -> usize {
        match self {
            Self::ScriptRelay { .. } => 7,
            Self::Multipart { .. } => 10,
        }
    }
}

/// 提交结果
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// 中继确认写入完成
    Accepted(ApplyResponse),
    /// 已投递但无法确认(脚本端点的 fire-and-forget 语义)
    Queued { submission_id: String },
}

/// 申请提交客户端
pub struct ApplyClient {
    http: reqwest::Client,
    strategy: SubmitStrategy,
}

impl ApplyClient {
    pub fn new(endpoint: &str) -> Result<Self, String> {
        let strategy = SubmitStrategy::detect(endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| format!("创建 HTTP 客户端失败: {}", e))?;
        Ok(Self { http, strategy })
    }

    pub fn strategy(&self) -> &SubmitStrategy {
        &self.strategy
    }

    pub fn max_file_mb(&self) -> usize {
        self.strategy.max_file_mb()
    }

    pub async fn submit(&self, payload: &ApplyPayload) -> Result<SubmitOutcome, String> {
        match &self.strategy {
            SubmitStrategy::Multipart { endpoint } => self.submit_multipart(endpoint, payload).await,
            SubmitStrategy::ScriptRelay { endpoint } => self.submit_script(endpoint, payload).await,
        }
    }

    async fn submit_multipart(
        &self,
        endpoint: &str,
        payload: &ApplyPayload,
    ) -> Result<SubmitOutcome, String> {
        let cv = require_file(&payload.cv_file, "CV file is required")?;
        let cover = require_file(&payload.cover_file, "Cover letter file is required")?;

        let form = reqwest::multipart::Form::new()
            .text("applicant_name", payload.applicant_name.clone())
            .text("applicant_email", payload.applicant_email.clone())
            .text("program_track", payload.program_track.clone())
            .text("affiliation", payload.affiliation.clone())
            .text(
                "research_proposal_note",
                payload.research_proposal_note.clone(),
            )
            .text("special_note", payload.special_note.clone())
            .text("source_page", payload.source_page.clone())
            .text("_honey", payload.honey.clone())
            .text("submitted_at", chrono::Utc::now().to_rfc3339())
            .part(
                "cv_pdf",
                reqwest::multipart::Part::bytes(cv.content.to_vec())
                    .file_name(cv.file_name.clone()),
            )
            .part(
                "cover_letter",
                reqwest::multipart::Part::bytes(cover.content.to_vec())
                    .file_name(cover.file_name.clone()),
            );

        let response = self
            .http
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("Upload failed: {}", e))?;

        let status = response.status();
        // 响应体解析失败时退化为默认值,错误文案取服务端的 error 字段
        let body: ApplyResponse = response.json().await.unwrap_or_default();

        if !status.is_success() || !body.success {
            return Err(body.error.unwrap_or_else(|| "Upload failed".to_string()));
        }

        Ok(SubmitOutcome::Accepted(body))
    }

    async fn submit_script(
        &self,
        endpoint: &str,
        payload: &ApplyPayload,
    ) -> Result<SubmitOutcome, String> {
        let cv = require_file(&payload.cv_file, "CV file is required")?;
        let cover = require_file(&payload.cover_file, "Cover letter file is required")?;

        let now = chrono::Utc::now();
        let submission_id = format!("{}-{}", now.format("%Y%m%d%H%M%S"), naming::nonce(6));

        let body = serde_json::json!({
            "submission_id": submission_id,
            "submitted_at": now.to_rfc3339(),
            "source_page": payload.source_page,
            "applicant_name": payload.applicant_name,
            "applicant_email": payload.applicant_email,
            "program_track": payload.program_track,
            "affiliation": payload.affiliation,
            "research_proposal_note": payload.research_proposal_note,
            "special_note": payload.special_note,
            "files": {
                "cv": {
                    "name": cv.file_name,
                    "type": "application/pdf",
                    "base64": BASE64.encode(&cv.content),
                },
                "cover_letter": {
                    "name": cover.file_name,
                    "type": "application/octet-stream",
                    "base64": BASE64.encode(&cover.content),
                },
            },
        });

        // no-cors 的等价语义:只确认请求发出,不读取响应
        self.http
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| format!("Upload failed: {}", e))?;

        Ok(SubmitOutcome::Queued { submission_id })
    }
}

fn require_file<'a>(file: &'a Option<FilePart>, message: &str) -> Result<&'a FilePart, String> {
    file.as_ref().ok_or_else(|| message.to_string())
}
