//! 兴趣表单提交
//! 走 FormSubmit 的 AJAX 端点;失败时给出 mailto 兜底链接

use std::time::Duration;

use super::rate_limit::SubmitTracker;
use super::{INTEREST_RATE_KEY, RATE_LIMIT, RATE_WINDOW_MS};

const FORMSUBMIT_AJAX_URL: &str = "https://formsubmit.co/ajax/";
const INTEREST_SUBJECT: &str = "EMDP Lab Interest Form";

pub struct InterestClient {
    http: reqwest::Client,
    recipient: String,
}

impl InterestClient {
    pub fn new(recipient: impl Into<String>) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| format!("创建 HTTP 客户端失败: {}", e))?;
        Ok(Self {
            http,
            recipient: recipient.into(),
        })
    }

    /// 提交一条兴趣登记;成功后记入限频器
    pub async fn submit(
        &self,
        tracker: &SubmitTracker,
        email: &str,
        source_page: &str,
        honey: &str,
    ) -> Result<(), String> {
        if !honey.trim().is_empty() {
            return Err("Submission blocked.".to_string());
        }

        let email = email.trim();
        if email.is_empty() {
            return Err("Email is required".to_string());
        }

        if tracker.is_limited(INTEREST_RATE_KEY, RATE_LIMIT, RATE_WINDOW_MS) {
            return Err("Too many submissions. Please try again tomorrow.".to_string());
        }

        let form = reqwest::multipart::Form::new()
            .text("_subject", INTEREST_SUBJECT)
            .text("email", email.to_string())
            .text("source_page", source_page.to_string())
            .text("submitted_at", chrono::Utc::now().to_rfc3339());

        let response = self
            .http
            .post(format!("{}{}", FORMSUBMIT_AJAX_URL, self.recipient))
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Request failed ({})", response.status()));
        }

        tracker.record(INTEREST_RATE_KEY);
        Ok(())
    }

    /// 中继失败时的 mailto 兜底链接
    pub fn mailto_fallback(&self, email: &str) -> String {
        let body = format!(
            "Hello,\r\n\r\nI am interested in joining EMDP Lab.\r\nMy email: {}",
            email.trim()
        );
        let params = [
            ("subject", "Interest in EMDP Lab research"),
            ("body", body.as_str()),
        ];
        url::Url::parse_with_params(&format!("mailto:{}", self.recipient), &params)
            .map(|link| link.to_string())
            .unwrap_or_else(|_| format!("mailto:{}", self.recipient))
    }
}
