//! 提交通知
//! 通过 Resend 给实验室管理员发一封纯文本邮件;失败不影响提交本身

use serde::Serialize;

use super::{Notifier, SubmissionSummary};
use crate::core::error::RelayError;
use crate::core::models::NotifyConfig;

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

#[derive(Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Resend 邮件通知
pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    to: String,
    from: String,
}

impl ResendNotifier {
    /// API key 和收件人齐全时才可用
    pub fn from_config(client: reqwest::Client, config: &NotifyConfig) -> Option<Self> {
        let api_key = config.resend_api_key.clone()?;
        let to = config.notify_to.clone()?;
        Some(Self {
            client,
            api_key,
            to,
            from: config.notify_from.clone(),
        })
    }
}

impl Notifier for ResendNotifier {
    async fn send(&self, summary: &SubmissionSummary) -> Result<bool, RelayError> {
        let (subject, text) = notification_content(summary);
        let request = EmailRequest {
            from: &self.from,
            to: [self.to.as_str()],
            subject: &subject,
            text: &text,
        };

        let response = self
            .client
            .post(RESEND_EMAILS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::upstream(format!("Resend request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RelayError::upstream(format!(
                "Resend returned {}",
                response.status()
            )));
        }

        Ok(true)
    }
}

/// 按配置选择的通知实现;未配置时为 Noop
pub enum AnyNotifier {
    Resend(ResendNotifier),
    Noop,
}

impl AnyNotifier {
    pub fn from_config(client: reqwest::Client, config: &NotifyConfig) -> Self {
        match ResendNotifier::from_config(client, config) {
            Some(notifier) => Self::Resend(notifier),
            None => {
                tracing::info!("通知未配置 (RESEND_API_KEY / NOTIFY_TO),跳过邮件提醒");
                Self::Noop
            }
        }
    }
}

impl Notifier for AnyNotifier {
    async fn send(&self, summary: &SubmissionSummary) -> Result<bool, RelayError> {
        match self {
            Self::Resend(notifier) => notifier.send(summary).await,
            Self::Noop => Ok(false),
        }
    }
}

fn notification_content(summary: &SubmissionSummary) -> (String, String) {
    let subject = format!(
        "New EMDP application: {} ({})",
        summary.applicant_name, summary.submission_id
    );
    let link_line = if summary.folder_link.is_empty() {
        "Dropbox link: (not created)".to_string()
    } else {
        format!("Dropbox link: {}", summary.folder_link)
    };
    let text = [
        format!("Submission ID: {}", summary.submission_id),
        format!("Applicant: {}", summary.applicant_name),
        format!("Email: {}", summary.applicant_email),
        format!("Track: {}", summary.program_track),
        format!("Affiliation: {}", summary.affiliation),
        format!("Dropbox folder: {}", summary.folder_path),
        link_line,
    ]
    .join("\n");
    (subject, text)
}
