//! 申请提交的数据结构

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 一个上传的文件（整体驻留内存，不做流式处理）
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub content: Bytes,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// 一次申请提交的全部输入（文本字段已去除首尾空白）
#[derive(Debug, Clone, Default)]
pub struct ApplyPayload {
    pub applicant_name: String,
    pub applicant_email: String,
    pub program_track: String,
    pub affiliation: String,
    pub research_proposal_note: String,
    pub special_note: String,
    pub source_page: String,
    pub honey: String,
    pub cv_file: Option<FilePart>,
    pub cover_file: Option<FilePart>,
}

/// 随上传文件一起写入的不可变元数据记录
/// 写入一次后不再被本系统读取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    pub submission_id: String,
    pub submitted_at: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub program_track: String,
    pub affiliation: String,
    pub research_proposal_note: String,
    pub special_note: String,
    pub source_page: String,
    pub files: SubmissionFiles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionFiles {
    pub cv: String,
    pub cover_letter: String,
}

/// `POST /api/apply` 的响应体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_response_omits_empty_fields() {
        let response = ApplyResponse {
            success: true,
            submission_id: Some("20250314-092653-kim-abc123".to_string()),
            folder_path: Some("/EMDP-Lab-Applications/2025-03-14/x".to_string()),
            folder_link: None,
            notification_sent: Some(false),
            error: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"submission_id\""));
        assert!(!json.contains("folder_link"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_apply_response_tolerates_empty_body() {
        // 客户端侧：响应体不是合法 JSON 时退化为默认值
        let response: ApplyResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.success);
        assert!(response.error.is_none());
    }
}
