//! 提交校验门
//! 客户端提交前与服务端收到请求后执行同一套约束

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::RelayError;
use crate::core::models::{ApplyPayload, FilePart};
use crate::core::naming::file_extension;

pub const CV_ALLOWED_EXTENSIONS: &[&str] = &["pdf"];
pub const COVER_ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("无效的正则"));

/// 按固定顺序校验一次提交，任意一条失败立即返回
pub fn validate_payload(payload: &ApplyPayload, max_bytes: usize) -> Result<(), RelayError> {
    // 蜜罐字段非空说明是自动化提交
    if !payload.honey.trim().is_empty() {
        return Err(RelayError::validation("Rejected submission"));
    }

    require_field(&payload.applicant_name, "Full name")?;
    require_field(&payload.applicant_email, "Email")?;
    require_field(&payload.program_track, "Program track")?;
    require_field(&payload.affiliation, "Affiliation")?;
    require_field(&payload.research_proposal_note, "Research proposal note")?;

    if !EMAIL_RE.is_match(payload.applicant_email.trim()) {
        return Err(RelayError::validation("Invalid email"));
    }

    let cv = payload
        .cv_file
        .as_ref()
        .ok_or_else(|| RelayError::validation("CV file is required"))?;
    let cover = payload
        .cover_file
        .as_ref()
        .ok_or_else(|| RelayError::validation("Cover letter file is required"))?;

    validate_file(cv, CV_ALLOWED_EXTENSIONS, max_bytes, "CV")?;
    validate_file(cover, COVER_ALLOWED_EXTENSIONS, max_bytes, "Cover letter")?;

    Ok(())
}

pub fn validate_file(
    file: &FilePart,
    allowed: &[&str],
    max_bytes: usize,
    label: &str,
) -> Result<(), RelayError> {
    let ext = file_extension(&file.file_name);
    if !allowed.contains(&ext.as_str()) {
        return Err(RelayError::validation(format!(
            "{} has an invalid file type",
            label
        )));
    }
    if file.is_empty() {
        return Err(RelayError::validation(format!("{} file is empty", label)));
    }
    if file.size() > max_bytes {
        return Err(RelayError::validation(format!(
            "{} exceeds the size limit",
            label
        )));
    }
    Ok(())
}

pub fn has_allowed_extension(name: &str, allowed: &[&str]) -> bool {
    allowed.contains(&file_extension(name).as_str())
}

fn require_field(value: &str, label: &str) -> Result<(), RelayError> {
    if value.trim().is_empty() {
        return Err(RelayError::validation(format!("{} is required", label)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const MAX_BYTES: usize = 10 * 1024 * 1024;

    fn file(name: &str, size: usize) -> FilePart {
        FilePart::new(name, Bytes::from(vec![0u8; size]))
    }

    fn valid_payload() -> ApplyPayload {
        ApplyPayload {
            applicant_name: "Kim Min-Jun".to_string(),
            applicant_email: "a@b.com".to_string(),
            program_track: "PhD".to_string(),
            affiliation: "X University".to_string(),
            research_proposal_note: "Printed electronics for flexible sensors".to_string(),
            special_note: String::new(),
            source_page: "apply.html".to_string(),
            honey: String::new(),
            cv_file: Some(file("cv.pdf", 1024 * 1024)),
            cover_file: Some(file("cover.docx", 1024 * 1024)),
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(validate_payload(&valid_payload(), MAX_BYTES).is_ok());
    }

    #[test]
    fn test_honeypot_rejected_first() {
        let mut payload = valid_payload();
        payload.honey = "bot".to_string();
        // 蜜罐命中时连缺字段都不再检查
        payload.applicant_name = String::new();
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "Rejected submission");
    }

    #[test]
    fn test_missing_required_field() {
        let mut payload = valid_payload();
        payload.affiliation = "  ".to_string();
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "Affiliation is required");
    }

    #[test]
    fn test_invalid_email() {
        let mut payload = valid_payload();
        payload.applicant_email = "not-an-email".to_string();
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "Invalid email");
    }

    #[test]
    fn test_cv_wrong_extension() {
        let mut payload = valid_payload();
        payload.cv_file = Some(file("cv.docx", 1024));
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "CV has an invalid file type");
    }

    #[test]
    fn test_cover_extension_set() {
        let mut payload = valid_payload();
        payload.cover_file = Some(file("cover.pdf", 1024));
        assert!(validate_payload(&payload, MAX_BYTES).is_ok());

        payload.cover_file = Some(file("cover.txt", 1024));
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "Cover letter has an invalid file type");
    }

    #[test]
    fn test_missing_files() {
        let mut payload = valid_payload();
        payload.cv_file = None;
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "CV file is required");

        let mut payload = valid_payload();
        payload.cover_file = None;
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "Cover letter file is required");
    }

    #[test]
    fn test_empty_file() {
        let mut payload = valid_payload();
        payload.cv_file = Some(file("cv.pdf", 0));
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "CV file is empty");
    }

    #[test]
    fn test_oversized_file() {
        let mut payload = valid_payload();
        payload.cover_file = Some(file("cover.pdf", MAX_BYTES + 1));
        let err = validate_payload(&payload, MAX_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "Cover letter exceeds the size limit");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let mut payload = valid_payload();
        payload.cv_file = Some(file("CV.PDF", 1024));
        assert!(validate_payload(&payload, MAX_BYTES).is_ok());
    }
}
