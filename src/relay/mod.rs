//! 上传中继管道
//! 同一套写入序列服务于所有部署形态，云端差异收敛在三个 trait 后面

pub mod dropbox;
pub mod notify;

use std::future::Future;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};

use crate::core::error::RelayError;
use crate::core::models::{ApplyPayload, ApplyResponse, SubmissionFiles, SubmissionMetadata};
use crate::core::naming;
use crate::core::validation;

/// 获取上游访问令牌（静态配置或 OAuth 刷新）
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> impl Future<Output = Result<String, RelayError>> + Send;
}

/// 云端对象写入
pub trait ObjectStore: Send + Sync {
    /// 创建目标文件夹；"已存在"视为成功
    fn ensure_folder(
        &self,
        token: &str,
        path: &str,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// 单次整体上传一个二进制对象，返回实际存储路径
    fn put_object(
        &self,
        token: &str,
        path: &str,
        content: Bytes,
    ) -> impl Future<Output = Result<String, RelayError>> + Send;

    /// 为文件夹申请共享链接
    fn folder_link(
        &self,
        token: &str,
        path: &str,
    ) -> impl Future<Output = Result<String, RelayError>> + Send;
}

/// 提交通知；`Ok(false)` 表示未配置通知
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        summary: &SubmissionSummary,
    ) -> impl Future<Output = Result<bool, RelayError>> + Send;
}

/// 通知内容摘要
#[derive(Debug, Clone)]
pub struct SubmissionSummary {
    pub submission_id: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub program_track: String,
    pub affiliation: String,
    pub folder_path: String,
    pub folder_link: String,
}

/// 一次成功提交的结果
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub submission_id: String,
    pub folder_path: String,
    pub folder_link: String,
    pub notification_sent: bool,
}

impl From<SubmissionOutcome> for ApplyResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        let folder_link = if outcome.folder_link.is_empty() {
            None
        } else {
            Some(outcome.folder_link)
        };
        ApplyResponse {
            success: true,
            submission_id: Some(outcome.submission_id),
            folder_path: Some(outcome.folder_path),
            folder_link,
            notification_sent: Some(outcome.notification_sent),
            error: None,
        }
    }
}

/// 校验后执行写入序列
/// 被拒绝的提交不会产生任何云端调用
pub async fn submit_application<T, S, N>(
    token_source: &T,
    store: &S,
    notifier: &N,
    base_path: &str,
    max_file_bytes: usize,
    payload: &ApplyPayload,
) -> Result<SubmissionOutcome, RelayError>
where
    T: TokenSource,
    S: ObjectStore,
    N: Notifier,
{
    validation::validate_payload(payload, max_file_bytes)?;
    process_submission(token_source, store, notifier, base_path, payload).await
}

/// 写入序列，严格串行：token → 文件夹 → CV → 求职信 → 元数据 → 链接 → 通知
/// 中途失败会留下不完整的文件夹，不做清理或重试
pub async fn process_submission<T, S, N>(
    token_source: &T,
    store: &S,
    notifier: &N,
    base_path: &str,
    payload: &ApplyPayload,
) -> Result<SubmissionOutcome, RelayError>
where
    T: TokenSource,
    S: ObjectStore,
    N: Notifier,
{
    let cv = payload
        .cv_file
        .as_ref()
        .ok_or_else(|| RelayError::validation("CV file is required"))?;
    let cover = payload
        .cover_file
        .as_ref()
        .ok_or_else(|| RelayError::validation("Cover letter file is required"))?;

    let token = token_source.access_token().await?;

    let now = Utc::now();
    let submission_id = naming::build_submission_id(&payload.applicant_name, now);
    let folder_path = naming::folder_path(base_path, now.date_naive(), &submission_id);

    store.ensure_folder(&token, &folder_path).await?;

    let cv_target = format!(
        "{}/{}",
        folder_path,
        naming::stored_file_name("cv", &cv.file_name)
    );
    let cv_stored = store
        .put_object(&token, &cv_target, cv.content.clone())
        .await?;

    let cover_target = format!(
        "{}/{}",
        folder_path,
        naming::stored_file_name("cover-letter", &cover.file_name)
    );
    let cover_stored = store
        .put_object(&token, &cover_target, cover.content.clone())
        .await?;

    let metadata = SubmissionMetadata {
        submission_id: submission_id.clone(),
        submitted_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        applicant_name: payload.applicant_name.clone(),
        applicant_email: payload.applicant_email.clone(),
        program_track: payload.program_track.clone(),
        affiliation: payload.affiliation.clone(),
        research_proposal_note: payload.research_proposal_note.clone(),
        special_note: payload.special_note.clone(),
        source_page: payload.source_page.clone(),
        files: SubmissionFiles {
            cv: cv_stored,
            cover_letter: cover_stored,
        },
    };
    let metadata_body = serde_json::to_vec_pretty(&metadata)
        .map_err(|e| RelayError::upstream(format!("Metadata encoding failed: {}", e)))?;
    store
        .put_object(
            &token,
            &format!("{}/submission.json", folder_path),
            Bytes::from(metadata_body),
        )
        .await?;

    // 共享链接与通知都是尽力而为，失败不影响提交结果
    let folder_link = match store.folder_link(&token, &folder_path).await {
        Ok(link) => link,
        Err(e) => {
            tracing::warn!("共享链接创建失败: {}", e);
            String::new()
        }
    };

    let summary = SubmissionSummary {
        submission_id: submission_id.clone(),
        applicant_name: payload.applicant_name.clone(),
        applicant_email: payload.applicant_email.clone(),
        program_track: payload.program_track.clone(),
        affiliation: payload.affiliation.clone(),
        folder_path: folder_path.clone(),
        folder_link: folder_link.clone(),
    };
    let notification_sent = match notifier.send(&summary).await {
        Ok(sent) => sent,
        Err(e) => {
            tracing::warn!("通知发送失败: {}", e);
            false
        }
    };

    Ok(SubmissionOutcome {
        submission_id,
        folder_path,
        folder_link,
        notification_sent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::FilePart;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::sync::Mutex;

    static ID_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\d{8}-\d{6}-[a-z0-9][a-z0-9\-_]*-[0-9a-z]{6}$").unwrap()
    });

    struct StaticToken;

    impl TokenSource for StaticToken {
        async fn access_token(&self) -> Result<String, RelayError> {
            Ok("test-token".to_string())
        }
    }

    struct FailingToken;

    impl TokenSource for FailingToken {
        async fn access_token(&self) -> Result<String, RelayError> {
            Err(RelayError::upstream_auth(
                "Dropbox credentials are not configured",
            ))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        folders: Mutex<Vec<String>>,
        objects: Mutex<Vec<(String, Bytes)>>,
        link_fails: bool,
    }

    impl RecordingStore {
        fn call_count(&self) -> usize {
            self.folders.lock().unwrap().len() + self.objects.lock().unwrap().len()
        }
    }

    impl ObjectStore for RecordingStore {
        async fn ensure_folder(&self, _token: &str, path: &str) -> Result<(), RelayError> {
            self.folders.lock().unwrap().push(path.to_string());
            Ok(())
        }

        async fn put_object(
            &self,
            _token: &str,
            path: &str,
            content: Bytes,
        ) -> Result<String, RelayError> {
            self.objects
                .lock()
                .unwrap()
                .push((path.to_string(), content));
            Ok(path.to_string())
        }

        async fn folder_link(&self, _token: &str, _path: &str) -> Result<String, RelayError> {
            if self.link_fails {
                Err(RelayError::upstream("Dropbox shared link failed (500)"))
            } else {
                Ok("https://www.dropbox.com/sh/test".to_string())
            }
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        sent: Mutex<Vec<SubmissionSummary>>,
    }

    impl Notifier for CountingNotifier {
        async fn send(&self, summary: &SubmissionSummary) -> Result<bool, RelayError> {
            self.sent.lock().unwrap().push(summary.clone());
            Ok(true)
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        async fn send(&self, _summary: &SubmissionSummary) -> Result<bool, RelayError> {
            Err(RelayError::upstream("Resend returned 500"))
        }
    }

    fn payload() -> ApplyPayload {
        ApplyPayload {
            applicant_name: "Kim Min-Jun".to_string(),
            applicant_email: "a@b.com".to_string(),
            program_track: "PhD".to_string(),
            affiliation: "X University".to_string(),
            research_proposal_note: "Flexible oxide transistors".to_string(),
            special_note: String::new(),
            source_page: "apply.html".to_string(),
            honey: String::new(),
            cv_file: Some(FilePart::new("cv.pdf", vec![1u8; 1024 * 1024])),
            cover_file: Some(FilePart::new("cover.docx", vec![2u8; 1024 * 1024])),
        }
    }

    const MAX_BYTES: usize = 10 * 1024 * 1024;

    #[tokio::test]
    async fn test_end_to_end_success() {
        let store = RecordingStore::default();
        let notifier = CountingNotifier::default();

        let outcome = submit_application(
            &StaticToken,
            &store,
            &notifier,
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &payload(),
        )
        .await
        .unwrap();

        assert!(
            ID_RE.is_match(&outcome.submission_id),
            "unexpected id: {}",
            outcome.submission_id
        );
        assert!(outcome
            .folder_path
            .starts_with("/EMDP-Lab-Applications/"));
        assert!(outcome.folder_path.ends_with(&outcome.submission_id));
        assert_eq!(outcome.folder_link, "https://www.dropbox.com/sh/test");
        assert!(outcome.notification_sent);

        // 文件夹一次,对象三个:cv、求职信、元数据
        assert_eq!(store.folders.lock().unwrap().len(), 1);
        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 3);
        assert!(objects[0].0.ends_with("/cv-cv.pdf"));
        assert!(objects[1].0.ends_with("/cover-letter-cover.docx"));
        assert!(objects[2].0.ends_with("/submission.json"));

        // 元数据记录包含全部字段与存储路径
        let metadata: SubmissionMetadata = serde_json::from_slice(&objects[2].1).unwrap();
        assert_eq!(metadata.submission_id, outcome.submission_id);
        assert_eq!(metadata.applicant_email, "a@b.com");
        assert_eq!(metadata.files.cv, objects[0].0);
        assert_eq!(metadata.files.cover_letter, objects[1].0);

        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_honeypot_never_reaches_store() {
        let store = RecordingStore::default();
        let notifier = CountingNotifier::default();
        let mut bad = payload();
        bad.honey = "bot".to_string();

        let err = submit_application(
            &StaticToken,
            &store,
            &notifier,
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &bad,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Rejected submission");
        assert_eq!(store.call_count(), 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_cv_type_never_reaches_store() {
        let store = RecordingStore::default();
        let notifier = CountingNotifier::default();
        let mut bad = payload();
        bad.cv_file = Some(FilePart::new("cv.docx", vec![1u8; 1024]));

        let err = submit_application(
            &StaticToken,
            &store,
            &notifier,
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &bad,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "CV has an invalid file type");
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_failure_is_upstream_auth() {
        let store = RecordingStore::default();
        let err = submit_application(
            &FailingToken,
            &store,
            &CountingNotifier::default(),
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &payload(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RelayError::UpstreamAuth(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_link_failure_is_tolerated() {
        let store = RecordingStore {
            link_fails: true,
            ..Default::default()
        };
        let outcome = submit_application(
            &StaticToken,
            &store,
            &CountingNotifier::default(),
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &payload(),
        )
        .await
        .unwrap();

        assert!(outcome.folder_link.is_empty());
        assert!(outcome.notification_sent);
    }

    #[tokio::test]
    async fn test_notify_failure_is_tolerated() {
        let store = RecordingStore::default();
        let outcome = submit_application(
            &StaticToken,
            &store,
            &FailingNotifier,
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &payload(),
        )
        .await
        .unwrap();

        assert!(!outcome.notification_sent);
    }

    #[tokio::test]
    async fn test_same_name_same_second_ids_differ() {
        let store = RecordingStore::default();
        let notifier = CountingNotifier::default();
        let payload = payload();

        let first = submit_application(
            &StaticToken,
            &store,
            &notifier,
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &payload,
        )
        .await
        .unwrap();
        let second = submit_application(
            &StaticToken,
            &store,
            &notifier,
            "/EMDP-Lab-Applications",
            MAX_BYTES,
            &payload,
        )
        .await
        .unwrap();

        assert_ne!(first.submission_id, second.submission_id);
    }

    #[test]
    fn test_outcome_into_response_maps_empty_link() {
        let response: ApplyResponse = SubmissionOutcome {
            submission_id: "id".to_string(),
            folder_path: "/p".to_string(),
            folder_link: String::new(),
            notification_sent: false,
        }
        .into();
        assert!(response.success);
        assert!(response.folder_link.is_none());
        assert_eq!(response.notification_sent, Some(false));
    }
}
