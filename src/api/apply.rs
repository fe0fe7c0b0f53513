use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use crate::core::error::RelayError;
use crate::core::models::{ApplyPayload, ApplyResponse, FilePart};
use crate::relay;
use crate::state::AppState;

/// POST /api/apply — 接收申请表单,重新校验后转存到 Dropbox
pub async fn handle_apply(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let payload = match read_payload(multipart).await {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result = relay::submit_application(
        &state.token_source,
        &state.store,
        &state.notifier,
        &state.config.dropbox_base_path,
        state.config.max_file_bytes,
        &payload,
    )
    .await;

    match result {
        Ok(outcome) => {
            tracing::info!(
                "Application stored: {} -> {}",
                outcome.submission_id,
                outcome.folder_path
            );
            Json(ApplyResponse::from(outcome)).into_response()
        }
        Err(e) => {
            tracing::warn!("Application rejected: {}", e);
            e.into_response()
        }
    }
}

/// 解析 multipart 表单为提交载荷
/// 未知字段直接忽略,文本字段去除首尾空白
async fn read_payload(mut multipart: Multipart) -> Result<ApplyPayload, RelayError> {
    let mut payload = ApplyPayload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "cv_pdf" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| RelayError::validation(format!("Failed to read CV: {}", e)))?;
                payload.cv_file = Some(FilePart::new(file_name, content));
            }
            "cover_letter" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(|e| {
                    RelayError::validation(format!("Failed to read cover letter: {}", e))
                })?;
                payload.cover_file = Some(FilePart::new(file_name, content));
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| {
                        RelayError::validation(format!("Malformed field {}: {}", name, e))
                    })?
                    .trim()
                    .to_string();
                match name.as_str() {
                    "applicant_name" => payload.applicant_name = value,
                    "applicant_email" => payload.applicant_email = value,
                    "program_track" => payload.program_track = value,
                    "affiliation" => payload.affiliation = value,
                    "research_proposal_note" => payload.research_proposal_note = value,
                    "special_note" => payload.special_note = value,
                    "source_page" => payload.source_page = value,
                    "_honey" => payload.honey = value,
                    _ => {}
                }
            }
        }
    }

    Ok(payload)
}
