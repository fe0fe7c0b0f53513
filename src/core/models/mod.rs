//! 核心数据模型

mod config;
mod submission;

pub use config::{DropboxCredentials, NotifyConfig, RelayConfig, DEFAULT_MAX_FILE_MB};
pub use submission::{
    ApplyPayload, ApplyResponse, FilePart, SubmissionFiles, SubmissionMetadata,
};
