//! 申请表单的提交前校验
//! 所有可变状态都挂在 FormSession 实例上,不使用全局量

use std::time::{Duration, Instant};

use rand::Rng;

use crate::core::validation::{
    has_allowed_extension, COVER_ALLOWED_EXTENSIONS, CV_ALLOWED_EXTENSIONS,
};

/// 提交前的最短停留时间
pub const MIN_DWELL: Duration = Duration::from_secs(8);

/// 两数相加的人机校验问题
/// 只是劝阻脚本,不是安全边界
#[derive(Debug, Clone)]
pub struct SecurityQuestion {
    a: u32,
    b: u32,
}

impl SecurityQuestion {
    fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            a: rng.gen_range(3..=10),
            b: rng.gen_range(4..=11),
        }
    }

    pub fn prompt(&self) -> String {
        format!("Security check: {} + {} = ?", self.a, self.b)
    }

    pub fn check(&self, answer: i64) -> bool {
        answer == (self.a + self.b) as i64
    }
}

/// 草稿中的文件信息
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub size: usize,
}

/// 提交时的用户输入
#[derive(Debug, Clone, Default)]
pub struct FormDraft {
    pub honey: String,
    pub consent: bool,
    pub answer: Option<i64>,
    pub cv: Option<FileInfo>,
    pub cover: Option<FileInfo>,
}

/// 一次表单会话:创建时间与当前校验问题
pub struct FormSession {
    started_at: Instant,
    question: SecurityQuestion,
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            question: SecurityQuestion::generate(),
        }
    }

    pub fn question(&self) -> &SecurityQuestion {
        &self.question
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 提交成功后重新计时并换一道题
    pub fn reset(&mut self) {
        self.started_at = Instant::now();
        self.question = SecurityQuestion::generate();
    }

    /// 按固定顺序检查草稿,任意一条失败立即返回对应的提示文案
    pub fn check(&self, draft: &FormDraft, max_file_mb: usize) -> Result<(), String> {
        if !draft.honey.trim().is_empty() {
            return Err("Submission blocked.".to_string());
        }

        if self.started_at.elapsed() < MIN_DWELL {
            return Err("Please take a little more time before submitting.".to_string());
        }

        if !draft.consent {
            return Err("Please confirm the consent checkbox.".to_string());
        }

        match draft.answer {
            Some(answer) if self.question.check(answer) => {}
            _ => return Err("Security check answer is incorrect.".to_string()),
        }

        let cv = draft
            .cv
            .as_ref()
            .filter(|file| has_allowed_extension(&file.name, CV_ALLOWED_EXTENSIONS))
            .ok_or_else(|| "CV must be a PDF file.".to_string())?;

        let cover = draft
            .cover
            .as_ref()
            .filter(|file| has_allowed_extension(&file.name, COVER_ALLOWED_EXTENSIONS))
            .ok_or_else(|| "Cover letter must be PDF, DOC, or DOCX.".to_string())?;

        let max_bytes = max_file_mb * 1024 * 1024;
        if cv.size > max_bytes || cover.size > max_bytes {
            return Err(format!("Each file must be {}MB or smaller.", max_file_mb));
        }

        Ok(())
    }

    #[cfg(test)]
    fn backdate(&mut self, by: Duration) {
        self.started_at -= by;
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}
