//! 命令行申请提交工具
//! 与页面表单走同一套校验门、限频器与上传策略

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emdp_apply_server::client::form::{FileInfo, MIN_DWELL};
use emdp_apply_server::client::{
    default_data_dir, ApplyClient, FormDraft, FormSession, SubmitOutcome, SubmitTracker,
    APPLY_RATE_KEY, RATE_LIMIT, RATE_WINDOW_MS,
};
use emdp_apply_server::core::models::{ApplyPayload, FilePart};

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit an application package to the EMDP Lab relay", long_about = None)]
struct Args {
    /// 上传端点(自建中继或 Apps Script 端点)
    #[arg(long, env = "UPLOAD_ENDPOINT")]
    endpoint: String,

    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    /// Program track, e.g. "PhD" / "MS" / "Post-doc"
    #[arg(long)]
    track: String,

    #[arg(long)]
    affiliation: String,

    /// Research proposal note
    #[arg(long)]
    proposal: String,

    #[arg(long, default_value = "")]
    note: String,

    #[arg(long, default_value = "cli")]
    source_page: String,

    /// CV 文件路径 (PDF)
    #[arg(long)]
    cv: PathBuf,

    /// 求职信文件路径 (PDF/DOC/DOCX)
    #[arg(long)]
    cover: PathBuf,

    /// 确认同意数据处理条款
    #[arg(long)]
    consent: bool,

    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let data_dir = match args.data_dir.clone() {
        Some(dir) => {
            std::fs::create_dir_all(&dir).context("创建数据目录失败")?;
            dir
        }
        None => default_data_dir().map_err(anyhow::Error::msg)?,
    };
    let tracker = SubmitTracker::open(data_dir.join("rate_limits.json"));

    if tracker.is_limited(APPLY_RATE_KEY, RATE_LIMIT, RATE_WINDOW_MS) {
        bail!("Too many submissions. Please try again tomorrow.");
    }

    let client = ApplyClient::new(&args.endpoint).map_err(anyhow::Error::msg)?;

    let mut session = FormSession::new();
    let answer = ask_security_question(&session)?;

    // 校验门要求最短停留时间;交互不足 8 秒时等满
    let remaining = MIN_DWELL.saturating_sub(session.elapsed());
    if !remaining.is_zero() {
        tokio::time::sleep(remaining).await;
    }

    let cv = read_file(&args.cv).context("读取 CV 失败")?;
    let cover = read_file(&args.cover).context("读取求职信失败")?;

    let draft = FormDraft {
        honey: String::new(),
        consent: args.consent,
        answer: Some(answer),
        cv: Some(FileInfo {
            name: cv.file_name.clone(),
            size: cv.size(),
        }),
        cover: Some(FileInfo {
            name: cover.file_name.clone(),
            size: cover.size(),
        }),
    };
    session
        .check(&draft, client.max_file_mb())
        .map_err(anyhow::Error::msg)?;

    let payload = ApplyPayload {
        applicant_name: args.name.trim().to_string(),
        applicant_email: args.email.trim().to_string(),
        program_track: args.track.trim().to_string(),
        affiliation: args.affiliation.trim().to_string(),
        research_proposal_note: args.proposal.trim().to_string(),
        special_note: args.note.trim().to_string(),
        source_page: args.source_page.clone(),
        honey: String::new(),
        cv_file: Some(cv),
        cover_file: Some(cover),
    };

    println!("Uploading files and application data...");
    let outcome = client
        .submit(&payload)
        .await
        .map_err(anyhow::Error::msg)?;

    tracker.record(APPLY_RATE_KEY);
    session.reset();

    match outcome {
        SubmitOutcome::Accepted(response) => match response.submission_id {
            Some(id) => println!("Application uploaded successfully. Submission ID: {}", id),
            None => println!("Application uploaded successfully. Thank you for applying."),
        },
        SubmitOutcome::Queued { submission_id } => {
            // 脚本端点只能确认投递,不能确认写入
            println!(
                "Submission request sent. ID: {}. You should receive confirmation email shortly.",
                submission_id
            );
        }
    }

    Ok(())
}

fn ask_security_question(session: &FormSession) -> Result<i64> {
    print!("{} ", session.question().prompt());
    std::io::stdout().flush().context("stdout flush 失败")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("读取输入失败")?;
    line.trim()
        .parse::<i64>()
        .context("Security check answer must be a number")
}

fn read_file(path: &PathBuf) -> Result<FilePart> {
    let content = std::fs::read(path).with_context(|| format!("无法读取 {:?}", path))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file")
        .to_string();
    Ok(FilePart::new(file_name, content))
}
