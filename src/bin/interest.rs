//! 命令行兴趣登记工具

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emdp_apply_server::client::interest::InterestClient;
use emdp_apply_server::client::{default_data_dir, SubmitTracker};

#[derive(Parser, Debug)]
#[command(author, version, about = "Register interest in EMDP Lab research", long_about = None)]
struct Args {
    /// 收件人(实验室邮箱)
    #[arg(long, env = "INTEREST_RECIPIENT")]
    recipient: String,

    #[arg(long)]
    email: String,

    #[arg(long, default_value = "cli")]
    source_page: String,

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
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => default_data_dir().map_err(anyhow::Error::msg)?,
    };
    let tracker = SubmitTracker::open(data_dir.join("rate_limits.json"));

    let client = InterestClient::new(&args.recipient).map_err(anyhow::Error::msg)?;

    match client
        .submit(&tracker, &args.email, &args.source_page, "")
        .await
    {
        Ok(()) => {
            println!("Thanks. Your interest has been delivered.");
            Ok(())
        }
        Err(message) => {
            // 中继失败时退回 mailto 链接,交给用户手动发送
            eprintln!("{}", message);
            println!("Fallback: {}", client.mailto_fallback(&args.email));
            std::process::exit(1);
        }
    }
}
