use clap::Parser;
use eyre::Context;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_utils::config::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = Config::parse();

    // this is a demo; every failure ends up as one line and a normal exit
    if let Err(e) = run(&config).await {
        println!("An error occurred: {e:#}");
    }
}

async fn run(config: &Config) -> eyre::Result<()> {
    let yt = config
        .session()
        .authenticate(&config.authenticator())
        .await?;

    if let Some(request) = config.upload_request() {
        let video = yt.upload_video(request).await?;
        println!("Uploaded video: {}", video.id);
    }

    let stats = yt.get_channel_stats().await?;
    println!(
        "Channel Statistics: {}",
        serde_json::to_string(&stats).context("serialize channel statistics")?
    );

    let videos = yt.list_videos(config.max_results).await?;
    println!("\nRecent Videos:");
    for video in &videos {
        println!("- {}", video.title().unwrap_or("(untitled)"));
    }

    Ok(())
}
