use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "capture")]
mod capture;
mod clipboard;
mod config;
mod engine;
mod engines;
mod error;
mod raster;
mod server;
mod session;

#[derive(Parser, Debug)]
#[command(name = "ocrshot-server")]
#[command(about = "Local screen capture, image stacking and OCR server")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "OCRSHOT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCRSHOT_PORT", default_value = "7878")]
    pub port: u16,

    /// Default language hint for OCR (e.g. "eng", "kor", "kor+eng")
    #[arg(long, env = "OCRSHOT_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Default OCR engine (falls back to the first available one)
    #[arg(long, env = "OCRSHOT_ENGINE")]
    pub default_engine: Option<String>,

    /// API key for the remote Vision engine
    #[arg(long, env = "VISION_API_KEY")]
    pub vision_api_key: Option<String>,

    /// Endpoint for the remote Vision engine
    #[arg(
        long,
        env = "VISION_ENDPOINT",
        default_value = "https://vision.googleapis.com/v1/images:annotate"
    )]
    pub vision_endpoint: String,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "OCRSHOT_MAX_UPLOAD_SIZE", default_value = "52428800")]
    pub max_upload_size: usize,

    /// Do not register the global capture hotkey
    #[arg(long, env = "OCRSHOT_DISABLE_HOTKEY")]
    pub disable_hotkey: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting ocrshot-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
