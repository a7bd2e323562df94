//! ytocr - Screenshot OCR tool
//!
//! Startup entry point: stages bundled OCR assets, restarts silently when
//! they changed, and hosts the main window until interrupted.

mod cli;

use anyhow::Context;
use clap::Parser;

use ytocr_app::config::OcrEngineKind;
use ytocr_app::staging::DirectoryBundle;
use ytocr_app::{
    load_config, load_config_from, AppConfig, AppVersion, LaunchMode, Launcher, Next,
    RuntimePaths,
};
use ytocr_ui::HeadlessWindow;

use crate::cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let mode = LaunchMode::from_flag(args.silent_restart);
    log::info!("Starting ytocr {} ({:?})", env!("CARGO_PKG_VERSION"), mode);

    let config = load(&args);
    let paths = RuntimePaths::resolve(&config);
    log::debug!("Runtime paths: {:?}", paths);

    let launcher = Launcher::new(
        &config,
        paths.clone(),
        AppVersion::new(env!("CARGO_PKG_VERSION")),
        mode,
    );
    launcher.heal();

    let mut window = HeadlessWindow::default();
    let bundle = DirectoryBundle::new(&paths.resource_dir);

    launcher.present(&mut window);
    if launcher.prepare(&bundle, &window).await == Next::Exit {
        log::info!("Handed over to new process, exiting");
        return Ok(());
    }

    check_ocr_assets(&config, &paths);
    launcher.complete(&mut window);

    log::info!("ytocr is running, press Ctrl+C to quit");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    log::info!("Shutting down");

    Ok(())
}

fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.init();
}

/// Load the configuration, falling back to defaults if it cannot be read
fn load(args: &Args) -> AppConfig {
    let result = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    result.unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    })
}

fn check_ocr_assets(config: &AppConfig, paths: &RuntimePaths) {
    let missing = paths.missing_ocr_assets(&config.ocr);
    if missing.is_empty() {
        if config.ocr.engine != OcrEngineKind::Windows {
            log::info!("OCR assets for {:?} engine found", config.ocr.engine);
        }
        return;
    }
    for path in &missing {
        log::warn!("Missing OCR asset: {}", path.display());
    }
    log::warn!(
        "{:?} engine unavailable until its assets are installed",
        config.ocr.engine
    );
}
