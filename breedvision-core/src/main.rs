//! BreedVision command-line client
//!
//! Runs one session: selects the locale, authenticates, uploads and analyzes
//! each image in order, prints the rendered result, signs out.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use breedvision_common::config;
use breedvision_core::models::{ImageOrigin, JobStatus, RawImageSource};
use breedvision_core::services::SignUpForm;
use breedvision_core::{BreedVisionApp, Collaborators};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for breedvision
#[derive(Parser, Debug)]
#[command(name = "breedvision")]
#[command(about = "Cattle and buffalo breed recognition")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = config::CONFIG_FILE_ENV)]
    config: Option<PathBuf>,

    /// Folder holding persisted preferences
    #[arg(short, long, env = config::ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// UI language code (en, hi, ta, ...)
    #[arg(short, long)]
    locale: Option<String>,

    #[arg(long, env = "BREEDVISION_EMAIL")]
    email: String,

    #[arg(long, env = "BREEDVISION_PASSWORD", hide_env_values = true)]
    password: String,

    /// Create the account instead of signing in
    ///
    /// Required on every run without `auth.firebase_api_key`: the built-in
    /// in-memory identity provider starts with no accounts.
    #[arg(long, requires = "full_name")]
    sign_up: bool,

    #[arg(long)]
    full_name: Option<String>,

    /// Images to analyze, in order
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn init_tracing(logging: &config::LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = config::load_or_default(args.config.as_deref());
    init_tracing(&config.logging)?;

    info!("Starting BreedVision {}", env!("CARGO_PKG_VERSION"));

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let collaborators = Collaborators::from_config(&config, &root_folder)
        .context("Failed to set up collaborators")?;
    let app = BreedVisionApp::new(&config, collaborators).context("Failed to initialize")?;
    let watcher = app.start_provider_watch();

    if let Some(code) = &args.locale {
        app.locale().set_locale(code)?;
    }
    info!("Locale: {}", app.locale().active_code());

    let outcome = if args.sign_up {
        let full_name = args.full_name.as_deref().unwrap_or_default();
        app.auth()
            .sign_up(SignUpForm {
                email: &args.email,
                password: &args.password,
                confirm_password: &args.password,
                full_name,
            })
            .await
    } else {
        app.auth().sign_in(&args.email, &args.password).await
    };
    if let Err(e) = outcome {
        // The gate message carries the localized reason
        print!("{}", app.view().to_text());
        bail!("Authentication failed: {}", e);
    }

    let mut failures = 0usize;
    for path in &args.images {
        let source = RawImageSource::from_path(path, ImageOrigin::FilePicker)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let staged = match app.upload(source) {
            Ok(staged) => staged,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping image");
                failures += 1;
                continue;
            }
        };

        let job = app.analyze(staged.job.id).await?;
        println!("{}", path.display());
        print!("{}", app.view().to_text());
        if job.status != JobStatus::Completed {
            failures += 1;
        }
        app.reset()?;
    }

    app.auth().sign_out().await?;
    drop(app);
    if let Err(e) = watcher.await {
        warn!(error = %e, "Provider watcher ended abnormally");
    }

    if failures > 0 {
        bail!("{} of {} images could not be analyzed", failures, args.images.len());
    }
    info!("Session complete");
    Ok(())
}
