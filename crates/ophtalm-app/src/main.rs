#![warn(missing_docs)]
//! # ophtalm binary
//!
//! Command-line entry point: analyses one fundus image against the
//! configured inference endpoint.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use ophtalm_app::{AppConfig, AppError, http_controller, load_image, project_session_view};

#[derive(Parser)]
#[command(name = "ophtalm", version = ophtalm_app::APP_VERSION, about = "Glaucoma screening client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a fundus image and print the assessment
    Analyze {
        /// Path to the fundus image
        image: PathBuf,

        /// Endpoint base URL (overrides OPHTALM_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Request deadline in seconds (overrides OPHTALM_TIMEOUT_SECS)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the build version
    Version,
}

/// CLI entry point.
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("ophtalm {}", ophtalm_app::app_version());
            ExitCode::SUCCESS
        }
        Commands::Analyze {
            image,
            endpoint,
            timeout_secs,
            json,
        } => {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(error) => {
                    eprintln!("failed to start runtime: {error}");
                    return ExitCode::FAILURE;
                }
            };

            match runtime.block_on(analyze(image, endpoint, timeout_secs, json)) {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    error!(target: "app", "analysis failed: {error}");
                    eprintln!("{error}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn analyze(
    image: PathBuf,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    json: bool,
) -> Result<(), AppError> {
    let config = AppConfig::from_env()?.with_overrides(endpoint, timeout_secs)?;
    if config.is_insecure_remote() {
        warn!(
            target: "app",
            "endpoint {} sends images over plain http",
            config.endpoint_base
        );
    }
    info!(
        target: "app",
        "config: endpoint={} timeout_ms={}",
        config.endpoint_base,
        config.timeout.as_millis()
    );

    let mut controller = http_controller(&config)?;
    let abort = controller.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.cancel();
        }
    });

    let file = load_image(&image).await?;
    controller.select_and_preview(file).await;
    let outcome = controller.submit().await;

    let view = project_session_view(controller.session());
    match outcome {
        Ok(result) if json => match serde_json::to_string_pretty(&result) {
            Ok(rendered) => println!("{rendered}"),
            Err(error) => warn!(target: "app", "json rendering failed: {error}"),
        },
        Ok(_) => print!("{view}"),
        Err(error) => {
            print!("{view}");
            return Err(error.into());
        }
    }
    Ok(())
}
