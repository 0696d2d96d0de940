mod commands;
mod config;
mod repl;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{AccessToken, HttpDocumentService, SessionContext, WorkspaceController};
use shared::domain::ExportFormat;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(name = "quill", about = "Interactive client for the document generation service")]
struct Args {
    /// Read settings from this file instead of the default locations.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Document type recorded on saved projects (pdf, docx, pptx).
    #[arg(long, value_parser = parse_doc_type)]
    doc_type: Option<ExportFormat>,
    #[arg(long)]
    export_dir: Option<PathBuf>,
    #[arg(long)]
    log_filter: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            server_url: self.server_url.clone(),
            request_timeout_secs: self.timeout_secs,
            doc_type: self.doc_type,
            export_dir: self.export_dir.clone(),
            log_filter: self.log_filter.clone(),
        }
    }
}

fn parse_doc_type(raw: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(raw).ok_or_else(|| format!("unsupported document type '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = config::load_settings(&args.overrides())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = Arc::new(
        match settings.token.clone().and_then(AccessToken::new) {
            Some(token) => SessionContext::with_token(token),
            None => SessionContext::new(),
        },
    );
    let http = Arc::new(HttpDocumentService::with_timeout(
        &settings.server_url,
        session.clone(),
        settings.request_timeout(),
    )?);

    match http.health().await {
        Ok(message) => info!(server = %http.base_url(), %message, "backend reachable"),
        Err(err) => warn!(server = %http.base_url(), error = %err, "backend health check failed"),
    }

    let workspace =
        WorkspaceController::new_with_doc_type(http.clone(), session.clone(), settings.doc_type);

    repl::run(repl::Repl {
        settings,
        session,
        http,
        workspace,
    })
    .await
}
