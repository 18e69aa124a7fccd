//! batchgate-cli: command-line counterpart of the gateway.
//!
//! `preview` drives the same session the interactive client uses, including the lenient
//! options override and download-all.

mod args;
mod print;

use std::path::{Path, PathBuf};

use batchgate::client::{ClientError, GatewayClient, Session};
use batchgate::domain::options::ProcessingOptions;
use batchgate::domain::uploads::UploadItem;
use clap::Parser;

use args::{BatchArgs, Cli, Commands, PreviewArgs, ProcessArgs};
use print::{print_json, print_status, print_warning};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.gateway)?;

    match cli.command {
        Commands::Health => print_json(&client.health().await?)?,
        Commands::Process(args) => process(&client, args).await?,
        Commands::Preview(args) => preview(&client, args).await?,
    }

    Ok(())
}

async fn process(client: &GatewayClient, args: ProcessArgs) -> Result<(), ClientError> {
    let files = read_files(&args.batch.files).await?;
    let manual = read_override(&args.batch).await?;
    let (options, ignored) = ProcessingOptions::interactive(args.batch.shadow, manual.as_deref());
    if let Some(ignored) = ignored {
        print_warning(&format!("ignoring options override: {}", ignored.reason));
    }

    let download = client.process(&files, &options).await?;
    let target = args
        .out
        .unwrap_or_else(|| PathBuf::from(safe_file_name(&download.filename)));
    tokio::fs::write(&target, &download.body).await?;
    println!("{}", target.display());
    Ok(())
}

async fn preview(client: &GatewayClient, args: PreviewArgs) -> Result<(), ClientError> {
    let files = read_files(&args.batch.files).await?;
    let manual = read_override(&args.batch).await?;

    let mut session = Session::new(client.base().clone());
    let outcome = session
        .submit(client, &files, args.batch.shadow, manual.as_deref())
        .await;
    for warning in session.warnings() {
        print_warning(warning);
    }
    if let Some(status) = session.status() {
        print_status(status);
    }
    outcome?;

    tokio::fs::create_dir_all(&args.out_dir).await?;
    for item in session.gallery() {
        let payload = item.locator().read(client).await?;
        let target = args.out_dir.join(safe_file_name(item.download_name()));
        tokio::fs::write(&target, &payload).await?;
        println!("{}", target.display());
    }

    if args.zip {
        let bundle = session.download_all(client).await?;
        for skipped in &bundle.skipped {
            print_warning(&format!(
                "result #{} left out of the archive: {}",
                skipped.position, skipped.reason
            ));
        }
        let target = args.out_dir.join(&bundle.filename);
        tokio::fs::write(&target, &bundle.body).await?;
        println!("{}", target.display());
    }

    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<UploadItem>, ClientError> {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::InputFile {
                path: path.display().to_string(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        items.push(UploadItem::new(filename, None, bytes));
    }
    Ok(items)
}

async fn read_override(args: &BatchArgs) -> Result<Option<String>, ClientError> {
    match &args.options_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map(Some)
            .map_err(|source| ClientError::InputFile {
                path: path.display().to_string(),
                source,
            }),
        None => Ok(args.options.clone()),
    }
}

/// Keep only the final path component of a server-suggested name.
fn safe_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "download.bin".to_string())
}
