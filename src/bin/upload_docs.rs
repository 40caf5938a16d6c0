//! Bulk uploader: walks a directory and posts every matching file to a running server.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "upload-docs",
    about = "Upload a directory of documents to the knowledge base"
)]
struct Cli {
    /// Base URL of the knowledge-rag server.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server: String,
    /// File extensions to upload (repeatable).
    #[arg(long = "extension", default_values = ["txt", "md"])]
    extensions: Vec<String>,
    /// Directory to scan recursively.
    dir: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let files = collect_files(&cli.dir, &cli.extensions)?;
    if files.is_empty() {
        println!("No matching files under {}", cli.dir.display());
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .user_agent("knowledge-rag/upload-docs")
        .build()
        .context("failed to build HTTP client")?;
    let endpoint = format!("{}/upload", cli.server.trim_end_matches('/'));

    let mut failures = 0usize;
    for path in &files {
        match upload(&client, &endpoint, path).await {
            Ok(chunks) => println!("ok    {} ({chunks} chunks)", path.display()),
            Err(err) => {
                failures += 1;
                println!("error {}: {err:#}", path.display());
            }
        }
    }

    println!("{} uploaded, {failures} failed", files.len() - failures);
    if failures > 0 {
        bail!("{failures} upload(s) failed");
    }
    Ok(())
}

fn collect_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| ext.eq_ignore_ascii_case(wanted.trim_start_matches('.')))
        })
}

async fn upload(client: &reqwest::Client, endpoint: &str, path: &Path) -> Result<u64> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("file name is not valid UTF-8")?
        .to_string();

    let form = Form::new().part("file", Part::bytes(bytes).file_name(filename));
    let response = client
        .post(endpoint)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .with_context(|| format!("server answered {status} with a non-JSON body"))?;
    if !status.is_success() {
        let message = body["message"].as_str().unwrap_or("no message");
        bail!("server answered {status}: {message}");
    }
    Ok(body["chunks_added"].as_u64().unwrap_or_default())
}
