use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::multipart;

#[derive(Parser)]
#[command(name = "percept", about = "Percept vision API client", version)]
struct Cli {
    /// Base URL of the percept daemon
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    server: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the currency denomination in an image
    Currency { image: PathBuf },
    /// Detect objects in an image
    Objects { image: PathBuf },
    /// Enroll reference photos for a person
    AddFace {
        /// Person's name, used as the gallery label
        name: String,
        /// One or more JPEG or PNG photos
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Recognize known faces in an image
    Recognize { image: PathBuf },
    /// Extract the text visible in an image
    ReadText { image: PathBuf },
    /// Recognize the activity in a video clip
    Activity { video: PathBuf },
    /// Describe the contents of an image
    Describe { image: PathBuf },
    /// Show daemon status and gallery size
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.server.trim_end_matches('/').to_string();

    let response = match cli.command {
        Commands::Currency { image } => {
            post_file(&client, &base, "detect_currency", &image).await?
        }
        Commands::Objects { image } => {
            post_file(&client, &base, "object_detection", &image).await?
        }
        Commands::AddFace { name, images } => {
            let mut form = multipart::Form::new().text("name", name);
            for image in &images {
                form = form.part("files", file_part(image).await?);
            }
            client
                .post(format!("{base}/add_face"))
                .multipart(form)
                .send()
                .await
                .context("sending request")?
        }
        Commands::Recognize { image } => {
            post_file(&client, &base, "recognize_face", &image).await?
        }
        Commands::ReadText { image } => post_file(&client, &base, "read_text", &image).await?,
        Commands::Activity { video } => {
            post_file(&client, &base, "activity_recognition", &video).await?
        }
        Commands::Describe { image } => {
            post_file(&client, &base, "describe_image", &image).await?
        }
        Commands::Health => client
            .get(format!("{base}/health"))
            .send()
            .await
            .context("sending request")?,
    };

    let status = response.status();
    let body: serde_json::Value = response.json().await.context("decoding response body")?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        bail!("server returned {status}");
    }
    Ok(())
}

async fn post_file(
    client: &reqwest::Client,
    base: &str,
    endpoint: &str,
    path: &Path,
) -> Result<reqwest::Response> {
    let form = multipart::Form::new().part("file", file_part(path).await?);
    client
        .post(format!("{base}/{endpoint}"))
        .multipart(form)
        .send()
        .await
        .context("sending request")
}

async fn file_part(path: &Path) -> Result<multipart::Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let part = multipart::Part::bytes(bytes)
        .file_name(filename)
        .mime_str(mime_for(path))?;
    Ok(part)
}

/// MIME type from the file extension; the server validates face
/// uploads by content type.
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        _ => "image/jpeg",
    }
}
