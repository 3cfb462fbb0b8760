use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{Value, json};
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

#[derive(Parser)]
#[command(
    name = "lexa-upload",
    about = "Submit a directory of documents to the Lexa AI bulk ingestion endpoint"
)]
struct Cli {
    /// Base URL of the running service.
    #[arg(long, env = "LEXA_SERVER_URL", default_value = "http://127.0.0.1:8000")]
    server: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload every pdf, docx, and txt file under a directory as one bulk job.
    Upload {
        /// Directory to walk.
        #[arg(long)]
        dir: PathBuf,
        /// Category applied to every file.
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated tags applied to every file.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Uploading user recorded on the job and the stored chunks.
        #[arg(long)]
        user: Option<String>,
        /// Seconds between job status polls.
        #[arg(long, default_value_t = 2)]
        poll_interval: u64,
        /// Return right after the job is accepted.
        #[arg(long)]
        no_wait: bool,
    },
    /// Print the status of an existing job.
    Status {
        /// Job identifier returned by `upload`.
        job_id: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accepted {
    job_id: String,
    total: usize,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: String,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    processed: usize,
    #[serde(default)]
    errors: Vec<String>,
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}

/// Returns `false` when the job ended in the failed state.
async fn run() -> Result<bool> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .user_agent("lexa-upload/0.1")
        .build()
        .context("failed to build HTTP client")?;
    let server = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Command::Upload {
            dir,
            category,
            tags,
            user,
            poll_interval,
            no_wait,
        } => {
            let files = collect_files(&dir, category.as_deref(), &tags)?;
            if files.is_empty() {
                bail!("no pdf, docx, or txt files found under {}", dir.display());
            }
            println!("Submitting {} file(s) from {}", files.len(), dir.display());

            let accepted = submit(&client, &server, files, user).await?;
            println!("Job {} accepted ({} files)", accepted.job_id, accepted.total);
            if no_wait {
                return Ok(true);
            }

            let status = wait_for_job(
                &client,
                &server,
                &accepted.job_id,
                Duration::from_secs(poll_interval.max(1)),
            )
            .await?;
            report(&status);
            Ok(status.status != "failed")
        }
        Command::Status { job_id } => {
            let status = fetch_status(&client, &server, &job_id).await?;
            report(&status);
            Ok(status.status != "failed")
        }
    }
}

fn collect_files(dir: &Path, category: Option<&str>, tags: &[String]) -> Result<Vec<Value>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
    {
        let bytes = fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        let filename = entry.file_name().to_string_lossy().into_owned();

        let mut file = json!({
            "filename": filename,
            "content_b64": STANDARD.encode(bytes),
            "tags": tags,
        });
        if let Some(category) = category {
            file["category"] = Value::String(category.to_string());
        }
        files.push(file);
    }
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

async fn submit(
    client: &reqwest::Client,
    server: &str,
    files: Vec<Value>,
    user: Option<String>,
) -> Result<Accepted> {
    let response = client
        .post(format!("{server}/ingest/bulk"))
        .json(&json!({ "files": files, "userId": user }))
        .send()
        .await
        .with_context(|| format!("failed to reach {server}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("bulk ingest rejected ({status}): {body}");
    }
    response
        .json()
        .await
        .context("failed to decode bulk ingest response")
}

async fn fetch_status(client: &reqwest::Client, server: &str, job_id: &str) -> Result<JobStatus> {
    let response = client
        .get(format!("{server}/ingest/jobs/{job_id}"))
        .send()
        .await
        .with_context(|| format!("failed to reach {server}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("job {job_id} not available ({status})");
    }
    response
        .json()
        .await
        .context("failed to decode job status")
}

async fn wait_for_job(
    client: &reqwest::Client,
    server: &str,
    job_id: &str,
    interval: Duration,
) -> Result<JobStatus> {
    loop {
        let status = fetch_status(client, server, job_id).await?;
        if status.status != "processing" {
            return Ok(status);
        }
        println!("  {}/{} processed", status.processed, status.total);
        tokio::time::sleep(interval).await;
    }
}

fn report(status: &JobStatus) {
    println!(
        "Job {}: {}/{} processed, {} error(s)",
        status.status,
        status.processed,
        status.total,
        status.errors.len()
    );
    for error in &status.errors {
        println!("  - {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_supported_extensions_are_collected() {
        assert!(is_supported(Path::new("a/handbook.PDF")));
        assert!(is_supported(Path::new("notes.txt")));
        assert!(is_supported(Path::new("memo.docx")));
        assert!(!is_supported(Path::new("sheet.csv")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn collected_files_carry_base64_content_and_metadata() {
        let dir = std::env::temp_dir().join(format!("lexa-upload-{}", std::process::id()));
        fs::create_dir_all(dir.join("nested")).expect("dirs");
        fs::write(dir.join("nested/one.txt"), b"hello").expect("write");
        fs::write(dir.join("skip.csv"), b"a,b").expect("write");

        let files = collect_files(&dir, Some("HR"), &["policy".into()]).expect("collect");
        fs::remove_dir_all(&dir).ok();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["filename"], "one.txt");
        assert_eq!(files[0]["content_b64"], STANDARD.encode(b"hello"));
        assert_eq!(files[0]["category"], "HR");
        assert_eq!(files[0]["tags"], json!(["policy"]));
    }
}
