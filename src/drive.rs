use crate::config::DriveSource;
use crate::loader::read_csv;
use crate::{Error, Result};
use chrono::Utc;
use polars::prelude::*;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const BASE_URL: &str = "https://drive.google.com/uc";
const MAX_ATTEMPTS: usize = 2;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

pub struct DriveClient {
    client: Client,
    base_url: String,
}

impl DriveClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn download_url(&self, file_id: &str) -> String {
        format!("{}?export=download&id={}&confirm=t", self.base_url, file_id)
    }

    /// Streams the file behind `file_id` into `dest`.
    pub fn download_csv(&self, file_id: &str, dest: &Path) -> Result<u64> {
        let url = self.download_url(file_id);
        let mut response = self.request_with_retry(&url)?;

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("text/html"))
            .unwrap_or(false);
        if is_html {
            return Err(Error::Download {
                url,
                reason: "received an HTML page instead of file contents".to_string(),
            });
        }

        let mut file = File::create(dest)?;
        let written = io::copy(&mut response, &mut file)?;
        Ok(written)
    }

    fn request_with_retry(&self, url: &str) -> Result<Response> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = self.client.get(url).send()?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= MAX_ATTEMPTS {
                    return Err(Error::Download {
                        url: url.to_string(),
                        reason: "too many requests".to_string(),
                    });
                }

                let wait = parse_retry_after(&response).unwrap_or(DEFAULT_RETRY_AFTER);
                warn!(url, wait_secs = wait.as_secs(), "Rate limited, retrying");
                sleep(wait);
                continue;
            }

            if !response.status().is_success() {
                return Err(Error::Download {
                    url: url.to_string(),
                    reason: format!("status {}", response.status()),
                });
            }

            return Ok(response);
        }
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Rewrites a CSV file as parquet. Returns the number of rows.
pub fn convert_csv_to_parquet(csv_path: &Path, parquet_path: &Path) -> Result<usize> {
    let mut df = read_csv(csv_path)?;
    let mut file = File::create(parquet_path)?;
    ParquetWriter::new(&mut file).finish(&mut df)?;
    Ok(df.height())
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchSummary {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<String>,
}

/// Downloads each source and converts it to parquet under `out_dir`.
///
/// Sources are processed one after another. A failing source is logged and
/// recorded in the summary; the rest still run.
pub fn fetch_sources(
    client: &DriveClient,
    sources: &[DriveSource],
    out_dir: &Path,
    keep_csv: bool,
) -> Result<FetchSummary> {
    fs::create_dir_all(out_dir)?;

    let mut summary = FetchSummary::default();
    let total = sources.len();
    let start = Instant::now();

    for (idx, source) in sources.iter().enumerate() {
        info!(
            index = idx + 1,
            total,
            file_id = %source.file_id,
            parquet_file = %source.parquet_file,
            "Downloading source"
        );

        match fetch_one(client, source, out_dir, keep_csv) {
            Ok((path, rows)) => {
                info!(path = %path.display(), rows, "Converted to parquet");
                summary.converted.push(path);
            }
            Err(err) => {
                error!(file_id = %source.file_id, error = %err, "Fetch failed");
                summary.failed.push(source.file_id.clone());
            }
        }
    }

    info!(
        converted = summary.converted.len(),
        failed = summary.failed.len(),
        elapsed_secs = start.elapsed().as_secs(),
        finished_at = %Utc::now().to_rfc3339(),
        "Fetch complete"
    );

    Ok(summary)
}

fn fetch_one(
    client: &DriveClient,
    source: &DriveSource,
    out_dir: &Path,
    keep_csv: bool,
) -> Result<(PathBuf, usize)> {
    let parquet_path = out_dir.join(&source.parquet_file);
    let csv_path = download_path(&parquet_path);

    let converted = client
        .download_csv(&source.file_id, &csv_path)
        .and_then(|bytes| {
            info!(path = %csv_path.display(), bytes, "Downloaded CSV");
            convert_csv_to_parquet(&csv_path, &parquet_path)
        });

    if !keep_csv && csv_path.exists() {
        if let Err(err) = fs::remove_file(&csv_path) {
            warn!(path = %csv_path.display(), error = %err, "Could not remove downloaded CSV");
        }
    }

    Ok((parquet_path, converted?))
}

/// `<stem>.download.csv` next to the parquet target.
fn download_path(parquet_path: &Path) -> PathBuf {
    let stem = parquet_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    parquet_path.with_file_name(format!("{stem}.download.csv"))
}
