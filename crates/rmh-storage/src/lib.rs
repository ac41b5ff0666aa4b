//! HTTP fetch utilities + atomic dataset artifact publishing for RMH.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use rmh_core::NormalizedMeeting;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "rmh-storage";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Thin GET-only client. Fetches are issued one at a time by callers; there is
/// no retry or backoff, a failed fetch fails the enclosing adapter.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    pub async fn fetch_text(
        &self,
        run_id: Uuid,
        source_id: &str,
        url: &str,
    ) -> Result<String, FetchError> {
        let span = info_span!("http_fetch", %run_id, source_id, url);
        async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let final_url = response.url().to_string();

            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: final_url,
                });
            }

            Ok(response.text().await?)
        }
        .instrument(span)
        .await
    }
}

/// Writes dataset artifacts all-or-nothing: a publish lands via temp-file plus
/// atomic rename, and `clear` removes the artifact so a failed run leaves
/// "no file" rather than a stale one.
#[derive(Debug, Clone)]
pub struct Publisher {
    root: PathBuf,
}

impl Publisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, artifact: &str) -> PathBuf {
        self.root.join(artifact)
    }

    /// Serializes `records` as a JSON array and atomically replaces the
    /// artifact's previous content.
    pub async fn publish(
        &self,
        artifact: &str,
        records: &[NormalizedMeeting],
    ) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(records)
            .with_context(|| format!("serializing records for {artifact}"))?;

        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating output directory {}", self.root.display()))?;

        let target = self.artifact_path(artifact);
        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));

        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp artifact file {}", temp_path.display()))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("writing temp artifact file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp artifact file {}", temp_path.display()))?;
        drop(file);

        match fs::rename(&temp_path, &target).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(err).with_context(|| {
                    format!(
                        "atomically renaming temp artifact {} -> {}",
                        temp_path.display(),
                        target.display()
                    )
                })
            }
        }
    }

    /// Removes the artifact. An absent artifact is a no-op, not an error.
    pub async fn clear(&self, artifact: &str) -> anyhow::Result<()> {
        let target = self.artifact_path(artifact);
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("removing artifact {}", target.display()))
            }
        }
    }
}
