//! Dataset orchestration: run each dataset's adapters in order, merge their
//! output, and publish all-or-nothing.
//!
//! A dataset either ends the run with a complete, internally consistent
//! artifact or with no artifact at all: the first adapter failure aborts the
//! dataset and clears any pre-existing output. The two regional datasets are
//! independent pipelines; one aborting never affects the other.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rmh_adapters::{aa_boston, indy_aa, na_org, nerna, SourceAdapter};
use rmh_core::NormalizedMeeting;
use rmh_storage::{HttpFetcher, Publisher};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "rmh-pipeline";

/// Fixed output directory; artifact names are constants of the design, not
/// runtime configuration.
pub const OUTPUT_DIR: &str = "public";

pub struct Dataset {
    pub name: &'static str,
    pub artifact: &'static str,
    pub adapters: Vec<Box<dyn SourceAdapter>>,
}

pub fn boston_dataset() -> Dataset {
    Dataset {
        name: "boston",
        artifact: "output.json",
        adapters: vec![Box::new(aa_boston()), Box::new(nerna()), Box::new(na_org())],
    }
}

pub fn indiana_dataset() -> Dataset {
    Dataset {
        name: "indiana",
        artifact: "bhtc.json",
        adapters: vec![Box::new(indy_aa())],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetRunSummary {
    pub run_id: Uuid,
    pub dataset: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: usize,
    pub source_counts: BTreeMap<String, usize>,
}

/// Runs one dataset to completion. Adapters execute sequentially in their
/// fixed order; outputs are concatenated in adapter order, then per-adapter
/// emission order.
pub async fn run_dataset(
    http: &HttpFetcher,
    publisher: &Publisher,
    dataset: &Dataset,
) -> Result<DatasetRunSummary> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();

    let mut merged: Vec<NormalizedMeeting> = Vec::new();
    for adapter in &dataset.adapters {
        match adapter.scrape(http, run_id).await {
            Ok(batch) => {
                info!(
                    %run_id,
                    dataset = dataset.name,
                    source = adapter.source().as_str(),
                    records = batch.len(),
                    "adapter finished"
                );
                merged.extend(batch);
            }
            Err(err) => {
                warn!(
                    %run_id,
                    dataset = dataset.name,
                    source = adapter.source().as_str(),
                    error = %err,
                    "adapter failed, clearing dataset artifact"
                );
                publisher.clear(dataset.artifact).await.with_context(|| {
                    format!("clearing {} after adapter failure", dataset.artifact)
                })?;
                return Err(anyhow::Error::new(err)).with_context(|| {
                    format!("dataset {} aborted by {}", dataset.name, adapter.source())
                });
            }
        }
    }

    if let Err(err) = publisher.publish(dataset.artifact, &merged).await {
        publisher
            .clear(dataset.artifact)
            .await
            .with_context(|| format!("clearing {} after publish failure", dataset.artifact))?;
        return Err(err).with_context(|| format!("publishing dataset {}", dataset.name));
    }

    let mut source_counts: BTreeMap<String, usize> = BTreeMap::new();
    for meeting in &merged {
        *source_counts
            .entry(meeting.source.as_str().to_string())
            .or_default() += 1;
    }

    Ok(DatasetRunSummary {
        run_id,
        dataset: dataset.name,
        started_at,
        finished_at: Utc::now(),
        records: merged.len(),
        source_counts,
    })
}

/// Runs both regional datasets. Their outcomes are independent; a failure in
/// one is reported alongside the other's success.
pub async fn run_all(
    http: &HttpFetcher,
    publisher: &Publisher,
) -> Vec<(&'static str, Result<DatasetRunSummary>)> {
    let boston = boston_dataset();
    let indiana = indiana_dataset();

    let (boston_outcome, indiana_outcome) = tokio::join!(
        run_dataset(http, publisher, &boston),
        run_dataset(http, publisher, &indiana),
    );

    vec![(boston.name, boston_outcome), (indiana.name, indiana_outcome)]
}
