use anyhow::Result;
use rmh_pipeline::{run_all, OUTPUT_DIR};
use rmh_storage::{HttpClientConfig, HttpFetcher, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let http = HttpFetcher::new(HttpClientConfig::default())?;
    let publisher = Publisher::new(OUTPUT_DIR);

    let mut failed = false;
    for (name, outcome) in run_all(&http, &publisher).await {
        match outcome {
            Ok(summary) => {
                let counts = summary
                    .source_counts
                    .iter()
                    .map(|(source, count)| format!("{source}={count}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "{name}: run_id={} records={} {counts}",
                    summary.run_id, summary.records
                );
            }
            Err(err) => {
                failed = true;
                eprintln!("{name}: run failed: {err:#}");
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
