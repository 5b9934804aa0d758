//! Deduplicate a processed RFID export, reconcile it against a reference file and upload it.
use anyhow::{Context, Error};
use envconfig::Envconfig;

use epc_dispose::{config::Config, pipeline, upload::Uploader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
pub async fn main() -> Result<(), Error> {
    setup_tracing();

    let config = Config::init_from_env().context("invalid configuration")?;
    let uploader = Uploader::from_config(&config)?;

    info!(
        input = %config.input_path.display(),
        reference = %config.reference_path.display(),
        batch_size = uploader.batch_size(),
        "starting dispose run"
    );

    let report = match pipeline::run(&config.input_path, &config.reference_path, &uploader).await
    {
        Ok(report) => report,
        Err(e) => {
            error!("dispose run failed: {}", e);
            return Err(e.into());
        }
    };

    let result = report.outcome.to_string();
    println!("{result}");
    println!("{}", result.matches(',').count() + 1);

    Ok(())
}
