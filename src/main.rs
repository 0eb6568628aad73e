use clap::Parser;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};

use job_yield::{JobScraper, Output, ScraperConfig};

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ScraperConfig::from_file(path)?,
        None => ScraperConfig::default(),
    };
    let config = args.apply(config);

    if config.fetch.backend == job_yield::config::FetchBackend::Webdriver {
        ::log::info!(
            "WebDriver backend selected; set WEBDRIVER_URL if not using {}",
            config.fetch.webdriver_url
        );
    }

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let (mut rx, handle) = JobScraper::new(config).generate().await?;

    let start_time = std::time::Instant::now();
    let mut written = 0;
    while let Some(output) = rx.recv().await {
        write_output(&mut sink, &output)?;
        written += 1;
    }
    sink.flush()?;

    let summary = handle.await?;
    ::log::info!(
        "Crawl complete - wrote {} records in {:.2} seconds",
        written,
        start_time.elapsed().as_secs_f64()
    );
    ::log::info!("Summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Write one item as a JSON line
fn write_output(sink: &mut dyn Write, output: &Output) -> Result<(), Box<dyn std::error::Error>> {
    serde_json::to_writer(&mut *sink, output)?;
    sink.write_all(b"\n")?;
    Ok(())
}
