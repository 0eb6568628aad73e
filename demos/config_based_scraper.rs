use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use job_yield::{JobScraper, Output};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to scraper configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Override the number of records wanted
    #[arg(short, long)]
    results_wanted: Option<usize>,

    /// Override max concurrency
    #[arg(short = 'n', long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();

    // Load configuration from file
    let mut scraper = JobScraper::from_config_file(&args.config)?;

    let config = scraper.config();
    println!("Scraper configuration:");
    println!("  Source: {}", config.site.source);
    println!("  Seed URLs: {:?}", config.seed_urls()?);
    println!("  Collect details: {}", config.collect_details);
    println!("  Results wanted: {}", config.results_wanted);
    println!("  Max pages: {}", config.max_pages);

    // Apply overrides if specified
    if let Some(results_wanted) = args.results_wanted {
        println!("Overriding results wanted: {}", results_wanted);
        scraper = scraper.with_results_wanted(results_wanted);
    }
    if let Some(concurrency) = args.concurrency {
        println!("Overriding max concurrency: {}", concurrency);
        scraper = scraper.with_max_concurrency(concurrency);
    }

    let (mut rx, handle) = scraper.generate().await?;

    let start_time = std::time::Instant::now();
    let mut received = 0;
    while let Some(output) = rx.recv().await {
        received += 1;
        match &output {
            Output::Job(job) => println!(
                "Record {}: {} | {} | {}",
                received,
                job.title.as_deref().unwrap_or("-"),
                job.company.as_deref().unwrap_or("-"),
                job.url
            ),
            Output::Link(link) => {
                println!("Link {} (page {}): {}", received, link.page_no, link.url)
            }
        }
    }

    let summary = handle.await?;
    println!(
        "Scraping complete. Received {} items in {:.2} seconds.",
        received,
        start_time.elapsed().as_secs_f64()
    );
    println!("Summary: {:?}", summary);

    Ok(())
}
