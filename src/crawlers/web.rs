use scraper::Html;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use url::Url;

use super::frontier::{CrawlRequest, CrawlSummary, Frontier, FrontierState, Label};
use super::listing::{BlockDetector, ListingPage, ListingRules};
use crate::config::ScraperConfig;
use crate::error::ConfigError;
use crate::fetch::{self, FetchedPage, Fetcher};
use crate::links::LinkFilter;
use crate::reconcile::Reconciler;
use crate::results::{DiscoveredLink, JobRecord, Output};
use crate::text;

/// Capacity of the result channel
const RESULT_BUFFER: usize = 10_000;

/// Everything the workers share for one run
struct CrawlContext<F> {
    fetcher: Arc<F>,
    filter: LinkFilter,
    listing: ListingRules,
    blocks: BlockDetector,
    reconciler: Reconciler,
    state: Mutex<FrontierState>,
    frontier: Frontier,
    result_tx: mpsc::Sender<Output>,
    collect_details: bool,
    max_jitter_ms: u64,
    source: String,
}

/// What the blocking analysis of a fetched page found
enum PageOutcome {
    Blocked,
    Listing(ListingPage),
    Detail(Box<JobRecord>),
}

/// Starts a crawl and returns a receiver that yields records as they are
/// produced, plus a handle resolving to the run's counters once every worker
/// has stopped.
///
/// # Arguments
///
/// * `config` - Crawl configuration, clamped before use
/// * `fetcher` - Fetch service resolving URLs to page bodies
pub async fn start<F: Fetcher>(
    config: ScraperConfig,
    fetcher: Arc<F>,
) -> Result<(mpsc::Receiver<Output>, JoinHandle<CrawlSummary>), ConfigError> {
    let config = config.normalized();
    let seeds = config.seed_urls()?;

    ::log::info!(
        "Starting crawl from {} seed(s): results_wanted={}, max_pages={}, collect_details={}, concurrency={}",
        seeds.len(),
        config.results_wanted,
        config.max_pages,
        config.collect_details,
        config.max_concurrency
    );

    let (result_tx, result_rx) = mpsc::channel::<Output>(RESULT_BUFFER);
    let ctx = Arc::new(CrawlContext {
        fetcher,
        filter: LinkFilter::new(&config.site)?,
        listing: ListingRules::new(&config.site)?,
        blocks: BlockDetector::new(&config.site),
        reconciler: Reconciler::new(&config)?,
        state: Mutex::new(FrontierState::from_config(&config)),
        frontier: Frontier::new(),
        result_tx,
        collect_details: config.collect_details,
        max_jitter_ms: config.fetch.max_jitter_ms,
        source: config.site.source.clone(),
    });

    seed(&ctx, seeds).await;

    let monitor = spawn_workers(config.max_concurrency, ctx);
    Ok((result_rx, monitor))
}

/// Queues the seed URLs.
///
/// A seed that is itself a job page is treated as a detail request, or
/// emitted directly as a link when details are not collected.
async fn seed<F: Fetcher>(ctx: &Arc<CrawlContext<F>>, seeds: Vec<Url>) {
    for url in seeds {
        let url = ctx.filter.normalize_url(&url);
        if !ctx.filter.is_job_link(&url) {
            ctx.frontier.push(CrawlRequest::list(url, 1)).await;
            continue;
        }

        let job_url = ctx.filter.canonical_job_url(&url);
        if !ctx.state.lock().await.try_claim_job(&job_url) {
            continue;
        }
        if ctx.collect_details {
            ctx.frontier.push(CrawlRequest::detail(job_url, 0)).await;
        } else if !emit_link(ctx, &job_url, &url, 0).await {
            return;
        }
    }
}

/// Spawns the workers and returns a task that waits for all of them
fn spawn_workers<F: Fetcher>(
    max_concurrency: usize,
    ctx: Arc<CrawlContext<F>>,
) -> JoinHandle<CrawlSummary> {
    let workers: Vec<JoinHandle<()>> = (0..max_concurrency)
        .map(|worker_id| spawn_worker(worker_id, Arc::clone(&ctx)))
        .collect();

    tokio::spawn(async move {
        for (worker_id, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                ::log::error!("Worker {} terminated abnormally: {}", worker_id, e);
            }
        }
        ::log::info!("All {} workers have completed", max_concurrency);

        let summary = ctx.state.lock().await.summary();
        // Dropping the context drops the last result sender and closes the channel
        drop(ctx);
        summary
    })
}

fn spawn_worker<F: Fetcher>(worker_id: usize, ctx: Arc<CrawlContext<F>>) -> JoinHandle<()> {
    ::log::trace!("Spawning worker {}", worker_id);
    tokio::spawn(async move {
        worker_processing_loop(worker_id, &ctx).await;
    })
}

/// Pulls requests until the frontier is drained or closed
async fn worker_processing_loop<F: Fetcher>(worker_id: usize, ctx: &Arc<CrawlContext<F>>) {
    ::log::debug!("Worker {} starting processing loop", worker_id);

    while let Some(request) = ctx.frontier.next().await {
        ::log::trace!("Worker {} processing: {}", worker_id, request.url);
        match request.label {
            Label::List => process_list(worker_id, ctx, request).await,
            Label::Detail => process_detail(worker_id, ctx, request).await,
        }
        ctx.frontier.done();

        if ctx.state.lock().await.is_exhausted() && !ctx.frontier.is_closed() {
            ::log::info!("Result budget reached, stopping the crawl");
            ctx.frontier.close();
        }
    }

    ::log::debug!("Worker {} completed processing loop", worker_id);
}

async fn process_list<F: Fetcher>(worker_id: usize, ctx: &Arc<CrawlContext<F>>, request: CrawlRequest) {
    if !ctx.state.lock().await.try_visit_list(&request.url) {
        ::log::trace!("Worker {} skipping already visited: {}", worker_id, request.url);
        return;
    }

    let Some(page) = fetch_page(worker_id, ctx, &request).await else {
        return;
    };
    let final_url = ctx.filter.normalize_url(&page.final_url);
    if final_url != request.url && !ctx.state.lock().await.try_visit_list(&final_url) {
        ::log::debug!("{} redirected to already visited {}", request.url, final_url);
        return;
    }

    let listing = match analyze(ctx, Label::List, final_url.clone(), page.body).await {
        Some(PageOutcome::Listing(listing)) => listing,
        Some(PageOutcome::Blocked) => {
            handle_block(ctx, &final_url).await;
            return;
        }
        Some(PageOutcome::Detail(_)) | None => {
            ctx.state.lock().await.record_abandoned();
            return;
        }
    };

    let (claimed, next_page) = {
        let mut state = ctx.state.lock().await;
        state.record_list_page();
        let claimed = state.claim_jobs(&listing.job_links);
        let next_page = listing
            .next_page
            .filter(|next| state.should_paginate(request.page_no) && !state.is_list_visited(next));
        (claimed, next_page)
    };

    ::log::info!(
        "Listing page {} ({}): {} job links, {} new",
        request.page_no,
        final_url,
        listing.job_links.len(),
        claimed.len()
    );

    for job_url in claimed {
        if ctx.collect_details {
            ctx.frontier
                .push(CrawlRequest::detail(job_url, request.page_no))
                .await;
        } else if !emit_link(ctx, &job_url, &final_url, request.page_no).await {
            return;
        }
    }

    if let Some(next) = next_page {
        ctx.frontier
            .push(CrawlRequest::list(next, request.page_no + 1))
            .await;
    }
}

async fn process_detail<F: Fetcher>(
    worker_id: usize,
    ctx: &Arc<CrawlContext<F>>,
    request: CrawlRequest,
) {
    let skip = {
        let mut state = ctx.state.lock().await;
        let skip = !state.should_process_detail();
        if skip {
            state.settle_detail(false);
        }
        skip
    };
    if skip {
        ::log::trace!("Worker {} skipping detail, budget reached: {}", worker_id, request.url);
        return;
    }

    let Some(page) = fetch_page(worker_id, ctx, &request).await else {
        ctx.state.lock().await.settle_detail(true);
        return;
    };
    ctx.state.lock().await.record_detail_page();

    match analyze(ctx, Label::Detail, request.url.clone(), page.body).await {
        Some(PageOutcome::Detail(record)) => {
            let accepted = {
                let mut state = ctx.state.lock().await;
                if state.is_exhausted() {
                    state.settle_detail(false);
                    false
                } else {
                    state.record_saved();
                    true
                }
            };
            if accepted {
                ::log::info!("Saved {} ({:?})", record.url, record.title);
                send(ctx, Output::Job(*record)).await;
            }
        }
        Some(PageOutcome::Blocked) => {
            handle_block(ctx, &request.url).await;
            ctx.state.lock().await.settle_detail(false);
        }
        Some(PageOutcome::Listing(_)) | None => {
            ctx.state.lock().await.settle_detail(true);
        }
    }
}

/// Fetches a request's page after a random delay; failures are logged and
/// counted, never propagated
async fn fetch_page<F: Fetcher>(
    worker_id: usize,
    ctx: &Arc<CrawlContext<F>>,
    request: &CrawlRequest,
) -> Option<FetchedPage> {
    fetch::jitter(ctx.max_jitter_ms).await;
    match ctx.fetcher.fetch(&request.url).await {
        Ok(page) => Some(page),
        Err(e) => {
            ::log::error!("Worker {} abandoning {}: {}", worker_id, request.url, e);
            ctx.state.lock().await.record_abandoned();
            None
        }
    }
}

/// Parses and analyzes a page on the blocking pool.
///
/// Returns `None` when the analysis panicked.
async fn analyze<F: Fetcher>(
    ctx: &Arc<CrawlContext<F>>,
    label: Label,
    url: Url,
    body: String,
) -> Option<PageOutcome> {
    let task_ctx = Arc::clone(ctx);
    let task_url = url.clone();
    let result = tokio::task::spawn_blocking(move || {
        let document = Html::parse_document(&body);
        let body_text = text::normalize_whitespace(&text::visible_text(document.root_element()));
        if task_ctx.blocks.is_blocked(&body_text) {
            return PageOutcome::Blocked;
        }
        match label {
            Label::List => {
                PageOutcome::Listing(task_ctx.listing.analyze(&task_url, &document, &task_ctx.filter))
            }
            Label::Detail => {
                PageOutcome::Detail(Box::new(task_ctx.reconciler.reconcile(&task_url, &document)))
            }
        }
    })
    .await;

    match result {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            ::log::error!("Processing {} failed: {}", url, e);
            None
        }
    }
}

async fn handle_block<F: Fetcher>(ctx: &Arc<CrawlContext<F>>, url: &Url) {
    ::log::warn!("Blocked page detected at {}, abandoning it", url);
    ctx.state.lock().await.record_blocked();
    ctx.fetcher.retire_session().await;
}

/// Emits a URL-only record; false when the receiver is gone
async fn emit_link<F: Fetcher>(
    ctx: &Arc<CrawlContext<F>>,
    job_url: &Url,
    discovered_on: &Url,
    page_no: u32,
) -> bool {
    let link = DiscoveredLink {
        url: job_url.to_string(),
        source: ctx.source.clone(),
        discovered_on: discovered_on.to_string(),
        page_no,
        scraped_at: chrono::Utc::now(),
    };
    ::log::info!("Saved link {}", link.url);
    send(ctx, Output::Link(link)).await
}

async fn send<F: Fetcher>(ctx: &Arc<CrawlContext<F>>, output: Output) -> bool {
    if let Err(e) = ctx.result_tx.send(output).await {
        ::log::error!("Failed to send result, stopping the crawl: {}", e);
        ctx.frontier.close();
        return false;
    }
    true
}
