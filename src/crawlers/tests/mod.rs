use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use crate::JobScraper;
use crate::config::ScraperConfig;
use crate::crawlers::CrawlSummary;
use crate::fetch::{FetchError, FetchedPage, Fetcher};
use crate::results::Output;

const BASE: &str = "https://www.rekrute.com";

/// Serves canned pages and counts requests
#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    hits: std::sync::Mutex<HashMap<String, usize>>,
    retired: AtomicUsize,
}

impl FakeFetcher {
    fn page(mut self, path: &str, body: String) -> Self {
        self.pages.insert(format!("{BASE}{path}"), body);
        self
    }

    fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(format!("{BASE}{from}"), format!("{BASE}{to}"));
        self
    }

    fn hits(&self, path: &str) -> usize {
        let hits = self.hits.lock().unwrap();
        hits.get(&format!("{BASE}{path}")).copied().unwrap_or(0)
    }

    fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let target = self
            .redirects
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| url.to_string());
        match self.pages.get(&target) {
            Some(body) => Ok(FetchedPage {
                final_url: Url::parse(&target).unwrap(),
                status: 200,
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: target,
            }),
        }
    }

    async fn retire_session(&self) {
        self.retired.fetch_add(1, Ordering::SeqCst);
    }
}

fn listing(jobs: &[String], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><div id=\"fixed\">");
    for job in jobs {
        html.push_str(&format!(r#"<div class="section"><h2><a class="titreJob" href="{job}">Offre</a></h2></div>"#));
    }
    html.push_str(r#"<a href="/offres.html">Toutes les offres</a>"#);
    if let Some(next) = next {
        html.push_str(&format!(r#"<ul class="pagination"><li><a href="{next}">Suivant</a></li></ul>"#));
    }
    html.push_str("</div></body></html>");
    html
}

fn detail(title: &str) -> String {
    format!(
        r#"<html lang="fr"><body>
            <h1>{title} - Acme - Casablanca</h1>
            <div class="job-description"><p>Au sein d'une équipe dynamique, vous prendrez en charge le développement de nos applications web.</p></div>
        </body></html>"#
    )
}

fn job(i: usize) -> String {
    format!("/offre-emploi-developpeur-casablanca-{}.html", 1000 + i)
}

fn config() -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.start_urls = vec![format!("{BASE}/offres.html")];
    config.max_concurrency = 4;
    config.fetch.max_jitter_ms = 0;
    config
}

async fn run(config: ScraperConfig, fetcher: &Arc<FakeFetcher>) -> (Vec<Output>, CrawlSummary) {
    JobScraper::new(config)
        .run_to_vec(Arc::clone(fetcher))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_listing_pages_are_processed_once() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("/offres.html", listing(&[job(1)], Some("/offres.html?p=2")))
            .page("/offres.html?p=2", listing(&[job(2)], Some("/offres.html")))
            .page(&job(1), detail("Dev 1"))
            .page(&job(2), detail("Dev 2")),
    );
    let mut config = config();
    config.start_urls.push(format!("{BASE}/offres.html#top"));

    let (outputs, summary) = run(config, &fetcher).await;

    assert_eq!(fetcher.hits("/offres.html"), 1);
    assert_eq!(fetcher.hits("/offres.html?p=2"), 1);
    assert_eq!(summary.list_pages, 2);
    assert_eq!(outputs.len(), 2);
}

#[tokio::test]
async fn test_detail_is_enqueued_once_across_listings() {
    let shared = job(7);
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("/offres.html", listing(&[shared.clone(), job(1)], Some("/offres.html?p=2")))
            .page("/offres.html?p=2", listing(&[format!("{shared}#apply"), job(2)], None))
            .page(&shared, detail("Shared"))
            .page(&job(1), detail("One"))
            .page(&job(2), detail("Two")),
    );

    let (outputs, summary) = run(config(), &fetcher).await;

    assert_eq!(fetcher.hits(&shared), 1);
    assert_eq!(summary.queued_detail, 3);
    let shared_url = format!("{BASE}{shared}");
    assert_eq!(outputs.iter().filter(|o| o.url() == shared_url).count(), 1);
    assert_eq!(outputs.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_listings_share_detail_links() {
    let jobs: Vec<String> = (0..30).map(job).collect();
    let mut pages = FakeFetcher::default();
    let mut seeds = Vec::new();
    for p in 1..=40 {
        // Each listing serves every job, starting at a different offset
        let mut rotated = jobs.clone();
        rotated.rotate_left(p % jobs.len());
        let path = format!("/offres.html?p={p}");
        pages = pages.page(&path, listing(&rotated, None));
        seeds.push(format!("{BASE}{path}"));
    }
    for (i, path) in jobs.iter().enumerate() {
        pages = pages.page(path, detail(&format!("Dev {i}")));
    }

    for results_wanted in [1, 7, 29, 30, 50] {
        let fetcher = Arc::new(FakeFetcher {
            pages: pages.pages.clone(),
            ..FakeFetcher::default()
        });
        let mut config = config();
        config.start_urls = seeds.clone();
        config.max_concurrency = 20;
        config.results_wanted = results_wanted;

        let (outputs, summary) = run(config, &fetcher).await;

        let expected = results_wanted.min(jobs.len());
        assert_eq!(outputs.len(), expected, "results_wanted={results_wanted}");
        assert_eq!(summary.saved, expected);
        for path in &jobs {
            assert!(fetcher.hits(path) <= 1, "{path} fetched twice");
        }
        let detail_hits: usize = jobs.iter().map(|path| fetcher.hits(path)).sum();
        assert_eq!(detail_hits, expected);

        let mut urls: Vec<&str> = outputs.iter().map(Output::url).collect();
        urls.sort_unstable();
        urls.dedup();
        assert_eq!(urls.len(), expected);
    }
}

#[tokio::test]
async fn test_results_wanted_caps_detail_requests() {
    let jobs: Vec<String> = (0..20).map(job).collect();
    let mut fetcher = FakeFetcher::default().page("/offres.html", listing(&jobs, Some("/offres.html?p=2")));
    fetcher = fetcher.page("/offres.html?p=2", listing(&[job(50)], None));
    for (i, path) in jobs.iter().enumerate() {
        fetcher = fetcher.page(path, detail(&format!("Dev {i}")));
    }
    let fetcher = Arc::new(fetcher);
    let mut config = config();
    config.results_wanted = 5;

    let (outputs, summary) = run(config, &fetcher).await;

    assert_eq!(outputs.len(), 5);
    assert_eq!(summary.saved, 5);
    assert_eq!(summary.queued_detail, 5);
    let detail_hits: usize = jobs.iter().map(|path| fetcher.hits(path)).sum();
    assert_eq!(detail_hits, 5);

    // Extracted records carry the heading parts
    let record = outputs[0].as_job().unwrap();
    assert_eq!(record.company.as_deref(), Some("Acme"));
    assert_eq!(record.location.as_deref(), Some("Casablanca"));
    assert!(record.description_text.is_some());
}

#[tokio::test]
async fn test_blocked_listing_is_abandoned() {
    let body = format!(
        "<html><body><p>Our systems have detected unusual traffic from your computer network.</p>{}</body></html>",
        listing(&[job(1)], Some("/offres.html?p=2"))
    );
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("/offres.html", body)
            .page(&job(1), detail("Dev"))
            .page("/offres.html?p=2", listing(&[], None)),
    );

    let (outputs, summary) = run(config(), &fetcher).await;

    assert!(outputs.is_empty());
    assert_eq!(summary.blocked, 1);
    assert_eq!(summary.list_pages, 0);
    assert_eq!(fetcher.total_hits(), 1);
    assert_eq!(fetcher.retired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_url_only_mode_emits_links() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("/offres.html", listing(&[job(1), job(2), job(3)], Some("/offres.html?p=2")))
            .page("/offres.html?p=2", listing(&[job(3), job(4)], None)),
    );
    let mut config = config();
    config.collect_details = false;

    let (outputs, summary) = run(config, &fetcher).await;

    assert_eq!(outputs.len(), 4);
    assert_eq!(summary.saved, 4);
    assert_eq!(summary.queued_detail, 0);
    for output in &outputs {
        let Output::Link(link) = output else {
            panic!("expected a link record, got {output:?}");
        };
        assert!(link.discovered_on.starts_with(&format!("{BASE}/offres.html")));
        assert_eq!(link.source, "rekrute");
    }
    // No detail page is ever fetched
    assert_eq!(fetcher.hits(&job(1)), 0);
}

#[tokio::test]
async fn test_pagination_stops_at_max_pages() {
    let mut fetcher = FakeFetcher::default().page("/offres.html", listing(&[], Some("/offres.html?p=2")));
    for p in 2..=5 {
        fetcher = fetcher.page(
            &format!("/offres.html?p={p}"),
            listing(&[], Some(&format!("/offres.html?p={}", p + 1))),
        );
    }
    let fetcher = Arc::new(fetcher);
    let mut config = config();
    config.max_pages = 3;

    let (_, summary) = run(config, &fetcher).await;

    assert_eq!(summary.list_pages, 3);
    assert_eq!(fetcher.hits("/offres.html?p=3"), 1);
    assert_eq!(fetcher.hits("/offres.html?p=4"), 0);
}

#[tokio::test]
async fn test_failed_detail_does_not_stop_the_run() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("/offres.html", listing(&[job(1), job(2)], None))
            .page(&job(2), detail("Dev 2")),
    );

    let (outputs, summary) = run(config(), &fetcher).await;

    assert_eq!(outputs.len(), 1);
    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.failed_detail, 1);
    assert_eq!(outputs[0].url(), format!("{BASE}{}", job(2)));
}

#[tokio::test]
async fn test_redirect_to_visited_listing_is_skipped() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .page("/offres.html", listing(&[job(1)], Some("/offres.html?p=1")))
            .redirect("/offres.html?p=1", "/offres.html")
            .page(&job(1), detail("Dev")),
    );

    let (outputs, summary) = run(config(), &fetcher).await;

    assert_eq!(summary.list_pages, 1);
    assert_eq!(outputs.len(), 1);
}

#[tokio::test]
async fn test_job_url_as_start_url() {
    let fetcher = Arc::new(FakeFetcher::default().page(&job(9), detail("Direct")));
    let mut config = config();
    config.start_urls = vec![format!("{BASE}{}", job(9))];

    let (outputs, _) = run(config.clone(), &fetcher).await;
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].as_job().unwrap().title.as_deref(), Some("Direct"));

    config.collect_details = false;
    let fetcher = Arc::new(FakeFetcher::default());
    let (outputs, _) = run(config, &fetcher).await;
    assert!(matches!(&outputs[..], [Output::Link(_)]));
    assert_eq!(fetcher.total_hits(), 0);
}
