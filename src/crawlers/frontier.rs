//! Crawl requests, dedup sets, budgets and the shared work queue.

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};
use url::Url;

use crate::config::ScraperConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Paginated search results
    List,
    /// A single job posting
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: Url,
    pub label: Label,
    pub page_no: u32,
}

impl CrawlRequest {
    pub fn list(url: Url, page_no: u32) -> Self {
        Self {
            url,
            label: Label::List,
            page_no,
        }
    }

    pub fn detail(url: Url, page_no: u32) -> Self {
        Self {
            url,
            label: Label::Detail,
            page_no,
        }
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Records emitted
    pub saved: usize,
    /// Detail requests enqueued
    pub queued_detail: usize,
    /// Listing pages processed
    pub list_pages: usize,
    /// Detail pages processed
    pub detail_pages: usize,
    /// Detail pages abandoned after a fetch or extraction failure
    pub failed_detail: usize,
    /// Pages recognized as block or CAPTCHA pages
    pub blocked: usize,
    /// Requests abandoned after the fetcher gave up
    pub abandoned: usize,
}

/// Visited sets and counters shared by all workers.
///
/// Every method is meant to run under one lock so that each check-and-update
/// is atomic with respect to the other workers.
#[derive(Debug)]
pub struct FrontierState {
    visited_list_urls: HashSet<String>,
    seen_job_urls: HashSet<String>,
    summary: CrawlSummary,
    /// Detail requests that finished, whether saved, failed or skipped
    detail_settled: usize,
    results_wanted: usize,
    max_pages: u32,
    collect_details: bool,
}

impl FrontierState {
    pub fn new(results_wanted: usize, max_pages: u32, collect_details: bool) -> Self {
        Self {
            visited_list_urls: HashSet::new(),
            seen_job_urls: HashSet::new(),
            summary: CrawlSummary::default(),
            detail_settled: 0,
            results_wanted,
            max_pages,
            collect_details,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.results_wanted, config.max_pages, config.collect_details)
    }

    /// Marks a listing URL visited; false when it already was
    pub fn try_visit_list(&mut self, url: &Url) -> bool {
        self.visited_list_urls.insert(url.to_string())
    }

    pub fn is_list_visited(&self, url: &Url) -> bool {
        self.visited_list_urls.contains(url.as_str())
    }

    /// Detail requests enqueued but not finished yet
    fn outstanding_details(&self) -> usize {
        self.summary.queued_detail.saturating_sub(self.detail_settled)
    }

    /// How many more job links may be claimed without overshooting the budget
    pub fn remaining(&self) -> usize {
        self.results_wanted
            .saturating_sub(self.summary.saved)
            .saturating_sub(self.outstanding_details())
    }

    /// Claim one job URL: it must be new and fit in the budget.
    ///
    /// In detail mode a claim counts as a queued detail request; in URL-only
    /// mode it counts as saved.
    pub fn try_claim_job(&mut self, url: &Url) -> bool {
        if self.remaining() == 0 || self.seen_job_urls.contains(url.as_str()) {
            return false;
        }
        self.seen_job_urls.insert(url.to_string());
        if self.collect_details {
            self.summary.queued_detail += 1;
        } else {
            self.summary.saved += 1;
        }
        true
    }

    /// Claim as many `candidates` as the budget allows, in order
    pub fn claim_jobs(&mut self, candidates: &[Url]) -> Vec<Url> {
        let mut claimed = Vec::new();
        for url in candidates {
            if self.remaining() == 0 {
                break;
            }
            if self.try_claim_job(url) {
                claimed.push(url.clone());
            } else {
                ::log::trace!("Skipping already seen job: {}", url);
            }
        }
        claimed
    }

    /// Whether a dequeued detail request should still be processed
    pub fn should_process_detail(&self) -> bool {
        self.collect_details && self.summary.saved < self.results_wanted
    }

    /// A detail page produced a record
    pub fn record_saved(&mut self) {
        self.summary.saved += 1;
        self.detail_settled += 1;
    }

    /// A detail request finished without a record
    pub fn settle_detail(&mut self, failed: bool) {
        self.detail_settled += 1;
        if failed {
            self.summary.failed_detail += 1;
        }
    }

    pub fn record_blocked(&mut self) {
        self.summary.blocked += 1;
    }

    pub fn record_abandoned(&mut self) {
        self.summary.abandoned += 1;
    }

    pub fn record_list_page(&mut self) {
        self.summary.list_pages += 1;
    }

    pub fn record_detail_page(&mut self) {
        self.summary.detail_pages += 1;
    }

    /// Whether the listing page `page_no` may link to the next one
    pub fn should_paginate(&self, page_no: u32) -> bool {
        page_no < self.max_pages && self.summary.saved < self.results_wanted
    }

    pub fn is_exhausted(&self) -> bool {
        self.summary.saved >= self.results_wanted
    }

    pub fn summary(&self) -> CrawlSummary {
        self.summary.clone()
    }
}

/// FIFO of pending requests shared by the workers.
///
/// `pending` counts requests pushed but not yet marked done, so an empty
/// queue with in-flight requests keeps workers waiting for what those
/// requests may enqueue.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<VecDeque<CrawlRequest>>,
    pending: AtomicUsize,
    notify: Notify,
    closed: AtomicBool,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, request: CrawlRequest) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        ::log::debug!("Queuing {:?} {} (page {})", request.label, request.url, request.page_no);
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().await.push_back(request);
        self.notify.notify_one();
    }

    /// Next request, or `None` once the queue is drained with nothing in
    /// flight or the frontier was closed
    pub async fn next(&self) -> Option<CrawlRequest> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            if let Some(request) = self.queue.lock().await.pop_front() {
                return Some(request);
            }
            if self.pending.load(Ordering::SeqCst) == 0 {
                return None;
            }
            notified.await;
        }
    }

    /// Mark a request returned by [`Frontier::next`] as fully handled
    pub fn done(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Stop handing out requests
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
