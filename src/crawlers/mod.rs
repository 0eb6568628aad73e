pub mod frontier;
pub mod listing;
pub mod web;

#[cfg(test)]
mod tests;

pub use frontier::{CrawlRequest, CrawlSummary, Label};
