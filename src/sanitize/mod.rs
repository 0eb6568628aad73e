//! HTML cleanup for job descriptions.
//!
//! [`Sanitizer::clean`] runs both stages: noise removal with densest-block
//! selection, then simplification to a small set of safe tags. The result is
//! a fixed point: cleaning it again returns it unchanged.

pub mod densest;
pub mod dom;
pub mod simplify;

#[cfg(test)]
mod tests;

use scraper::{ElementRef, Selector};

use crate::config::{ExtractionConfig, compile_selectors};
use crate::error::ConfigError;
use dom::Node;

/// Upper bound on whole-pipeline passes while searching for a fixed point
const MAX_PASSES: usize = 4;

#[derive(Debug)]
pub struct Sanitizer {
    noise_selectors: Vec<Selector>,
    excluded_hints: Vec<String>,
    min_block_len: usize,
    max_collapse_iterations: usize,
}

impl Sanitizer {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            noise_selectors: compile_selectors(&config.noise_selectors)?,
            excluded_hints: config
                .excluded_block_hints
                .iter()
                .map(|hint| hint.to_lowercase())
                .collect(),
            min_block_len: config.min_block_len,
            max_collapse_iterations: config.max_collapse_iterations,
        })
    }

    /// Stage one: strip noise, collapse wrappers and keep the densest block.
    ///
    /// When the best block has less than `min_block_len` characters of text
    /// the whole (noise-free) fragment is kept.
    pub fn densest_block(&self, html: &str) -> Vec<Node> {
        let mut nodes = dom::parse_fragment_filtered(html, &|el: ElementRef<'_>| self.is_noise(el));
        densest::collapse_wrappers(&mut nodes, self.max_collapse_iterations);

        match densest::densest_block(&nodes, &self.excluded_hints) {
            Some(block) if block.text_len() >= self.min_block_len => {
                vec![Node::Element(block.clone())]
            }
            _ => nodes,
        }
    }

    /// Run both stages once and serialize the result
    pub fn clean_once(&self, html: &str) -> String {
        let block = self.densest_block(html);
        dom::serialize(&simplify::simplify_nodes(block))
            .trim()
            .to_string()
    }

    /// Run both stages until the output stops changing
    pub fn clean(&self, html: &str) -> String {
        let mut current = self.clean_once(html);
        for _ in 1..MAX_PASSES {
            let next = self.clean_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn is_noise(&self, el: ElementRef<'_>) -> bool {
        if densest::NOISE_TAGS.contains(&el.value().name()) {
            return true;
        }
        self.noise_selectors.iter().any(|selector| selector.matches(&el))
    }
}
