pub mod alias;
pub mod classify;
pub mod clean;
pub mod collect;
pub mod config;
pub mod dedupe;
#[doc(hidden)]
pub mod dom_tree;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod links;
pub mod parse;
pub mod record;
pub mod rewrite;
pub mod rules;
pub mod scoring;

pub use classify::Classifier;
pub use clean::{CleanConfig, clean_attributes, clean_html, clean_tree};
pub use collect::{FetchedDocument, SiteCollector};
pub use config::{CrawlConfig, CrawlConfigBuilder, CrawlSettings};
pub use dedupe::{DedupConfig, HashFrequencyTable, remove_boilerplate, strip_title_affixes};
#[doc(hidden)]
pub use dom_tree::DomTree;
pub use error::{Result, SiftError};
pub use fetch::{Fetcher, RawResponse};
#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, HttpFetcher};
pub use graph::{BuildStats, CrawlState, PageGraphBuilder};
pub use links::{LinkDecision, LinkFilter, SkippedLink};
pub use parse::Document;
pub use record::{DocumentRef, FormRef, ImageRef, PageRecord, RedirectRecord, SiteExport};
pub use rules::{ContentTypeRule, FieldSource, FieldSpec, RuleTable};
pub use scoring::{ScoreConfig, ScoreResult, score, score_content};
