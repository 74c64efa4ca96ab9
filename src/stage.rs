//! Pipeline stages and their stuck-item queries.
//!
//! Every stage is checked the same way: records in the `links` collection
//! whose `download_analysis.<key>.processing_done` flag is exactly `false`.
//! A [`StageQuery`] carries the per-stage differences as plain data so the
//! store backends and the HTTP layer stay stage-agnostic.
//!
//! | Stage | `download_analysis` key | Extra filter | Country projected |
//! |-------|-------------------------|--------------|-------------------|
//! | source-channel-analysis | `source-channel-analysis` | none | yes |
//! | website-scraping | `website-scraping` | `exclude_link != true` | yes |
//! | general-file-parser | `general-file-parser` | none | yes |
//! | article-classifier | `articleclassifier` | none | **no** |

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const LINK_YID_FIELD: &str = "link_yid";
pub const URL_FIELD: &str = "url";
pub const COUNTRY_CODE_FIELD: &str = "source_channel.country_code";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const EXCLUDE_LINK_FIELD: &str = "exclude_link";

const PROJECTION_WITH_COUNTRY: &[&str] = &[
    LINK_YID_FIELD,
    URL_FIELD,
    COUNTRY_CODE_FIELD,
    CREATED_AT_FIELD,
];

// The article classifier check never projected the country code.
const PROJECTION_WITHOUT_COUNTRY: &[&str] = &[LINK_YID_FIELD, URL_FIELD, CREATED_AT_FIELD];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    SourceChannelAnalysis,
    WebsiteScraping,
    GeneralFileParser,
    ArticleClassifier,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::SourceChannelAnalysis,
        Stage::WebsiteScraping,
        Stage::GeneralFileParser,
        Stage::ArticleClassifier,
    ];

    /// Name used on the CLI, in routes, and in export filenames.
    pub fn slug(self) -> &'static str {
        match self {
            Stage::SourceChannelAnalysis => "source-channel-analysis",
            Stage::WebsiteScraping => "website-scraping",
            Stage::GeneralFileParser => "general-file-parser",
            Stage::ArticleClassifier => "article-classifier",
        }
    }

    /// Key of the stage's sub-document under `download_analysis`.
    pub fn analysis_key(self) -> &'static str {
        match self {
            Stage::ArticleClassifier => "articleclassifier",
            other => other.slug(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::SourceChannelAnalysis => "Source Channel Analysis",
            Stage::WebsiteScraping => "Website Scraping",
            Stage::GeneralFileParser => "General File Parser",
            Stage::ArticleClassifier => "Article Classifier",
        }
    }

    pub fn route(self) -> String {
        format!("/checks/stuck-in-{}", self.slug())
    }

    pub fn csv_prefix(self) -> String {
        format!("stuck-{}", self.slug())
    }

    pub fn projection(self) -> &'static [&'static str] {
        match self {
            Stage::ArticleClassifier => PROJECTION_WITHOUT_COUNTRY,
            _ => PROJECTION_WITH_COUNTRY,
        }
    }

    pub fn extra_filter(self) -> ExtraFilter {
        match self {
            Stage::WebsiteScraping => ExtraFilter::NotExcluded,
            _ => ExtraFilter::None,
        }
    }

    /// Whether rows for this stage can ever carry a country code.
    pub fn projects_country(self) -> bool {
        self.projection().contains(&COUNTRY_CODE_FIELD)
    }

    /// Query for this stage against the given collection.
    pub fn query(self, collection: &str) -> StageQuery {
        StageQuery {
            stage: self,
            collection: collection.to_string(),
            done_field: format!("download_analysis.{}.processing_done", self.analysis_key()),
            projection: self.projection(),
            extra_filter: self.extra_filter(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match Stage::ALL.iter().find(|stage| stage.slug() == s) {
            Some(stage) => Ok(*stage),
            None => bail!(
                "Unknown stage: {}. Use source-channel-analysis, website-scraping, \
                 general-file-parser, or article-classifier.",
                s
            ),
        }
    }
}

/// Additional predicate applied on top of `processing_done == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraFilter {
    None,
    /// `exclude_link != true`; a missing flag counts as not excluded.
    NotExcluded,
}

/// Stage query configuration: collection, predicate, and projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageQuery {
    pub stage: Stage,
    pub collection: String,
    /// Dotted path of the `processing_done` flag.
    pub done_field: String,
    /// Dotted paths of the projected fields.
    pub projection: &'static [&'static str],
    pub extra_filter: ExtraFilter,
}

impl StageQuery {
    pub fn projects_country(&self) -> bool {
        self.projection.contains(&COUNTRY_CODE_FIELD)
    }

    /// Evaluate the predicate against a JSON document.
    ///
    /// Equality semantics follow the document store: the flag must be the
    /// boolean `false`, a missing flag does not match.
    pub fn matches(&self, doc: &Value) -> bool {
        if lookup(doc, &self.done_field) != Some(&Value::Bool(false)) {
            return false;
        }
        match self.extra_filter {
            ExtraFilter::None => true,
            ExtraFilter::NotExcluded => {
                lookup(doc, EXCLUDE_LINK_FIELD) != Some(&Value::Bool(true))
            }
        }
    }
}

/// Resolve a dotted path inside a JSON document.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, key| current.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slug_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.slug().parse::<Stage>().unwrap(), stage);
        }
        assert!("articleclassifier".parse::<Stage>().is_err());
    }

    #[test]
    fn test_routes() {
        assert_eq!(
            Stage::SourceChannelAnalysis.route(),
            "/checks/stuck-in-source-channel-analysis"
        );
        assert_eq!(
            Stage::ArticleClassifier.route(),
            "/checks/stuck-in-article-classifier"
        );
        assert_eq!(Stage::WebsiteScraping.csv_prefix(), "stuck-website-scraping");
    }

    #[test]
    fn test_article_classifier_uses_compact_key() {
        let q = Stage::ArticleClassifier.query("links");
        assert_eq!(
            q.done_field,
            "download_analysis.articleclassifier.processing_done"
        );
        assert!(!q.projects_country());
    }

    #[test]
    fn test_only_website_scraping_skips_excluded() {
        for stage in Stage::ALL {
            let expected = if stage == Stage::WebsiteScraping {
                ExtraFilter::NotExcluded
            } else {
                ExtraFilter::None
            };
            assert_eq!(stage.query("links").extra_filter, expected);
        }
    }

    #[test]
    fn test_matches_requires_explicit_false() {
        let q = Stage::GeneralFileParser.query("links");
        let pending = json!({"download_analysis": {"general-file-parser": {"processing_done": false}}});
        let done = json!({"download_analysis": {"general-file-parser": {"processing_done": true}}});
        let missing = json!({"download_analysis": {}});
        assert!(q.matches(&pending));
        assert!(!q.matches(&done));
        assert!(!q.matches(&missing));
    }

    #[test]
    fn test_matches_exclude_flag() {
        let q = Stage::WebsiteScraping.query("links");
        let base = json!({"download_analysis": {"website-scraping": {"processing_done": false}}});
        let mut excluded = base.clone();
        excluded["exclude_link"] = json!(true);
        let mut kept = base.clone();
        kept["exclude_link"] = json!(false);

        assert!(q.matches(&base));
        assert!(q.matches(&kept));
        assert!(!q.matches(&excluded));

        // Other stages ignore the flag entirely.
        let scan = Stage::SourceChannelAnalysis.query("links");
        let doc = json!({
            "exclude_link": true,
            "download_analysis": {"source-channel-analysis": {"processing_done": false}}
        });
        assert!(scan.matches(&doc));
    }
}
