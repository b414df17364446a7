//! Client-side refinement of search results.
//!
//! The backend only understands a keyword query. Year ranges, sorting and the
//! advanced author/journal criteria are applied here on the returned page.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::PaperSummary;

/// Lower bound of the default year range.
pub const DEFAULT_YEAR_MIN: i32 = 1980;

/// Keywords sent when an advanced search has none.
pub const FALLBACK_KEYWORDS: &str = "research";

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    /// Keep the backend's ranking.
    #[default]
    Relevance,
    DateDesc,
    DateAsc,
}

impl SortBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relevance" => Some(SortBy::Relevance),
            "date-desc" | "newest" => Some(SortBy::DateDesc),
            "date-asc" | "oldest" => Some(SortBy::DateAsc),
            _ => None,
        }
    }
}

/// Year range and ordering applied to a result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub year_min: i32,
    pub year_max: i32,
    pub sort_by: SortBy,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            year_min: DEFAULT_YEAR_MIN,
            year_max: current_year(),
            sort_by: SortBy::Relevance,
        }
    }
}

impl SearchFilters {
    /// Keep results inside the inclusive year range, then sort.
    pub fn apply(&self, results: &[PaperSummary]) -> Vec<PaperSummary> {
        let mut filtered: Vec<PaperSummary> = results
            .iter()
            .filter(|p| p.year >= self.year_min && p.year <= self.year_max)
            .cloned()
            .collect();

        match self.sort_by {
            SortBy::Relevance => {}
            SortBy::DateDesc => filtered.sort_by(|a, b| b.year.cmp(&a.year)),
            SortBy::DateAsc => filtered.sort_by(|a, b| a.year.cmp(&b.year)),
        }

        filtered
    }

    /// How many filters differ from their defaults.
    pub fn active_count(&self) -> usize {
        let defaults = Self::default();
        let mut count = 0;
        if self.year_min != defaults.year_min || self.year_max != defaults.year_max {
            count += 1;
        }
        if self.sort_by != defaults.sort_by {
            count += 1;
        }
        count
    }
}

/// Structured search criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedQuery {
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub journal: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

impl AdvancedQuery {
    /// Keywords with surrounding whitespace removed, if any remain.
    pub fn keywords(&self) -> Option<&str> {
        trimmed(&self.keywords)
    }

    /// Query text actually sent to the backend.
    pub fn search_terms(&self) -> &str {
        self.keywords().unwrap_or(FALLBACK_KEYWORDS)
    }

    /// Apply the author, journal and year criteria.
    pub fn apply(&self, results: Vec<PaperSummary>) -> Vec<PaperSummary> {
        let author = trimmed(&self.author).map(str::to_lowercase);
        let journal = trimmed(&self.journal).map(str::to_lowercase);

        results
            .into_iter()
            .filter(|p| match &author {
                Some(needle) => p.authors.iter().any(|a| a.to_lowercase().contains(needle)),
                None => true,
            })
            .filter(|p| match &journal {
                Some(needle) => p
                    .journal
                    .as_deref()
                    .is_some_and(|j| j.to_lowercase().contains(needle)),
                None => true,
            })
            .filter(|p| self.year_from.map_or(true, |from| p.year >= from))
            .filter(|p| self.year_to.map_or(true, |to| p.year <= to))
            .collect()
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn current_year() -> i32 {
    Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, year: i32, authors: &[&str], journal: Option<&str>) -> PaperSummary {
        PaperSummary {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year,
            abstract_text: None,
            url: String::new(),
            journal: journal.map(str::to_string),
            volume: None,
            issue: None,
            pages: None,
            citation_apa: None,
        }
    }

    fn ids(results: &[PaperSummary]) -> Vec<&str> {
        results.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_year_range_is_inclusive() {
        let results = vec![
            summary("a", 1999, &[], None),
            summary("b", 2000, &[], None),
            summary("c", 2010, &[], None),
            summary("d", 2011, &[], None),
        ];
        let filters = SearchFilters {
            year_min: 2000,
            year_max: 2010,
            sort_by: SortBy::Relevance,
        };
        assert_eq!(ids(&filters.apply(&results)), vec!["b", "c"]);
    }

    #[test]
    fn test_sorting() {
        let results = vec![
            summary("a", 2005, &[], None),
            summary("b", 2020, &[], None),
            summary("c", 1990, &[], None),
        ];
        let mut filters = SearchFilters {
            year_min: 1900,
            year_max: 2100,
            sort_by: SortBy::DateDesc,
        };
        assert_eq!(ids(&filters.apply(&results)), vec!["b", "a", "c"]);

        filters.sort_by = SortBy::DateAsc;
        assert_eq!(ids(&filters.apply(&results)), vec!["c", "a", "b"]);

        filters.sort_by = SortBy::Relevance;
        assert_eq!(ids(&filters.apply(&results)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_active_count() {
        let mut filters = SearchFilters::default();
        assert_eq!(filters.active_count(), 0);

        filters.year_min = 2000;
        assert_eq!(filters.active_count(), 1);

        filters.sort_by = SortBy::DateAsc;
        assert_eq!(filters.active_count(), 2);
    }

    #[test]
    fn test_advanced_query_filters() {
        let results = vec![
            summary("a", 2015, &["Yann LeCun"], Some("Nature")),
            summary("b", 2018, &["Geoffrey Hinton"], Some("Nature Machine Intelligence")),
            summary("c", 2021, &["Yoshua Bengio"], None),
        ];

        let query = AdvancedQuery {
            journal: Some("nature".to_string()),
            year_from: Some(2016),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(results.clone())), vec!["b"]);

        let query = AdvancedQuery {
            author: Some("  lecun ".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(results.clone())), vec!["a"]);

        let query = AdvancedQuery {
            year_to: Some(2018),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(results)), vec!["a", "b"]);
    }

    #[test]
    fn test_search_terms_fallback() {
        let query = AdvancedQuery {
            keywords: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.keywords(), None);
        assert_eq!(query.search_terms(), "research");

        let query = AdvancedQuery {
            keywords: Some(" protein folding ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_terms(), "protein folding");
    }

    #[test]
    fn test_sort_by_parse() {
        assert_eq!(SortBy::parse("date-desc"), Some(SortBy::DateDesc));
        assert_eq!(SortBy::parse("oldest"), Some(SortBy::DateAsc));
        assert_eq!(SortBy::parse("random"), None);
    }
}
