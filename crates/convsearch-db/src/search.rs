use std::ops::ControlFlow;

use convsearch_common::{Result, Role};
use tracing::debug;

use crate::archive::{ConversationArchive, MessageFilter};
use crate::resolver::PathResolver;
use crate::timestamp::DateRange;

/// Returned verbatim when nothing survives filtering.
pub const NO_MATCHES: &str = "No matching messages.";

pub const DEFAULT_LIMIT: usize = 50;

/// Rows fetched when a date bound is present; dates are filtered in memory.
const DATE_FILTER_FETCH_CAP: usize = 5000;
/// Without date bounds, over-fetch `limit * 3` rows, up to this cap.
const UNBOUNDED_FETCH_CAP: usize = 500;
const OVERFETCH_FACTOR: usize = 3;

const RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// Typed `conversation_search` arguments, already validated at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: Option<String>,
    /// Empty means no role filter.
    pub roles: Vec<Role>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: None,
            roles: Vec::new(),
            start_date: None,
            end_date: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchParams {
    /// Trimmed query text, `None` when blank.
    pub fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Database-side row cap for this search.
    pub fn fetch_limit(&self) -> usize {
        if self.has_date_bounds() {
            DATE_FILTER_FETCH_CAP
        } else {
            self.limit
                .saturating_mul(OVERFETCH_FACTOR)
                .min(UNBOUNDED_FETCH_CAP)
        }
    }
}

/// Anything that can answer a `conversation_search` call with a text digest.
pub trait ConversationSearch: Send + Sync {
    fn search(&self, params: &SearchParams) -> Result<String>;
}

/// Resolves the archive, runs the coarse SQL filter, then applies the exact
/// date-range filter and the result limit in memory.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    resolver: PathResolver,
}

impl QueryEngine {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn search_archive(archive: &ConversationArchive, params: &SearchParams) -> Result<String> {
        let filter = MessageFilter {
            text: params.query_text(),
            roles: &params.roles,
            fetch_limit: params.fetch_limit(),
        };
        let range = DateRange::from_bounds(params.start_date.as_deref(), params.end_date.as_deref());
        debug!(
            fetch_limit = filter.fetch_limit,
            limit = params.limit,
            ?range,
            "searching conversation archive"
        );

        let mut blocks: Vec<String> = Vec::new();
        archive.for_each_message(&filter, |message| {
            if !range.contains(message.create_time.comparable()) {
                return ControlFlow::Continue(());
            }
            if blocks.len() >= params.limit {
                return ControlFlow::Break(());
            }
            blocks.push(message.render());
            ControlFlow::Continue(())
        })?;

        debug!(kept = blocks.len(), "conversation search finished");

        if blocks.is_empty() {
            Ok(NO_MATCHES.to_string())
        } else {
            Ok(blocks.join(RESULT_SEPARATOR))
        }
    }
}

impl ConversationSearch for QueryEngine {
    fn search(&self, params: &SearchParams) -> Result<String> {
        let db_path = self.resolver.resolve()?;
        let archive = ConversationArchive::open(&db_path)?;
        Self::search_archive(&archive, params)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_LIMIT, SearchParams};

    #[test]
    fn default_limit_is_fifty() {
        assert_eq!(SearchParams::default().limit, DEFAULT_LIMIT);
        assert_eq!(DEFAULT_LIMIT, 50);
    }

    #[test]
    fn blank_query_is_absent() {
        let params = SearchParams {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.query_text(), None);

        let params = SearchParams {
            query: Some("  hello ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.query_text(), Some("hello"));
    }

    #[test]
    fn fetch_limit_overfetches_without_dates() {
        let params = |limit| SearchParams {
            limit,
            ..Default::default()
        };
        assert_eq!(params(10).fetch_limit(), 30);
        assert_eq!(params(200).fetch_limit(), 500);
        assert_eq!(params(usize::MAX).fetch_limit(), 500);
    }

    #[test]
    fn fetch_limit_widens_with_any_date_bound() {
        let params = SearchParams {
            limit: 10,
            end_date: Some("not-a-date".to_string()),
            ..Default::default()
        };
        assert_eq!(params.fetch_limit(), 5000);
    }
}
