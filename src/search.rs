use std::collections::HashMap;

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    docset::{Entry, Index},
    error::{Error, Result},
};

/// Searching more unfiltered docs than this attaches a warning.
pub const MANY_SOURCES_THRESHOLD: usize = 10;

/// Raw fuzzy scores are divided by this before being reported.
pub const SCORE_SCALE: f64 = 100.0;

/// Anything that can offer entries to the engine under one source id.
pub trait CandidateSource: Send + Sync {
    fn source_id(&self) -> &str;

    fn entries(&self) -> &[Entry];

    /// Every entry tagged with this source's id, in index order.
    fn candidates(&self) -> impl Iterator<Item = Candidate<'_>> {
        let source_id = self.source_id();
        self.entries()
            .iter()
            .map(move |entry| Candidate { source_id, entry })
    }
}

/// An entry waiting to be ranked, tagged with where it came from.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub source_id: &'a str,
    pub entry: &'a Entry,
}

/// A loaded `index.json` together with its doc slug.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    pub source_id: String,
    pub index: Index,
}

impl SourceIndex {
    pub fn new(source_id: impl Into<String>, index: Index) -> Self {
        Self {
            source_id: source_id.into(),
            index,
        }
    }
}

impl CandidateSource for SourceIndex {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn entries(&self) -> &[Entry] {
        &self.index.entries
    }
}

/// One ranked hit.
///
/// Serializes as `{"name", "path", "type", "source_id", "score"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub entry: Entry,
    pub source_id: String,
    pub score: f64,
}

/// Ranked results plus an optional advisory for the user.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub warning: Option<String>,
}

/// Fuzzy search across a fixed set of loaded docs.
///
/// The engine never changes after construction, so `search` can be called
/// from several threads at once.
pub struct Engine<S = SourceIndex> {
    sources: Vec<S>,
    positions: HashMap<String, usize>,
    limit: usize,
    matcher: SkimMatcherV2,
}

impl<S: CandidateSource> Engine<S> {
    /// Build an engine over `sources`, returning at most `limit` results
    /// per search. A limit of 0 makes every successful search empty.
    pub fn new(
        sources: impl IntoIterator<Item = S>,
        limit: usize,
    ) -> Result<Self> {
        let sources: Vec<S> = sources.into_iter().collect();
        let mut positions = HashMap::with_capacity(sources.len());
        for (pos, source) in sources.iter().enumerate() {
            let id = source.source_id().to_string();
            if positions.insert(id.clone(), pos).is_some() {
                return Err(Error::DuplicateSource(id));
            }
        }

        Ok(Self {
            sources,
            positions,
            limit,
            matcher: SkimMatcherV2::default().ignore_case(),
        })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn source(&self, source_id: &str) -> Option<&S> {
        self.positions.get(source_id).map(|&pos| &self.sources[pos])
    }

    /// Rank `query` against entry names.
    ///
    /// An empty `source_filter` searches every loaded doc; otherwise only
    /// the listed ones. Results are ordered by score (descending), then
    /// name, source id and path (ascending).
    pub fn search(
        &self,
        query: &str,
        source_filter: &[String],
    ) -> Result<SearchOutcome> {
        let working = self.working_set(source_filter);
        if working.is_empty() {
            return Err(Error::NoMatchingSources {
                requested: source_filter.to_vec(),
            });
        }

        let warning = (source_filter.is_empty()
            && working.len() > MANY_SOURCES_THRESHOLD)
            .then(|| {
                format!(
                    "Searching across {} docs. Use --doc <doc> for faster results.",
                    working.len()
                )
            });

        let candidates: Vec<Candidate<'_>> =
            working.iter().flat_map(|s| s.candidates()).collect();
        // A blank pattern matches nothing rather than everything.
        if candidates.is_empty() || query.trim().is_empty() {
            return Err(Error::NoResults {
                query: query.to_string(),
            });
        }

        let mut results: Vec<SearchResult> = candidates
            .par_iter()
            .filter_map(|c| {
                let raw = self.matcher.fuzzy_match(&c.entry.name, query)?;
                Some(SearchResult {
                    entry: c.entry.clone(),
                    source_id: c.source_id.to_string(),
                    score: raw as f64 / SCORE_SCALE,
                })
            })
            .collect();

        tracing::debug!(
            query,
            docs = working.len(),
            candidates = candidates.len(),
            matches = results.len(),
            "ranked candidates"
        );

        if results.is_empty() {
            return Err(Error::NoResults {
                query: query.to_string(),
            });
        }

        results.sort_by(compare_results);
        results.truncate(self.limit);

        Ok(SearchOutcome { results, warning })
    }

    /// Sources to search, in load order, each at most once.
    fn working_set(&self, source_filter: &[String]) -> Vec<&S> {
        if source_filter.is_empty() {
            return self.sources.iter().collect();
        }

        let mut wanted: Vec<usize> = source_filter
            .iter()
            .filter_map(|id| self.positions.get(id.as_str()).copied())
            .collect();
        wanted.sort_unstable();
        wanted.dedup();
        wanted.into_iter().map(|pos| &self.sources[pos]).collect()
    }
}

fn compare_results(a: &SearchResult, b: &SearchResult) -> std::cmp::Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.entry.name.cmp(&b.entry.name))
        .then_with(|| a.source_id.cmp(&b.source_id))
        .then_with(|| a.entry.path.cmp(&b.entry.path))
}
