//! Near-match suggestions for unmatched tokens.
//!
//! Candidates are ranked by Damerau–Levenshtein distance (insertions,
//! deletions, substitutions and adjacent transpositions all cost 1), then by
//! name. Candidates farther than the configured maximum are dropped.
//!
//! # Examples
//!
//! ```
//! use argtree_core::SuggestionEngine;
//!
//! let engine = SuggestionEngine::new(2);
//! let suggestions = engine.suggest("--hepl", ["--help", "--version", "-h"]);
//! assert_eq!(suggestions[0].name, "--help");
//! assert_eq!(suggestions[0].distance, 1);
//! assert_eq!(suggestions.len(), 1);
//! ```

use serde::Serialize;
use strsim::damerau_levenshtein;

use crate::options::SuggestionConfig;

/// A ranked candidate name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Candidate option or command name.
    pub name: String,
    /// Edit distance to the unmatched token.
    pub distance: usize,
}

/// Stateless suggestion ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionEngine {
    max_distance: usize,
    limit: Option<usize>,
}

impl SuggestionEngine {
    /// Engine keeping every candidate within `max_distance`.
    pub fn new(max_distance: usize) -> Self {
        Self {
            max_distance,
            limit: None,
        }
    }

    /// Caps the number of returned suggestions.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Engine configured from parser options.
    pub fn from_config(config: &SuggestionConfig) -> Self {
        Self {
            max_distance: config.max_distance,
            limit: config.limit,
        }
    }

    /// Maximum accepted edit distance.
    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// Ranks `candidates` against `input`.
    ///
    /// The result is sorted by distance, then name; duplicate candidates
    /// appear once.
    pub fn suggest<'a, I>(&self, input: &str, candidates: I) -> Vec<Suggestion>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ranked: Vec<Suggestion> = candidates
            .into_iter()
            .map(|name| Suggestion {
                name: name.to_string(),
                distance: damerau_levenshtein(input, name),
            })
            .filter(|s| s.distance <= self.max_distance)
            .collect();

        ranked.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.name.cmp(&b.name)));
        ranked.dedup_by(|a, b| a.name == b.name);
        if let Some(limit) = self.limit {
            ranked.truncate(limit);
        }
        ranked
    }
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::from_config(&SuggestionConfig::default())
    }
}
