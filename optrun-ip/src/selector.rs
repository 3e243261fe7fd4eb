//! Solution selection
//!
//! Builds the ranking query for a source from its addressing and profile,
//! then consumes ranked rows until N picks are collected. For swarm-style
//! sources a candidate index names a persistent particle, so only the
//! best-ranked snapshot of each index is kept.
//!
//! When a source is both staged and swarm-style, the stage tie-break is part
//! of the ranking query and deduplication runs over that ranked sequence.

use crate::layout::{
    DATA_TABLE, FITNESS_COLUMN, INDEX_COLUMN, ITERATION_COLUMN, SOLUTION_TABLE, STAGE_COLUMN,
};
use crate::profile::{CandidateIdentity, Ranking, SourceProfile};
use crate::spec::{Addressing, SourceSpec};
use optrun_common::db::{SqlValue, Store};
use optrun_common::{Error, Result};
use serde::Serialize;
use sqlx::Row;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Lookup key of one candidate inside a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CandidateRef {
    pub iteration: i64,
    pub index: i64,
}

impl CandidateRef {
    pub fn new(iteration: i64, index: i64) -> Self {
        Self { iteration, index }
    }
}

/// Statement text and positional parameters of a ranking query
#[derive(Debug, Clone, PartialEq)]
pub struct RankingQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Build the ranking query for `addressing` under `ranking`
///
/// Ties on the ranking keys fall back to `(iteration, index)` ascending so
/// that capped and uncapped queries agree on the order.
pub fn ranking_query(addressing: Addressing, ranking: Ranking, limit_one: bool) -> RankingQuery {
    let mut sql = format!(
        "SELECT s.\"{it}\", s.\"{ix}\" FROM \"{solution}\" AS s",
        it = ITERATION_COLUMN,
        ix = INDEX_COLUMN,
        solution = SOLUTION_TABLE,
    );

    let exact = matches!(addressing, Addressing::Exact { .. });
    let staged = ranking == Ranking::StageThenFitness && !exact;
    if staged {
        sql.push_str(&format!(
            " LEFT JOIN \"{data}\" AS d ON (d.\"{ix}\" = s.\"{ix}\" AND d.\"{it}\" = s.\"{it}\")",
            data = DATA_TABLE,
            it = ITERATION_COLUMN,
            ix = INDEX_COLUMN,
        ));
    }

    let params = match addressing {
        Addressing::All => vec![],
        Addressing::Candidate { index } => {
            sql.push_str(&format!(" WHERE s.\"{}\" = ?", INDEX_COLUMN));
            vec![SqlValue::Integer(index)]
        }
        Addressing::Iteration { iteration } => {
            sql.push_str(&format!(" WHERE s.\"{}\" = ?", ITERATION_COLUMN));
            vec![SqlValue::Integer(iteration)]
        }
        Addressing::Exact { iteration, index } => {
            sql.push_str(&format!(
                " WHERE s.\"{}\" = ? AND s.\"{}\" = ?",
                ITERATION_COLUMN, INDEX_COLUMN
            ));
            vec![SqlValue::Integer(iteration), SqlValue::Integer(index)]
        }
    };

    if !exact {
        sql.push_str(" ORDER BY ");
        if staged {
            sql.push_str(&format!("CAST(d.\"{}\" AS REAL) DESC, ", STAGE_COLUMN));
        }
        sql.push_str(&format!(
            "s.\"{fit}\" DESC, s.\"{it}\" ASC, s.\"{ix}\" ASC",
            fit = FITNESS_COLUMN,
            it = ITERATION_COLUMN,
            ix = INDEX_COLUMN,
        ));
    }

    if limit_one || exact {
        sql.push_str(" LIMIT 1");
    }

    RankingQuery { sql, params }
}

/// Accumulates picks from a ranked sequence
#[derive(Debug)]
pub struct PickCollector {
    limit: usize,
    dedup: bool,
    seen: HashSet<i64>,
    picks: Vec<CandidateRef>,
}

impl PickCollector {
    /// Collect up to `limit` picks, keeping one per index when `dedup`
    pub fn new(limit: usize, dedup: bool) -> Self {
        Self {
            limit,
            dedup,
            seen: HashSet::new(),
            picks: Vec::new(),
        }
    }

    /// Offer the next ranked candidate; `false` once the cap is reached
    pub fn offer(&mut self, candidate: CandidateRef) -> bool {
        if self.is_full() {
            return false;
        }

        if !self.dedup || self.seen.insert(candidate.index) {
            self.picks.push(candidate);
        }

        !self.is_full()
    }

    fn is_full(&self) -> bool {
        self.picks.len() >= self.limit
    }

    pub fn into_picks(self) -> Vec<CandidateRef> {
        self.picks
    }
}

/// Select up to `nbest` candidates of `store`, most preferred first
pub async fn select(
    store: &Store,
    spec: &SourceSpec,
    profile: SourceProfile,
    nbest: u32,
) -> Result<Vec<CandidateRef>> {
    if nbest == 0 {
        return Ok(Vec::new());
    }

    let addressing = spec.addressing();
    let dedup = profile.identity == CandidateIdentity::Persistent && spec.candidate_index.is_none();
    let query = ranking_query(addressing, profile.ranking, nbest == 1);

    debug!("Ranking {} with: {}", spec, query.sql);

    let mut collector = PickCollector::new(nbest as usize, dedup);
    let sql = query.sql.as_str();

    store
        .query(sql, &query.params, |row| {
            let iteration: i64 = row.try_get(0).map_err(Error::store(sql))?;
            let index: i64 = row.try_get(1).map_err(Error::store(sql))?;
            Ok(collector.offer(CandidateRef::new(iteration, index)))
        })
        .await?;

    let picks = collector.into_picks();
    if picks.is_empty() {
        warn!("No candidates selected from {}", spec);
    } else {
        debug!("Selected {} candidates from {}: {:?}", picks.len(), spec, picks);
    }

    Ok(picks)
}
