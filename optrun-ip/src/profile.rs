//! Per-source ranking profile
//!
//! Probed once per source from the auxiliary `extensions` and `job` tables
//! before selection runs. Missing auxiliary tables mean "plain".

use crate::layout::{EXTENSIONS_TABLE, JOB_TABLE, STAGE_EXTENSION, SWARM_OPTIMIZER};
use optrun_common::db::{SchemaIntrospector, Store};
use optrun_common::{Error, Result};
use serde::Serialize;
use sqlx::Row;
use tracing::debug;

/// Sort order of the ranking query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Fitness descending
    Fitness,
    /// Stage descending, then fitness descending
    StageThenFitness,
}

/// What a candidate index denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateIdentity {
    /// Each (iteration, index) is an independent solution
    Snapshot,
    /// The index names a particle that persists across iterations
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceProfile {
    pub ranking: Ranking,
    pub identity: CandidateIdentity,
}

/// Plain fitness ranking over independent snapshots
impl Default for SourceProfile {
    fn default() -> Self {
        Self {
            ranking: Ranking::Fitness,
            identity: CandidateIdentity::Snapshot,
        }
    }
}

impl SourceProfile {
    /// Probe `store` for the stage extension and the swarm optimizer family
    pub async fn probe(store: &Store) -> Result<Self> {
        let staged = any_name(store, EXTENSIONS_TABLE, |name| name == STAGE_EXTENSION).await?;
        let swarm = any_name(store, JOB_TABLE, |name| {
            name.eq_ignore_ascii_case(SWARM_OPTIMIZER)
        })
        .await?;

        let mut profile = Self::default();
        if staged {
            profile.ranking = Ranking::StageThenFitness;
        }
        if swarm {
            profile.identity = CandidateIdentity::Persistent;
        }

        debug!("Profile of {}: {:?}", store.path().display(), profile);
        Ok(profile)
    }
}

/// Whether any `name` row of `table` satisfies `pred`; `false` if no table
async fn any_name<F>(store: &Store, table: &str, pred: F) -> Result<bool>
where
    F: Fn(&str) -> bool,
{
    if !SchemaIntrospector::table_exists(store, table).await? {
        return Ok(false);
    }

    let sql = format!("SELECT \"name\" FROM \"{}\"", table);
    let mut found = false;

    store
        .query(&sql, &[], |row| {
            let name: Option<String> = row.try_get(0).map_err(Error::store(&sql))?;
            found = name.as_deref().is_some_and(&pred);
            Ok(!found)
        })
        .await?;

    Ok(found)
}
