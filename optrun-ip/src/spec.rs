//! Source specification parsing
//!
//! A source is written `path[:iteration[:candidateIndex]]`. A missing, empty
//! or `-1` qualifier leaves that dimension unconstrained.

use optrun_common::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A parsed selection target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub iteration: Option<i64>,
    pub candidate_index: Option<i64>,
}

/// Which dimensions of a source are pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Addressing {
    /// Rank every candidate in the store
    All,
    /// One candidate index across all iterations
    Candidate { index: i64 },
    /// All candidates of one iteration
    Iteration { iteration: i64 },
    /// Exactly one row
    Exact { iteration: i64, index: i64 },
}

impl SourceSpec {
    pub fn addressing(&self) -> Addressing {
        match (self.iteration, self.candidate_index) {
            (None, None) => Addressing::All,
            (None, Some(index)) => Addressing::Candidate { index },
            (Some(iteration), None) => Addressing::Iteration { iteration },
            (Some(iteration), Some(index)) => Addressing::Exact { iteration, index },
        }
    }
}

fn parse_qualifier(spec: &str, what: &str, part: Option<&str>) -> Result<Option<i64>> {
    let Some(part) = part.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let value: i64 = part.parse().map_err(|_| {
        Error::InvalidSpec(format!("{} `{}' in `{}' is not an integer", what, part, spec))
    })?;

    Ok(if value == -1 { None } else { Some(value) })
}

impl FromStr for SourceSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');

        let path = parts.next().unwrap_or_default();
        if path.is_empty() {
            return Err(Error::InvalidSpec(format!("`{}' has no path", s)));
        }

        let iteration = parse_qualifier(s, "iteration", parts.next())?;
        let candidate_index = parse_qualifier(s, "candidate index", parts.next())?;

        Ok(Self {
            path: PathBuf::from(path),
            iteration,
            candidate_index,
        })
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        match (self.iteration, self.candidate_index) {
            (None, None) => Ok(()),
            (Some(it), None) => write!(f, ":{}", it),
            (it, Some(idx)) => write!(f, ":{}:{}", it.unwrap_or(-1), idx),
        }
    }
}
