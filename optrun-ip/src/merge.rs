//! Initial population generation
//!
//! Control flow: preflight checks, parse every source spec, resolve the
//! schema from the first source, create the output store, then for each
//! source in order: validate, probe, select, append. Any error after the
//! output store was created removes it again.

use crate::profile::SourceProfile;
use crate::registry::StoreRegistry;
use crate::schema::ResolvedSchema;
use crate::selector::{self, CandidateRef};
use crate::spec::SourceSpec;
use crate::writer::MergeWriter;
use chrono::{DateTime, Utc};
use optrun_common::db::{StoreOptions, DEFAULT_BUSY_TIMEOUT_MS};
use optrun_common::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Inputs of one run
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Source specs, `path[:iteration[:candidateIndex]]`
    pub sources: Vec<String>,
    /// Output store path; must not exist
    pub output: PathBuf,
    /// Picks per source
    pub nbest: u32,
    pub busy_timeout_ms: u64,
    /// Open sources with `PRAGMA synchronous = OFF`
    pub synchronous_off: bool,
    /// Validate metadata columns like parameters
    pub strict_metadata: bool,
    /// Select and validate only
    pub dry_run: bool,
}

impl MergeRequest {
    pub fn new(sources: Vec<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            output: output.into(),
            nbest: 1,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            synchronous_off: true,
            strict_metadata: false,
            dry_run: false,
        }
    }

    pub fn with_nbest(mut self, nbest: u32) -> Self {
        self.nbest = nbest;
        self
    }
}

/// Picks contributed by one source spec
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub spec: SourceSpec,
    pub profile: SourceProfile,
    pub picks: Vec<CandidateRef>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub output: PathBuf,
    pub dry_run: bool,
    pub generated_at: DateTime<Utc>,
    pub parameters: Vec<String>,
    pub metadata: Vec<String>,
    pub sources: Vec<SourceReport>,
    pub rows_written: usize,
}

impl MergeReport {
    /// Write the report as pretty JSON
    pub fn export_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Total picks across sources
    pub fn total_picks(&self) -> usize {
        self.sources.iter().map(|s| s.picks.len()).sum()
    }
}

/// Run a merge; all-or-nothing with respect to the output store
pub async fn generate(request: &MergeRequest) -> Result<MergeReport> {
    if request.output.exists() {
        return Err(Error::Precondition(format!(
            "The file `{}' already exists",
            request.output.display()
        )));
    }

    if request.sources.is_empty() {
        return Err(Error::Precondition("Please provide input databases".to_string()));
    }

    let specs = request
        .sources
        .iter()
        .map(|s| s.parse::<SourceSpec>())
        .collect::<Result<Vec<_>>>()?;

    let mut registry = StoreRegistry::new(StoreOptions::source(
        request.busy_timeout_ms,
        request.synchronous_off,
    ));
    let mut writer: Option<MergeWriter> = None;

    let result = run(request, &specs, &mut registry, &mut writer).await;

    registry.close_all().await;
    let rows_written = writer.as_ref().map_or(0, MergeWriter::rows_written);
    let created = writer.is_some();
    if let Some(writer) = writer {
        writer.close().await;
    }

    match result {
        Ok(mut report) => {
            report.rows_written = rows_written;
            Ok(report)
        }
        Err(e) => {
            error!("Initial population generation failed: {}", e);
            if created {
                discard_output(&request.output);
            }
            Err(e)
        }
    }
}

async fn run(
    request: &MergeRequest,
    specs: &[SourceSpec],
    registry: &mut StoreRegistry,
    writer: &mut Option<MergeWriter>,
) -> Result<MergeReport> {
    let reference = registry.open(&specs[0].path).await?;
    let schema = ResolvedSchema::resolve(reference).await?;

    if !request.dry_run {
        *writer = Some(
            MergeWriter::create(&request.output, &schema, request.busy_timeout_ms).await?,
        );
    }

    let mut sources = Vec::with_capacity(specs.len());

    for spec in specs {
        let store = registry.open(&spec.path).await?;
        schema.validate(store, request.strict_metadata).await?;

        let profile = SourceProfile::probe(store).await?;
        let picks = selector::select(store, spec, profile, request.nbest).await?;

        if let Some(writer) = writer.as_mut() {
            for pick in &picks {
                writer.append_pick(store, *pick).await?;
            }
        }

        info!("{}: {} candidates selected", spec, picks.len());
        sources.push(SourceReport {
            spec: spec.clone(),
            profile,
            picks,
        });
    }

    Ok(MergeReport {
        output: request.output.clone(),
        dry_run: request.dry_run,
        generated_at: Utc::now(),
        parameters: schema.parameters.iter().map(|p| p.name.clone()).collect(),
        metadata: schema.metadata.iter().map(|m| m.name.clone()).collect(),
        sources,
        rows_written: 0,
    })
}

/// Remove a written or partial output store, if present
pub fn discard_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
    }
}
