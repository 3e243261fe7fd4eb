//! Table and column names of optimizer result stores

/// Parameter names, one row per parameter (`name`)
pub const PARAMETERS_TABLE: &str = "parameters";
/// Per-candidate data; free-form columns carry [`METADATA_PREFIX`]
pub const DATA_TABLE: &str = "data";
/// `(iteration, index, fitness)` rows
pub const SOLUTION_TABLE: &str = "solution";
/// Per-candidate parameter values, one [`PARAMETER_PREFIX`] column per parameter
pub const PARAMETER_VALUES_TABLE: &str = "parameter_values";
/// Enabled optimizer extensions (`name`)
pub const EXTENSIONS_TABLE: &str = "extensions";
/// Job descriptor (`name` is the optimizer name)
pub const JOB_TABLE: &str = "job";

pub const ITERATION_COLUMN: &str = "iteration";
pub const INDEX_COLUMN: &str = "index";
pub const FITNESS_COLUMN: &str = "fitness";

pub const PARAMETER_PREFIX: &str = "_p_";
pub const METADATA_PREFIX: &str = "_d_";

/// Extension whose candidates rank by stage before fitness
pub const STAGE_EXTENSION: &str = "StagePSO";
/// Data column holding the stage of a [`STAGE_EXTENSION`] candidate
pub const STAGE_COLUMN: &str = "_d_StagePSO::stage";
/// Optimizer family whose candidate index is a persistent particle
pub const SWARM_OPTIMIZER: &str = "pso";

/// Output table of parameter values
pub const OUTPUT_PARAMETER_TABLE: &str = "initial_population";
/// Output table of metadata values, row-aligned with [`OUTPUT_PARAMETER_TABLE`]
pub const OUTPUT_METADATA_TABLE: &str = "initial_population_data";
pub const OUTPUT_ID_COLUMN: &str = "id";
