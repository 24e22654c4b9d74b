pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod invocation;

pub use crate::application::{
    run_batch, ArchiveOutcome, BatchError, BatchRequest, CommandOutcome, CommandRunner,
    FilePorts, ProgressReporter,
};
pub use crate::config::{Config, ConfigError, GraphParameters, GraphSpec, PostProcess, ResolveMode};
pub use crate::domain::{
    format_elapsed, output_file_name, parse_scene_arg, parse_scene_list, staging_file_name,
    BatchStats, FailurePolicy, SceneName,
};
pub use crate::infrastructure::{
    FsPorts, IndicatifProgressReporter, LineProgressReporter, NoProgressReporter,
    SystemCommandRunner,
};
pub use crate::invocation::ToolInvocation;
