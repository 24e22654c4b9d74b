use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{Config, GraphSpec, ResolveMode};
use crate::domain::{
    output_file_name, staging_file_name, BatchStats, FailurePolicy, SceneName,
};
use crate::invocation::ToolInvocation;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("aborted after failure on scene {scene} ({label})")]
    Aborted { scene: String, label: String },
    #[error("{0}")]
    Message(String),
}

pub trait FilePorts {
    fn read_scene_list(&self, path: &Path) -> Result<Vec<SceneName>, BatchError>;
    fn resolve_scene(
        &self,
        raw_root: &Path,
        scene: &SceneName,
        mode: ResolveMode,
    ) -> Result<Option<PathBuf>, BatchError>;
    fn inspect_archive(&self, archive: &Path) -> ArchiveOutcome;
    fn output_exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, dir: &Path) -> Result<(), BatchError>;
    fn move_file(&self, from: &Path, to: &Path) -> Result<(), BatchError>;
}

pub trait CommandRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<CommandOutcome, BatchError>;
}

pub trait ProgressReporter {
    fn on_start(&self, scenes: u64, graphs: u64);
    fn on_scene_start(&self, index: u64, scene: &SceneName);
    fn on_scene_missing(&self, scene: &SceneName);
    fn on_scene_invalid(&self, archive: &Path, reason: &str);
    fn on_graph_start(&self, scene: &SceneName, label: &str);
    fn on_graph_failed(&self, scene: &SceneName, label: &str, reason: &str);
    fn on_post_process_failed(&self, target: &Path, reason: &str);
    fn on_output_written(&self, output: &Path);
    fn on_dry_run(&self, invocation: &ToolInvocation);
    /// Runs an external command with the reporter's own output held back.
    fn suspend(&self, run: &mut dyn FnMut()) {
        run();
    }
    fn on_scene_finish(&self, scene: &SceneName, elapsed: Duration);
    fn on_finish(&self, stats: &BatchStats);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Valid { entries: usize },
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failed { code: Option<i32> },
}

impl CommandOutcome {
    fn describe(&self) -> String {
        match self {
            CommandOutcome::Success => "success".to_string(),
            CommandOutcome::Failed { code: Some(code) } => format!("exit status {code}"),
            CommandOutcome::Failed { code: None } => "terminated by signal".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub config: Config,
    pub scenes: Vec<SceneName>,
    pub dry_run: bool,
}

enum StepResult {
    Done,
    Failed(String),
}

struct SceneRun<'a> {
    ports: &'a dyn FilePorts,
    runner: &'a dyn CommandRunner,
    progress: &'a dyn ProgressReporter,
    config: &'a Config,
    dry_run: bool,
}

impl SceneRun<'_> {
    fn invoke(&self, invocation: &ToolInvocation) -> Result<StepResult, BatchError> {
        log::debug!("running: {}", invocation.display());

        if self.dry_run {
            self.progress.on_dry_run(invocation);
            return Ok(StepResult::Done);
        }

        let mut result = None;
        self.progress
            .suspend(&mut || result = Some(self.runner.run(invocation)));
        let result = result.ok_or_else(|| {
            BatchError::Message(format!("not run: {}", invocation.display()))
        })?;

        match result {
            Ok(CommandOutcome::Success) => Ok(StepResult::Done),
            Ok(outcome) => Ok(StepResult::Failed(outcome.describe())),
            Err(err @ BatchError::Spawn { .. }) => Ok(StepResult::Failed(err.to_string())),
            Err(err) => Err(err),
        }
    }

    fn graph_failed(
        &self,
        stats: &mut BatchStats,
        scene: &SceneName,
        graph: &GraphSpec,
        reason: &str,
    ) -> Result<(), BatchError> {
        stats.graphs_failed += 1;
        self.progress.on_graph_failed(scene, &graph.label, reason);
        self.fail(scene, graph)
    }

    fn fail(&self, scene: &SceneName, graph: &GraphSpec) -> Result<(), BatchError> {
        match self.config.on_failure {
            FailurePolicy::Skip => Ok(()),
            FailurePolicy::Abort => Err(BatchError::Aborted {
                scene: scene.to_string(),
                label: graph.label.clone(),
            }),
        }
    }

    fn process_graph(
        &self,
        stats: &mut BatchStats,
        scene: &SceneName,
        archive: &Path,
        scene_dir: &Path,
        graph: &GraphSpec,
    ) -> Result<(), BatchError> {
        let staging = scene_dir.join(staging_file_name(scene.stem(), &graph.label));
        let output = scene_dir.join(output_file_name(scene.stem(), &graph.label));

        self.progress.on_graph_start(scene, &graph.label);
        stats.graphs_run += 1;

        let tool = ToolInvocation::for_graph(
            &self.config.executable,
            graph,
            archive,
            &staging,
            &self.config.parameters,
        );
        if let StepResult::Failed(reason) = self.invoke(&tool)? {
            return self.graph_failed(stats, scene, graph, &reason);
        }

        // a zero exit with no raster happens when the region misses the scene
        if !self.dry_run && !self.ports.output_exists(&staging) {
            let reason = format!("no output written to {}", staging.display());
            return self.graph_failed(stats, scene, graph, &reason);
        }

        if let Some(post) = &self.config.post_process {
            let post = ToolInvocation::for_post_process(post, &staging);
            if let StepResult::Failed(reason) = self.invoke(&post)? {
                stats.post_process_failed += 1;
                self.progress.on_post_process_failed(&staging, &reason);
                return self.fail(scene, graph);
            }
        }

        if self.dry_run {
            return Ok(());
        }

        if let Err(err) = self.ports.move_file(&staging, &output) {
            let reason = format!("cannot move to {}: {}", output.display(), err);
            return self.graph_failed(stats, scene, graph, &reason);
        }
        stats.outputs_written += 1;
        self.progress.on_output_written(&output);

        Ok(())
    }

    fn process_scene(&self, stats: &mut BatchStats, scene: &SceneName) -> Result<(), BatchError> {
        let Some(archive) =
            self.ports
                .resolve_scene(&self.config.raw_root, scene, self.config.resolve)?
        else {
            stats.scenes_missing += 1;
            self.progress.on_scene_missing(scene);
            return Ok(());
        };
        log::info!("resolved {} to {}", scene, archive.display());

        if let ArchiveOutcome::Invalid(reason) = self.ports.inspect_archive(&archive) {
            stats.scenes_invalid += 1;
            self.progress.on_scene_invalid(&archive, &reason);
            return Ok(());
        }

        let scene_dir = self.config.output_root.join(scene.stem());
        if !self.dry_run {
            if let Err(err) = self.ports.create_dir_all(&scene_dir) {
                let reason = format!("cannot create {}: {}", scene_dir.display(), err);
                for graph in &self.config.graphs {
                    self.graph_failed(stats, scene, graph, &reason)?;
                }
                return Ok(());
            }
        }

        for graph in &self.config.graphs {
            self.process_graph(stats, scene, &archive, &scene_dir, graph)?;
        }

        Ok(())
    }
}

/// Runs every configured graph over every scene, one at a time and in list order.
pub fn run_batch(
    ports: &dyn FilePorts,
    runner: &dyn CommandRunner,
    progress: &dyn ProgressReporter,
    request: &BatchRequest,
) -> Result<BatchStats, BatchError> {
    let started = Instant::now();
    let run = SceneRun {
        ports,
        runner,
        progress,
        config: &request.config,
        dry_run: request.dry_run,
    };
    let mut stats = BatchStats {
        scenes_total: request.scenes.len() as u64,
        ..BatchStats::default()
    };

    progress.on_start(stats.scenes_total, request.config.graphs.len() as u64);

    for (index, scene) in request.scenes.iter().enumerate() {
        let scene_started = Instant::now();
        progress.on_scene_start(index as u64 + 1, scene);

        let result = run.process_scene(&mut stats, scene);
        progress.on_scene_finish(scene, scene_started.elapsed());

        if let Err(err) = result {
            stats.elapsed = started.elapsed();
            progress.on_finish(&stats);
            return Err(err);
        }
    }

    stats.elapsed = started.elapsed();
    progress.on_finish(&stats);

    Ok(stats)
}
