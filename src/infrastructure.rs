use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use walkdir::WalkDir;

use crate::application::{
    ArchiveOutcome, BatchError, CommandOutcome, CommandRunner, FilePorts, ProgressReporter,
};
use crate::config::ResolveMode;
use crate::domain::{format_elapsed, parse_scene_list, BatchStats, SceneName};
use crate::invocation::ToolInvocation;

pub struct FsPorts;

impl FsPorts {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl FilePorts for FsPorts {
    fn read_scene_list(&self, path: &Path) -> Result<Vec<SceneName>, BatchError> {
        let text = fs::read_to_string(path)?;
        Ok(parse_scene_list(&text))
    }

    fn resolve_scene(
        &self,
        raw_root: &Path,
        scene: &SceneName,
        mode: ResolveMode,
    ) -> Result<Option<PathBuf>, BatchError> {
        match mode {
            ResolveMode::Direct => {
                let candidate = raw_root.join(scene.as_str());
                Ok(candidate.is_file().then_some(candidate))
            }
            ResolveMode::Search => {
                let walker = WalkDir::new(raw_root)
                    .follow_links(false)
                    .sort_by_file_name();
                for entry in walker {
                    let entry = entry.map_err(|err| BatchError::Message(err.to_string()))?;

                    // symlinked archives count, as they do in direct mode
                    if entry.file_name() == scene.as_str() && entry.path().is_file() {
                        return Ok(Some(entry.into_path()));
                    }
                }

                Ok(None)
            }
        }
    }

    fn inspect_archive(&self, archive: &Path) -> ArchiveOutcome {
        let file = match fs::File::open(archive) {
            Ok(file) => file,
            Err(err) => return ArchiveOutcome::Invalid(err.to_string()),
        };

        match zip::ZipArchive::new(file) {
            Ok(zip) if zip.len() == 0 => ArchiveOutcome::Invalid("archive is empty".to_string()),
            Ok(zip) => ArchiveOutcome::Valid { entries: zip.len() },
            Err(err) => ArchiveOutcome::Invalid(err.to_string()),
        }
    }

    fn output_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, dir: &Path) -> Result<(), BatchError> {
        fs::create_dir_all(dir)?;
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<(), BatchError> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                fs::copy(from, to)?;
                fs::remove_file(from)?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Runs invocations as child processes with inherited stdio.
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<CommandOutcome, BatchError> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map_err(|source| BatchError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(CommandOutcome::Success)
        } else {
            Ok(CommandOutcome::Failed {
                code: status.code(),
            })
        }
    }
}

pub struct NoProgressReporter;

impl NoProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for NoProgressReporter {
    fn on_start(&self, _scenes: u64, _graphs: u64) {}

    fn on_scene_start(&self, _index: u64, _scene: &SceneName) {}

    fn on_scene_missing(&self, _scene: &SceneName) {}

    fn on_scene_invalid(&self, _archive: &Path, _reason: &str) {}

    fn on_graph_start(&self, _scene: &SceneName, _label: &str) {}

    fn on_graph_failed(&self, _scene: &SceneName, _label: &str, _reason: &str) {}

    fn on_post_process_failed(&self, _target: &Path, _reason: &str) {}

    fn on_output_written(&self, _output: &Path) {}

    fn on_dry_run(&self, _invocation: &ToolInvocation) {}

    fn on_scene_finish(&self, _scene: &SceneName, _elapsed: Duration) {}

    fn on_finish(&self, _stats: &BatchStats) {}
}

pub struct IndicatifProgressReporter {
    bar: ProgressBar,
}

impl IndicatifProgressReporter {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(draw_target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, draw_target);
        let style = ProgressStyle::with_template(
            "{spinner:.yellow} [{elapsed_precise}] {pos}/{len} {msg:.blue}",
        )
        .expect("invalid progress style template")
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }
}

impl Default for IndicatifProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn on_start(&self, scenes: u64, graphs: u64) {
        self.bar.set_length(scenes);
        let _ = self
            .bar
            .println(format!("processing {scenes} scene(s) with {graphs} graph(s)"));
    }

    fn on_scene_start(&self, _index: u64, scene: &SceneName) {
        self.bar.set_message(scene.stem().to_string());
    }

    fn on_scene_missing(&self, scene: &SceneName) {
        let message = format!("missing archive: {scene}, skipping");
        let _ = self.bar.println(style(message).yellow().to_string());
    }

    fn on_scene_invalid(&self, archive: &Path, reason: &str) {
        let message = format!("invalid archive: {} ({})", archive.display(), reason);
        let _ = self.bar.println(style(message).red().to_string());
    }

    fn on_graph_start(&self, scene: &SceneName, label: &str) {
        self.bar.set_message(format!("{} [{}]", scene.stem(), label));
    }

    fn on_graph_failed(&self, scene: &SceneName, label: &str, reason: &str) {
        let message = format!("{label} failed on {scene}: {reason}");
        let _ = self.bar.println(style(message).red().to_string());
    }

    fn on_post_process_failed(&self, target: &Path, reason: &str) {
        let message = format!("post-processing failed on {}: {}", target.display(), reason);
        let _ = self.bar.println(style(message).red().to_string());
    }

    fn on_output_written(&self, output: &Path) {
        let message = format!("written: {}", output.display());
        let _ = self.bar.println(style(message).green().to_string());
    }

    fn on_dry_run(&self, invocation: &ToolInvocation) {
        let _ = self.bar.println(invocation.display());
    }

    fn suspend(&self, run: &mut dyn FnMut()) {
        // child processes share the terminal, keep the spinner off it meanwhile
        self.bar.suspend(run);
    }

    fn on_scene_finish(&self, scene: &SceneName, elapsed: Duration) {
        let _ = self
            .bar
            .println(format!("{} done in {}", scene.stem(), HumanDuration(elapsed)));
        self.bar.inc(1);
    }

    fn on_finish(&self, stats: &BatchStats) {
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(format_stats(stats));
    }
}

struct LineProgressState<W: Write> {
    writer: W,
    scenes: u64,
}

/// Plain line output for logs and non-interactive terminals.
pub struct LineProgressReporter<W: Write + Send> {
    state: Mutex<LineProgressState<W>>,
}

impl LineProgressReporter<std::io::Stderr> {
    pub fn new() -> Self {
        Self::with_writer(std::io::stderr())
    }
}

impl Default for LineProgressReporter<std::io::Stderr> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> LineProgressReporter<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            state: Mutex::new(LineProgressState { writer, scenes: 0 }),
        }
    }

    pub fn into_inner(self) -> W {
        let state = match self.state.into_inner() {
            Ok(state) => state,
            Err(err) => err.into_inner(),
        };
        state.writer
    }

    fn write_line(&self, line: std::fmt::Arguments<'_>) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(err) => err.into_inner(),
        };

        let _ = writeln!(state.writer, "{line}");
        let _ = state.writer.flush();
    }
}

impl<W: Write + Send> ProgressReporter for LineProgressReporter<W> {
    fn on_start(&self, scenes: u64, graphs: u64) {
        {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(err) => err.into_inner(),
            };
            state.scenes = scenes;
        }
        self.write_line(format_args!(
            "processing {scenes} scene(s) with {graphs} graph(s)"
        ));
    }

    fn on_scene_start(&self, index: u64, scene: &SceneName) {
        let total = match self.state.lock() {
            Ok(state) => state.scenes,
            Err(err) => err.into_inner().scenes,
        };
        self.write_line(format_args!("[{index}/{total}] {scene}"));
    }

    fn on_scene_missing(&self, scene: &SceneName) {
        self.write_line(format_args!("missing archive: {scene}, skipping"));
    }

    fn on_scene_invalid(&self, archive: &Path, reason: &str) {
        self.write_line(format_args!(
            "invalid archive: {} ({})",
            archive.display(),
            reason
        ));
    }

    fn on_graph_start(&self, _scene: &SceneName, label: &str) {
        self.write_line(format_args!("  graph: {label}"));
    }

    fn on_graph_failed(&self, scene: &SceneName, label: &str, reason: &str) {
        self.write_line(format_args!("  {label} failed on {scene}: {reason}"));
    }

    fn on_post_process_failed(&self, target: &Path, reason: &str) {
        self.write_line(format_args!(
            "  post-processing failed on {}: {}",
            target.display(),
            reason
        ));
    }

    fn on_output_written(&self, output: &Path) {
        self.write_line(format_args!("  written: {}", output.display()));
    }

    fn on_dry_run(&self, invocation: &ToolInvocation) {
        self.write_line(format_args!("  {}", invocation.display()));
    }

    fn on_scene_finish(&self, scene: &SceneName, elapsed: Duration) {
        self.write_line(format_args!(
            "  {} done in {}",
            scene.stem(),
            format_elapsed(elapsed)
        ));
    }

    fn on_finish(&self, stats: &BatchStats) {
        self.write_line(format_args!("{}", format_stats(stats)));
    }
}

fn format_stats(stats: &BatchStats) -> String {
    format!(
        "scenes: {} missing: {} invalid: {} failed: {} written: {} elapsed: {}",
        stats.scenes_total,
        stats.scenes_missing,
        stats.scenes_invalid,
        stats.graphs_failed + stats.post_process_failed,
        stats.outputs_written,
        format_elapsed(stats.elapsed)
    )
}
