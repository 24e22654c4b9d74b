use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use scene_batch::{
    parse_scene_arg, run_batch, BatchRequest, Config, FailurePolicy, FilePorts, FsPorts,
    IndicatifProgressReporter, LineProgressReporter, ProgressReporter, SystemCommandRunner,
};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Newline separated list of scene archive names
    #[arg(value_name = "SCENE_LIST", required_unless_present = "scene")]
    scene_list: Option<PathBuf>,

    /// Scene archive names, comma separated, instead of a list file
    #[arg(short, long, value_name = "NAME[,NAME...]", conflicts_with = "scene_list")]
    scene: Option<String>,

    #[arg(short, long, value_name = "FILE", default_value = "scene-batch.json")]
    config: PathBuf,

    /// Print the commands without running them
    #[arg(long)]
    dry_run: bool,

    /// Stop the whole run at the first failed invocation
    #[arg(long)]
    fail_fast: bool,

    /// Plain line output instead of a progress bar
    #[arg(long)]
    plain: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(if err.use_stderr() { 1 } else { 0 });
    });

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut config = Config::from_file(&cli.config)
        .map_err(|err| format!("{}: {}", cli.config.display(), err))?;
    if cli.fail_fast {
        config.on_failure = FailurePolicy::Abort;
    }

    if !config.raw_root.is_dir() {
        return Err(format!("raw root not found: {}", config.raw_root.display()).into());
    }

    let ports = FsPorts::new();
    let scenes = match (&cli.scene_list, &cli.scene) {
        (None, Some(names)) => parse_scene_arg(names),
        (Some(list), None) => {
            if !list.is_file() {
                return Err(format!("scene list not found: {}", list.display()).into());
            }
            ports.read_scene_list(list)?
        }
        _ => return Err("give either SCENE_LIST or --scene".into()),
    };
    log::info!("{} scene(s) to process", scenes.len());

    let progress: Box<dyn ProgressReporter> = if cli.plain {
        Box::new(LineProgressReporter::new())
    } else {
        Box::new(IndicatifProgressReporter::new())
    };
    let request = BatchRequest {
        config,
        scenes,
        dry_run: cli.dry_run,
    };
    run_batch(&ports, &SystemCommandRunner::new(), progress.as_ref(), &request)?;

    Ok(())
}
