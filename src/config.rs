use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::FailurePolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no processing graphs configured")]
    NoGraphs,
    #[error("graph has no usable label: {0}")]
    EmptyLabel(PathBuf),
    #[error("duplicate graph label: {0}")]
    DuplicateLabel(String),
    #[error("{name} must be positive, got {value}")]
    InvalidPixelSpacing { name: &'static str, value: f64 },
}

/// How a scene name is turned into an archive path.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// `<raw_root>/<scene name>`
    #[default]
    Direct,
    /// First file named like the scene anywhere below the raw root.
    Search,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum GraphEntry {
    Path(PathBuf),
    Spec {
        path: PathBuf,
        #[serde(default)]
        label: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSpec {
    pub path: PathBuf,
    pub label: String,
}

impl GraphSpec {
    /// Uses `label` when given, otherwise the graph file stem.
    pub fn new(path: impl Into<PathBuf>, label: Option<String>) -> Self {
        let path = path.into();
        let label = label.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        Self { path, label }
    }
}

/// Values passed to every graph as `-P` properties.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphParameters {
    /// WKT polygon of the area of interest.
    pub region: Option<String>,
    pub utm_zone: Option<String>,
    pub central_meridian: Option<String>,
    pub pixel_spacing_meters: Option<f64>,
    pub pixel_spacing_degrees: Option<f64>,
    pub land_mask_path: Option<PathBuf>,
    pub land_mask_name: Option<String>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostProcess {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub raw_root: PathBuf,
    pub output_root: PathBuf,
    pub executable: PathBuf,
    pub resolve: ResolveMode,
    pub graphs: Vec<GraphSpec>,
    pub parameters: GraphParameters,
    pub post_process: Option<PostProcess>,
    pub on_failure: FailurePolicy,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigHelper {
    raw_root: PathBuf,
    output_root: PathBuf,
    executable: PathBuf,
    #[serde(default)]
    resolve: ResolveMode,
    graphs: Vec<GraphEntry>,
    #[serde(default)]
    parameters: GraphParameters,
    #[serde(default)]
    post_process: Option<PostProcess>,
    #[serde(default)]
    on_failure: FailurePolicy,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let helper: ConfigHelper = serde_json::from_reader(BufReader::new(file))?;
        Self::from_helper(helper)
    }

    pub fn from_json(text: &str) -> Result<Config, ConfigError> {
        let helper: ConfigHelper = serde_json::from_str(text)?;
        Self::from_helper(helper)
    }

    fn from_helper(helper: ConfigHelper) -> Result<Config, ConfigError> {
        let graphs: Vec<GraphSpec> = helper
            .graphs
            .into_iter()
            .map(|entry| match entry {
                GraphEntry::Path(path) => GraphSpec::new(path, None),
                GraphEntry::Spec { path, label } => GraphSpec::new(path, label),
            })
            .collect();

        let config = Config {
            raw_root: helper.raw_root,
            output_root: helper.output_root,
            executable: helper.executable,
            resolve: helper.resolve,
            graphs,
            parameters: helper.parameters,
            post_process: helper.post_process,
            on_failure: helper.on_failure,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graphs.is_empty() {
            return Err(ConfigError::NoGraphs);
        }

        let mut labels = HashSet::new();
        for graph in &self.graphs {
            if graph.label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel(graph.path.clone()));
            }
            if !labels.insert(graph.label.as_str()) {
                return Err(ConfigError::DuplicateLabel(graph.label.clone()));
            }
        }

        let spacings = [
            ("pixel_spacing_meters", self.parameters.pixel_spacing_meters),
            ("pixel_spacing_degrees", self.parameters.pixel_spacing_degrees),
        ];
        for (name, value) in spacings {
            if let Some(value) = value {
                if value.is_nan() || value <= 0.0 {
                    return Err(ConfigError::InvalidPixelSpacing { name, value });
                }
            }
        }

        Ok(())
    }
}
