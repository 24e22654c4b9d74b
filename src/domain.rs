use std::fmt;
use std::time::Duration;

use serde::Deserialize;

pub const ARCHIVE_EXTENSION: &str = ".zip";
pub const OUTPUT_EXTENSION: &str = "tif";

/// One scene archive file name as listed in the scene list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneName(String);

impl SceneName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its `.zip` extension.
    pub fn stem(&self) -> &str {
        let name = self.0.as_str();
        let split = name.len().saturating_sub(ARCHIVE_EXTENSION.len());
        match (name.get(..split), name.get(split..)) {
            (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION) => stem,
            _ => name,
        }
    }
}

impl fmt::Display for SceneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a newline separated scene list. Blank lines and `#` comments are dropped,
/// the last line counts even without a trailing newline.
pub fn parse_scene_list(text: &str) -> Vec<SceneName> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(SceneName::new)
        .collect()
}

/// Splits a comma separated `--scene` value.
pub fn parse_scene_arg(value: &str) -> Vec<SceneName> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(SceneName::new)
        .collect()
}

pub fn output_file_name(scene_stem: &str, label: &str) -> String {
    format!("{scene_stem}_{label}.{OUTPUT_EXTENSION}")
}

pub fn staging_file_name(scene_stem: &str, label: &str) -> String {
    format!("{scene_stem}_{label}.staging.{OUTPUT_EXTENSION}")
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// What a failed tool or post-process invocation does to the rest of the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Skip,
    Abort,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub scenes_total: u64,
    pub scenes_missing: u64,
    pub scenes_invalid: u64,
    pub graphs_run: u64,
    pub graphs_failed: u64,
    pub post_process_failed: u64,
    pub outputs_written: u64,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_line_without_trailing_newline() {
        let scenes = parse_scene_list("a.zip\nb.zip\nc.zip");
        let names: Vec<&str> = scenes.iter().map(SceneName::as_str).collect();
        assert_eq!(names, vec!["a.zip", "b.zip", "c.zip"]);
    }

    #[test]
    fn drops_blank_lines_comments_and_carriage_returns() {
        let scenes = parse_scene_list("# header\r\na.zip\r\n\r\n  b.zip  \n\n");
        let names: Vec<&str> = scenes.iter().map(SceneName::as_str).collect();
        assert_eq!(names, vec!["a.zip", "b.zip"]);
    }

    #[test]
    fn stem_strips_zip_extension_only() {
        assert_eq!(SceneName::new("S1A_IW_GRDH_1SDV.zip").stem(), "S1A_IW_GRDH_1SDV");
        assert_eq!(SceneName::new("S1A_IW_GRDH_1SDV.ZIP").stem(), "S1A_IW_GRDH_1SDV");
        assert_eq!(SceneName::new("S1A_IW_GRDH_1SDV").stem(), "S1A_IW_GRDH_1SDV");
        assert_eq!(SceneName::new("zip").stem(), "zip");
    }

    #[test]
    fn scene_arg_splits_on_commas() {
        let scenes = parse_scene_arg("a.zip, b.zip,,");
        assert_eq!(scenes, vec![SceneName::new("a.zip"), SceneName::new("b.zip")]);
    }

    #[test]
    fn output_names_are_deterministic() {
        assert_eq!(output_file_name("S1A_x", "GRD_TC"), "S1A_x_GRD_TC.tif");
        assert_eq!(staging_file_name("S1A_x", "SNAP"), "S1A_x_SNAP.staging.tif");
    }

    #[test]
    fn elapsed_is_formatted_as_clock() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(61_900)), "00:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(90_061)), "25:01:01");
    }
}
