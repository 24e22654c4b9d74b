use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{GraphParameters, GraphSpec, PostProcess};

/// A fully resolved external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn property(self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let mut arg = OsString::from(format!("-P{key}="));
        arg.push(value);
        self.arg(arg)
    }

    fn optional_property(self, key: &str, value: Option<impl AsRef<std::ffi::OsStr>>) -> Self {
        match value {
            Some(value) => self.property(key, value),
            None => self,
        }
    }

    /// `<executable> <graph> -Pinput=<source> -Ptarget=<target> [-P<name>=<value>...]`
    pub fn for_graph(
        executable: &Path,
        graph: &GraphSpec,
        source: &Path,
        target: &Path,
        parameters: &GraphParameters,
    ) -> Self {
        let mut invocation = Self::new(executable)
            .arg(graph.path.as_os_str())
            .property("input", source)
            .property("target", target)
            .optional_property("region", parameters.region.as_deref())
            .optional_property("utmZone", parameters.utm_zone.as_deref())
            .optional_property("centralMeridian", parameters.central_meridian.as_deref())
            .optional_property(
                "pixelSpacingInMeter",
                parameters.pixel_spacing_meters.map(|v| v.to_string()),
            )
            .optional_property(
                "pixelSpacingInDegree",
                parameters.pixel_spacing_degrees.map(|v| v.to_string()),
            )
            .optional_property("landMask", parameters.land_mask_path.as_deref())
            .optional_property("landMaskName", parameters.land_mask_name.as_deref());

        for (key, value) in &parameters.extra {
            invocation = invocation.property(key, value);
        }

        invocation
    }

    /// `<program> <args...> <target>`
    pub fn for_post_process(post: &PostProcess, target: &Path) -> Self {
        post.args
            .iter()
            .fold(Self::new(&post.program), |invocation, arg| invocation.arg(arg))
            .arg(target.as_os_str())
    }

    /// Shell-like rendering for logs and dry runs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| quote(&part.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(part: &str) -> String {
    let plain = !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(invocation: &ToolInvocation) -> Vec<String> {
        invocation
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn graph_invocation_passes_source_and_target_first() {
        let graph = GraphSpec::new("/graphs/GRD_TC.xml", None);
        let invocation = ToolInvocation::for_graph(
            Path::new("/opt/snap/bin/gpt"),
            &graph,
            Path::new("/raw/S1A.zip"),
            Path::new("/out/S1A/S1A_GRD_TC.staging.tif"),
            &GraphParameters::default(),
        );

        assert_eq!(invocation.program, PathBuf::from("/opt/snap/bin/gpt"));
        assert_eq!(
            args(&invocation),
            vec![
                "/graphs/GRD_TC.xml",
                "-Pinput=/raw/S1A.zip",
                "-Ptarget=/out/S1A/S1A_GRD_TC.staging.tif",
            ]
        );
    }

    #[test]
    fn graph_invocation_appends_parameters_in_fixed_order() {
        let graph = GraphSpec::new("g.xml", None);
        let mut parameters = GraphParameters {
            region: Some("POLYGON((0 0, 1 0, 1 1, 0 0))".to_string()),
            utm_zone: Some("33".to_string()),
            central_meridian: Some("15".to_string()),
            pixel_spacing_meters: Some(20.0),
            pixel_spacing_degrees: Some(0.5),
            land_mask_path: Some(PathBuf::from("/masks/coast.shp")),
            land_mask_name: Some("coast".to_string()),
            ..GraphParameters::default()
        };
        parameters.extra.insert("z".to_string(), "last".to_string());
        parameters.extra.insert("a".to_string(), "first".to_string());

        let invocation = ToolInvocation::for_graph(
            Path::new("gpt"),
            &graph,
            Path::new("in.zip"),
            Path::new("out.tif"),
            &parameters,
        );

        assert_eq!(
            &args(&invocation)[3..],
            &[
                "-Pregion=POLYGON((0 0, 1 0, 1 1, 0 0))",
                "-PutmZone=33",
                "-PcentralMeridian=15",
                "-PpixelSpacingInMeter=20",
                "-PpixelSpacingInDegree=0.5",
                "-PlandMask=/masks/coast.shp",
                "-PlandMaskName=coast",
                "-Pa=first",
                "-Pz=last",
            ]
        );
    }

    #[test]
    fn post_process_gets_target_last() {
        let post = PostProcess {
            program: PathBuf::from("python3"),
            args: vec!["convert_to_NaN_and_dB.py".to_string()],
        };
        let invocation = ToolInvocation::for_post_process(&post, Path::new("/out/a.tif"));

        assert_eq!(args(&invocation), vec!["convert_to_NaN_and_dB.py", "/out/a.tif"]);
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let invocation = ToolInvocation::new("gpt")
            .arg("-Pregion=POLYGON((0 0))")
            .arg("it's");

        assert_eq!(
            invocation.display(),
            r"gpt '-Pregion=POLYGON((0 0))' 'it'\''s'"
        );
    }
}
