//! External verification tools
//!
//! A tool is described entirely by data: the program to launch, an
//! argument template, an optional source prelude, and the literal marker
//! its output must contain when it finds the planted fault. New backends
//! are added with a [`ToolSpec`], without touching the sweep.
//!
//! # Argument templates
//!
//! | Placeholder    | Replaced with                                   |
//! |----------------|-------------------------------------------------|
//! | `{file}`       | path of the file handed to the tool             |
//! | `{iterations}` | iteration count of the grid cell                |
//! | `{functions}`  | function count of the grid cell                 |
//! | `{test}`       | test identifier, e.g. `10i_2f`                  |

mod runner;

pub use runner::{ProcessRunner, RunOutcome, ToolRunner};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::generator::GenerationParameters;
use crate::{Error, Result};

/// Prelude prepended to programs handed to SMACK
pub const SMACK_PRELUDE: &str = "\
#[macro_use]
extern crate smack;
use smack::*;
use smack::assert;
";

/// Description of one verification backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Identifier written to the results table
    pub name: String,
    /// Executable to launch
    pub program: String,
    /// Argument templates
    #[serde(default)]
    pub args: Vec<String>,
    /// Source text placed before the generated program
    #[serde(default)]
    pub prelude: Option<String>,
    /// Literal that must appear in the tool's output
    pub marker: String,
    /// Log file suffix; defaults to `<name>_log.txt`
    #[serde(default)]
    pub log_suffix: Option<String>,
}

impl ToolSpec {
    /// Create a tool spec with no arguments and no prelude
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            prelude: None,
            marker: marker.into(),
            log_suffix: None,
        }
    }

    /// Set the argument templates
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the source prelude
    #[must_use]
    pub fn with_prelude(mut self, prelude: impl Into<String>) -> Self {
        self.prelude = Some(prelude.into());
        self
    }

    /// Set the log file suffix
    #[must_use]
    pub fn with_log_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.log_suffix = Some(suffix.into());
        self
    }

    /// RMC: `rmc <file>`
    #[must_use]
    pub fn rmc() -> Self {
        Self::new("rmc", "rmc", "VERIFICATION FAILED").with_args(["{file}"])
    }

    /// SMACK: `smack <smack_file> --unroll <iterations>`
    #[must_use]
    pub fn smack() -> Self {
        Self::new("smack", "smack", "SMACK found an error")
            .with_args(["{file}", "--unroll", "{iterations}"])
            .with_prelude(SMACK_PRELUDE)
    }

    /// Log file name for a test
    #[must_use]
    pub fn log_file_name(&self, test: &str) -> String {
        match &self.log_suffix {
            Some(suffix) => format!("{test}_{suffix}"),
            None => format!("{test}_{}_log.txt", self.name),
        }
    }

    /// Whether the captured output shows the expected failure
    #[must_use]
    pub fn found_failure(&self, output: &str) -> bool {
        output.contains(&self.marker)
    }

    /// Substitute placeholders in one argument template
    fn expand(template: &str, file: &Path, params: GenerationParameters) -> String {
        template
            .replace("{file}", &file.to_string_lossy())
            .replace("{iterations}", &params.iterations.to_string())
            .replace("{functions}", &params.functions.to_string())
            .replace("{test}", &params.test_id())
    }

    /// Build the invocation for one grid cell
    ///
    /// When the tool has a prelude, a `<name>_<test>.<ext>` copy of the
    /// program with the prelude prepended is written next to it and that
    /// copy is handed to the tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be read or the wrapped copy
    /// cannot be written.
    pub fn prepare(
        &self,
        dir: &Path,
        program_file: &Path,
        params: GenerationParameters,
    ) -> Result<ToolInvocation> {
        let test = params.test_id();
        let source = match &self.prelude {
            Some(prelude) => {
                let ext = program_file
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                let wrapped = dir.join(format!("{}_{test}{ext}", self.name));
                let program = std::fs::read_to_string(program_file)?;
                std::fs::write(&wrapped, format!("{prelude}{program}"))?;
                wrapped
            }
            None => program_file.to_path_buf(),
        };

        let args = self
            .args
            .iter()
            .map(|template| Self::expand(template, &source, params))
            .collect();

        Ok(ToolInvocation {
            tool: self.name.clone(),
            test: test.clone(),
            program: self.program.clone(),
            args,
            source,
            log: dir.join(self.log_file_name(&test)),
        })
    }
}

/// Fully resolved command for one tool on one grid cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Tool identifier
    pub tool: String,
    /// Test identifier
    pub test: String,
    /// Executable
    pub program: String,
    /// Expanded arguments
    pub args: Vec<String>,
    /// File handed to the tool
    pub source: PathBuf,
    /// Log file receiving stdout and stderr
    pub log: PathBuf,
}

impl ToolInvocation {
    /// Command line as a single display string
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Ordered set of known tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// RMC followed by SMACK
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            tools: vec![ToolSpec::rmc(), ToolSpec::smack()],
        }
    }

    /// Add a tool, replacing any tool with the same name in place
    pub fn register(&mut self, spec: ToolSpec) {
        match self.tools.iter_mut().find(|t| t.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.tools.push(spec),
        }
    }

    /// Look up a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Tools in registration order
    #[must_use]
    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Number of tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registry holding only `names`, in the given order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown or repeated name, or
    /// when `names` is empty.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::Configuration("no tools selected".into()));
        }
        let mut selected = Self::new();
        for name in names {
            let name = name.as_ref();
            if selected.get(name).is_some() {
                return Err(Error::Configuration(format!(
                    "tool '{name}' selected twice"
                )));
            }
            let spec = self.get(name).ok_or_else(|| {
                let known: Vec<_> = self.tools.iter().map(|t| t.name.as_str()).collect();
                Error::Configuration(format!(
                    "unknown tool '{name}' (known: {})",
                    known.join(", ")
                ))
            })?;
            selected.tools.push(spec.clone());
        }
        Ok(selected)
    }

    /// Merge tool specs from a JSON array file into this registry
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array
    /// of tool specs.
    pub fn load_json(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        let specs: Vec<ToolSpec> = serde_json::from_str(&text)?;
        for spec in specs {
            if spec.marker.is_empty() {
                return Err(Error::Configuration(format!(
                    "tool '{}' in {} has an empty marker",
                    spec.name,
                    path.display()
                )));
            }
            self.register(spec);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(iterations: u32, functions: u32) -> GenerationParameters {
        GenerationParameters::new(iterations, functions).unwrap()
    }

    #[test]
    fn test_rmc_spec() {
        let rmc = ToolSpec::rmc();
        assert_eq!(rmc.name, "rmc");
        assert_eq!(rmc.marker, "VERIFICATION FAILED");
        assert!(rmc.prelude.is_none());
        assert_eq!(rmc.log_file_name("10i_2f"), "10i_2f_rmc_log.txt");
    }

    #[test]
    fn test_smack_spec() {
        let smack = ToolSpec::smack();
        assert_eq!(smack.marker, "SMACK found an error");
        assert!(smack.prelude.as_deref().unwrap().contains("extern crate smack;"));
        assert_eq!(smack.args, vec!["{file}", "--unroll", "{iterations}"]);
    }

    #[test]
    fn test_custom_log_suffix() {
        let spec = ToolSpec::smack().with_log_suffix("log.txt");
        assert_eq!(spec.log_file_name("10i_2f"), "10i_2f_log.txt");
    }

    #[test]
    fn test_found_failure() {
        let rmc = ToolSpec::rmc();
        assert!(rmc.found_failure("...\nVERIFICATION FAILED\n"));
        assert!(!rmc.found_failure("VERIFICATION SUCCESSFUL"));
        assert!(!rmc.found_failure("verification failed"));
    }

    #[test]
    fn test_prepare_direct() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("10i_2f.rs");
        std::fs::write(&file, "fn main() {}\n").unwrap();

        let inv = ToolSpec::rmc().prepare(dir.path(), &file, params(10, 2)).unwrap();
        assert_eq!(inv.source, file);
        assert_eq!(inv.args, vec![file.to_string_lossy().to_string()]);
        assert_eq!(inv.log, dir.path().join("10i_2f_rmc_log.txt"));
        assert_eq!(inv.test, "10i_2f");
    }

    #[test]
    fn test_prepare_with_prelude() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("10i_2f.rs");
        std::fs::write(&file, "fn main() {}\n").unwrap();

        let inv = ToolSpec::smack()
            .prepare(dir.path(), &file, params(10, 2))
            .unwrap();
        let wrapped = dir.path().join("smack_10i_2f.rs");
        assert_eq!(inv.source, wrapped);
        assert_eq!(
            inv.args,
            vec![
                wrapped.to_string_lossy().to_string(),
                "--unroll".to_string(),
                "10".to_string()
            ]
        );

        let text = std::fs::read_to_string(&wrapped).unwrap();
        assert!(text.starts_with(SMACK_PRELUDE));
        assert!(text.ends_with("fn main() {}\n"));
        // original untouched
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "fn main() {}\n");
    }

    #[test]
    fn test_prepare_expands_all_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("p.rs");
        std::fs::write(&file, "").unwrap();

        let spec = ToolSpec::new("echo", "echo", "X")
            .with_args(["--n={iterations}", "--k={functions}", "{test}"]);
        let inv = spec.prepare(dir.path(), &file, params(30, 4)).unwrap();
        assert_eq!(inv.args, vec!["--n=30", "--k=4", "30i_4f"]);
        assert_eq!(inv.command_line(), "echo --n=30 --k=4 30i_4f");
    }

    #[test]
    fn test_prepare_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("missing.rs");
        let result = ToolSpec::smack().prepare(dir.path(), &file, params(10, 2));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_builtin_registry_order() {
        let registry = ToolRegistry::builtin();
        let names: Vec<_> = registry.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["rmc", "smack"]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = ToolRegistry::builtin();
        registry.register(ToolSpec::new("rmc", "/opt/rmc/bin/rmc", "VERIFICATION FAILED"));
        registry.register(ToolSpec::new("kani", "cargo-kani", "VERIFICATION:- FAILED"));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.tools()[0].program, "/opt/rmc/bin/rmc");
        assert_eq!(registry.tools()[2].name, "kani");
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let registry = ToolRegistry::builtin();
        let selected = registry.select(&["smack", "rmc"]).unwrap();
        assert_eq!(selected.tools()[0].name, "smack");
        assert_eq!(selected.tools()[1].name, "rmc");
    }

    #[test]
    fn test_select_errors() {
        let registry = ToolRegistry::builtin();
        let empty: [&str; 0] = [];
        assert!(registry.select(&empty).is_err());
        assert!(registry.select(&["rmc", "rmc"]).is_err());
        let err = registry.select(&["cbmc"]).unwrap_err();
        assert!(err.to_string().contains("known: rmc, smack"));
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "smack", "program": "/usr/local/bin/smack",
                 "args": ["{file}", "--unroll", "{iterations}"],
                 "prelude": "use smack::*;\n", "marker": "SMACK found an error"},
                {"name": "echo", "program": "echo", "marker": "boom"}
            ]"#,
        )
        .unwrap();

        let mut registry = ToolRegistry::builtin();
        registry.load_json(&path).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("smack").unwrap().program, "/usr/local/bin/smack");
        let echo = registry.get("echo").unwrap();
        assert!(echo.args.is_empty());
        assert!(echo.prelude.is_none());
    }

    #[test]
    fn test_load_json_rejects_empty_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        std::fs::write(&path, r#"[{"name": "x", "program": "x", "marker": ""}]"#).unwrap();
        let err = ToolRegistry::new().load_json(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_load_json_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ToolRegistry::new().load_json(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
