//! Process chains: ordered lists of GRASS module invocations.
//!
//! A [`ProcessChain`] is what the orchestration hands to a
//! [`ProcessExecutor`](crate::engine::ProcessExecutor). Steps carrying a
//! [`StdoutParser`] have their captured stdout turned into
//! [`ModuleResults`] after execution, which is how the tiling and merge jobs
//! read back cell counts, attribute table checks and series listings.
//!
//! Chains are built by the typed functions in [`builders`], one per kind of
//! tool invocation.

pub mod builders;
mod output;

pub use output::{parse_module_outputs, ModuleOutput, ModuleResults};

use serde::Serialize;

pub const PROCESS_CHAIN_VERSION: &str = "1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub param: String,
    pub value: String,
}

/// How the stdout of a step is split into a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StdoutFormat {
    /// One entry per line.
    List,
    /// `key<delimiter>value` lines.
    Kv,
    /// One row per line, columns split at the delimiter.
    Table,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StdoutParser {
    pub id: String,
    pub format: StdoutFormat,
    pub delimiter: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessStep {
    /// Steps without id are anonymous and cannot be queried after execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub module: String,
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
    /// Single character module flags, e.g. `"t"` for `v.info -t`.
    pub flags: String,
    pub overwrite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<StdoutParser>,
}

impl ProcessStep {
    pub fn new(id: &str, module: &str) -> Self {
        Self {
            id: (!id.is_empty()).then(|| id.to_string()),
            module: module.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            flags: String::new(),
            overwrite: false,
            stdout: None,
        }
    }

    pub fn input(mut self, param: &str, value: impl Into<String>) -> Self {
        self.inputs.push(Parameter {
            param: param.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn output(mut self, param: &str, value: impl Into<String>) -> Self {
        self.outputs.push(Parameter {
            param: param.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn flags(mut self, flags: &str) -> Self {
        self.flags.push_str(flags);
        self
    }

    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Capture stdout under the id of the step.
    pub fn capture(mut self, format: StdoutFormat, delimiter: &str) -> Self {
        let id = self.id.clone().unwrap_or_else(|| self.module.clone());
        self.stdout = Some(StdoutParser {
            id,
            format,
            delimiter: delimiter.to_string(),
        });
        self
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.module)
    }

    /// Value of an input parameter.
    pub fn input_value(&self, param: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|p| p.param == param)
            .map(|p| p.value.as_str())
    }

    pub fn output_value(&self, param: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|p| p.param == param)
            .map(|p| p.value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessChain {
    pub version: String,
    pub list: Vec<ProcessStep>,
}

impl Default for ProcessChain {
    fn default() -> Self {
        Self {
            version: PROCESS_CHAIN_VERSION.to_string(),
            list: Vec::new(),
        }
    }
}

impl ProcessChain {
    pub fn new(list: Vec<ProcessStep>) -> Self {
        Self {
            list,
            ..Self::default()
        }
    }

    /// The parser specification of the chain: which steps emit structured
    /// output and how to split it.
    pub fn output_parsers(&self) -> impl Iterator<Item = (&ProcessStep, &StdoutParser)> {
        self.list
            .iter()
            .filter_map(|step| step.stdout.as_ref().map(|parser| (step, parser)))
    }
}

/// What the executor reports for one executed step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepLog {
    pub id: String,
    pub module: String,
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
}
