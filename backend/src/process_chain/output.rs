use super::{ProcessChain, StdoutFormat, StepLog};
use crate::error::{ProcessingError, Result};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleOutput {
    List(Vec<String>),
    Kv(BTreeMap<String, String>),
    Table(Vec<Vec<String>>),
}

/// Parsed stdout of all capturing steps of an executed chain, keyed by the
/// parser id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleResults {
    results: HashMap<String, ModuleOutput>,
}

impl ModuleResults {
    pub fn get(&self, id: &str) -> Result<&ModuleOutput> {
        self.results
            .get(id)
            .ok_or_else(|| ProcessingError::MissingModuleOutput(id.to_string()))
    }

    pub fn list(&self, id: &str) -> Result<&[String]> {
        match self.get(id)? {
            ModuleOutput::List(lines) => Ok(lines),
            _ => Err(ProcessingError::MissingModuleOutput(id.to_string())),
        }
    }

    pub fn kv(&self, id: &str) -> Result<&BTreeMap<String, String>> {
        match self.get(id)? {
            ModuleOutput::Kv(map) => Ok(map),
            _ => Err(ProcessingError::MissingModuleOutput(id.to_string())),
        }
    }
}

/// Lines of a module stdout. Empty output yields a single empty line so that
/// "first line is empty" checks work on silent modules.
fn stdout_lines(stdout: &str) -> Vec<String> {
    stdout
        .trim_end_matches(['\n', '\r'])
        .split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

fn parse_stdout(stdout: &str, format: StdoutFormat, delimiter: &str) -> ModuleOutput {
    match format {
        StdoutFormat::List => ModuleOutput::List(stdout_lines(stdout)),
        StdoutFormat::Kv => ModuleOutput::Kv(
            stdout
                .lines()
                .filter_map(|line| line.split_once(delimiter))
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .collect(),
        ),
        StdoutFormat::Table => ModuleOutput::Table(
            stdout
                .lines()
                .filter(|line| !line.is_empty())
                .map(|line| line.split(delimiter).map(str::to_string).collect())
                .collect(),
        ),
    }
}

/// Match the logs of an executed chain against its parser specification.
pub fn parse_module_outputs(chain: &ProcessChain, logs: &[StepLog]) -> Result<ModuleResults> {
    let mut results = HashMap::new();
    for (step, parser) in chain.output_parsers() {
        let log = logs
            .iter()
            .find(|log| log.id == step.display_id())
            .ok_or_else(|| ProcessingError::MissingModuleOutput(parser.id.clone()))?;
        results.insert(
            parser.id.clone(),
            parse_stdout(&log.stdout, parser.format, &parser.delimiter),
        );
    }
    Ok(ModuleResults { results })
}
