//! Reading the structure of a space time raster dataset and writing the
//! registration file of its patched copy.

use crate::error::{ProcessingError, Result};
use crate::process_chain::builders::{StrdsDefinition, STRDS_DESCRIPTION, STRDS_INFO, STRDS_RASTERS};
use crate::process_chain::ModuleResults;
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use tempfile::NamedTempFile;

const TITLE_MARKER: &str = "# Title:";
const DESCRIPTION_MARKER: &str = "# Description:";
const HISTORY_MARKER: &str = "# Command history:";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)# Title:(.*?)# Description:").expect("valid title regex")
});
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)# Description:(.*?)# Command history:").expect("valid description regex")
});

/// One row of the `t.rast.list` output, columns in listing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterRecord {
    fields: Vec<(String, String)>,
}

impl RasterRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn name(&self) -> &str {
        self.get("name").unwrap_or_default()
    }

    /// The row without its `mapset` column, as `t.register` expects it for
    /// maps living in the current mapset.
    pub fn registration_line(&self) -> String {
        self.fields
            .iter()
            .filter(|(name, _)| name != "mapset")
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Structure and metadata of one series, read from the first source mapset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeriesInfo {
    pub rasters: Vec<RasterRecord>,
    pub title: String,
    pub description: String,
    pub temporal_type: String,
    pub semantic_type: String,
}

impl SeriesInfo {
    pub fn from_module_results(results: &ModuleResults) -> Result<Self> {
        let rasters = parse_raster_listing(results.list(STRDS_RASTERS)?)?;
        let (title, description) = parse_description(results.list(STRDS_DESCRIPTION)?)?;
        let info = results.kv(STRDS_INFO)?;
        let field = |key: &str| {
            info.get(key).cloned().ok_or_else(|| ProcessingError::MalformedOutput {
                module: "t.info".to_string(),
                reason: format!("no '{key}' entry"),
            })
        };
        Ok(Self {
            rasters,
            title,
            description,
            temporal_type: field("temporal_type")?,
            semantic_type: field("semantic_type")?,
        })
    }

    pub fn definition<'a>(&'a self, name: &'a str) -> StrdsDefinition<'a> {
        StrdsDefinition {
            name,
            temporal_type: &self.temporal_type,
            semantic_type: &self.semantic_type,
            title: &self.title,
            description: &self.description,
        }
    }

    /// Write the member rasters, stripped of their source mapset, to a
    /// temporary file in `dir`. The file is removed when dropped.
    pub fn write_registration_file(&self, name: &str, dir: &Path) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("strds_{name}_"))
            .suffix(".txt")
            .tempfile_in(dir)
            .map_err(|e| ProcessingError::io(dir, e))?;
        for raster in &self.rasters {
            writeln!(file, "{}", raster.registration_line())
                .map_err(|e| ProcessingError::io(file.path(), e))?;
        }
        file.flush().map_err(|e| ProcessingError::io(file.path(), e))?;
        Ok(file)
    }
}

/// Parse the pipe delimited listing whose first line holds the column names.
pub fn parse_raster_listing(lines: &[String]) -> Result<Vec<RasterRecord>> {
    let malformed = |reason: String| ProcessingError::MalformedOutput {
        module: "t.rast.list".to_string(),
        reason,
    };
    let text = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| malformed(e.to_string()))?
        .clone();
    if !headers.iter().any(|h| h == "name") {
        return Err(malformed("no 'name' column in the raster listing".to_string()));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| malformed(e.to_string()))?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        records.push(RasterRecord {
            fields: headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        });
    }
    Ok(records)
}

/// Extract title and description from the `t.info -h` block.
///
/// Content lines carry a two character `# ` prefix; the section markers are
/// kept verbatim so the regexes can find the text between them.
pub fn parse_description(lines: &[String]) -> Result<(String, String)> {
    let block = lines
        .iter()
        .map(|line| {
            let line = line.trim_end();
            if [TITLE_MARKER, DESCRIPTION_MARKER, HISTORY_MARKER].contains(&line) {
                line.to_string()
            } else {
                line.chars().skip(2).collect()
            }
        })
        .collect::<Vec<String>>()
        .join("\n");

    let section = |re: &Regex, name: &str| {
        re.captures(&block)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .ok_or_else(|| ProcessingError::MalformedOutput {
                module: "t.info".to_string(),
                reason: format!("no {name} section in the dataset history"),
            })
    };
    Ok((section(&TITLE_RE, "title")?, section(&DESCRIPTION_RE, "description")?))
}
