//! One builder per tool invocation used by the tiling and merge jobs.
//!
//! Builders take the values they substitute as typed arguments, so there is
//! no text rendering step and no escaping of user supplied names. Required
//! values must be non-empty.

use super::{ProcessChain, ProcessStep, StdoutFormat};
use crate::error::{ProcessingError, Result};

/// Parser id of the `v.info -t` output of the grid.
pub const GRID_INFO: &str = "grid_info";
/// Parser id of the attribute table connection check.
pub const ATTRIBUTE_TABLE: &str = "attrtable";
/// Parser ids of the space time raster dataset listing.
pub const STRDS_RASTERS: &str = "rasters";
pub const STRDS_DESCRIPTION: &str = "strds_description";
pub const STRDS_INFO: &str = "strds_info";

/// Columns requested from `t.rast.list`, in order.
pub const STRDS_LIST_COLUMNS: &str = "name,mapset,start_time,end_time";

fn required<'a>(param: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(ProcessingError::invalid_value(param, "must not be empty"))
    } else {
        Ok(value)
    }
}

pub fn create_grid(grid: &str, width: &str, height: &str) -> Result<ProcessChain> {
    let box_size = format!("{},{}", required("width", width)?, required("height", height)?);
    Ok(ProcessChain::new(vec![ProcessStep::new("create_grid", "v.mkgrid")
        .input("box", box_size)
        .output("map", required("grid", grid)?)]))
}

pub fn grid_info(grid: &str) -> Result<ProcessChain> {
    Ok(ProcessChain::new(vec![ProcessStep::new(GRID_INFO, "v.info")
        .input("map", required("grid", grid)?)
        .flags("t")
        .capture(StdoutFormat::List, "|")]))
}

pub fn extract_grid_cell(grid: &str, index: usize, output: &str) -> Result<ProcessChain> {
    Ok(ProcessChain::new(vec![ProcessStep::new(
        &format!("extract_cell_{index}"),
        "v.extract",
    )
    .input("input", required("grid", grid)?)
    .input("cats", index.to_string())
    .output("output", required("output", output)?)]))
}

pub fn remove_vector(name: &str) -> Result<ProcessChain> {
    Ok(ProcessChain::new(vec![ProcessStep::new("remove_vector", "g.remove")
        .input("type", "vector")
        .input("name", required("name", name)?)
        .flags("f")]))
}

/// Set the region to the union of all tiles and patch them.
pub fn patch_raster(raster_list: &str, raster: &str) -> Result<ProcessChain> {
    let raster_list = required("rasterlist", raster_list)?;
    Ok(ProcessChain::new(vec![
        ProcessStep::new("set_region", "g.region").input("raster", raster_list),
        ProcessStep::new("patch_raster", "r.patch")
            .input("input", raster_list)
            .output("output", required("raster", raster)?)
            .overwrite(),
    ]))
}

/// Prints the database connection of the vector map; prints nothing if the
/// map has no attribute table.
pub fn check_attribute_table(vector: &str) -> Result<ProcessChain> {
    Ok(ProcessChain::new(vec![ProcessStep::new(ATTRIBUTE_TABLE, "v.db.connect")
        .input("map", required("map", vector)?)
        .flags("g")
        .capture(StdoutFormat::List, "|")]))
}

pub fn patch_vector(vector_list: &str, vector: &str, attribute_table: bool) -> Result<ProcessChain> {
    let mut step = ProcessStep::new("patch_vector", "v.patch")
        .input("input", required("vectorlist", vector_list)?)
        .output("output", required("vector", vector)?)
        .overwrite();
    if attribute_table {
        step = step.flags("e");
    }
    Ok(ProcessChain::new(vec![step]))
}

/// Member listing, description history and general info of a series.
pub fn list_strds(strds: &str) -> Result<ProcessChain> {
    let strds = required("strds", strds)?;
    Ok(ProcessChain::new(vec![
        ProcessStep::new(STRDS_RASTERS, "t.rast.list")
            .input("input", strds)
            .input("columns", STRDS_LIST_COLUMNS)
            .input("separator", "pipe")
            .capture(StdoutFormat::List, "|"),
        ProcessStep::new(STRDS_DESCRIPTION, "t.info")
            .input("input", strds)
            .flags("h")
            .capture(StdoutFormat::List, "|"),
        ProcessStep::new(STRDS_INFO, "t.info")
            .input("input", strds)
            .flags("g")
            .capture(StdoutFormat::Kv, "="),
    ]))
}

/// Metadata of a space time raster dataset to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrdsDefinition<'a> {
    pub name: &'a str,
    pub temporal_type: &'a str,
    pub semantic_type: &'a str,
    pub title: &'a str,
    pub description: &'a str,
}

/// Create a series and register the rasters listed in `register_file`.
pub fn create_strds(strds: &StrdsDefinition<'_>, register_file: &str) -> Result<ProcessChain> {
    let name = required("strds", strds.name)?;
    Ok(ProcessChain::new(vec![
        ProcessStep::new("create_strds", "t.create")
            .input("type", "strds")
            .input("temporaltype", required("temporaltype", strds.temporal_type)?)
            .input("semantictype", required("semantictype", strds.semantic_type)?)
            .input("title", strds.title)
            .input("description", strds.description)
            .output("output", name)
            .overwrite(),
        ProcessStep::new("register_rasters", "t.register")
            .input("input", name)
            .input("type", "raster")
            .input("file", required("file", register_file)?),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_grid_uses_box_size() {
        let chain = create_grid("grid_1", "0.5", "0.25").unwrap();
        let step = &chain.list[0];
        assert_eq!(step.module, "v.mkgrid");
        assert_eq!(step.input_value("box"), Some("0.5,0.25"));
        assert_eq!(step.output_value("map"), Some("grid_1"));
    }

    #[test]
    fn empty_values_are_rejected() {
        assert!(matches!(
            create_grid("grid", "", "1"),
            Err(ProcessingError::InvalidValue { param, .. }) if param == "width"
        ));
        assert!(patch_raster("", "ndvi").is_err());
        assert!(patch_vector("a@m1", " ", false).is_err());
    }

    #[test]
    fn extract_selects_category() {
        let chain = extract_grid_cell("grid", 3, "tile3").unwrap();
        let step = &chain.list[0];
        assert_eq!(step.input_value("cats"), Some("3"));
        assert_eq!(step.output_value("output"), Some("tile3"));
        assert_eq!(step.id.as_deref(), Some("extract_cell_3"));
    }

    #[test]
    fn patch_vector_flag_follows_attribute_table() {
        let with = patch_vector("v@a,v@b", "v", true).unwrap();
        assert_eq!(with.list[0].flags, "e");
        let without = patch_vector("v@a,v@b", "v", false).unwrap();
        assert_eq!(without.list[0].flags, "");
    }

    #[test]
    fn list_strds_captures_three_outputs() {
        let chain = list_strds("temperature@tile1").unwrap();
        let ids: Vec<_> = chain.output_parsers().map(|(_, p)| p.id.as_str()).collect();
        assert_eq!(ids, [STRDS_RASTERS, STRDS_DESCRIPTION, STRDS_INFO]);
        assert_eq!(chain.list[2].stdout.as_ref().unwrap().format, StdoutFormat::Kv);
    }

    #[test]
    fn create_strds_registers_file() {
        let definition = StrdsDefinition {
            name: "temperature",
            temporal_type: "absolute",
            semantic_type: "mean",
            title: "Temperature",
            description: "Daily mean",
        };
        let chain = create_strds(&definition, "/tmp/strds_temperature.txt").unwrap();
        assert_eq!(chain.list[0].output_value("output"), Some("temperature"));
        assert_eq!(chain.list[1].input_value("file"), Some("/tmp/strds_temperature.txt"));
    }
}
