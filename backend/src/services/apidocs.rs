//! Static API descriptions of the processing endpoints.
//!
//! `GET` on a processing endpoint returns the description of its `POST`
//! counterpart. The process listings are derived from the same documents, so
//! the `tags` become the categories of a process.

use common::model::process::ProcessDescription;
use serde_json::{json, Value};

pub fn grid_tiling_post_docs() -> Value {
    json!({
        "tags": ["Tiling"],
        "description": "Creates grid tiles with a specified 'width' and 'height' in the \
            current computational region. The created grids have the given \
            'grid_prefix' and are listed in the 'process_results'.",
        "consumes": ["application/json"],
        "parameters": [
            {
                "name": "width",
                "description": "The width of one grid tile in map units.",
                "required": true,
                "in": "body",
                "schema": {"type": "string"}
            },
            {
                "name": "height",
                "description": "The height of one grid tile in map units.",
                "required": true,
                "in": "body",
                "schema": {"type": "string"}
            },
            {
                "name": "grid_prefix",
                "description": "The prefix of the grid tiles.",
                "required": true,
                "in": "body",
                "schema": {"type": "string"}
            }
        ],
        "responses": {
            "200": {"description": "The accepted job with its status URL. The grid \
                tile names are listed in the 'process_results' of the finished job."},
            "400": {"description": "A detailed error message."}
        }
    })
}

pub fn patch_merge_post_docs() -> Value {
    json!({
        "tags": ["Merge"],
        "description": "Merge raster, vector and STRDS data from the mapsets listed in \
            'mapsetlist' by patching them in the new or existing target mapset.",
        "consumes": ["application/json"],
        "parameters": [
            {
                "name": "mapsetlist",
                "description": "The names of the mapsets which are merged into the \
                    target mapset.",
                "required": true,
                "in": "body",
                "schema": {"type": "array", "items": {"type": "string"}}
            },
            {
                "name": "outputs",
                "description": "A list of output parameters: 'param' is the data type \
                    (raster, vector, strds), 'value' a comma separated list of names.",
                "required": true,
                "in": "body",
                "schema": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "param": {"type": "string"},
                            "value": {"type": "string"}
                        }
                    }
                }
            },
            {
                "name": "keep_mapsets",
                "description": "If 'true' the merged mapsets are kept. The default is \
                    'false', so the merged mapsets are deleted.",
                "required": false,
                "in": "body",
                "schema": {"type": "boolean"}
            }
        ],
        "responses": {
            "200": {"description": "The accepted job with its status URL."},
            "400": {"description": "A detailed error message."},
            "409": {"description": "The target mapset is locked by another job."}
        }
    })
}

/// Build a listing entry from the `POST` description of a process.
pub fn describe(id: &str, docs: &Value) -> ProcessDescription {
    let categories = docs["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    ProcessDescription {
        id: id.to_string(),
        categories,
        description: docs["description"].as_str().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_use_tags_as_categories() {
        let grid = describe("grid", &grid_tiling_post_docs());
        assert_eq!(grid.id, "grid");
        assert_eq!(grid.categories, ["Tiling"]);
        assert!(grid.description.starts_with("Creates grid tiles"));

        let patch = describe("patch", &patch_merge_post_docs());
        assert_eq!(patch.categories, ["Merge"]);
    }

    #[test]
    fn parameters_match_request_fields() {
        let names = |docs: Value| -> Vec<String> {
            docs["parameters"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["name"].as_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(names(grid_tiling_post_docs()), ["width", "height", "grid_prefix"]);
        assert_eq!(
            names(patch_merge_post_docs()),
            ["mapsetlist", "outputs", "keep_mapsets"]
        );
    }
}
