use serde::{Deserialize, Serialize};

pub const DEFAULT_SPARSE_COLUMN: &str = "sparse_group_number";
pub const DEFAULT_DENSE_COLUMN: &str = "dense_group_number";

/// Which columns a pipeline run reads and writes, and what it does around the passes.
///
/// Missing fields take their defaults when deserialized, so a config only has to name the
/// grouping and value columns:
///
/// ```
/// let cfg: densegroup::PipelineConfig =
///     serde_json::from_str(r#"{"group_column": "CRSDepTime", "value_column": "Distance"}"#)
///         .unwrap();
/// assert_eq!(cfg.dense_column, "dense_group_number");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Integer column whose values define the groups.
    pub group_column: String,
    /// Numeric column summarized per group.
    pub value_column: String,
    /// Column added to hold each row's raw group value.
    pub sparse_column: String,
    /// Column added to hold each row's compacted group id.
    pub dense_column: String,
    /// Remove the table from the store once a stored run has finished.
    pub remove_table_after_run: bool,
    /// Log one line per group when a run completes.
    pub log_summaries: bool,
}

impl PipelineConfig {
    pub fn new(group_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            group_column: group_column.into(),
            value_column: value_column.into(),
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            group_column: String::new(),
            value_column: String::new(),
            sparse_column: DEFAULT_SPARSE_COLUMN.to_string(),
            dense_column: DEFAULT_DENSE_COLUMN.to_string(),
            remove_table_after_run: false,
            log_summaries: true,
        }
    }
}
