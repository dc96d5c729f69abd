//! Pipeline configuration data structures.
//!
//! A [`PipelineConfig`] is the complete, strongly typed description of a
//! view: which stages are active and with which parameters. The UI layer
//! builds one and hands it over wholesale. Stage order is fixed by the
//! executor, not by the order in which fields were filled in.
//!
//! Configs serialize to JSON so a view can be saved and re-applied later.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Current pipeline config version
pub const CONFIG_VERSION: &str = "0.1";

/// Stage parameters for one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Config version for future migrations
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupSpec>,

    #[serde(default)]
    pub nulls: NullHandling,

    #[serde(default)]
    pub dedupe: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            filter: None,
            sort: None,
            group: None,
            nulls: NullHandling::None,
            dedupe: false,
        }
    }
}

impl PipelineConfig {
    /// Config with no active stage; produces a view equal to the table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some(FilterSpec {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    pub fn with_filter_op(
        mut self,
        column: impl Into<String>,
        op: FilterOp,
        value: impl Into<String>,
    ) -> Self {
        self.filter = Some(FilterSpec {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add an ascending or descending sort key.
    pub fn with_sort(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.sort.get_or_insert_with(SortSpec::default).keys.push(SortKey {
            column: column.into(),
            descending,
        });
        self
    }

    /// Sort by the first schema column, ascending.
    pub fn with_default_sort(mut self) -> Self {
        self.sort = Some(SortSpec::default());
        self
    }

    pub fn with_group(mut self, column: impl Into<String>, aggregation: impl Into<String>) -> Self {
        self.group = Some(GroupSpec {
            column: column.into(),
            aggregation: aggregation.into(),
        });
        self
    }

    pub fn with_nulls(mut self, nulls: NullHandling) -> Self {
        self.nulls = nulls;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// True when no stage would change the input.
    pub fn is_identity(&self) -> bool {
        self.filter.is_none()
            && self.sort.is_none()
            && self.group.is_none()
            && self.nulls == NullHandling::None
            && !self.dedupe
    }

    /// Number of configured stages.
    pub fn active_stages(&self) -> usize {
        [
            self.filter.is_some(),
            self.sort.is_some(),
            self.group.is_some(),
            self.nulls != NullHandling::None,
            self.dedupe,
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }

    /// Load a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read pipeline config file")?;
        Self::from_json(&content)
    }

    /// Parse a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline config JSON")
    }

    /// Save config to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).context("Failed to write pipeline config file")
    }

    /// Serialize config to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline config")
    }
}

/// Keep rows where `row[column] <op> value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    #[serde(default)]
    pub op: FilterOp,
    /// Raw text, coerced into the column kind at execution time
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Substring match on the displayed value
    Contains,
}

impl FilterOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Contains => "contains",
        }
    }
}

impl FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "==" | "=" | "eq" => Ok(Self::Eq),
            "!=" | "<>" | "ne" => Ok(Self::Ne),
            "<" | "lt" => Ok(Self::Lt),
            "<=" | "le" => Ok(Self::Le),
            ">" | "gt" => Ok(Self::Gt),
            ">=" | "ge" => Ok(Self::Ge),
            "contains" | "~" => Ok(Self::Contains),
            other => Err(format!("unknown filter operator '{other}'")),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Sort keys, most significant first. No keys means "first column, ascending".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub keys: Vec<SortKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

/// Partition by `column` and apply `aggregation` to every other column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub column: String,
    /// Aggregation name as typed by the user (`mean`, `sum`, `count`, ...)
    pub aggregation: String,
}

/// Missing-value handling stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NullHandling {
    #[default]
    None,
    /// Remove every row holding a missing marker
    Drop,
    /// Replace missing markers with `value`, or the column kind's default
    Fill {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

fn default_version() -> String {
    CONFIG_VERSION.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() -> Result<()> {
        let config = PipelineConfig::new()
            .with_filter("name", "a")
            .with_sort("score", true)
            .with_nulls(NullHandling::Fill { value: None })
            .with_dedupe(true);

        let json = config.to_json()?;
        assert!(json.contains("\"version\": \"0.1\""));
        assert!(json.contains("\"mode\": \"fill\""));

        let parsed = PipelineConfig::from_json(&json)?;
        assert_eq!(parsed, config);
        Ok(())
    }

    #[test]
    fn test_minimal_json_defaults() -> Result<()> {
        let parsed = PipelineConfig::from_json(r#"{"dedupe": true}"#)?;
        assert_eq!(parsed.version, CONFIG_VERSION);
        assert_eq!(parsed.nulls, NullHandling::None);
        assert_eq!(parsed.active_stages(), 1);
        Ok(())
    }

    #[test]
    fn test_filter_op_parsing() {
        assert_eq!(">=".parse::<FilterOp>(), Ok(FilterOp::Ge));
        assert_eq!("EQ".parse::<FilterOp>(), Ok(FilterOp::Eq));
        assert!("like".parse::<FilterOp>().is_err());
    }

    #[test]
    fn test_identity() {
        assert!(PipelineConfig::new().is_identity());
        assert!(!PipelineConfig::new().with_default_sort().is_identity());
    }
}
