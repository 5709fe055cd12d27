//! Table configuration registry.
//!
//! Each source table is described by a [`TableConfig`]: which source
//! connection it lives on, which columns carry the time, device id and depth,
//! and how each data column maps onto a measurement kind. The registry is
//! plain data; the transformer interprets it.
//!
//! ## Usage
//!
//! - [`TableRegistry::builtin`] returns the deployed tables
//! - [`TableRegistry::from_file`] loads a YAML list of tables instead
//!
//! Both paths go through the same validation.

use crate::error::{Result, SyncError};
use crate::types::{DepthUnits, MeasurementKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Which source connection a table is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Legacy database
    Old,
    /// Current database
    New,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Old => write!(f, "old"),
            Self::New => write!(f, "new"),
        }
    }
}

/// Mapping of one source column onto a measurement kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataColumn {
    /// Source column name
    pub column: String,

    /// Target bucket
    pub kind: MeasurementKind,

    /// Measurement key; defaults to the kind's key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Units; defaults to the kind's fixed unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    /// Fixed depth for tables without a depth column. Wins over the row's
    /// depth column when both exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

impl DataColumn {
    /// A column whose samples are always at `depth`.
    pub fn at_depth(column: impl Into<String>, kind: MeasurementKind, depth: f64) -> Self {
        Self {
            column: column.into(),
            kind,
            key: None,
            units: None,
            depth: Some(depth),
        }
    }

    /// A column whose depth is read from the table's depth column.
    pub fn row_depth(column: impl Into<String>, kind: MeasurementKind) -> Self {
        Self {
            column: column.into(),
            kind,
            key: None,
            units: None,
            depth: None,
        }
    }

    pub fn measurement_key(&self) -> &str {
        self.key.as_deref().unwrap_or(self.kind.key())
    }

    pub fn measurement_units(&self) -> &str {
        self.units.as_deref().unwrap_or(self.kind.units())
    }
}

/// Description of one source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub table: String,
    pub source: SourceTag,
    pub time_column: String,
    pub device_id_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_column: Option<String>,
    #[serde(default)]
    pub depth_units: DepthUnits,
    pub data_columns: Vec<DataColumn>,
}

impl TableConfig {
    pub fn new(
        table: impl Into<String>,
        source: SourceTag,
        time_column: impl Into<String>,
        device_id_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            source,
            time_column: time_column.into(),
            device_id_column: device_id_column.into(),
            depth_column: None,
            depth_units: DepthUnits::Cm,
            data_columns: Vec::new(),
        }
    }

    pub fn with_depth_column(mut self, column: impl Into<String>) -> Self {
        self.depth_column = Some(column.into());
        self
    }

    pub fn with_column(mut self, column: DataColumn) -> Self {
        self.data_columns.push(column);
        self
    }

    /// Check this table on its own. Cross-table rules live in
    /// [`TableRegistry::new`].
    pub fn validate(&self) -> Result<()> {
        let table = &self.table;
        if table.trim().is_empty() {
            return Err(SyncError::Config("table name is empty".to_string()));
        }
        if self.time_column.is_empty() || self.device_id_column.is_empty() {
            return Err(SyncError::Config(format!(
                "table '{table}' must name its time and device id columns"
            )));
        }
        if self.data_columns.is_empty() {
            return Err(SyncError::Config(format!(
                "table '{table}' has no data columns"
            )));
        }

        let mut reserved = vec![self.time_column.as_str(), self.device_id_column.as_str()];
        if let Some(depth) = &self.depth_column {
            reserved.push(depth.as_str());
        }

        let mut seen = HashSet::new();
        for col in &self.data_columns {
            let name = col.column.as_str();
            if !seen.insert(name) {
                return Err(SyncError::Config(format!(
                    "table '{table}' maps column '{name}' more than once"
                )));
            }
            if reserved.contains(&name) {
                return Err(SyncError::Config(format!(
                    "table '{table}' uses '{name}' as both a data column and a time/device/depth column"
                )));
            }
            if col.measurement_key() != col.kind.key() {
                return Err(SyncError::Config(format!(
                    "table '{table}' column '{name}': key '{}' does not match {} key '{}'",
                    col.measurement_key(),
                    col.kind,
                    col.kind.key()
                )));
            }
            if col.measurement_units() != col.kind.units() {
                return Err(SyncError::Config(format!(
                    "table '{table}' column '{name}': units '{}' do not match {} units '{}'",
                    col.measurement_units(),
                    col.kind,
                    col.kind.units()
                )));
            }
            match col.depth {
                Some(depth) if !depth.is_finite() => {
                    return Err(SyncError::Config(format!(
                        "table '{table}' column '{name}' has a non-finite fixed depth"
                    )));
                }
                None if self.depth_column.is_none() => {
                    return Err(SyncError::Config(format!(
                        "table '{table}' column '{name}' has neither a fixed depth nor a depth column"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// The validated, ordered list of tables to poll. Order is poll order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRegistry {
    tables: Vec<TableConfig>,
}

impl TableRegistry {
    /// Validate and wrap a list of tables.
    pub fn new(tables: Vec<TableConfig>) -> Result<Self> {
        let mut names = HashSet::new();
        for table in &tables {
            table.validate()?;
            if !names.insert(table.table.as_str()) {
                return Err(SyncError::Config(format!(
                    "table '{}' is configured more than once",
                    table.table
                )));
            }
        }
        Ok(Self { tables })
    }

    /// The deployed soil-sensor tables.
    pub fn builtin() -> Self {
        use MeasurementKind::{Conductivity, Temperature, WaterContent};

        const LAYER_DEPTHS: [f64; 6] = [2.0, 20.0, 40.0, 60.0, 80.0, 100.0];

        let cs_surface = TableConfig::new("cs_surface", SourceTag::Old, "time", "device_eui")
            .with_column(DataColumn::at_depth("vwc", WaterContent, 2.0))
            .with_column(DataColumn::at_depth("temp_c", Temperature, 2.0))
            .with_column(DataColumn::at_depth("conduct_us_cm", Conductivity, 2.0));

        let mut cs_6layer = TableConfig::new("cs_6layer", SourceTag::Old, "time", "device_eui");
        for (i, depth) in LAYER_DEPTHS.iter().enumerate() {
            cs_6layer = cs_6layer.with_column(DataColumn::at_depth(
                format!("vwc_{}", i + 1),
                WaterContent,
                *depth,
            ));
        }
        for (i, depth) in LAYER_DEPTHS.iter().enumerate() {
            cs_6layer = cs_6layer.with_column(DataColumn::at_depth(
                format!("temp_c_{}", i + 1),
                Temperature,
                *depth,
            ));
        }

        let soil_temp = TableConfig::new("soil_temp", SourceTag::New, "ts", "device_id")
            .with_depth_column("depth_cm")
            .with_column(DataColumn::row_depth("temp_c", Temperature));

        let soil_moisture = TableConfig::new("soil_moisture", SourceTag::New, "ts", "device_id")
            .with_depth_column("depth_cm")
            .with_column(DataColumn::row_depth("vwc", WaterContent));

        Self {
            tables: vec![cs_surface, cs_6layer, soil_temp, soil_moisture],
        }
    }

    /// Load a registry from a YAML file containing a list of tables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("failed to read table file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a registry from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let tables: Vec<TableConfig> = serde_yaml::from_str(yaml)
            .map_err(|e| SyncError::Config(format!("failed to parse table YAML: {e}")))?;
        Self::new(tables)
    }

    pub fn tables(&self) -> &[TableConfig] {
        &self.tables
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableConfig> {
        self.tables.iter()
    }

    pub fn get(&self, table: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Get all table names in poll order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
