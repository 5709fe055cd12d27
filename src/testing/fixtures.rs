//! Rows, registries and pollers for tests.

use chrono::{DateTime, Utc};
use checkpoint::ServiceStateStore;
use iot4ag_sync_postgresql_source::RowSource;
use sync_core::{DataColumn, MeasurementKind, RawRow, SourceTag, TableConfig, TableRegistry};
use trellis_sink::{BookmarkPaths, DocumentSink, Tree};

use crate::poller::{Poller, PollerSettings};

pub const DOMAIN: &str = "iot4ag/soil";
pub const SERVICE_NAME: &str = "iot4ag2Trellis";

/// Parse an RFC 3339 timestamp. Panics on malformed input.
pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("bad timestamp {s:?}: {e}"))
        .with_timezone(&Utc)
}

/// A one-table registry shaped like `cs_surface`, minus conductivity.
pub fn surface_registry() -> TableRegistry {
    let config = TableConfig::new("cs_surface", SourceTag::Old, "time", "device_eui")
        .with_column(DataColumn::at_depth("vwc", MeasurementKind::WaterContent, 2.0))
        .with_column(DataColumn::at_depth("temp_c", MeasurementKind::Temperature, 2.0));
    TableRegistry::new(vec![config]).unwrap_or_else(|e| panic!("invalid registry: {e}"))
}

/// A `cs_surface` row.
pub fn surface_row(time: &str, device: &str, vwc: f64, temp_c: f64) -> RawRow {
    RawRow::builder()
        .column("time", ts(time))
        .column("device_eui", device)
        .column("vwc", vwc)
        .column("temp_c", temp_c)
        .build()
}

/// A `soil_temp` / `soil_moisture` style row with a depth column.
pub fn depth_row(time: &str, device: &str, depth_cm: f64, column: &str, value: f64) -> RawRow {
    RawRow::builder()
        .column("ts", ts(time))
        .column("device_id", device)
        .column("depth_cm", depth_cm)
        .column(column, value)
        .build()
}

pub fn tree() -> Tree {
    Tree::for_service(DOMAIN, SERVICE_NAME).unwrap_or_else(|e| panic!("invalid tree: {e}"))
}

pub fn paths() -> BookmarkPaths {
    BookmarkPaths::new(DOMAIN)
}

/// A poller over the given doubles with the test domain.
pub fn poller<R, D, S>(
    registry: TableRegistry,
    source: R,
    sink: D,
    store: S,
    settings: PollerSettings,
) -> Poller<R, D, S>
where
    R: RowSource,
    D: DocumentSink,
    S: ServiceStateStore,
{
    Poller::new(registry, source, sink, store, tree(), paths(), settings)
}
