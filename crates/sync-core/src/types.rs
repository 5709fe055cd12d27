//! Measurement documents produced by the transformer.
//!
//! The output of a cycle is a set of day-bucketed documents, one per
//! (measurement kind, UTC day). Each document maps a deterministic sample id
//! to a sample record:
//!
//! ```json
//! { "data": { "2024-01-02T10:00:00.000Z-dev-1": {
//!     "time": "2024-01-02T10:00:00.000Z",
//!     "deviceid": "dev-1",
//!     "depth": { "value": 2, "units": "cm" },
//!     "vwc": { "value": 18.4, "units": "%" } } } }
//! ```
//!
//! All maps are ordered so serializing the same buckets twice yields the same
//! bytes.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// The kinds of measurement the poller publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementKind {
    WaterContent,
    Temperature,
    Conductivity,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 3] = [
        MeasurementKind::WaterContent,
        MeasurementKind::Temperature,
        MeasurementKind::Conductivity,
    ];

    /// Key of the measurement field inside a sample record.
    pub fn key(&self) -> &'static str {
        match self {
            Self::WaterContent => "vwc",
            Self::Temperature => "temperature",
            Self::Conductivity => "conductivity",
        }
    }

    /// The fixed unit every sample of this kind carries.
    pub fn units(&self) -> &'static str {
        match self {
            Self::WaterContent => "%",
            Self::Temperature => "C",
            Self::Conductivity => "uS/cm",
        }
    }

    /// Path segment of this kind below the bookmark domain.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::WaterContent => "water-content",
            Self::Temperature => "temperature",
            Self::Conductivity => "conductivity",
        }
    }
}

impl std::fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Units a depth may be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthUnits {
    #[default]
    Cm,
    In,
}

/// Sample depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Depth {
    pub value: f64,
    pub units: DepthUnits,
}

/// A measured value with its unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    pub units: &'static str,
}

/// One sample: a single measurement of one kind, from one device, at one
/// time and depth.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// ISO-8601 UTC with millisecond precision
    pub time: String,
    pub deviceid: String,
    pub depth: Depth,
    pub kind: MeasurementKind,
    pub value: f64,
}

impl SampleRecord {
    /// Deterministic key of this sample within its day document.
    pub fn sample_id(&self) -> String {
        sample_id(&self.time, &self.deviceid)
    }

    pub fn measurement(&self) -> Quantity {
        Quantity {
            value: self.value,
            units: self.kind.units(),
        }
    }
}

// The measurement field is keyed by the kind, so the record is serialized by
// hand rather than derived.
impl Serialize for SampleRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("time", &self.time)?;
        map.serialize_entry("deviceid", &self.deviceid)?;
        map.serialize_entry("depth", &self.depth)?;
        map.serialize_entry(self.kind.key(), &self.measurement())?;
        map.end()
    }
}

/// Build a sample id: `<time>-<deviceid>`.
pub fn sample_id(time: &str, deviceid: &str) -> String {
    format!("{time}-{deviceid}")
}

/// All samples of one kind for one UTC day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayDocument {
    pub data: BTreeMap<String, SampleRecord>,
}

impl DayDocument {
    /// Insert a sample, replacing any sample with the same id.
    pub fn upsert(&mut self, record: SampleRecord) {
        self.data.insert(record.sample_id(), record);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Day key (`YYYY-MM-DD`) to document.
pub type DayIndex = BTreeMap<String, DayDocument>;

/// The per-kind bucket maps filled during one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementBuckets {
    buckets: BTreeMap<MeasurementKind, DayIndex>,
}

impl MeasurementBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// The day document for `kind` on `day`, created on first use.
    pub fn day_mut(&mut self, kind: MeasurementKind, day: &str) -> &mut DayDocument {
        self.buckets
            .entry(kind)
            .or_default()
            .entry(day.to_string())
            .or_default()
    }

    pub fn get(&self, kind: MeasurementKind) -> Option<&DayIndex> {
        self.buckets.get(&kind)
    }

    /// Merge `other` into `self`. Samples with the same id overwrite.
    pub fn merge(&mut self, other: MeasurementBuckets) {
        for (kind, days) in other.buckets {
            for (day, doc) in days {
                let target = self.day_mut(kind, &day);
                for (id, record) in doc.data {
                    target.data.insert(id, record);
                }
            }
        }
    }

    /// Iterate every day document, ordered by kind then day.
    pub fn documents(&self) -> impl Iterator<Item = (MeasurementKind, &str, &DayDocument)> {
        self.buckets.iter().flat_map(|(kind, days)| {
            days.iter()
                .map(move |(day, doc)| (*kind, day.as_str(), doc))
        })
    }

    pub fn document_count(&self) -> usize {
        self.buckets.values().map(|days| days.len()).sum()
    }

    pub fn sample_count(&self, kind: MeasurementKind) -> usize {
        self.buckets
            .get(&kind)
            .map(|days| days.values().map(DayDocument::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.document_count() == 0
    }
}
