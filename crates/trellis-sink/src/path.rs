//! Document paths under the bookmark domain.

use sync_core::MeasurementKind;

/// Builds the paths the poller writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkPaths {
    domain: String,
}

impl BookmarkPaths {
    /// `domain` is relative to `/bookmarks`, e.g. `iot4ag/soil`.
    pub fn new(domain: impl Into<String>) -> Self {
        let domain: String = domain.into();
        Self {
            domain: domain.trim_matches('/').to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `/bookmarks/<domain>/<kind>/day-index/<day>`
    pub fn day_index(&self, kind: MeasurementKind, day: &str) -> String {
        format!(
            "/bookmarks/{}/{}/day-index/{day}",
            self.domain,
            kind.path_segment()
        )
    }

    /// `/bookmarks/services/<name>`
    pub fn service(name: &str) -> String {
        format!("/bookmarks/services/{name}")
    }
}
