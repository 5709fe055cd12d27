//! Where service state is kept.

/// Storage backend for service state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StateStorage {
    /// The document store, at `/bookmarks/services/<service-name>`
    #[default]
    Trellis,

    /// A JSON file in a local directory
    Filesystem { dir: String },
}

impl StateStorage {
    /// Filesystem storage when a directory is given, the document store
    /// otherwise.
    pub fn from_dir(dir: Option<String>) -> Self {
        match dir {
            Some(dir) => Self::Filesystem { dir },
            None => Self::Trellis,
        }
    }
}
