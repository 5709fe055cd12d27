//! Structural templates for the document store.
//!
//! A tree mirrors the document hierarchy: each node may carry a `_type`
//! (content type of the resource at that path) and a `_rev` marker (the link
//! from the parent is versioned). A `*` key matches any path segment.
//!
//! ```json
//! { "bookmarks": { "_type": "application/vnd.oada.bookmarks.1+json",
//!     "iot4ag": { "_type": "application/vnd.iot4ag.1+json", "_rev": 0, ... } } }
//! ```

use serde_json::{json, Map, Value};
use sync_core::MeasurementKind;

use crate::error::{Result, SinkError};

const BOOKMARKS_TYPE: &str = "application/vnd.oada.bookmarks.1+json";
const SERVICES_TYPE: &str = "application/vnd.oada.services.1+json";

/// A structural template describing content types along document paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree(Value);

impl Tree {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build the tree for a bookmark domain such as `iot4ag/soil` and the
    /// service document named `service_name`.
    ///
    /// Every domain level gets a versioned resource typed after its dotted
    /// prefix; below the last level sit the per-kind indexes with their
    /// `day-index/*` documents.
    pub fn for_service(domain: &str, service_name: &str) -> Result<Self> {
        let segments = split_path(domain)?;
        let vendor = segments[0];

        let mut kinds = Map::new();
        let dotted = segments.join(".");
        for kind in MeasurementKind::ALL {
            let segment = kind.path_segment();
            kinds.insert(
                segment.to_string(),
                json!({
                    "_type": format!("application/vnd.{dotted}.{segment}-index.1+json"),
                    "_rev": 0,
                    "day-index": {
                        "*": { "_type": format!("application/vnd.{dotted}.{segment}.1+json") }
                    }
                }),
            );
        }

        // Wrap from the innermost domain level outwards.
        let mut node = Value::Object(kinds);
        for depth in (1..=segments.len()).rev() {
            let prefix = segments[..depth].join(".");
            let mut level = match node {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            level.insert(
                "_type".to_string(),
                Value::String(format!("application/vnd.{prefix}.1+json")),
            );
            level.insert("_rev".to_string(), json!(0));
            node = json!({ segments[depth - 1]: level });
        }

        let mut bookmarks = match node {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        bookmarks.insert("_type".to_string(), json!(BOOKMARKS_TYPE));
        bookmarks.insert(
            "services".to_string(),
            json!({
                "_type": SERVICES_TYPE,
                "_rev": 0,
                service_name: {
                    "_type": format!("application/vnd.{vendor}.{service_name}.service.1+json")
                }
            }),
        );

        Ok(Self(json!({ "bookmarks": bookmarks })))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The template node for `path`, matching `*` where no exact key exists.
    pub fn node(&self, path: &str) -> Option<&Value> {
        let mut current = &self.0;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let children = current.as_object()?;
            current = children.get(segment).or_else(|| children.get("*"))?;
        }
        Some(current)
    }

    /// The content type declared at `path`, if any.
    pub fn content_type(&self, path: &str) -> Option<&str> {
        self.node(path)?.get("_type")?.as_str()
    }

    /// Whether the link to `path` from its parent is versioned.
    pub fn is_versioned(&self, path: &str) -> bool {
        self.node(path).is_some_and(|n| n.get("_rev").is_some())
    }

    /// The content type of `path` or its nearest typed ancestor.
    pub fn nearest_content_type(&self, path: &str) -> Option<&str> {
        let segments = split_path(path).ok()?;
        (1..=segments.len())
            .rev()
            .find_map(|depth| self.content_type(&join_path(&segments[..depth])))
    }

    /// The resources that must exist before a put to `path` can land.
    ///
    /// Every typed level below `/bookmarks` is a resource of its own, linked
    /// into its parent. The returned steps run from the shallowest level to
    /// `path` itself.
    pub fn resource_plan(&self, path: &str) -> Result<Vec<ResourceStep>> {
        let segments = split_path(path)?;
        let mut steps = Vec::new();
        for depth in 2..=segments.len() {
            let resource_path = join_path(&segments[..depth]);
            let Some(content_type) = self.content_type(&resource_path) else {
                continue;
            };
            let parent = join_path(&segments[..depth - 1]);
            let parent_content_type = self
                .nearest_content_type(&parent)
                .unwrap_or("application/json")
                .to_string();
            steps.push(ResourceStep {
                versioned: self.is_versioned(&resource_path),
                content_type: content_type.to_string(),
                key: segments[depth - 1].to_string(),
                path: resource_path,
                parent,
                parent_content_type,
            });
        }
        Ok(steps)
    }
}

/// One resource to ensure before writing below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStep {
    pub path: String,
    pub content_type: String,
    pub parent: String,
    pub parent_content_type: String,
    /// Key of the link inside the parent document
    pub key: String,
    pub versioned: bool,
}

impl ResourceStep {
    /// The body linking a newly created resource into its parent.
    pub fn link_body(&self, resource_id: &str) -> Value {
        let link = if self.versioned {
            json!({ "_id": resource_id, "_rev": 0 })
        } else {
            json!({ "_id": resource_id })
        };
        json!({ self.key.as_str(): link })
    }
}

pub(crate) fn split_path(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(SinkError::InvalidPath(path.to_string()));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(SinkError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn join_path(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}
