//! Presentation attributes: selector → properties.
//!
//! An [`AttrTree`] is a mapping of mappings over JSON values addressed with
//! `/`-separated paths (`"rect/fill"`, `"text/text"`). The first path segment
//! is the sub-element selector.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::PortId;

pub const PATH_DELIMITER: char = '/';

/// Split `a/b/c` into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_DELIMITER).filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrTree(Map<String, Value>);

impl AttrTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object; anything else yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(AttrTree(map)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Selectors in declaration order.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Properties of one selector.
    pub fn selector(&self, selector: &str) -> Option<&Map<String, Value>> {
        self.0.get(selector).and_then(Value::as_object)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = split_path(path);
        let (first, rest) = segments.split_first()?;
        let mut current = self.0.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    /// Set the value at `path`, creating intermediate objects (and replacing
    /// non-object values in the way). Returns the previous value.
    pub fn set(&mut self, path: &str, value: Value) -> Option<Value> {
        let segments = split_path(path);
        let (last, parents) = segments.split_last()?;
        let mut map = &mut self.0;
        for segment in parents {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            map = entry.as_object_mut()?;
        }
        map.insert(last.to_string(), value)
    }

    /// Remove the value at `path`. Returns it when it existed.
    pub fn unset(&mut self, path: &str) -> Option<Value> {
        let segments = split_path(path);
        let (last, parents) = segments.split_last()?;
        let mut map = &mut self.0;
        for segment in parents {
            map = map.get_mut(*segment)?.as_object_mut()?;
        }
        map.shift_remove(*last)
    }

    /// Deep merge: objects merge key by key, anything else in `other` wins.
    pub fn merge(&mut self, other: &AttrTree) {
        merge_maps(&mut self.0, &other.0);
    }

    /// `defaults` overlaid with `self`.
    pub fn with_defaults(&self, defaults: &AttrTree) -> AttrTree {
        let mut merged = defaults.clone();
        merged.merge(self);
        merged
    }

    /// Only the properties that differ from `defaults`.
    pub fn diff(&self, defaults: &AttrTree) -> AttrTree {
        AttrTree(diff_maps(&self.0, &defaults.0))
    }

    /// Ports declared through a `port` property, as `(selector, port)`.
    ///
    /// The property is either the port id or an object with an `id`.
    pub fn ports(&self) -> Vec<(String, PortId)> {
        self.0
            .iter()
            .filter_map(|(selector, props)| {
                let port = props.as_object()?.get("port")?;
                let id = match port {
                    Value::String(s) => s.as_str(),
                    Value::Object(o) => o.get("id")?.as_str()?,
                    _ => return None,
                };
                Some((selector.clone(), PortId::new(id)))
            })
            .collect()
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_maps(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn diff_maps(current: &Map<String, Value>, defaults: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in current {
        match (value, defaults.get(key)) {
            (Value::Object(inner), Some(Value::Object(default_inner))) => {
                let nested = diff_maps(inner, default_inner);
                if !nested.is_empty() {
                    out.insert(key.clone(), Value::Object(nested));
                }
            }
            (value, Some(default)) if value == default => {}
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

impl From<Map<String, Value>> for AttrTree {
    fn from(map: Map<String, Value>) -> Self {
        AttrTree(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> AttrTree {
        AttrTree::from_value(value).unwrap()
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("rect/fill"), vec!["rect", "fill"]);
        assert_eq!(split_path("/a//b/"), vec!["a", "b"]);
        assert!(split_path("").is_empty());
    }

    #[test]
    fn test_get_set_unset() {
        let mut attrs = AttrTree::new();
        assert_eq!(attrs.set("rect/fill", json!("red")), None);
        assert_eq!(attrs.get("rect/fill"), Some(&json!("red")));
        assert_eq!(attrs.set("rect/fill", json!("blue")), Some(json!("red")));
        assert_eq!(attrs.unset("rect/fill"), Some(json!("blue")));
        assert_eq!(attrs.get("rect/fill"), None);
        assert_eq!(attrs.unset("nothing/here"), None);
    }

    #[test]
    fn test_set_replaces_scalars_in_the_way() {
        let mut attrs = tree(json!({"text": "plain"}));
        attrs.set("text/font-size", json!(12));
        assert_eq!(attrs.to_value(), json!({"text": {"font-size": 12}}));
    }

    #[test]
    fn test_merge_is_deep() {
        let mut attrs = tree(json!({"rect": {"fill": "red", "stroke": "black"}}));
        attrs.merge(&tree(json!({"rect": {"fill": "blue"}, "text": {"text": "hi"}})));
        assert_eq!(
            attrs.to_value(),
            json!({"rect": {"fill": "blue", "stroke": "black"}, "text": {"text": "hi"}})
        );
    }

    #[test]
    fn test_diff_against_defaults() {
        let defaults = tree(json!({"rect": {"fill": "white", "stroke": "black"}}));
        let attrs = tree(json!({"rect": {"fill": "red", "stroke": "black"}, "text": {"text": "a"}}));
        let diff = attrs.diff(&defaults);
        assert_eq!(
            diff.to_value(),
            json!({"rect": {"fill": "red"}, "text": {"text": "a"}})
        );
        assert_eq!(diff.with_defaults(&defaults), attrs);
    }

    #[test]
    fn test_ports() {
        let attrs = tree(json!({
            ".in": {"port": "in", "fill": "red"},
            ".out": {"port": {"id": "out", "type": "output"}},
            "rect": {"fill": "blue"}
        }));
        assert_eq!(
            attrs.ports(),
            vec![
                (".in".to_string(), PortId::new("in")),
                (".out".to_string(), PortId::new("out"))
            ]
        );
    }
}
