//! Path-addressed access to document elements.
//!
//! Node paths look like `/bpmn:definitions[1]/bpmn:process[1]/bpmn:task[2]`:
//! one segment per ancestor, with a 1-based index among same-named siblings.
//! A path computed by [`elements_by_tags`] resolves to the same element after
//! the document round-trips through [`XmlDocument::to_xml`] and back.

use std::collections::HashMap;

use super::document::{XmlDocument, XmlElement};
use super::PathError;

/// Attribute holding the per-element JSON configuration blob.
pub const PM_CONFIG_ATTRIBUTE: &str = "pm:config";

/// Read an attribute value. Absent attributes are `None`, never an error.
pub fn attribute<'a>(element: &'a XmlElement, name: &str) -> Option<&'a str> {
    element
        .attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn set_attribute(element: &mut XmlElement, name: &str, value: &str) {
    match element.attributes.iter_mut().find(|(key, _)| key == name) {
        Some((_, existing)) => *existing = value.to_string(),
        None => element
            .attributes
            .push((name.to_string(), value.to_string())),
    }
}

/// `true` when a query tag matches an element name. An exact qualified match
/// always wins; a query tag without a prefix also matches any prefixed
/// element with that local name.
fn tag_matches(tag: &str, name: &str) -> bool {
    if tag == name {
        return true;
    }
    if !tag.contains(':') {
        let local = name.rsplit_once(':').map_or(name, |(_, local)| local);
        return local == tag;
    }
    false
}

/// Every element whose tag matches any name in `tags`, in definition order,
/// paired with its node path.
pub fn elements_by_tags<'a>(
    document: &'a XmlDocument,
    tags: &[&str],
) -> Vec<(String, &'a XmlElement)> {
    let mut found = Vec::new();
    let root_path = format!("/{}[1]", document.root.name);
    collect(&document.root, &root_path, tags, &mut found);
    found
}

fn collect<'a>(
    element: &'a XmlElement,
    path: &str,
    tags: &[&str],
    found: &mut Vec<(String, &'a XmlElement)>,
) {
    if tags.iter().any(|tag| tag_matches(tag, &element.name)) {
        found.push((path.to_string(), element));
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for child in element.child_elements() {
        let index = seen.entry(child.name.as_str()).or_insert(0);
        *index += 1;
        let child_path = format!("{path}/{}[{}]", child.name, index);
        collect(child, &child_path, tags, found);
    }
}

/// Resolve a node path to its element.
pub fn element_at_path<'a>(
    document: &'a XmlDocument,
    path: &str,
) -> Result<&'a XmlElement, PathError> {
    let segments = parse_path(path)?;
    let mut current = match_segment_root(&document.root, &segments, path)?;
    for segment in &segments[1..] {
        current = child_at_segment(current, segment).ok_or_else(|| PathError::Unresolved {
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

fn element_at_path_mut<'a>(
    document: &'a mut XmlDocument,
    path: &str,
) -> Result<&'a mut XmlElement, PathError> {
    let segments = parse_path(path)?;
    match_segment_root(&document.root, &segments, path)?;
    let mut current = &mut document.root;
    for segment in &segments[1..] {
        current = child_at_segment_mut(current, segment).ok_or_else(|| PathError::Unresolved {
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

/// Set (or overwrite) a plain attribute on the element at `path`.
/// Idempotent: writing the same value twice leaves the document unchanged.
pub fn set_attribute_at_path(
    document: &mut XmlDocument,
    path: &str,
    name: &str,
    value: &str,
) -> Result<(), PathError> {
    let element = element_at_path_mut(document, path)?;
    set_attribute(element, name, value);
    tracing::debug!(path, name, value, "set XML attribute");
    Ok(())
}

/// Set a key inside the `pm:config` JSON blob of the element at `path`.
///
/// The blob is created as an empty object when the attribute is absent; an
/// attribute that holds something other than a JSON object is an error.
pub fn set_pm_config_at_path(
    document: &mut XmlDocument,
    path: &str,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), PathError> {
    let element = element_at_path_mut(document, path)?;

    let raw = attribute(element, PM_CONFIG_ATTRIBUTE).unwrap_or("{}");
    let mut config: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| PathError::Config {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    let object = config.as_object_mut().ok_or_else(|| PathError::Config {
        path: path.to_string(),
        reason: "pm:config is not a JSON object".to_string(),
    })?;
    object.insert(key.to_string(), value.clone());

    let serialized = serde_json::to_string(&config).map_err(|e| PathError::Config {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    set_attribute(element, PM_CONFIG_ATTRIBUTE, &serialized);
    tracing::debug!(path, key, "set pm:config value");
    Ok(())
}

struct PathSegment {
    name: String,
    index: usize,
}

fn parse_path(path: &str) -> Result<Vec<PathSegment>, PathError> {
    let malformed = || PathError::Malformed {
        path: path.to_string(),
    };

    if !path.starts_with('/') {
        return Err(malformed());
    }
    let mut segments = Vec::new();
    for part in path[1..].split('/') {
        let (name, rest) = part.split_once('[').ok_or_else(malformed)?;
        let index: usize = rest
            .strip_suffix(']')
            .and_then(|n| n.parse().ok())
            .ok_or_else(malformed)?;
        if name.is_empty() || index == 0 {
            return Err(malformed());
        }
        segments.push(PathSegment {
            name: name.to_string(),
            index,
        });
    }
    if segments.is_empty() {
        return Err(malformed());
    }
    Ok(segments)
}

fn match_segment_root<'a>(
    root: &'a XmlElement,
    segments: &[PathSegment],
    path: &str,
) -> Result<&'a XmlElement, PathError> {
    let first = &segments[0];
    if root.name != first.name || first.index != 1 {
        return Err(PathError::Unresolved {
            path: path.to_string(),
        });
    }
    Ok(root)
}

fn child_at_segment<'a>(parent: &'a XmlElement, segment: &PathSegment) -> Option<&'a XmlElement> {
    parent
        .child_elements()
        .filter(|child| child.name == segment.name)
        .nth(segment.index - 1)
}

fn child_at_segment_mut<'a>(
    parent: &'a mut XmlElement,
    segment: &PathSegment,
) -> Option<&'a mut XmlElement> {
    parent
        .children
        .iter_mut()
        .filter_map(|node| match node {
            super::document::XmlNode::Element(el) if el.name == segment.name => Some(el),
            _ => None,
        })
        .nth(segment.index - 1)
}
