//! Signal scope resolution.
//!
//! Finds every signal a process's BPMN document declares or references and
//! classifies its scope: a `bpmn:signal` declared directly under
//! `bpmn:definitions` is shared across processes (global), one declared
//! inside a `bpmn:process` or `bpmn:collaboration` is local to it (scoped).
//! Pure function of the XML input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::SignalData;
use crate::xml::{XmlDocument, attribute, elements_by_tags};

/// Attribute carrying a signal's free-form detail payload.
const DETAIL_ATTRIBUTE: &str = "pm:detail";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalScope {
    Global,
    Scoped,
}

/// One signal the document declares or references, with its scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReference {
    pub scope: SignalScope,
    pub signal: SignalData,
}

/// Signals referenced by the document's signal event definitions, plus any
/// global declarations the document itself carries. Deduplicated by signal
/// id, in declaration order. References to undeclared signals cannot be
/// resolved to a definition and are skipped.
pub fn signals_referenced_by_process(document: &XmlDocument) -> Vec<SignalReference> {
    let mut declarations: BTreeMap<String, SignalReference> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for (path, element) in elements_by_tags(document, &["bpmn:signal"]) {
        let Some(id) = attribute(element, "id") else {
            continue;
        };
        if declarations.contains_key(id) {
            continue;
        }
        let scope = scope_of_declaration(&path);
        let signal = SignalData::new(
            id,
            attribute(element, "name").unwrap_or_default(),
            attribute(element, DETAIL_ATTRIBUTE).unwrap_or_default(),
        );
        declarations.insert(id.to_string(), SignalReference { scope, signal });
        order.push(id.to_string());
    }

    let mut referenced: Vec<String> = Vec::new();
    for (_, element) in elements_by_tags(document, &["bpmn:signalEventDefinition"]) {
        let Some(id) = attribute(element, "signalRef") else {
            continue;
        };
        if !referenced.iter().any(|seen| seen == id) {
            referenced.push(id.to_string());
        }
    }

    // Referenced signals first (in reference order), then remaining global
    // declarations the document carries without referencing.
    let mut result = Vec::new();
    for id in &referenced {
        if let Some(reference) = declarations.get(id) {
            result.push(reference.clone());
        } else {
            tracing::warn!(signal = %id, "signal reference has no declaration; skipping");
        }
    }
    for id in &order {
        let reference = &declarations[id];
        if reference.scope == SignalScope::Global && !referenced.iter().any(|seen| seen == id) {
            result.push(reference.clone());
        }
    }
    result
}

/// A declaration path of the form `/bpmn:definitions[1]/bpmn:signal[n]` has
/// two segments; anything deeper is nested inside a process/collaboration.
fn scope_of_declaration(path: &str) -> SignalScope {
    if path.matches('/').count() == 2 {
        SignalScope::Global
    } else {
        SignalScope::Scoped
    }
}
