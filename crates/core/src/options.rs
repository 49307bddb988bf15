// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed submitter options (spec §9 REDESIGN FLAGS: a small struct of known
//! fields plus an opaque side-table, rather than a fully dynamic map the
//! core inspects ad hoc).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Options a submitter may attach to a task. Only `pipeline_id` is
/// inspected by the core (for duplicate prevention, spec §4.1); everything
/// else is opaque passthrough.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// When set, enables duplicate-prevention for the
    /// `(model, app_number, pipeline_id)` triple (spec §4.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,

    /// Submitter-requested time-to-live override for the task as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "duration_ms_opt")]
    pub ttl: Option<Duration>,

    /// Submitter-requested lease TTL override (defaults to the dispatcher's
    /// configured lease TTL when absent).
    #[serde(default, skip_serializing_if = "Option::is_none", with = "duration_ms_opt")]
    pub lease_ttl_override: Option<Duration>,

    /// Opaque extension fields the core never inspects.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

mod duration_ms_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        v.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let opts = TaskOptions {
            pipeline_id: Some("pipe-1".to_string()),
            ttl: Some(Duration::from_secs(60)),
            lease_ttl_override: None,
            extra: HashMap::from([("note".to_string(), serde_json::json!("x"))]),
        };
        let json = serde_json::to_string(&opts).unwrap();
        let back: TaskOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(opts, back);
    }

    #[test]
    fn default_has_no_pipeline_id() {
        assert_eq!(TaskOptions::default().pipeline_id, None);
    }
}
