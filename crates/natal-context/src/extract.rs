//! Topic key to chart slice extraction
//!
//! Each key maps to one bounded sub-document of the raw chart. The dasha
//! slice is the running major cycle plus the next one, never the full tree.

use chrono::{DateTime, Utc};
use natal_core::periods::{active_at, current_period, upcoming_after};
use natal_core::{PeriodNode, PeriodTree, TopicKey};
use serde_json::{json, Value};

/// Slice of `chart` relevant to `key`, `None` when the chart lacks it
pub fn extract(key: TopicKey, chart: &Value, now: DateTime<Utc>) -> Option<Value> {
    match key {
        TopicKey::Planets => section(chart, &["planets"]),
        TopicKey::Houses => section(chart, &["houses"]),
        TopicKey::Navamsa => section(chart, &["divisional", "D9"]),
        TopicKey::Dasamsa => section(chart, &["divisional", "D10"]),
        TopicKey::Dasha => dasha_window(chart, now),
        TopicKey::Yogas => section(chart, &["yogas"]),
        TopicKey::Strengths => section(chart, &["strengths"]),
    }
}

fn section(chart: &Value, path: &[&str]) -> Option<Value> {
    let mut node = chart;
    for segment in path {
        node = node.get(segment)?;
    }
    match node {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        other => Some(other.clone()),
    }
}

fn dasha_window(chart: &Value, now: DateTime<Utc>) -> Option<Value> {
    let tree = PeriodTree::from_chart(chart);
    let majors = tree.majors();
    let first = majors.first()?;

    // Before the first cycle the chart's opening entries stand in for "now";
    // past the last one nothing is active.
    let (running, active) = match majors.iter().position(|m| m.contains(now)) {
        Some(index) => (Some(index), Some(active_at(&tree, now))),
        None if now < first.start => (Some(0), Some(current_period(&tree))),
        None => (None, None),
    };
    let next = match running {
        Some(index) => majors.get(index + 1),
        None => upcoming_after(&tree, now),
    };

    Some(json!({
        "as_of": now,
        "active": active,
        "sub_periods": running.map(|index| sub_periods(&majors[index])).unwrap_or_default(),
        "next": next.map(PeriodNode::span),
    }))
}

fn sub_periods(major: &PeriodNode) -> Vec<Value> {
    major
        .children
        .iter()
        .map(|sub| json!(sub.span()))
        .collect()
}
