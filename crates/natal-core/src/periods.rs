//! Hierarchical planetary period engine
//!
//! A subject's periods form three nested levels (major, sub, sub-sub). Every
//! query here is a pure read over an already-materialized [`PeriodTree`]:
//!
//! - [`current_period`]: first entry at each level, absent levels propagate
//! - [`overlapping`]: pruned copy of the tree intersecting a half-open range
//! - [`active_at`]: entries whose interval contains an instant
//!
//! Siblings are kept in ascending start order, which lets range scans stop
//! at the first sibling starting at or after the range end.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Chart section holding the period tree
pub const DASHA_SECTION: &str = "dasha";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodLevel {
    Major,
    Sub,
    SubSub,
}

impl PeriodLevel {
    /// Chart key under which a node of this level lists its children
    pub fn children_key(&self) -> Option<&'static str> {
        match self {
            PeriodLevel::Major => Some("antardasha"),
            PeriodLevel::Sub => Some("pratyantardasha"),
            PeriodLevel::SubSub => None,
        }
    }

    pub fn child(&self) -> Option<PeriodLevel> {
        match self {
            PeriodLevel::Major => Some(PeriodLevel::Sub),
            PeriodLevel::Sub => Some(PeriodLevel::SubSub),
            PeriodLevel::SubSub => None,
        }
    }
}

/// One cycle covering `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodNode {
    pub planet: String,
    pub level: PeriodLevel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PeriodNode>,
}

impl PeriodNode {
    /// Half-open intersection with `[from, to)`
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start < to && self.end > from
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn span(&self) -> PeriodSpan {
        PeriodSpan {
            planet: self.planet.clone(),
            level: self.level,
            start: self.start,
            end: self.end,
        }
    }

    fn without_children(&self) -> PeriodNode {
        PeriodNode {
            planet: self.planet.clone(),
            level: self.level,
            start: self.start,
            end: self.end,
            children: Vec::new(),
        }
    }
}

/// A node stripped of its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSpan {
    pub planet: String,
    pub level: PeriodLevel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentPeriod {
    pub major: Option<PeriodSpan>,
    pub sub: Option<PeriodSpan>,
    pub sub_sub: Option<PeriodSpan>,
}

impl CurrentPeriod {
    fn from_chain(
        major: Option<&PeriodNode>,
        sub: Option<&PeriodNode>,
        sub_sub: Option<&PeriodNode>,
    ) -> Self {
        Self {
            major: major.map(PeriodNode::span),
            sub: sub.map(PeriodNode::span),
            sub_sub: sub_sub.map(PeriodNode::span),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.major.is_none()
    }
}

/// Validated, chronologically ordered period tree for one chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTree {
    majors: Vec<PeriodNode>,
}

impl PeriodTree {
    /// Build from major nodes, dropping malformed entries and ordering siblings by start
    pub fn new(majors: Vec<PeriodNode>) -> Self {
        Self {
            majors: normalize(majors, None),
        }
    }

    /// Read the `dasha` section of a raw chart; a missing section yields an empty tree
    pub fn from_chart(chart: &Value) -> Self {
        let majors = chart
            .get(DASHA_SECTION)
            .and_then(Value::as_object)
            .map(|section| parse_level(section, PeriodLevel::Major))
            .unwrap_or_default();
        Self::new(majors)
    }

    pub fn majors(&self) -> &[PeriodNode] {
        &self.majors
    }

    pub fn is_empty(&self) -> bool {
        self.majors.is_empty()
    }
}

/// First entry at each level.
///
/// Relies on the chart listing the running cycle first; see [`active_at`]
/// for the lookup that compares against a clock instead.
pub fn current_period(tree: &PeriodTree) -> CurrentPeriod {
    let major = tree.majors.first();
    let sub = major.and_then(|m| m.children.first());
    let sub_sub = sub.and_then(|s| s.children.first());
    CurrentPeriod::from_chain(major, sub, sub_sub)
}

/// Entries whose interval contains `at`, level by level
pub fn active_at(tree: &PeriodTree, at: DateTime<Utc>) -> CurrentPeriod {
    let major = find_containing(&tree.majors, at);
    let sub = major.and_then(|m| find_containing(&m.children, at));
    let sub_sub = sub.and_then(|s| find_containing(&s.children, at));
    CurrentPeriod::from_chain(major, sub, sub_sub)
}

/// First major cycle starting after `at`
pub fn upcoming_after(tree: &PeriodTree, at: DateTime<Utc>) -> Option<&PeriodNode> {
    tree.majors.iter().find(|node| node.start > at)
}

/// Pruned copy of the tree holding only nodes that intersect `[from, to)`.
///
/// An empty or inverted range matches nothing.
pub fn overlapping(tree: &PeriodTree, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<PeriodNode> {
    if from >= to {
        return Vec::new();
    }
    prune(&tree.majors, from, to)
}

fn prune(nodes: &[PeriodNode], from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<PeriodNode> {
    let mut kept = Vec::new();
    for node in nodes {
        // ascending starts: nothing later can intersect
        if node.start >= to {
            break;
        }
        if node.end > from {
            let mut copy = node.without_children();
            copy.children = prune(&node.children, from, to);
            kept.push(copy);
        }
    }
    kept
}

fn find_containing(nodes: &[PeriodNode], at: DateTime<Utc>) -> Option<&PeriodNode> {
    nodes
        .iter()
        .take_while(|node| node.start <= at)
        .find(|node| node.contains(at))
}

fn parse_level(entries: &Map<String, Value>, level: PeriodLevel) -> Vec<PeriodNode> {
    let mut nodes = Vec::with_capacity(entries.len());
    for (planet, entry) in entries {
        let start = entry.get("start").and_then(parse_instant);
        let end = entry.get("end").and_then(parse_instant);
        let (Some(start), Some(end)) = (start, end) else {
            warn!(planet = %planet, ?level, "period entry without readable start/end, skipping");
            continue;
        };

        let children = match (level.children_key(), level.child()) {
            (Some(key), Some(child_level)) => entry
                .get(key)
                .and_then(Value::as_object)
                .map(|nested| parse_level(nested, child_level))
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        nodes.push(PeriodNode {
            planet: planet.clone(),
            level,
            start,
            end,
            children,
        });
    }
    nodes
}

fn normalize(
    nodes: Vec<PeriodNode>,
    parent: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<PeriodNode> {
    let mut kept: Vec<PeriodNode> = nodes
        .into_iter()
        .filter(|node| {
            if node.end <= node.start {
                warn!(planet = %node.planet, level = ?node.level, "inverted period interval, dropping");
                return false;
            }
            if let Some((parent_start, parent_end)) = parent {
                if node.start < parent_start || node.end > parent_end {
                    warn!(planet = %node.planet, level = ?node.level, "period outside its parent, dropping");
                    return false;
                }
            }
            true
        })
        .collect();

    kept.sort_by_key(|node| node.start);
    for node in &mut kept {
        let children = std::mem::take(&mut node.children);
        node.children = normalize(children, Some((node.start, node.end)));
    }
    kept
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
