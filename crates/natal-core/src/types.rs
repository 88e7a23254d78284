//! Core domain types shared by the store, cache and window manager

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown topic key: {0}")]
    TopicKey(String),
    #[error("unknown message role: {0}")]
    Role(String),
}

/// Owner of a chart and its conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A bounded slice of chart meaning that gets its own cached summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKey {
    /// Planet placements in the birth chart
    Planets,
    /// House cusps and lords
    Houses,
    /// D9 divisional chart
    Navamsa,
    /// D10 divisional chart
    Dasamsa,
    /// Active and upcoming planetary periods
    Dasha,
    Yogas,
    /// Derived strength scores
    Strengths,
}

impl TopicKey {
    pub const ALL: [TopicKey; 7] = [
        TopicKey::Planets,
        TopicKey::Houses,
        TopicKey::Navamsa,
        TopicKey::Dasamsa,
        TopicKey::Dasha,
        TopicKey::Yogas,
        TopicKey::Strengths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TopicKey::Planets => "planets",
            TopicKey::Houses => "houses",
            TopicKey::Navamsa => "navamsa",
            TopicKey::Dasamsa => "dasamsa",
            TopicKey::Dasha => "dasha",
            TopicKey::Yogas => "yogas",
            TopicKey::Strengths => "strengths",
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TopicKey::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| ParseError::TopicKey(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    /// Rolling digest of compacted history; at most one per subject
    Summary,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Summary => "summary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "summary" => Ok(Role::Summary),
            other => Err(ParseError::Role(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Insertion sequence; chronological order within a subject
    pub id: i64,
    pub subject_id: SubjectId,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub is_compacted: bool,
}

/// Derived text for one (subject, topic key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub subject_id: SubjectId,
    pub topic_key: TopicKey,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SummaryRecord {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| now < expires)
    }
}

/// Inputs the chart oracle needs; kept uncompressed beside the chart blob
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BirthData {
    pub instant: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_topic_key_roundtrip() {
        for key in TopicKey::ALL {
            assert_eq!(key.as_str().parse::<TopicKey>().unwrap(), key);
        }
        assert_eq!(" Dasha ".parse::<TopicKey>().unwrap(), TopicKey::Dasha);
        assert!(matches!(
            "transits".parse::<TopicKey>(),
            Err(ParseError::TopicKey(_))
        ));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("summary".parse::<Role>().unwrap(), Role::Summary);
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn test_summary_freshness() {
        let now = Utc::now();
        let mut record = SummaryRecord {
            subject_id: SubjectId::new("s1"),
            topic_key: TopicKey::Dasha,
            text: "Saturn major period".to_string(),
            created_at: now,
            updated_at: now,
            expires_at: None,
        };
        assert!(record.is_fresh(now));

        record.expires_at = Some(now + Duration::days(1));
        assert!(record.is_fresh(now));

        record.expires_at = Some(now);
        assert!(!record.is_fresh(now));
    }

    #[test]
    fn test_topic_key_serde_snake_case() {
        let json = serde_json::to_string(&TopicKey::Dasamsa).unwrap();
        assert_eq!(json, "\"dasamsa\"");
    }
}
