use serde::{Deserialize, Serialize};

/// Every submission is stored under `resume:<id>`.
pub const SUBMISSION_KEY_PREFIX: &str = "resume:";

pub fn submission_key(id: &str) -> String {
    format!("{SUBMISSION_KEY_PREFIX}{id}")
}

/// The only durable entity. Serialised camelCase, exactly as the web client
/// has always written it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    /// Empty until analysis succeeds. Written as `""` while empty.
    #[serde(default, with = "empty_as_blank")]
    pub feedback: Option<Feedback>,
}

impl SubmissionRecord {
    /// A record whose feedback is present must reference both stored files.
    pub fn is_consistent(&self) -> bool {
        self.feedback.is_none() || (!self.resume_path.is_empty() && !self.image_path.is_empty())
    }
}

/// Tip category. Matched case-insensitively; anything else the model invents
/// is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TipKind {
    Good,
    Improve,
    Other(String),
}

impl From<String> for TipKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "good" => TipKind::Good,
            "improve" => TipKind::Improve,
            _ => TipKind::Other(raw),
        }
    }
}

impl From<TipKind> for String {
    fn from(kind: TipKind) -> Self {
        match kind {
            TipKind::Good => "good".to_string(),
            TipKind::Improve => "improve".to_string(),
            TipKind::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsSection {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<AtsTip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedSection {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<DetailedTip>,
}

/// Structured analysis returned by the model. Scores are out of 100; the
/// model sometimes writes them as floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub overall_score: f64,
    #[serde(rename = "ATS")]
    pub ats: AtsSection,
    pub tone_and_style: DetailedSection,
    pub content: DetailedSection,
    pub structure: DetailedSection,
    pub skills: DetailedSection,
}

/// `None` <-> `""`. Reading also accepts `null` or a missing field.
mod empty_as_blank {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use super::Feedback;

    pub fn serialize<S: Serializer>(value: &Option<Feedback>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(feedback) => feedback.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Feedback>, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(_)) => Err(D::Error::custom("feedback must be an object or empty")),
            Some(other) => serde_json::from_value(other).map(Some).map_err(D::Error::custom),
        }
    }
}
