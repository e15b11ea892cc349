
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A piece of profile text together with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    pub source_type: String,
    pub source_id: String,
    pub text: String,
}

impl TextField {
    #[inline]
    pub fn new(
        source_type: impl Into<String>,
        source_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// Pull the indexable text out of a profile document.
///
/// Experience and project descriptions are tagged with their list position,
/// skills collapse into a single comma-separated field, and free-form
/// `summary` / `bio` strings are taken as-is.
#[inline]
pub fn extract_text_fields(profile: &Value) -> Vec<TextField> {
    let mut fields = Vec::new();

    collect_descriptions(profile, "experience", "experience", &mut fields);
    collect_descriptions(profile, "projects", "project", &mut fields);

    if let Some(skills) = profile.get("skills").and_then(skills_text) {
        fields.push(TextField::new("skills", "0", skills));
    }

    for key in ["summary", "bio"] {
        if let Some(text) = profile.get(key).and_then(non_empty_text) {
            fields.push(TextField::new(key, "0", text));
        }
    }

    fields
}

fn collect_descriptions(profile: &Value, key: &str, source_type: &str, fields: &mut Vec<TextField>) {
    let Some(entries) = profile.get(key).and_then(Value::as_array) else {
        return;
    };

    for (i, entry) in entries.iter().enumerate() {
        if let Some(text) = entry.get("description").and_then(non_empty_text) {
            fields.push(TextField::new(source_type, i.to_string(), text));
        }
    }
}

fn skills_text(skills: &Value) -> Option<String> {
    let text = match skills {
        Value::Null => return None,
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    (!text.trim().is_empty()).then_some(text)
}

fn non_empty_text(value: &Value) -> Option<String> {
    let text = value.as_str()?;
    (!text.trim().is_empty()).then(|| text.to_string())
}
