//! Serialized form of a view for session restore.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Deserializer name the host uses to route records back to this editor.
pub const DESERIALIZER: &str = "EditorView";

/// One persisted view.
///
/// `text` is the baseline (last saved content). `current_text` is present
/// only when the buffer had unsaved edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub deserializer: String,
    pub filepath: Option<PathBuf>,
    /// Language id, e.g. `rust`.
    pub language: String,
    #[serde(rename = "viewState", default)]
    pub view_state: Value,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_text: Option<String>,
}

impl SessionRecord {
    pub fn new(filepath: Option<PathBuf>, language: &str, view_state: Value, text: String) -> Self {
        Self {
            deserializer: DESERIALIZER.to_string(),
            filepath,
            language: language.to_string(),
            view_state,
            text,
            current_text: None,
        }
    }

    /// Returns true when the record carries unsaved edits.
    pub fn is_modified(&self) -> bool {
        self.current_text.is_some()
    }

    /// Returns true when the record belongs to this editor.
    pub fn is_ours(&self) -> bool {
        self.deserializer == DESERIALIZER
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let mut record = SessionRecord::new(
            Some(PathBuf::from("/w/a.rs")),
            "rust",
            json!({"cursorState": {"lineNumber": 2, "column": 1}}),
            "saved".to_string(),
        );
        let value: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["deserializer"], "EditorView");
        assert_eq!(value["viewState"]["cursorState"]["lineNumber"], 2);
        assert!(value.get("current_text").is_none());

        record.current_text = Some("edited".to_string());
        let value: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["current_text"], "edited");
    }

    #[test]
    fn test_parse_minimal_record() {
        let record =
            SessionRecord::from_json(r#"{"deserializer":"EditorView","filepath":null,"language":"plaintext"}"#)
                .unwrap();
        assert!(record.is_ours());
        assert!(!record.is_modified());
        assert_eq!(record.text, "");
        assert_eq!(record.view_state, Value::Null);
    }
}
