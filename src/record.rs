//! The wire record: a self-describing, newline-terminated JSON value, one
//! per TCP connection, covering the six record types of spec.md §6.

use serde::{Deserialize, Serialize};

use crate::types::{MessageId, NodeId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Heartbeat {
        from: NodeId,
    },
    Election {
        from: NodeId,
    },
    Ok {
        from: NodeId,
    },
    Leader {
        from: NodeId,
    },
    Request {
        from: NodeId,
        id: MessageId,
        content: String,
    },
    Commit {
        from: NodeId,
        id: MessageId,
        content: String,
        #[serde(rename = "originalSender")]
        original_sender: NodeId,
    },
}

impl Record {
    /// Encode as a single line of JSON, newline-terminated.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode a line of JSON. Unknown `type` values or missing fields
    /// surface as an error here; the caller logs and drops the record.
    pub fn decode(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_round_trips() {
        let r = Record::Heartbeat { from: NodeId::new("n1") };
        let line = r.encode().unwrap();
        assert!(line.ends_with('\n'));
        let decoded = Record::decode(line.trim()).unwrap();
        match decoded {
            Record::Heartbeat { from } => assert_eq!(from, NodeId::new("n1")),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn commit_carries_original_sender_under_its_own_key() {
        let r = Record::Commit {
            from: NodeId::new("n2"),
            id: MessageId::new(),
            content: "hi".to_string(),
            original_sender: NodeId::new("n1"),
        };
        let line = r.encode().unwrap();
        assert!(line.contains("\"originalSender\":\"n1\""));
    }

    #[test]
    fn type_tags_are_lowercase_single_words() {
        let line = Record::Leader { from: NodeId::new("n3") }.encode().unwrap();
        assert!(line.contains("\"type\":\"leader\""));
    }

    #[test]
    fn unknown_type_is_a_decode_error_not_a_panic() {
        let err = Record::decode(r#"{"type":"unknown","from":"n1"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn missing_required_field_is_a_decode_error() {
        let err = Record::decode(r#"{"type":"heartbeat"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        let err = Record::decode("not json at all");
        assert!(err.is_err());
    }
}
