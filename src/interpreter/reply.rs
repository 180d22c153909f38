use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// One full-file mutation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    Create { path: String, content: String },
    Update { path: String, content: String },
    Delete { path: String },
}

impl FileOperation {
    pub fn path(&self) -> &str {
        match self {
            Self::Create { path, .. } | Self::Update { path, .. } | Self::Delete { path } => path,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// An entry of the `operations` list that could not be turned into a
/// [`FileOperation`]. Never applied; reported back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for RejectedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry #{}: {}", self.index, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistantReply {
    pub explanation: String,
    pub operations: Vec<FileOperation>,
    pub rejected: Vec<RejectedEntry>,
}

impl AssistantReply {
    pub fn plain_text(raw: &str) -> Self {
        Self {
            explanation: raw.to_string(),
            operations: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Which branch the decoder took for a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    ParsedOperations(AssistantReply),
    PlainText(String),
}

impl ParseOutcome {
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::PlainText(_))
    }

    pub fn into_reply(self) -> AssistantReply {
        match self {
            Self::ParsedOperations(reply) => reply,
            Self::PlainText(raw) => AssistantReply::plain_text(&raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Create,
    Update,
    Delete,
    CreateUpdate,
    Chat,
    Unknown(String),
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "create_update" => Self::CreateUpdate,
            "chat" => Self::Chat,
            _ => Self::Unknown(raw),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireOperation {
    action: Action,
    #[serde(default, alias = "filename")]
    path: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredReply {
    explanation: String,
    operations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireReply {
    Structured(StructuredReply),
    Legacy(Vec<Value>),
}

enum DecodedEntry {
    Operation(FileOperation),
    Chat(String),
}

/// Decodes a raw model response.
///
/// The primary shape is `{"explanation", "operations"}`; a bare array of
/// `create_update`/`delete`/`chat` entries is accepted as well. Anything else
/// is [`ParseOutcome::PlainText`]. Inside a recognized shape, each entry is
/// decoded on its own: bad entries become [`RejectedEntry`] values and do not
/// affect the others.
pub fn parse_response(raw: &str) -> ParseOutcome {
    let body = strip_code_fence(raw);
    let wire = match serde_json::from_str::<WireReply>(body) {
        Ok(wire) => wire,
        Err(err) => {
            tracing::debug!(error = %err, "model response is not a structured reply");
            return ParseOutcome::PlainText(raw.to_string());
        }
    };

    let (mut explanation, entries) = match wire {
        WireReply::Structured(reply) => (reply.explanation, reply.operations),
        WireReply::Legacy(entries) => (String::new(), entries),
    };

    let mut operations = Vec::new();
    let mut rejected = Vec::new();
    let mut chat = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match decode_entry(entry) {
            Ok(DecodedEntry::Operation(operation)) => operations.push(operation),
            Ok(DecodedEntry::Chat(text)) => chat.push(text),
            Err(reason) => rejected.push(RejectedEntry { index, reason }),
        }
    }

    if !chat.is_empty() {
        if !explanation.is_empty() {
            chat.insert(0, explanation);
        }
        explanation = chat.join("\n");
    }

    ParseOutcome::ParsedOperations(AssistantReply {
        explanation,
        operations,
        rejected,
    })
}

fn decode_entry(entry: Value) -> Result<DecodedEntry, String> {
    if !entry.is_object() {
        return Err(format!("expected an object, got {entry}"));
    }
    let WireOperation {
        action,
        path,
        content,
    } = serde_json::from_value(entry).map_err(|err| err.to_string())?;

    let path = match action {
        Action::Chat => return Ok(DecodedEntry::Chat(content.unwrap_or_default())),
        Action::Unknown(action) => return Err(format!("unknown action {action:?}")),
        _ => match path {
            Some(path) if !path.trim().is_empty() => path,
            _ => return Err("missing path".to_string()),
        },
    };

    let operation = match (action, content) {
        (Action::Delete, _) => FileOperation::Delete { path },
        (Action::Create, Some(content)) => FileOperation::Create { path, content },
        (Action::Update | Action::CreateUpdate, Some(content)) => {
            FileOperation::Update { path, content }
        }
        _ => return Err(format!("missing content for {path}")),
    };
    Ok(DecodedEntry::Operation(operation))
}

/// Drops a surrounding Markdown code fence (```` ```json ```` or bare ```` ``` ````).
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    let body = match rest.find('\n') {
        Some(index) if rest[..index].trim().chars().all(|ch| ch.is_ascii_alphanumeric()) => {
            &rest[index + 1..]
        }
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };
    body.trim()
}
