//! Hosting panel API models
//!
//! Request bodies and response shapes exchanged with the hosting panel. The
//! panel is loose about where it nests attributes and how it spells
//! identifiers, so the response types accept every shape observed in practice.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub description: String,
    /// Owning panel account
    pub user: String,
}

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
}

/// Single file write request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFileRequest {
    /// Path inside the server's filesystem
    pub file: String,
    pub content: String,
}

/// Identifier that may arrive as a string or a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Text(String),
    Number(u64),
}

impl Identifier {
    pub fn is_blank(&self) -> bool {
        matches!(self, Identifier::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Text(s) => f.write_str(s),
            Identifier::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Resource wrapper: `{ "object": "server", "attributes": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<A> {
    #[serde(default)]
    pub object: Option<String>,
    pub attributes: A,
}

/// Response envelope, either `{ data: { attributes } }` or `{ attributes }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<A> {
    #[serde(default)]
    pub data: Option<Resource<A>>,
    #[serde(default)]
    pub attributes: Option<A>,
}

impl<A> Envelope<A> {
    pub fn into_attributes(self) -> Option<A> {
        self.data.map(|d| d.attributes).or(self.attributes)
    }
}

/// Attributes of a created server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerAttributes {
    #[serde(default)]
    pub identifier: Option<Identifier>,
    #[serde(default)]
    pub uuid: Option<Identifier>,
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user: Option<Identifier>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerAttributes {
    /// Preferred identifier: `identifier`, then `uuid`, then `id`
    pub fn server_id(&self) -> Option<String> {
        [&self.identifier, &self.uuid, &self.id]
            .into_iter()
            .flatten()
            .find(|id| !id.is_blank())
            .map(|id| id.to_string())
    }
}

/// Attributes of a created account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAttributes {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub uuid: Option<Identifier>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Installed flag reported as either a boolean or 0/1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    pub fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(n) => *n != 0,
        }
    }
}

/// Container section of the status attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(default)]
    pub installed: Option<Flag>,
}

/// Server status attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusAttributes {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub is_suspended: Option<bool>,
    #[serde(default)]
    pub container: Option<ContainerInfo>,
    #[serde(default)]
    pub resources: Option<Value>,
}

impl StatusAttributes {
    /// `status`, falling back to `state`, lowercased
    pub fn reported_state(&self) -> Option<String> {
        self.status
            .as_deref()
            .or(self.state.as_deref())
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
    }

    pub fn is_installed(&self) -> bool {
        self.container
            .as_ref()
            .and_then(|c| c.installed)
            .is_some_and(|flag| flag.is_set())
    }
}

/// One entry of the panel's `errors` array
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelErrorItem {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Panel error envelope
///
/// Either `{ error, details }`, `{ message }` or `{ errors: [{ code, detail }] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<PanelErrorItem>>,
}

impl PanelError {
    /// Field-level messages, in the order the panel reported them
    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(items) = &self.errors {
            out.extend(items.iter().filter_map(|item| {
                item.detail.clone().or_else(|| item.code.clone())
            }));
        }
        if let Some(details) = &self.details {
            collect_detail_messages(details, None, &mut out);
        }
        out
    }

    /// Headline message
    pub fn summary(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .or_else(|| self.messages().into_iter().next())
    }
}

fn collect_detail_messages(value: &Value, field: Option<&str>, out: &mut Vec<String>) {
    match value {
        Value::String(s) => match field {
            Some(field) => out.push(format!("{}: {}", field, s)),
            None => out.push(s.clone()),
        },
        Value::Array(items) => {
            for item in items {
                collect_detail_messages(item, field, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                collect_detail_messages(item, Some(key), out);
            }
        }
        _ => {}
    }
}
