//! Shared data model for the mrtrace learning-activity pipeline.
//!
//! This crate defines the statement shape that flows from the IDE through
//! the statement factory, the durable queue, and finally to the Learning
//! Record Store (LRS). The JSON produced by `serde` follows the subset of
//! the xAPI 1.0.3 statement format that the LRS expects.
//!
//! No crate in the workspace defines its own copy of these types. Every
//! other crate depends on `mrtrace-types` for cross-cutting definitions.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Root of every custom URI emitted by the tracer.
pub const URI_BASE: &str = "https://www.lip6.fr/mocah/invalidURI/";

/// Prefix of the actor `openid`. The identity hash is appended to it.
pub const STUDENT_NUMBER_PREFIX: &str = "https://www.lip6.fr/mocah/invalidURI/student-number:";

/// Extension URIs attached to activity definitions and contexts.
pub mod ext {
    /// Session token, attached to every statement context.
    pub const SESSION: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/session";
    pub const ERROR_SEVERITY: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/error-severity";
    pub const ERROR_TYPE: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/error-type";
    pub const ERROR_CLASS: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/error-class";
    pub const ERROR_MESSAGE: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/error-message";
    pub const ERROR_INSTRUCTION: &str =
        "https://www.lip6.fr/mocah/invalidURI/extensions/error-instruction";
    pub const ERROR_LINE: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/error-line";
    pub const FILENAME: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/filename";
    pub const MODE: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/mode";
    pub const INSTRUCTION: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/instruction";
    pub const NB_ERRORS: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/nb-errors";
    pub const NB_WARNINGS: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/nb-warnings";
    pub const NUMBER_ASSERTS: &str = "https://www.lip6.fr/mocah/invalidURI/extensions/number-asserts";
    /// Identity hash before a rotation.
    pub const OLD_HASH: &str = "https://www.lip6.fr/mocah/invalidURI/old-hash";
    /// Identity hash after a rotation.
    pub const NEW_HASH: &str = "https://www.lip6.fr/mocah/invalidURI/new_hash";
}

/// A language tag to label mapping (`{"en-US": "opened"}`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageMap(BTreeMap<String, String>);

impl LanguageMap {
    /// Builds a map holding a single `en-US` label.
    pub fn en_us(label: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert("en-US".to_string(), label.to_string());
        Self(map)
    }

    /// Returns the label for `language`, if present.
    pub fn get(&self, language: &str) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }
}

/// Extension URI to value annotations.
///
/// Values are JSON scalars or strings; `null` is allowed for optional
/// fields such as a missing error line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<String, Value>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style variant of [`Extensions::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Error returned when an actor cannot be rebuilt from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseActorError {
    /// The `objectType` field was not `Agent`.
    #[error("unsupported actor object type: {0}")]
    ObjectType(String),
    /// The `openid` did not start with the student-number prefix.
    #[error("actor openid does not carry a student number: {0}")]
    OpenId(String),
}

/// The pseudonymous identity attached to every statement.
///
/// Both fields are derived from the persisted identity hash. On the wire
/// the identifier is rendered as an `openid` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AgentWire", try_from = "AgentWire")]
pub struct Actor {
    pub pseudonymous_id: String,
    pub display_name: String,
}

impl Actor {
    /// Builds the actor for an identity hash.
    pub fn from_hash(hash: &str) -> Self {
        Self {
            pseudonymous_id: hash.to_string(),
            display_name: hash.to_string(),
        }
    }

    /// The `openid` URI sent to the LRS.
    pub fn openid(&self) -> String {
        format!("{STUDENT_NUMBER_PREFIX}{}", self.pseudonymous_id)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentWire {
    object_type: String,
    openid: String,
    name: String,
}

impl From<Actor> for AgentWire {
    fn from(actor: Actor) -> Self {
        Self {
            object_type: "Agent".to_string(),
            openid: actor.openid(),
            name: actor.display_name,
        }
    }
}

impl TryFrom<AgentWire> for Actor {
    type Error = ParseActorError;

    fn try_from(wire: AgentWire) -> Result<Self, Self::Error> {
        if wire.object_type != "Agent" {
            return Err(ParseActorError::ObjectType(wire.object_type));
        }
        let pseudonymous_id = wire
            .openid
            .strip_prefix(STUDENT_NUMBER_PREFIX)
            .ok_or_else(|| ParseActorError::OpenId(wire.openid.clone()))?
            .to_string();
        Ok(Self {
            pseudonymous_id,
            display_name: wire.name,
        })
    }
}

/// A verb as it appears in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verb {
    pub id: String,
    pub display: LanguageMap,
}

/// The definition block of an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    pub name: LanguageMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LanguageMap>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
enum ActivityObjectType {
    #[default]
    Activity,
}

/// The statement object: an activity plus its (possibly extended) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "objectType", default)]
    object_type: ActivityObjectType,
    pub id: String,
    pub definition: ActivityDefinition,
}

impl Activity {
    pub fn new(id: impl Into<String>, definition: ActivityDefinition) -> Self {
        Self {
            object_type: ActivityObjectType::Activity,
            id: id.into(),
            definition,
        }
    }
}

/// Statement context. Only extensions are used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl Context {
    /// Context binding the statement to a session.
    pub fn for_session(session: &SessionId) -> Self {
        Self {
            extensions: Extensions::new().with(ext::SESSION, session.as_str()),
        }
    }

    /// The session this context was bound to, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.extensions.get(ext::SESSION).and_then(Value::as_str)
    }
}

/// Random token identifying one process run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Length of a generated session token.
    pub const LEN: usize = 10;

    /// Generates a fresh token from the first characters of a UUID v4.
    pub fn generate() -> Self {
        let mut token = Uuid::new_v4().to_string();
        token.truncate(Self::LEN);
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity and session every statement is built against.
///
/// A context never changes once built. Identity rotation produces a new
/// context with [`TraceContext::with_actor`] and swaps it in; statements
/// already built keep the context they were built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub actor: Actor,
    pub session_id: SessionId,
}

impl TraceContext {
    pub fn new(actor: Actor, session_id: SessionId) -> Self {
        Self { actor, session_id }
    }

    /// Same session, different actor.
    pub fn with_actor(&self, actor: Actor) -> Self {
        Self {
            actor,
            session_id: self.session_id.clone(),
        }
    }
}

/// A single learning-activity event.
///
/// Statements are immutable once built. The `id` is generated client side
/// so that a statement redelivered from the queue is recognised by the LRS,
/// and `timestamp` records when the event happened rather than when it was
/// delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    id: Uuid,
    actor: Actor,
    verb: Verb,
    object: Activity,
    context: Context,
    timestamp: DateTime<Utc>,
}

impl Statement {
    /// Builds a statement stamped with a fresh id and the current time.
    pub fn new(actor: Actor, verb: Verb, object: Activity, context: Context) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor,
            verb,
            object,
            context,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn verb(&self) -> &Verb {
        &self.verb
    }

    pub fn object(&self) -> &Activity {
        &self.object
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Shortcut for the object-level extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.object.definition.extensions
    }

    pub fn session_id(&self) -> Option<&str> {
        self.context.session_id()
    }

    /// Serialises the statement to its LRS wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a statement from its LRS wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
