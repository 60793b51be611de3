//! Activity keys and descriptors.

use mrtrace_types::{Activity, ActivityDefinition, Extensions, LanguageMap};

use crate::StatementError;

const LIP6_ACTIVITY_TYPES: &str = "https://www.lip6.fr/mocah/invalidURI/activity-types/";

/// The closed set of activity keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActivityKey {
    Application,
    StudentNumber,
    File,
    Mode,
    Execution,
    Evaluation,
    ExecutionError,
    ExecutionWarning,
    EvaluationError,
    EvaluationWarning,
    Keyword,
    Instruction,
    Scrollbar,
    Text,
}

impl ActivityKey {
    /// Every activity key, in catalog order.
    pub const ALL: [ActivityKey; 14] = [
        Self::Application,
        Self::StudentNumber,
        Self::File,
        Self::Mode,
        Self::Execution,
        Self::Evaluation,
        Self::ExecutionError,
        Self::ExecutionWarning,
        Self::EvaluationError,
        Self::EvaluationWarning,
        Self::Keyword,
        Self::Instruction,
        Self::Scrollbar,
        Self::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::StudentNumber => "student-number",
            Self::File => "file",
            Self::Mode => "mode",
            Self::Execution => "execution",
            Self::Evaluation => "evaluation",
            Self::ExecutionError => "execution-error",
            Self::ExecutionWarning => "execution-warning",
            Self::EvaluationError => "evaluation-error",
            Self::EvaluationWarning => "evaluation-warning",
            Self::Keyword => "keyword",
            Self::Instruction => "instruction",
            Self::Scrollbar => "scrollbar",
            Self::Text => "text",
        }
    }

    /// Full activity URI.
    pub fn uri(self) -> String {
        match self {
            Self::Application => "http://activitystrea.ms/schema/1.0/application".to_string(),
            Self::File => "http://activitystrea.ms/schema/1.0/file".to_string(),
            // The evaluation activity predates its key and keeps its old URI.
            Self::Evaluation => format!("{LIP6_ACTIVITY_TYPES}interpretation"),
            other => format!("{LIP6_ACTIVITY_TYPES}{}", other.as_str()),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Application => "the MrPython application",
            Self::StudentNumber => "his/her student number",
            Self::File => "the student's editor file",
            Self::Mode => "the programming mode",
            Self::Execution => "a programming execution",
            Self::Evaluation => "a programming evaluation",
            Self::ExecutionError => "an execution error",
            Self::ExecutionWarning => "an execution warning",
            Self::EvaluationError => "an evaluation error",
            Self::EvaluationWarning => "an evaluation warning",
            Self::Keyword => "a keyword",
            Self::Instruction => "a programming instruction",
            Self::Scrollbar => "a scrollbar",
            Self::Text => "some text",
        }
    }

    fn description(self) -> Option<&'static str> {
        match self {
            Self::Mode => Some("student/expert mode in MrPython"),
            Self::Execution => Some("execution of the student's editor"),
            Self::Evaluation => Some("interpretation made by the MrPython interpretor"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityKey {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| StatementError::UnknownActivity(s.to_string()))
    }
}

/// Catalog entry for an activity.
///
/// A descriptor has no extension slot. Per-statement extensions only exist
/// on the owned [`Activity`] produced by [`ActivityDescriptor::to_activity`],
/// so attaching them can never alter the shared catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDescriptor {
    pub key: ActivityKey,
    pub id: String,
    pub name: LanguageMap,
    pub description: Option<LanguageMap>,
}

impl ActivityDescriptor {
    pub(crate) fn new(key: ActivityKey) -> Self {
        Self {
            key,
            id: key.uri(),
            name: LanguageMap::en_us(key.name()),
            description: key.description().map(LanguageMap::en_us),
        }
    }

    /// Owned copy for embedding in a statement, with optional extensions.
    pub fn to_activity(&self, extensions: Option<Extensions>) -> Activity {
        Activity::new(
            self.id.clone(),
            ActivityDefinition {
                name: self.name.clone(),
                description: self.description.clone(),
                extensions: extensions.unwrap_or_default(),
            },
        )
    }
}
