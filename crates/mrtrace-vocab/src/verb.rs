//! Verb keys and descriptors.

use mrtrace_types::{LanguageMap, Verb};

use crate::StatementError;

const ACTIVITY_STREAMS: &str = "http://activitystrea.ms/schema/1.0/";
const ADL_VERBS: &str = "http://adlnet.gov/expapi/verbs/";
const LIP6_VERBS: &str = "https://www.lip6.fr/mocah/invalidURI/verbs/";

/// The closed set of verb keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VerbKey {
    Opened,
    Closed,
    Updated,
    Created,
    Saved,
    Switched,
    Started,
    Passed,
    Failed,
    Terminated,
    Had,
    Typed,
    Modified,
    Moved,
    Deleted,
    Inserted,
}

impl VerbKey {
    /// Every verb key, in catalog order.
    pub const ALL: [VerbKey; 16] = [
        Self::Opened,
        Self::Closed,
        Self::Updated,
        Self::Created,
        Self::Saved,
        Self::Switched,
        Self::Started,
        Self::Passed,
        Self::Failed,
        Self::Terminated,
        Self::Had,
        Self::Typed,
        Self::Modified,
        Self::Moved,
        Self::Deleted,
        Self::Inserted,
    ];

    /// The key as used by call sites, also the `en-US` display label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Updated => "updated",
            Self::Created => "created",
            Self::Saved => "saved",
            Self::Switched => "switched",
            Self::Started => "started",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
            Self::Had => "had",
            Self::Typed => "typed",
            Self::Modified => "modified",
            Self::Moved => "moved",
            Self::Deleted => "deleted",
            Self::Inserted => "inserted",
        }
    }

    /// Full verb URI.
    pub fn uri(self) -> String {
        match self {
            Self::Opened => format!("{ACTIVITY_STREAMS}open"),
            Self::Closed => format!("{ACTIVITY_STREAMS}close"),
            Self::Updated => format!("{ACTIVITY_STREAMS}update"),
            Self::Created => format!("{ACTIVITY_STREAMS}create"),
            Self::Saved => format!("{ACTIVITY_STREAMS}save"),
            Self::Started => format!("{ACTIVITY_STREAMS}start"),
            Self::Terminated => format!("{ACTIVITY_STREAMS}terminate"),
            Self::Deleted => format!("{ACTIVITY_STREAMS}delete"),
            Self::Inserted => format!("{ACTIVITY_STREAMS}insert"),
            Self::Passed => format!("{ADL_VERBS}passed"),
            Self::Failed => format!("{ADL_VERBS}failed"),
            Self::Switched | Self::Had | Self::Typed | Self::Modified | Self::Moved => {
                format!("{LIP6_VERBS}{}", self.as_str())
            }
        }
    }
}

impl std::fmt::Display for VerbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VerbKey {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| StatementError::UnknownVerb(s.to_string()))
    }
}

/// Catalog entry for a verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbDescriptor {
    pub key: VerbKey,
    pub id: String,
    pub display: LanguageMap,
}

impl VerbDescriptor {
    pub(crate) fn new(key: VerbKey) -> Self {
        Self {
            key,
            id: key.uri(),
            display: LanguageMap::en_us(key.as_str()),
        }
    }

    /// Owned copy for embedding in a statement.
    pub fn to_verb(&self) -> Verb {
        Verb {
            id: self.id.clone(),
            display: self.display.clone(),
        }
    }
}
