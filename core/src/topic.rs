//! Topic names published on the mediator.
//!
//! Without a correlation key the bare names are used; with key `job1` every
//! topic becomes `job1-<name>` so callers sharing one bus can tell their own
//! requests apart.

use std::fmt;

/// One of the four lifecycle topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Update,
    Success,
    Error,
    Abort,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::Update, Topic::Success, Topic::Error, Topic::Abort];

    pub fn name(&self) -> &'static str {
        match self {
            Topic::Update => "httpUpdate",
            Topic::Success => "httpSuccess",
            Topic::Error => "httpError",
            Topic::Abort => "httpAbort",
        }
    }

    /// The topic string as published for an optional correlation key.
    pub fn qualified(&self, key: Option<&str>) -> String {
        match key {
            Some(key) => format!("{key}-{}", self.name()),
            None => self.name().to_string(),
        }
    }

    /// Terminal topics end a request's lifecycle.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Topic::Update)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
