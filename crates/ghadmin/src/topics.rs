//! Topic set algebra.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AdminError;

/// How a requested topic list is combined with a repository's current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicMode {
    /// The requested list becomes the topic list as given.
    Replace,
    /// Union of current and requested, ignoring empty requested entries.
    Add,
    /// Current minus requested.
    Remove,
}

impl TopicMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TopicMode::Replace => "replace",
            TopicMode::Add => "add",
            TopicMode::Remove => "remove",
        }
    }
}

impl fmt::Display for TopicMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicMode {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(TopicMode::Replace),
            "add" => Ok(TopicMode::Add),
            "remove" => Ok(TopicMode::Remove),
            other => Err(AdminError::InvalidArgument(format!(
                "invalid topic mode: {other:?}"
            ))),
        }
    }
}

/// Compute the new topic list.
///
/// Membership is exact string equality. `Add` keeps current topics in their
/// order and appends new ones; `Remove` keeps the survivors in order.
#[must_use]
pub fn combine(current: &[String], requested: &[String], mode: TopicMode) -> Vec<String> {
    match mode {
        TopicMode::Replace => requested.to_vec(),
        TopicMode::Add => {
            let mut seen: HashSet<&str> = HashSet::new();
            current
                .iter()
                .chain(requested.iter().filter(|t| !t.is_empty()))
                .filter(|t| seen.insert(t.as_str()))
                .cloned()
                .collect()
        }
        TopicMode::Remove => {
            let drop: HashSet<&str> = requested.iter().map(String::as_str).collect();
            current
                .iter()
                .filter(|t| !drop.contains(t.as_str()))
                .cloned()
                .collect()
        }
    }
}
