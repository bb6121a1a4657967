use crate::engine::QueryClass;

/// One help line: the trigger users type after the help keyword, and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub trigger: String,
    pub text: String,
    pub no_prefix: bool,
    pub mention: bool,
    /// Registering connection for active responders; `None` for config entries.
    pub owner: Option<String>,
}

impl HelpEntry {
    /// The query class this entry answers to.
    pub fn class(&self) -> QueryClass {
        if self.mention {
            QueryClass::Mention
        } else if self.no_prefix {
            QueryClass::Plain
        } else {
            QueryClass::Prefixed
        }
    }
}

/// Append-only list of help entries in contribution order.
#[derive(Debug, Clone, Default)]
pub struct HelpRegistry {
    entries: Vec<HelpEntry>,
}

impl HelpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: HelpEntry) {
        self.entries.push(entry);
    }

    /// Drop every entry contributed by `owner`. Returns how many were removed.
    pub fn prune_owner(&mut self, owner: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.owner.as_deref() != Some(owner));
        before - self.entries.len()
    }

    /// Entries visible to a query of `class`, filtered to `topic` when given
    /// (compared case-insensitively). Registration order is preserved.
    pub fn lookup(&self, class: QueryClass, topic: Option<&str>) -> Vec<&HelpEntry> {
        self.entries
            .iter()
            .filter(|e| e.class() == class)
            .filter(|e| topic.is_none_or(|t| e.trigger.eq_ignore_ascii_case(t)))
            .collect()
    }

    pub fn entries(&self) -> &[HelpEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
