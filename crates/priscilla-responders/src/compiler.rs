//! Turns static config into compiled matchers, and holds the registries the
//! routing engine reads: passive responders (fixed at startup), the four
//! active-responder buckets (grown by `register`), and the help index.

use priscilla_core::config::{DEFAULT_HELP_COMMAND, DEFAULT_PREFIX};
use priscilla_core::PriscillaConfig;
use priscilla_protocol::Command;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::active::{ActiveResponder, ResponderClass};
use crate::error::{ResponderError, Result};
use crate::help::{HelpEntry, HelpRegistry};
use crate::passive::PassiveResponder;

/// Prefix and help-keyword settings, normalized once at startup.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Primary prefix first, then alternates. Each ends in exactly one space.
    prefixes: Vec<String>,
    help_regex: Regex,
}

impl MatchSettings {
    pub fn new(prefix: &str, alternates: &[String], help_command: &str) -> Result<Self> {
        let primary = normalize_prefix(prefix).unwrap_or_else(|| {
            warn!("No prefix specified, using default: {}", DEFAULT_PREFIX);
            format!("{} ", DEFAULT_PREFIX)
        });

        let mut prefixes = vec![primary];
        for alt in alternates.iter().filter_map(|a| normalize_prefix(a)) {
            if !prefixes.contains(&alt) {
                prefixes.push(alt);
            }
        }

        let help_command = if help_command.trim().is_empty() {
            DEFAULT_HELP_COMMAND
        } else {
            help_command.trim()
        };
        let help_regex = Regex::new(&format!(r"^(?:{})(?:\s+(?P<topic>\S+))?\s*$", help_command))
            .map_err(|source| ResponderError::InvalidHelpCommand {
                command: help_command.to_string(),
                source,
            })?;
        debug!(help = %help_regex, prefixes = ?prefixes, "match settings compiled");

        Ok(Self {
            prefixes,
            help_regex,
        })
    }

    /// The primary command prefix, including its trailing space.
    pub fn prefix(&self) -> &str {
        &self.prefixes[0]
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Remainder of `text` after the first configured prefix it starts with.
    pub fn strip_prefix<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.prefixes.iter().find_map(|p| text.strip_prefix(p.as_str()))
    }

    /// `Some(topic)` when `body` is a help query; the topic is `None` for a bare keyword.
    pub fn help_topic<'t>(&self, body: &'t str) -> Option<Option<&'t str>> {
        self.help_regex
            .captures(body)
            .map(|caps| caps.name("topic").map(|m| m.as_str()))
    }
}

/// Trim surrounding spaces and append exactly one. Empty prefixes are rejected.
fn normalize_prefix(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(' ');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("{} ", trimmed))
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveBuckets {
    pub(crate) prefix: Vec<ActiveResponder>,
    pub(crate) no_prefix: Vec<ActiveResponder>,
    pub(crate) mention: Vec<ActiveResponder>,
    pub(crate) unhandled: Vec<ActiveResponder>,
}

impl ActiveBuckets {
    fn get_mut(&mut self, class: ResponderClass) -> &mut Vec<ActiveResponder> {
        match class {
            ResponderClass::Prefix => &mut self.prefix,
            ResponderClass::NoPrefix => &mut self.no_prefix,
            ResponderClass::Mention => &mut self.mention,
            ResponderClass::Unhandled => &mut self.unhandled,
        }
    }

    fn len(&self) -> usize {
        self.prefix.len() + self.no_prefix.len() + self.mention.len() + self.unhandled.len()
    }

    fn prune(&mut self, source: &str) -> usize {
        let before = self.len();
        for bucket in [
            &mut self.prefix,
            &mut self.no_prefix,
            &mut self.mention,
            &mut self.unhandled,
        ] {
            bucket.retain(|ar| ar.source != source);
        }
        before - self.len()
    }
}

/// Every registry the routing engine consults. Owned by the dispatcher.
#[derive(Debug, Clone)]
pub struct Responders {
    pub(crate) settings: MatchSettings,
    pub(crate) passive: Vec<PassiveResponder>,
    pub(crate) prefix_passive: Vec<usize>,
    pub(crate) no_prefix_passive: Vec<usize>,
    pub(crate) mention_passive: Vec<usize>,
    pub(crate) active: ActiveBuckets,
    pub(crate) help: HelpRegistry,
}

impl Responders {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            passive: Vec::new(),
            prefix_passive: Vec::new(),
            no_prefix_passive: Vec::new(),
            mention_passive: Vec::new(),
            active: ActiveBuckets::default(),
            help: HelpRegistry::new(),
        }
    }

    /// Add a compiled passive responder to its lists and contribute its help entries.
    pub fn add_passive(&mut self, pr: PassiveResponder) {
        let idx = self.passive.len();

        if pr.no_prefix {
            debug!(responder = %pr.name, "registered noprefix responder");
            self.no_prefix_passive.push(idx);
        } else {
            debug!(responder = %pr.name, "registered prefix responder");
            self.prefix_passive.push(idx);
        }
        if pr.has_mention_patterns() {
            debug!(responder = %pr.name, "registered mention responder");
            self.mention_passive.push(idx);
        }

        for cmd in &pr.help_cmds {
            self.help.push(HelpEntry {
                trigger: cmd.clone(),
                text: pr.help.clone(),
                no_prefix: pr.no_prefix,
                mention: false,
                owner: None,
            });
        }
        for cmd in &pr.help_mention_cmds {
            self.help.push(HelpEntry {
                trigger: cmd.clone(),
                text: pr.help.clone(),
                no_prefix: false,
                mention: true,
                owner: None,
            });
        }

        self.passive.push(pr);
    }

    /// Handle a `register` command from connection `source`.
    ///
    /// On success the matcher is appended to exactly one bucket and, unless it
    /// is an `unhandled` fallback, a help entry is added.
    pub fn register(&mut self, source: &str, cmd: &Command) -> Result<()> {
        let ar = ActiveResponder::from_register(source, cmd)?;

        let help = HelpEntry {
            trigger: ar.help_cmd.clone(),
            text: ar.help.clone(),
            no_prefix: ar.class == ResponderClass::NoPrefix,
            mention: ar.class == ResponderClass::Mention,
            owner: Some(source.to_string()),
        };
        if ar.class != ResponderClass::Unhandled {
            self.help.push(help);
        }

        debug!(
            source,
            id = %ar.id,
            class = %ar.class,
            pattern = ar.pattern(),
            fallthrough = ar.match_next,
            "active responder registered"
        );
        self.active.get_mut(ar.class).push(ar);
        Ok(())
    }

    /// Forget every registration and help entry owned by `source`.
    pub fn prune_source(&mut self, source: &str) -> usize {
        let removed = self.active.prune(source);
        let help_removed = self.help.prune_owner(source);
        if removed > 0 {
            debug!(source, removed, help_removed, "active responders pruned");
        }
        removed
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn help(&self) -> &HelpRegistry {
        &self.help
    }

    pub fn passive(&self) -> &[PassiveResponder] {
        &self.passive
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

/// Compile the whole responder section of the config. Any error is fatal at startup.
pub fn compile(config: &PriscillaConfig) -> Result<Responders> {
    let settings = MatchSettings::new(&config.prefix, &config.prefix_alt, &config.help_command)?;
    let mut responders = Responders::new(settings);

    for def in &config.responders.passive {
        let pr = PassiveResponder::compile(def)?;
        responders.add_passive(pr);
    }

    info!(
        passive = responders.passive.len(),
        help_entries = responders.help.len(),
        prefix = %responders.settings.prefix(),
        "responders compiled"
    );
    Ok(responders)
}
