use priscilla_core::PassiveResponderDef;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{ResponderError, Result};
use crate::template::ArgTemplate;

/// A statically configured responder, compiled once at startup and immutable after.
#[derive(Debug, Clone)]
pub struct PassiveResponder {
    pub name: String,
    patterns: Vec<Regex>,
    mention_patterns: Vec<Regex>,
    pub no_prefix: bool,
    pub fall_through: bool,
    pub cmd: String,
    pub args: ArgTemplate,
    pub help: String,
    pub help_cmds: Vec<String>,
    pub help_mention_cmds: Vec<String>,
    pub timeout_secs: u64,
}

impl PassiveResponder {
    /// Compile one config entry. Fails on the first problem found, in the
    /// order: no match patterns, bad pattern, empty `cmd`, missing help.
    pub fn compile(def: &PassiveResponderDef) -> Result<Self> {
        if def.matches.is_empty() {
            return Err(ResponderError::MissingMatch {
                name: def.name.clone(),
            });
        }

        let patterns = compile_all(&def.matches)?;
        let mention_patterns = compile_all(&def.mention_match)?;

        if def.cmd.is_empty() {
            return Err(ResponderError::MissingCmd {
                name: def.name.clone(),
            });
        }

        if def.help.is_empty() || def.help_commands.is_empty() {
            return Err(ResponderError::MissingHelp {
                name: def.name.clone(),
            });
        }

        let args = ArgTemplate::compile(&def.args);
        if !args.substitution_slots().is_empty() || !args.room_slots().is_empty() {
            debug!(
                responder = %def.name,
                substitute = ?args.substitution_slots(),
                room = ?args.room_slots(),
                "argument substitution found"
            );
        }

        Ok(Self {
            name: def.name.clone(),
            patterns,
            mention_patterns,
            no_prefix: def.noprefix,
            fall_through: def.fallthrough,
            cmd: def.cmd.clone(),
            args,
            help: def.help.clone(),
            help_cmds: def.help_commands.clone(),
            help_mention_cmds: def.help_mention_commands.clone(),
            timeout_secs: def.effective_timeout_secs(),
        })
    }

    pub fn has_mention_patterns(&self) -> bool {
        !self.mention_patterns.is_empty()
    }

    /// Captures of the first primary pattern (in config order) matching `text`.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.patterns.iter().find_map(|re| re.captures(text))
    }

    /// Captures of the first mention pattern matching `text`.
    pub fn mention_captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.mention_patterns.iter().find_map(|re| re.captures(text))
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| ResponderError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}
