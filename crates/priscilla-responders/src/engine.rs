//! Pattern matching & routing.
//!
//! Given an inbound chat message, decide which responders fire and in what
//! order. The result is a [`Invocation`] plan; nothing here performs I/O, so
//! for fixed registries and input the plan is always identical.
//!
//! Precedence:
//! 1. help queries are answered from the help index and nothing else fires;
//! 2. the message is classified as prefixed, mention or plain;
//! 3. candidates are scanned in registration order, pass by pass, stopping a
//!    pass at the first match that does not fall through;
//! 4. addressed messages (prefixed or mention) that matched nothing go to the
//!    `unhandled` bucket.

use priscilla_protocol::{MatchInfo, Message};
use regex::Captures;
use tracing::debug;

use crate::active::ActiveResponder;
use crate::compiler::Responders;
use crate::help::HelpEntry;
use crate::passive::PassiveResponder;

/// How an inbound message addressed the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryClass {
    /// Started with a command prefix, which has been stripped.
    Prefixed,
    /// Not prefixed, but the adapter flagged a mention of the bot.
    Mention,
    /// Ordinary chatter.
    Plain,
}

/// Help text to send back to the adapter the query came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpReply {
    pub adapter: String,
    pub room: String,
    pub text: String,
}

/// A matched passive responder with its arguments already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveInvocation {
    pub responder: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub adapter: String,
    pub room: String,
}

/// A matched active responder: the message goes to the owning connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveInvocation {
    pub responder: String,
    pub adapter: String,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Help(HelpReply),
    Passive(PassiveInvocation),
    Active(ActiveInvocation),
}

/// One entry in a scan pass.
#[derive(Clone, Copy)]
enum Candidate<'r> {
    Passive {
        responder: &'r PassiveResponder,
        mention: bool,
    },
    Active(&'r ActiveResponder),
}

impl Candidate<'_> {
    fn falls_through(&self) -> bool {
        match self {
            Candidate::Passive { responder, .. } => responder.fall_through,
            Candidate::Active(ar) => ar.match_next,
        }
    }

    fn try_match(&self, body: &str, adapter: &str, message: &Message) -> Option<Invocation> {
        match *self {
            Candidate::Passive { responder, mention } => {
                let caps = if mention {
                    responder.mention_captures(body)?
                } else {
                    responder.captures(body)?
                };
                Some(Invocation::Passive(PassiveInvocation {
                    responder: responder.name.clone(),
                    cmd: responder.cmd.clone(),
                    args: responder.args.expand(&caps, &message.room),
                    timeout_secs: responder.timeout_secs,
                    adapter: adapter.to_string(),
                    room: message.room.clone(),
                }))
            }
            Candidate::Active(ar) => {
                let caps = ar.captures(body)?;
                let mut forwarded = message.clone();
                forwarded.matched = Some(MatchInfo {
                    id: ar.id.clone(),
                    groups: capture_strings(&caps),
                });
                Some(Invocation::Active(ActiveInvocation {
                    responder: ar.source.clone(),
                    adapter: adapter.to_string(),
                    message: forwarded,
                }))
            }
        }
    }
}

fn capture_strings(caps: &Captures<'_>) -> Vec<String> {
    caps.iter()
        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
        .collect()
}

/// Scan one pass. Returns true if any candidate matched.
fn scan<'r>(
    candidates: impl IntoIterator<Item = Candidate<'r>>,
    body: &str,
    adapter: &str,
    message: &Message,
    plan: &mut Vec<Invocation>,
) -> bool {
    let mut matched = false;
    for candidate in candidates {
        let Some(invocation) = candidate.try_match(body, adapter, message) else {
            continue;
        };
        matched = true;
        plan.push(invocation);
        if !candidate.falls_through() {
            break;
        }
    }
    matched
}

impl Responders {
    /// Classify `text`, returning the class and the text to match against.
    pub fn classify<'t>(&self, text: &'t str, mentioned: bool) -> (QueryClass, &'t str) {
        match self.settings.strip_prefix(text) {
            Some(body) => (QueryClass::Prefixed, body),
            None if mentioned => (QueryClass::Mention, text),
            None => (QueryClass::Plain, text),
        }
    }

    /// Build the routing plan for a chat message received from `adapter`.
    pub fn route(&self, adapter: &str, message: &Message) -> Vec<Invocation> {
        let (class, body) = self.classify(&message.text, message.mentioned);

        if let Some(topic) = self.settings.help_topic(body) {
            return self.help_plan(adapter, message, class, topic);
        }

        let mut plan = Vec::new();
        let matched = match class {
            QueryClass::Prefixed => scan(
                self.no_prefix_candidates().chain(self.prefix_candidates()),
                body,
                adapter,
                message,
                &mut plan,
            ),
            QueryClass::Plain => {
                scan(self.no_prefix_candidates(), body, adapter, message, &mut plan)
            }
            QueryClass::Mention => {
                let plain = scan(self.no_prefix_candidates(), body, adapter, message, &mut plan);
                let mention = scan(self.mention_candidates(), body, adapter, message, &mut plan);
                plain || mention
            }
        };

        if !matched && class != QueryClass::Plain {
            scan(
                self.active.unhandled.iter().map(Candidate::Active),
                body,
                adapter,
                message,
                &mut plan,
            );
        }

        debug!(adapter, ?class, invocations = plan.len(), "message routed");
        plan
    }

    fn passive_candidates<'r>(
        &'r self,
        indices: &'r [usize],
        mention: bool,
    ) -> impl Iterator<Item = Candidate<'r>> + 'r {
        indices.iter().filter_map(move |&i| {
            self.passive
                .get(i)
                .map(|responder| Candidate::Passive { responder, mention })
        })
    }

    fn no_prefix_candidates(&self) -> impl Iterator<Item = Candidate<'_>> {
        self.passive_candidates(&self.no_prefix_passive, false)
            .chain(self.active.no_prefix.iter().map(Candidate::Active))
    }

    fn prefix_candidates(&self) -> impl Iterator<Item = Candidate<'_>> {
        self.passive_candidates(&self.prefix_passive, false)
            .chain(self.active.prefix.iter().map(Candidate::Active))
    }

    fn mention_candidates(&self) -> impl Iterator<Item = Candidate<'_>> {
        self.passive_candidates(&self.mention_passive, true)
            .chain(self.active.mention.iter().map(Candidate::Active))
    }

    fn help_plan(
        &self,
        adapter: &str,
        message: &Message,
        class: QueryClass,
        topic: Option<&str>,
    ) -> Vec<Invocation> {
        let entries = self.help.lookup(class, topic);

        let text = if entries.is_empty() {
            // Plain chatter that happens to start with the keyword gets no reply.
            if class == QueryClass::Plain {
                return Vec::new();
            }
            match topic {
                Some(t) => format!("No help available for '{}'", t),
                None => "No help available".to_string(),
            }
        } else if topic.is_some() {
            entries
                .iter()
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            entries
                .iter()
                .map(|e| self.help_line(e))
                .collect::<Vec<_>>()
                .join("\n")
        };

        debug!(adapter, ?class, topic, "help query answered");
        vec![Invocation::Help(HelpReply {
            adapter: adapter.to_string(),
            room: message.room.clone(),
            text,
        })]
    }

    fn help_line(&self, entry: &HelpEntry) -> String {
        match entry.class() {
            QueryClass::Prefixed => {
                format!("{}{} - {}", self.settings.prefix(), entry.trigger, entry.text)
            }
            QueryClass::Mention | QueryClass::Plain => format!("{} - {}", entry.trigger, entry.text),
        }
    }
}
