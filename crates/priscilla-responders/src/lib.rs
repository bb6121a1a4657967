pub mod active;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod help;
pub mod passive;
pub mod template;

pub use active::{ActiveResponder, ResponderClass};
pub use compiler::{compile, MatchSettings, Responders};
pub use engine::{ActiveInvocation, HelpReply, Invocation, PassiveInvocation, QueryClass};
pub use error::{ResponderError, Result};
pub use help::{HelpEntry, HelpRegistry};
pub use passive::PassiveResponder;
