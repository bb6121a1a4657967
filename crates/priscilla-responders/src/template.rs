//! Argument templates for passive responders.
//!
//! Each configured argument is a slot. Slots containing `__N__` are filled
//! from capture group `N` of whichever pattern matched; slots containing
//! `__room__` get the originating room. Everything else passes through as is.
//! Which slots need work is decided once, at compile time.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CAPTURE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([0-9]+)__").expect("capture marker regex is valid"));

const ROOM_MARKER: &str = "__room__";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    text: String,
    substitute: bool,
    room: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgTemplate {
    slots: Vec<Slot>,
}

impl ArgTemplate {
    pub fn compile(args: &[String]) -> Self {
        let slots = args
            .iter()
            .map(|arg| Slot {
                text: arg.clone(),
                substitute: CAPTURE_MARKER.is_match(arg),
                room: arg.contains(ROOM_MARKER),
            })
            .collect();
        Self { slots }
    }

    /// Indices of slots carrying a capture marker.
    pub fn substitution_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.substitute)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of slots carrying the room marker.
    pub fn room_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.room)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Instantiate the template for one match. Missing groups expand to "".
    pub fn expand(&self, captures: &Captures<'_>, room: &str) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| {
                let mut out = if slot.substitute {
                    CAPTURE_MARKER
                        .replace_all(&slot.text, |marker: &Captures<'_>| {
                            marker[1]
                                .parse::<usize>()
                                .ok()
                                .and_then(|n| captures.get(n))
                                .map(|m| m.as_str().to_string())
                                .unwrap_or_default()
                        })
                        .into_owned()
                } else {
                    slot.text.clone()
                };
                if slot.room {
                    out = out.replace(ROOM_MARKER, room);
                }
                out
            })
            .collect()
    }
}
