use std::collections::HashMap;

use priscilla_core::config::SERVER_ID;
use rand::Rng;

use crate::conn::send::SharedSink;

/// Engaged connections keyed by id. Owned by the dispatcher, never shared.
#[derive(Default)]
pub struct ConnectionRegistry {
    conns: HashMap<String, SharedSink>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the id for a new connection.
    ///
    /// The requested id is kept when free; otherwise (or when none was asked
    /// for) fresh random ids are drawn until one is unused. `server` is never
    /// handed out.
    pub fn claim_id(&self, requested: &str) -> String {
        let mut id = if requested.is_empty() {
            generate_id()
        } else {
            requested.to_string()
        };
        while id == SERVER_ID || self.conns.contains_key(&id) {
            id = generate_id();
        }
        id
    }

    pub fn insert(&mut self, id: String, sink: SharedSink) {
        self.conns.insert(id, sink);
    }

    /// Drop a connection. Returns false if it was not registered.
    pub fn remove(&mut self, id: &str) -> bool {
        self.conns.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&SharedSink> {
        self.conns.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conns.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}

/// 16 lowercase hex chars from the thread-local CSPRNG.
pub fn generate_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    hex::encode(bytes)
}
