use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::Turn;

#[derive(Default, Serialize, Deserialize)]
struct StoredHistory {
    session_id: String,
    turns: Vec<Turn>,
}

/// Conversation history of one session, stored as a JSON file under the
/// memory root. Only the newest `max_turns` turns are kept.
pub struct SessionMemory {
    path: PathBuf,
    session_id: String,
    turns: Vec<Turn>,
    max_turns: usize,
}

impl SessionMemory {
    pub fn open(root: &Path, session_id: &str, max_turns: usize) -> Result<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(session_file_name(session_id));
        let turns = if path.is_file() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str::<StoredHistory>(&text)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
                .turns
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            session_id: session_id.to_string(),
            turns,
            max_turns,
        })
    }

    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// Records a turn and writes the history back to disk.
    pub fn append(&mut self, question: &str, answer: &str) -> Result<()> {
        self.turns.push(Turn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        if self.max_turns > 0 && self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        let stored = StoredHistory {
            session_id: self.session_id.clone(),
            turns: self.turns.clone(),
        };
        let text = serde_json::to_string_pretty(&stored)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(session = %self.session_id, turns = self.turns.len(), "saved session history");
        Ok(())
    }
}

/// Ids made of `[A-Za-z0-9_-]` map to `s-<id>.json`; anything else is
/// hex-encoded as `h-<hex>.json`, so distinct ids never share a file.
fn session_file_name(session_id: &str) -> String {
    let safe = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if safe {
        format!("s-{}.json", session_id)
    } else {
        let hex: String = session_id.bytes().map(|b| format!("{:02x}", b)).collect();
        format!("h-{}.json", hex)
    }
}

/// One mutex per session id. Holding a session's lock across
/// load → answer → save serialises questions from the same session.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Hands back a lock taken with `lock_for`. The entry is removed once no
    /// other caller holds it, so the map only grows with active sessions.
    pub fn release(&self, session_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let idle = locks
            .get(session_id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        drop(lock);
        if idle {
            locks.remove(session_id);
        }
    }
}
