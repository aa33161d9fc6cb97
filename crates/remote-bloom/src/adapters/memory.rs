//! In-process bit store
//!
//! A [`MemoryBackend`] plays the role of one store server: it holds the
//! bits of every logical database and can hand out any number of
//! [`MemoryStore`] connections to them. Each connection keeps its own
//! selected database and its own reply queue, the way a socket would.
//!
//! Commands take effect when they are sent, in send order; replies wait in
//! the connection's queue until received. Error replies mirror the real
//! server's wording closely enough for logs to read the same.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::MAX_BITS_PER_KEY;
use crate::error::StoreError;
use crate::ports::{BitStore, StoreCommand, StoreReply};

/// Logical databases a backend exposes
pub const DATABASES: i64 = 16;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Default)]
struct BackendState {
    /// db -> key -> set bit offsets
    databases: HashMap<i64, HashMap<String, HashSet<u64>>>,
    /// Keys holding a non-string value
    wrong_type: HashSet<(i64, String)>,
    password: Option<String>,
    broken: bool,
}

impl BackendState {
    fn key(&self, db: i64, key: &str) -> Option<&HashSet<u64>> {
        self.databases.get(&db).and_then(|keys| keys.get(key))
    }

    fn is_wrong_type(&self, db: i64, key: &str) -> bool {
        self.wrong_type.contains(&(db, key.to_string()))
    }
}

/// Shared in-memory store "server"
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that requires `AUTH password` before any other command
    pub fn with_password(password: impl Into<String>) -> Self {
        let backend = Self::new();
        backend.lock().password = Some(password.into());
        backend
    }

    /// Open a new connection, starting on database 0
    pub fn connect(&self) -> MemoryStore {
        let authenticated = self.lock().password.is_none();
        MemoryStore {
            backend: self.clone(),
            db: 0,
            authenticated,
            replies: VecDeque::new(),
        }
    }

    /// Value of one bit
    pub fn bit(&self, db: i64, key: &str, offset: u64) -> bool {
        self.lock()
            .key(db, key)
            .is_some_and(|bits| bits.contains(&offset))
    }

    /// Number of set bits in `key`
    pub fn count_ones(&self, db: i64, key: &str) -> usize {
        self.lock().key(db, key).map_or(0, HashSet::len)
    }

    pub fn key_exists(&self, db: i64, key: &str) -> bool {
        self.lock().key(db, key).is_some()
    }

    /// Make `key` hold a non-bitmap value so bit commands on it fail
    pub fn set_wrong_type(&self, db: i64, key: &str) {
        self.lock().wrong_type.insert((db, key.to_string()));
    }

    pub fn clear_wrong_type(&self, db: i64, key: &str) {
        self.lock().wrong_type.remove(&(db, key.to_string()));
    }

    /// Break every connection: sends and receives fail from now on
    pub fn break_connections(&self) {
        self.lock().broken = true;
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One connection to a [`MemoryBackend`]
pub struct MemoryStore {
    backend: MemoryBackend,
    db: i64,
    authenticated: bool,
    replies: VecDeque<StoreReply>,
}

impl MemoryStore {
    /// Database this connection has selected
    pub fn selected_db(&self) -> i64 {
        self.db
    }

    fn execute(&mut self, command: &StoreCommand) -> StoreReply {
        let mut state = self.backend.lock();

        match command {
            StoreCommand::Auth { password } => match &state.password {
                None => StoreReply::Error(
                    "ERR AUTH <password> called without any password configured for the default user"
                        .to_string(),
                ),
                Some(expected) if expected == password => {
                    self.authenticated = true;
                    StoreReply::Status("OK".to_string())
                }
                Some(_) => StoreReply::Error(
                    "WRONGPASS invalid username-password pair or user is disabled.".to_string(),
                ),
            },
            _ if !self.authenticated => {
                StoreReply::Error("NOAUTH Authentication required.".to_string())
            }
            StoreCommand::Ping => StoreReply::Status("PONG".to_string()),
            StoreCommand::Select { db } => {
                if (0..DATABASES).contains(db) {
                    self.db = *db;
                    StoreReply::Status("OK".to_string())
                } else {
                    StoreReply::Error("ERR DB index is out of range".to_string())
                }
            }
            StoreCommand::SetBit { key, offset } => {
                if state.is_wrong_type(self.db, key) {
                    return StoreReply::Error(WRONGTYPE.to_string());
                }
                if *offset > MAX_BITS_PER_KEY {
                    return bad_offset();
                }
                let was_set = !state
                    .databases
                    .entry(self.db)
                    .or_default()
                    .entry(key.clone())
                    .or_default()
                    .insert(*offset);
                StoreReply::Integer(i64::from(was_set))
            }
            StoreCommand::GetBit { key, offset } => {
                if state.is_wrong_type(self.db, key) {
                    return StoreReply::Error(WRONGTYPE.to_string());
                }
                if *offset > MAX_BITS_PER_KEY {
                    return bad_offset();
                }
                let set = state
                    .key(self.db, key)
                    .is_some_and(|bits| bits.contains(offset));
                StoreReply::Integer(i64::from(set))
            }
            StoreCommand::Del { key } => {
                let removed_bits = state
                    .databases
                    .get_mut(&self.db)
                    .and_then(|keys| keys.remove(key))
                    .is_some();
                let removed_other = state.wrong_type.remove(&(self.db, key.clone()));
                StoreReply::Integer(i64::from(removed_bits || removed_other))
            }
        }
    }
}

fn bad_offset() -> StoreReply {
    StoreReply::Error("ERR bit offset is not an integer or out of range".to_string())
}

impl BitStore for MemoryStore {
    fn send(&mut self, commands: &[StoreCommand]) -> Result<(), StoreError> {
        if self.backend.lock().broken {
            return Err(StoreError::Transport("connection reset by peer".to_string()));
        }
        for command in commands {
            let reply = self.execute(command);
            self.replies.push_back(reply);
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<StoreReply, StoreError> {
        if self.backend.lock().broken {
            return Err(StoreError::Transport("connection reset by peer".to_string()));
        }
        self.replies
            .pop_front()
            .ok_or_else(|| StoreError::Transport("read timed out: no reply pending".to_string()))
    }
}
