//! Room registry: room code to running room.
//!
//! Lookups and creation go through one lock so two connections racing to
//! open the same code always end up in the same room. The lock is never
//! held across an `.await`.

use crate::room::{self, RoomContext, RoomHandle};
use log::{debug, info};
use shared::User;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct Rooms {
    by_code: HashMap<String, RoomHandle>,
    next_room_id: u64,
}

/// Shared, cloneable registry of live rooms.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<Mutex<Rooms>>,
    ctx: RoomContext,
}

impl RoomRegistry {
    pub fn new(ctx: RoomContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Rooms {
                by_code: HashMap::new(),
                next_room_id: 1,
            })),
            ctx,
        }
    }

    fn rooms(&self) -> MutexGuard<'_, Rooms> {
        // A panic while holding the lock leaves the map itself consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the room for `code`, starting one hosted by `host` if none is
    /// running. Must be called from within a tokio runtime.
    pub fn get_or_create(&self, code: &str, host: &User) -> RoomHandle {
        let mut rooms = self.rooms();
        if let Some(handle) = rooms.by_code.get(code) {
            return handle.clone();
        }

        let id = rooms.next_room_id;
        rooms.next_room_id += 1;

        let handle = room::spawn(id, code.to_string(), host.clone(), self.ctx.clone(), self.clone());
        rooms.by_code.insert(code.to_string(), handle.clone());
        info!("Created room {} with host {}", code, host.name);
        handle
    }

    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms().by_code.get(code).cloned()
    }

    /// Drops the entry for `code` if it still points at room instance `id`.
    pub fn remove(&self, code: &str, id: u64) -> bool {
        let mut rooms = self.rooms();
        match rooms.by_code.get(code) {
            Some(handle) if handle.id() == id => {
                rooms.by_code.remove(code);
                debug!("Removed room {} from registry", code);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rooms().by_code.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rooms().by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
