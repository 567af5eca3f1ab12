//! Room bookkeeping for live viewer counts.
//!
//! Every connection sits in a private room named after its id and in one room
//! per page source it watches.  Joining a page room counts a viewer and tells
//! the whole room the new total; leaving uncounts the viewer at once and tells
//! the remaining members from a spawned task.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::cache::ViewCounter;
use crate::metrics::MetricsRegistry;

pub type ConnId = Uuid;

// ---------------------------------------------------------------------------
// Wire events
// ---------------------------------------------------------------------------

/// Frames sent by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientEvent {
    Watch(String),
    Leave(String),
}

/// Frames sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    Watch(u64),
}

// ---------------------------------------------------------------------------
// Hub state
// ---------------------------------------------------------------------------

struct Connection {
    tx: mpsc::UnboundedSender<ServerEvent>,
    /// Joined rooms in join order; the private room comes first.
    rooms: Vec<String>,
}

#[derive(Default)]
struct Rooms {
    connections: HashMap<ConnId, Connection>,
    members: HashMap<String, HashSet<ConnId>>,
}

impl Rooms {
    fn join(&mut self, conn: ConnId, room: &str) -> bool {
        let Some(connection) = self.connections.get_mut(&conn) else {
            return false;
        };
        if connection.rooms.iter().any(|r| r == room) {
            return false;
        }
        connection.rooms.push(room.to_owned());
        self.members.entry(room.to_owned()).or_default().insert(conn);
        true
    }

    fn part(&mut self, conn: ConnId, room: &str) -> bool {
        let Some(connection) = self.connections.get_mut(&conn) else {
            return false;
        };
        let Some(pos) = connection.rooms.iter().position(|r| r == room) else {
            return false;
        };
        connection.rooms.remove(pos);
        if let Some(members) = self.members.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                self.members.remove(room);
            }
        }
        true
    }

    /// Queue `event` to every member of `room` except `skip`.  Returns how
    /// many frames were queued.
    fn emit(&self, room: &str, event: &ServerEvent, skip: Option<ConnId>) -> u64 {
        let Some(members) = self.members.get(room) else {
            return 0;
        };
        let mut sent = 0;
        for id in members.iter().filter(|id| Some(**id) != skip) {
            let Some(connection) = self.connections.get(id) else {
                continue;
            };
            match connection.tx.send(event.clone()) {
                Ok(()) => sent += 1,
                Err(_) => debug!(conn = %id, room, "viewer connection already closed"),
            }
        }
        sent
    }
}

// ---------------------------------------------------------------------------
// ViewerHub
// ---------------------------------------------------------------------------

pub struct ViewerHub {
    rooms: Arc<Mutex<Rooms>>,
    views: Arc<ViewCounter>,
    /// Only sources under this prefix are counted.
    page_prefix: String,
    leave_delay: Duration,
    metrics: MetricsRegistry,
}

impl ViewerHub {
    /// `root_repo` bounds the watchable pages to that repository's files.
    pub fn new(
        views: Arc<ViewCounter>,
        root_repo: &str,
        leave_delay: Duration,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            rooms: Arc::default(),
            views,
            page_prefix: format!("{}/", root_repo.trim_end_matches('/')),
            leave_delay,
            metrics,
        }
    }

    #[cfg(test)]
    pub fn views(&self) -> &Arc<ViewCounter> {
        &self.views
    }

    #[cfg(test)]
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Register a connection; frames for it arrive on the returned receiver.
    pub fn connect(&self) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut rooms = self.lock();
        rooms.connections.insert(
            id,
            Connection {
                tx,
                rooms: Vec::new(),
            },
        );
        rooms.join(id, &id.to_string());
        debug!(conn = %id, "viewer connected");
        (id, rx)
    }

    pub fn handle(&self, conn: ConnId, event: ClientEvent) {
        match event {
            ClientEvent::Watch(source) => self.watch(conn, &source),
            ClientEvent::Leave(room) => self.leave(conn, &room),
        }
    }

    /// Join the page room of `source`, count the viewer and tell the room.
    ///
    /// Watching a page the connection already watches only re-sends the count.
    /// Sources outside the configured repository are ignored.
    pub fn watch(&self, conn: ConnId, source: &str) {
        if !source.starts_with(&self.page_prefix) {
            debug!(conn = %conn, source, "ignoring watch of a foreign source");
            return;
        }
        let mut rooms = self.lock();
        if !rooms.connections.contains_key(&conn) {
            return;
        }
        if rooms.join(conn, source) {
            self.views.add(source);
        }
        let count = displayed_count(&self.views, source);
        let sent = rooms.emit(source, &ServerEvent::Watch(count), None);
        self.metrics.metrics.realtime_broadcasts.inc_by(sent);
        info!(conn = %conn, source, count, "viewer watching");
    }

    /// Leave `room`, uncount the viewer and tell the remaining members.
    ///
    /// The private room cannot be left.
    pub fn leave(&self, conn: ConnId, room: &str) {
        if room == conn.to_string() {
            return;
        }
        if !self.lock().part(conn, room) {
            trace!(conn = %conn, room, "leave of a room not joined");
            return;
        }
        let Some(view) = self.views.get(room) else {
            return;
        };
        view.decrement();
        debug!(conn = %conn, room, count = view.count(), "viewer left");

        let rooms = Arc::clone(&self.rooms);
        let metrics = self.metrics.clone();
        let delay = self.leave_delay;
        let room = room.to_owned();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let rooms = rooms.lock().unwrap_or_else(PoisonError::into_inner);
            let sent = rooms.emit(&room, &ServerEvent::Watch(view.count()), Some(conn));
            metrics.metrics.realtime_broadcasts.inc_by(sent);
        });
    }

    /// Leave every joined room in join order, then forget the connection.
    pub fn disconnect(&self, conn: ConnId) {
        let joined = match self.lock().connections.get(&conn) {
            Some(connection) => connection.rooms.clone(),
            None => return,
        };
        for room in &joined {
            self.leave(conn, room);
        }
        let mut rooms = self.lock();
        rooms.part(conn, &conn.to_string());
        rooms.connections.remove(&conn);
        debug!(conn = %conn, "viewer disconnected");
    }

    fn lock(&self) -> MutexGuard<'_, Rooms> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Count shown to a new watcher.  Never below 1, since the watcher itself is
/// looking at the page.
fn displayed_count(views: &ViewCounter, source: &str) -> u64 {
    views.get(source).map(|v| v.count()).unwrap_or(0).max(1)
}
