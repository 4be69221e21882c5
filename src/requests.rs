//! In-flight request tracking
//!
//! Each backend call runs in its own task and reports back through the event
//! channel as a [`Completion`]. Nothing serialises the calls: several sends can
//! be outstanding and their completions arrive in whatever order the network
//! delivers them. A cancelled request is forgotten, so a completion that races
//! the abort is recognised as stale and dropped.

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use crate::client::{ChatClient, ChatError, ChatMode};
use crate::tui::AppEvent;

pub type RequestId = u64;

#[derive(Debug)]
pub enum Outcome {
    Reply {
        prompt: String,
        result: Result<String, ChatError>,
    },
    Cleared(Result<(), ChatError>),
}

#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Send { prompt: String, mode: ChatMode },
    ClearHistory,
}

pub struct PendingRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    handle: JoinHandle<()>,
}

pub struct RequestTracker {
    next_id: RequestId,
    pending: Vec<PendingRequest>,
    events: UnboundedSender<AppEvent>,
}

impl RequestTracker {
    pub fn new(events: UnboundedSender<AppEvent>) -> Self {
        Self {
            next_id: 1,
            pending: Vec::new(),
            events,
        }
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_send(
        &mut self,
        client: ChatClient,
        session_id: String,
        mode: ChatMode,
        prompt: String,
    ) -> RequestId {
        let id = self.allocate_id();
        let events = self.events.clone();
        let task_prompt = prompt.clone();

        let handle = tokio::spawn(async move {
            let result = client.send(&session_id, mode, &task_prompt).await;
            let completion = Completion {
                id,
                outcome: Outcome::Reply { prompt: task_prompt, result },
            };
            let _ = events.send(AppEvent::Completed(completion));
        });

        tracing::info!(request_id = id, mode = mode.as_str(), "Send started");
        self.pending.push(PendingRequest {
            id,
            kind: RequestKind::Send { prompt, mode },
            handle,
        });
        id
    }

    pub fn spawn_clear(&mut self, client: ChatClient, session_id: String) -> RequestId {
        let id = self.allocate_id();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            let result = client.clear_history(&session_id).await;
            let completion = Completion {
                id,
                outcome: Outcome::Cleared(result),
            };
            let _ = events.send(AppEvent::Completed(completion));
        });

        tracing::info!(request_id = id, "Clear history started");
        self.pending.push(PendingRequest {
            id,
            kind: RequestKind::ClearHistory,
            handle,
        });
        id
    }

    /// Stop tracking a request. Returns false if it was already cancelled or
    /// never existed.
    pub fn finish(&mut self, id: RequestId) -> bool {
        match self.pending.iter().position(|p| p.id == id) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Abort every outstanding request. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        for request in self.pending.drain(..) {
            request.handle.abort();
            match &request.kind {
                RequestKind::Send { mode, .. } => {
                    tracing::warn!(request_id = request.id, mode = mode.as_str(), "Send cancelled");
                }
                RequestKind::ClearHistory => {
                    tracing::warn!(request_id = request.id, "Clear history cancelled");
                }
            }
        }
        cancelled
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Prompts of sends still waiting for a reply, oldest first
    pub fn pending_prompts(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().filter_map(|p| match &p.kind {
            RequestKind::Send { prompt, .. } => Some(prompt.as_str()),
            RequestKind::ClearHistory => None,
        })
    }
}
