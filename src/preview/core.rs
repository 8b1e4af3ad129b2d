// src/preview/core.rs

//! Pure preview relay state machine.
//!
//! No channels, timers or IO live here; the async shell in
//! [`crate::preview::relay`] feeds debounced events in and performs the
//! token fetch and webhook call the core asks for.

use reqwest::Url;

use crate::preview::{PreviewPayload, PreviewSession, PreviewTarget, RefreshEvent, UPDATE_OPERATION};

/// Relay state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    /// Nothing is being previewed.
    Idle,
    /// A session exists; no call is in flight.
    Watching(PreviewSession),
    /// A notification for the session is being prepared or sent.
    Notifying(PreviewSession),
}

/// Result of feeding a refresh event into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshDecision {
    /// The shell should fetch a token and send a notification.
    Notify,
    /// Nothing is sent for this event; the session is kept.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The frame is loading a different page than the one being edited.
    PathMismatch { target_path: String, editor_path: String },
    /// One of the two URLs could not be parsed.
    MalformedUrl { url: String, reason: String },
    /// A notification is already being prepared.
    Busy,
}

/// Single-session relay core for one preview target.
#[derive(Debug, Clone)]
pub struct RelayCore {
    target: PreviewTarget,
    state: RelayState,
}

impl RelayCore {
    pub fn new(target: PreviewTarget) -> Self {
        Self {
            target,
            state: RelayState::Idle,
        }
    }

    pub fn target(&self) -> &PreviewTarget {
        &self.target
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    pub fn session(&self) -> Option<&PreviewSession> {
        match &self.state {
            RelayState::Idle => None,
            RelayState::Watching(s) | RelayState::Notifying(s) => Some(s),
        }
    }

    /// Handle a debounced `beforeUpdateIframe` event.
    ///
    /// Starts watching if idle, then checks that both URLs share a path.
    pub fn begin_refresh(&mut self, event: &RefreshEvent) -> RefreshDecision {
        let session = match std::mem::replace(&mut self.state, RelayState::Idle) {
            RelayState::Idle => self.new_session(),
            RelayState::Watching(session) => session,
            notifying @ RelayState::Notifying(_) => {
                self.state = notifying;
                return RefreshDecision::Skipped(SkipReason::Busy);
            }
        };

        match paths_match(&event.preview_target_url, &event.editor_preview_url) {
            Ok(()) => {
                self.state = RelayState::Notifying(session);
                RefreshDecision::Notify
            }
            Err(reason) => {
                self.state = RelayState::Watching(session);
                RefreshDecision::Skipped(reason)
            }
        }
    }

    /// Store the fetched token and build the update payload.
    ///
    /// Returns `None` unless a notification is being prepared.
    pub fn attach_token(&mut self, token: String) -> Option<PreviewPayload> {
        let RelayState::Notifying(session) = &mut self.state else {
            return None;
        };
        session.preview_token = Some(token);
        Some(payload_for(session, session.preview_token.clone()))
    }

    /// The in-flight notification finished (successfully or not).
    pub fn finish_notify(&mut self) {
        if let RelayState::Notifying(session) =
            std::mem::replace(&mut self.state, RelayState::Idle)
        {
            self.state = RelayState::Watching(session);
        }
    }

    /// Abandon a prepared notification (e.g. the token fetch failed).
    pub fn abort_notify(&mut self) {
        self.finish_notify();
    }

    /// Handle a debounced close/unload event.
    ///
    /// Returns the final token-less payload when a session was active.
    pub fn close(&mut self) -> Option<PreviewPayload> {
        match std::mem::replace(&mut self.state, RelayState::Idle) {
            RelayState::Idle => None,
            RelayState::Watching(session) | RelayState::Notifying(session) => {
                Some(payload_for(&session, None))
            }
        }
    }

    fn new_session(&self) -> PreviewSession {
        PreviewSession {
            watched_entity_id: self.target.entity_id,
            gql_type_name: self.target.type_name.clone(),
            site_id: self.target.site_id,
            preview_token: None,
        }
    }
}

fn payload_for(session: &PreviewSession, token: Option<String>) -> PreviewPayload {
    PreviewPayload {
        operation: UPDATE_OPERATION.to_string(),
        type_name: session.gql_type_name.clone(),
        id: session.watched_entity_id,
        site_id: session.site_id,
        token,
    }
}

/// Compare the path components of two absolute URLs.
pub fn paths_match(preview_target_url: &str, editor_preview_url: &str) -> Result<(), SkipReason> {
    let target = parse_url(preview_target_url)?;
    let editor = parse_url(editor_preview_url)?;

    if target.path() == editor.path() {
        Ok(())
    } else {
        Err(SkipReason::PathMismatch {
            target_path: target.path().to_string(),
            editor_path: editor.path().to_string(),
        })
    }
}

fn parse_url(url: &str) -> Result<Url, SkipReason> {
    Url::parse(url).map_err(|e| SkipReason::MalformedUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
