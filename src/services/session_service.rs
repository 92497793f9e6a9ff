use rand::RngCore;

use crate::models::{AppState, SessionUser};

pub const SESSION_COOKIE: &str = "session_id";

pub fn random_session_id() -> String {
    let mut b = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut b);
    hex::encode(b)
}

/// Store a freshly authenticated user under a new session id.
pub fn start_session(state: &AppState, user: SessionUser) -> String {
    let sid = random_session_id();
    tracing::info!(username = %user.username, project_id = user.active_project(), "Session started");
    state.sessions.lock().unwrap().insert(sid.clone(), user);
    sid
}

/// Swap the session's identity after a project switch.
pub fn replace_session_user(state: &AppState, sid: &str, user: SessionUser) {
    state.sessions.lock().unwrap().insert(sid.to_string(), user);
}

pub fn end_session(state: &AppState, sid: &str) {
    state.sessions.lock().unwrap().remove(sid);
    state.flash_store.lock().unwrap().remove(sid);
}
