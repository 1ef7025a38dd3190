use std::path::PathBuf;

use crate::auth::{default_roster, UserAccount};
use crate::workflow::Actor;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub roster: Vec<UserAccount>,
    /// Logged-in user; role checks happen here before workflow calls.
    pub session: Option<Actor>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            roster: default_roster(),
            session: None,
        }
    }
}
