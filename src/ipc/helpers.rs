use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::record::{seat_key_from_json, Record};
use crate::workflow::{Actor, Role};
use rusqlite::Connection;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

/// Seat numbers arrive as strings or numbers.
pub fn required_seat_no(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(seat_key_from_json)
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_record(req: &Request, key: &str) -> Result<Record, serde_json::Value> {
    let Some(raw) = req.params.get(key).filter(|v| v.is_object()) else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an object", key),
            None,
        ));
    };
    serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("{} is not a valid record: {}", key, e),
            None,
        )
    })
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn session_actor(state: &AppState, req: &Request) -> Result<Actor, serde_json::Value> {
    state
        .session
        .clone()
        .ok_or_else(|| err(&req.id, "not_authenticated", "log in first", None))
}

pub fn require_admin(state: &AppState, req: &Request) -> Result<Actor, serde_json::Value> {
    let actor = session_actor(state, req)?;
    match actor.role {
        Role::Admin => Ok(actor),
        Role::Teacher => Err(err(
            &req.id,
            "forbidden",
            "only an admin can do this",
            Some(serde_json::json!({ "role": actor.role.as_str() })),
        )),
    }
}
