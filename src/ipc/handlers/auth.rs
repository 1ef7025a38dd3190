use crate::auth::authenticate;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(user) = authenticate(&state.roster, username.trim(), &password) else {
        tracing::warn!(username = %username, "login rejected");
        return err(
            &req.id,
            "invalid_credentials",
            "invalid username or password",
            None,
        );
    };
    let public = user.public();
    state.session = Some(user.actor());
    tracing::info!(user = %public.id, role = public.role.as_str(), "logged in");
    ok(&req.id, json!({ "user": public }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was = state.session.take();
    if let Some(actor) = &was {
        tracing::info!(user = %actor.id, "logged out");
    }
    ok(&req.id, json!({ "loggedOut": was.is_some() }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let user = state.session.as_ref().and_then(|actor| {
        state
            .roster
            .iter()
            .find(|u| u.id == actor.id)
            .map(|u| u.public())
    });
    ok(&req.id, json!({ "user": user }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
