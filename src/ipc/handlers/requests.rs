use crate::db::{SqliteLedger, SqliteRecordStore};
use crate::diff::ChangeLogEntry;
use crate::ipc::error::{err, ok, workflow_err};
use crate::ipc::handlers::setup::workflow_policy;
use crate::ipc::helpers::{
    db_conn, optional_str, require_admin, required_seat_no, required_str, session_actor,
};
use crate::ipc::types::{AppState, Request};
use crate::ledger::RequestFilter;
use crate::workflow::{Orchestrator, Role, WorkflowPolicy};
use serde_json::json;

/// Teacher sessions only ever see their own requests.
fn request_filter(role: Role, actor_id: &str, req: &Request) -> RequestFilter {
    if role == Role::Teacher {
        return RequestFilter::ByTeacher(actor_id.to_string());
    }
    if let Some(teacher_id) = optional_str(req, "teacherId") {
        return RequestFilter::ByTeacher(teacher_id);
    }
    match optional_str(req, "status").as_deref() {
        Some("pending") => RequestFilter::Pending,
        _ => RequestFilter::All,
    }
}

fn handle_requests_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = match session_actor(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let filter = request_filter(actor.role, &actor.id, req);
    let mut store = SqliteRecordStore::new(conn);
    let mut ledger = SqliteLedger::new(conn);
    let orchestrator = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());
    match orchestrator.list_requests(&filter) {
        Ok(requests) => ok(&req.id, json!({ "requests": requests })),
        Err(e) => workflow_err(&req.id, &e),
    }
}

fn handle_requests_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = match session_actor(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let request_id = match required_str(req, "requestId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut store = SqliteRecordStore::new(conn);
    let mut ledger = SqliteLedger::new(conn);
    let orchestrator = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());
    match orchestrator.get_request(&request_id) {
        Ok(request) if actor.role == Role::Teacher && request.teacher_id != actor.id => err(
            &req.id,
            "forbidden",
            "request belongs to another teacher",
            Some(json!({ "requestId": request_id })),
        ),
        Ok(request) => ok(&req.id, json!({ "request": request })),
        Err(e) => workflow_err(&req.id, &e),
    }
}

fn handle_requests_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = match session_actor(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    if actor.role != Role::Teacher {
        return err(
            &req.id,
            "forbidden",
            "admins edit records directly with records.submitEdit",
            None,
        );
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let seat_no = match required_seat_no(req, "studentSeatNo") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_name = optional_str(req, "studentName").unwrap_or_default();
    let Some(raw_changes) = req.params.get("changes").filter(|v| v.is_array()) else {
        return err(&req.id, "bad_params", "changes must be an array", None);
    };
    let changes: Vec<ChangeLogEntry> = match serde_json::from_value(raw_changes.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("invalid change entry: {}", e),
                None,
            )
        }
    };
    let mut store = SqliteRecordStore::new(conn);
    let mut ledger = SqliteLedger::new(conn);
    let mut orchestrator =
        Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());
    match orchestrator.create_request(&actor, &seat_no, &student_name, changes) {
        Ok(request) => ok(&req.id, json!({ "request": request })),
        Err(e) => workflow_err(&req.id, &e),
    }
}

fn handle_requests_resolve(state: &mut AppState, req: &Request) -> serde_json::Value {
    let admin = match require_admin(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let request_id = match required_str(req, "requestId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status = match required_str(req, "status") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let comment = optional_str(req, "adminComment").filter(|c| !c.trim().is_empty());
    let policy = match workflow_policy(conn) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let mut store = SqliteRecordStore::new(conn);
    let mut ledger = SqliteLedger::new(conn);
    let mut orchestrator = Orchestrator::new(&mut store, &mut ledger, policy);
    match orchestrator.resolve_request_str(&request_id, &status, &admin.name, comment.as_deref()) {
        Ok(outcome) => ok(&req.id, json!(outcome)),
        Err(e) => workflow_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "requests.list" => Some(handle_requests_list(state, req)),
        "requests.get" => Some(handle_requests_get(state, req)),
        "requests.create" => Some(handle_requests_create(state, req)),
        "requests.resolve" => Some(handle_requests_resolve(state, req)),
        _ => None,
    }
}
