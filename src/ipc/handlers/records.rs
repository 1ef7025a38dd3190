use crate::db::{self, SqliteLedger, SqliteRecordStore};
use crate::import::import_records_csv;
use crate::ipc::error::{err, ok, workflow_err};
use crate::ipc::handlers::setup::workflow_policy;
use crate::ipc::helpers::{
    db_conn, require_admin, required_record, required_seat_no, required_str, session_actor,
};
use crate::ipc::types::{AppState, Request};
use crate::store::RecordStore;
use crate::workflow::{Orchestrator, WorkflowError};
use serde_json::json;
use std::path::PathBuf;

fn handle_records_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_actor(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match db::list_record_summaries(conn) {
        Ok(rows) => {
            let students: Vec<serde_json::Value> = rows
                .into_iter()
                .map(|(seat_no, name)| json!({ "seatNo": seat_no, "name": name }))
                .collect();
            ok(&req.id, json!({ "students": students }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_records_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_actor(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let seat_no = match required_seat_no(req, "seatNo") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match SqliteRecordStore::new(conn).fetch_record(&seat_no) {
        Ok(Some(record)) => ok(&req.id, json!({ "record": record })),
        Ok(None) => workflow_err(&req.id, &WorkflowError::RecordNotFound(seat_no)),
        Err(e) => workflow_err(&req.id, &WorkflowError::StoreReadFailed(e.to_string())),
    }
}

fn handle_preview_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_actor(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let original = match required_record(req, "original") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let edited = match required_record(req, "edited") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut store = SqliteRecordStore::new(conn);
    let mut ledger = SqliteLedger::new(conn);
    let orchestrator = Orchestrator::new(&mut store, &mut ledger, Default::default());
    match orchestrator.preview_edit(&original, &edited) {
        Ok(diff) => ok(&req.id, json!({ "diff": diff })),
        Err(e) => workflow_err(&req.id, &e),
    }
}

fn handle_submit_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = match session_actor(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let original = match required_record(req, "original") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let edited = match required_record(req, "edited") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let policy = match workflow_policy(conn) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let mut store = SqliteRecordStore::new(conn);
    let mut ledger = SqliteLedger::new(conn);
    let mut orchestrator = Orchestrator::new(&mut store, &mut ledger, policy);
    match orchestrator.submit_edit(&actor, &original, &edited) {
        Ok(outcome) => ok(&req.id, json!(outcome)),
        Err(e) => workflow_err(&req.id, &e),
    }
}

fn handle_import_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    match import_records_csv(conn, &path) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => err(
            &req.id,
            "import_failed",
            format!("{e:#}"),
            Some(json!({ "path": path.to_string_lossy() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.list" => Some(handle_records_list(state, req)),
        "records.get" => Some(handle_records_get(state, req)),
        "records.previewEdit" => Some(handle_preview_edit(state, req)),
        "records.submitEdit" => Some(handle_submit_edit(state, req)),
        "records.importCsv" => Some(handle_import_csv(state, req)),
        _ => None,
    }
}
