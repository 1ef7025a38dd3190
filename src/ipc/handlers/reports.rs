use crate::db::SqliteRecordStore;
use crate::ipc::error::{ok, workflow_err};
use crate::ipc::helpers::{db_conn, required_seat_no, session_actor};
use crate::ipc::types::{AppState, Request};
use crate::report::transcript_model;
use crate::store::RecordStore;
use crate::workflow::WorkflowError;
use serde_json::json;

fn handle_reports_transcript_model(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let record = match SqliteRecordStore::new(conn).fetch_record(&seat_no) {
        Ok(Some(r)) => r,
        Ok(None) => return workflow_err(&req.id, &WorkflowError::RecordNotFound(seat_no)),
        Err(e) => {
            return workflow_err(&req.id, &WorkflowError::StoreReadFailed(e.to_string()))
        }
    };
    ok(&req.id, json!(transcript_model(&record)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.transcriptModel" => Some(handle_reports_transcript_model(state, req)),
        _ => None,
    }
}
