use crate::workflow::WorkflowError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn workflow_err(id: &str, e: &WorkflowError) -> serde_json::Value {
    let details = match e {
        WorkflowError::RecordNotFound(key) => Some(json!({ "seatNo": key })),
        WorkflowError::RequestNotFound(req_id) => Some(json!({ "requestId": req_id })),
        WorkflowError::AlreadyResolved { id: req_id, status } => {
            Some(json!({ "requestId": req_id, "status": status }))
        }
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
