use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_admin, session_actor};
use crate::ipc::types::{AppState, Request};
use crate::workflow::WorkflowPolicy;
use rusqlite::Connection;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Workflow,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "workflow" => Some(Self::Workflow),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Workflow => "setup.workflow",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Workflow => json!({
            "allowRetransition": WorkflowPolicy::default().allow_retransition
        }),
    }
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::Workflow => match k.as_str() {
                "allowRetransition" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown workflow field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed saved values fall back to defaults.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

/// Policy the orchestrator runs with for this workspace.
pub fn workflow_policy(conn: &Connection) -> anyhow::Result<WorkflowPolicy> {
    let section = load_section(conn, SetupSection::Workflow)?;
    let default = WorkflowPolicy::default();
    Ok(WorkflowPolicy {
        allow_retransition: section
            .get("allowRetransition")
            .and_then(|v| v.as_bool())
            .unwrap_or(default.allow_retransition),
    })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_actor(state, req) {
        return e;
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let workflow = match load_section(conn, SetupSection::Workflow) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "workflow": workflow }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section_raw, value = %current, "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
