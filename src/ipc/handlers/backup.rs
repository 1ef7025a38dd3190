use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_admin;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn workspace_param(state: &AppState, req: &Request) -> Option<PathBuf> {
    req.params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone())
}

fn handle_backup_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let Some(workspace_path) = workspace_param(state, req) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Some(conn) = state.db.as_ref() {
        let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
    }

    let out = PathBuf::from(&out_path);
    let export = match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": out_path })),
            )
        }
    };
    tracing::info!(
        workspace = %workspace_path.to_string_lossy(),
        out = %out_path,
        sha256 = %export.db_sha256,
        "workspace bundle exported"
    );

    ok(
        &req.id,
        json!({
            "ok": true,
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbSha256": export.db_sha256
        }),
    )
}

fn handle_backup_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_admin(state, req) {
        return e;
    }
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let Some(workspace_path) = workspace_param(state, req) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    let is_open = state.workspace.as_deref() == Some(workspace_path.as_path());
    if is_open {
        // Drop open handle before replacing file.
        state.db = None;
    }

    let import = backup::import_workspace_bundle(&src, &workspace_path);

    let mut reopen_error = None;
    if is_open {
        match db::open_db(&workspace_path) {
            Ok(conn) => state.db = Some(conn),
            Err(e) => {
                state.workspace = None;
                reopen_error = Some(format!("{e:?}"));
            }
        }
    }

    let import = match import {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": src.to_string_lossy() })),
            )
        }
    };
    if let Some(msg) = reopen_error {
        return err(&req.id, "db_open_failed", msg, None);
    }
    tracing::info!(
        workspace = %workspace_path.to_string_lossy(),
        bundle = %in_path,
        reopened = is_open,
        "workspace bundle imported"
    );

    ok(
        &req.id,
        json!({
            "ok": true,
            "workspacePath": workspace_path.to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
            "dbSha256": import.db_sha256,
            "reopened": is_open
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_backup_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_backup_import_workspace_bundle(state, req)),
        _ => None,
    }
}
