//! Change-request lifecycle: admin direct edits, teacher proposals, and admin review.

use crate::diff::{apply_changes, compute_changes, ChangeLogEntry};
use crate::ledger::{
    ChangeRequest, Decision, Ledger, LedgerError, NewChangeRequest, RequestFilter, RequestStatus,
};
use crate::record::{Record, EDITABLE_FIELDS, IDENTITY_FIELDS};
use crate::store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// Resolving an already approved/rejected request overwrites it when true.
    pub allow_retransition: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            allow_retransition: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("student record not found: {0}")]
    RecordNotFound(String),

    #[error("change request not found: {0}")]
    RequestNotFound(String),

    #[error("No changes detected")]
    EmptyChangeSet,

    #[error("failed to read student record: {0}")]
    StoreReadFailed(String),

    #[error("failed to save changes: {0}")]
    StoreWriteFailed(String),

    #[error("invalid status: {0} (expected approved or rejected)")]
    InvalidStatus(String),

    #[error("change request {id} is already {status}")]
    AlreadyResolved { id: String, status: &'static str },

    #[error("change request ledger error: {0}")]
    LedgerFailed(String),

    #[error("field is not editable: {0}")]
    FieldNotEditable(String),
}

impl WorkflowError {
    /// Stable IPC error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RecordNotFound(_) | Self::RequestNotFound(_) => "not_found",
            Self::EmptyChangeSet => "empty_change_set",
            Self::StoreReadFailed(_) => "store_read_failed",
            Self::StoreWriteFailed(_) => "store_write_failed",
            Self::InvalidStatus(_) => "invalid_status",
            Self::AlreadyResolved { .. } => "already_resolved",
            Self::LedgerFailed(_) => "ledger_failed",
            Self::FieldNotEditable(_) => "field_not_editable",
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::EmptyChangeSet => Self::EmptyChangeSet,
            LedgerError::Backend(msg) => Self::LedgerFailed(msg),
        }
    }
}

/// First identity column whose value differs between the two rows.
fn changed_identity_field(original: &Record, edited: &Record) -> Option<&'static str> {
    IDENTITY_FIELDS.into_iter().find(|field| {
        match (original.value(field), edited.value(field)) {
            (None, None) => false,
            (Some(a), Some(b)) => !a.same_value(b),
            _ => true,
        }
    })
}

fn write_err(e: StoreError) -> WorkflowError {
    match e {
        StoreError::NotFound(key) => WorkflowError::RecordNotFound(key),
        StoreError::Backend(msg) => WorkflowError::StoreWriteFailed(msg),
    }
}

fn read_err(e: StoreError) -> WorkflowError {
    match e {
        StoreError::NotFound(key) => WorkflowError::RecordNotFound(key),
        StoreError::Backend(msg) => WorkflowError::StoreReadFailed(msg),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_request_id: Option<String>,
    pub diff: Vec<ChangeLogEntry>,
    /// New original snapshot after a direct apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,
    /// Teachers do not see the applied state; their record view is cleared after submitting.
    pub clear_view: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutcome {
    pub request: ChangeRequest,
    /// Final stored row after an approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,
    pub refresh_requests: bool,
}

pub struct Orchestrator<'a, S: RecordStore, L: Ledger> {
    store: &'a mut S,
    ledger: &'a mut L,
    policy: WorkflowPolicy,
}

impl<'a, S: RecordStore, L: Ledger> Orchestrator<'a, S, L> {
    pub fn new(store: &'a mut S, ledger: &'a mut L, policy: WorkflowPolicy) -> Self {
        Self {
            store,
            ledger,
            policy,
        }
    }

    /// Diff shown to an admin for confirmation before a direct apply.
    pub fn preview_edit(
        &self,
        original: &Record,
        edited: &Record,
    ) -> Result<Vec<ChangeLogEntry>, WorkflowError> {
        let diff = compute_changes(original, edited, &EDITABLE_FIELDS);
        if diff.is_empty() {
            return Err(WorkflowError::EmptyChangeSet);
        }
        Ok(diff)
    }

    pub fn submit_edit(
        &mut self,
        actor: &Actor,
        original: &Record,
        edited: &Record,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let diff = self.preview_edit(original, edited)?;
        let key = original
            .seat_no()
            .ok_or_else(|| WorkflowError::RecordNotFound("record has no SEAT_NO".to_string()))?;

        match actor.role {
            Role::Admin => {
                // The whole row is saved, so identity columns must come through unchanged.
                if let Some(field) = changed_identity_field(original, edited) {
                    tracing::warn!(seat_no = %key, actor = %actor.id, field, "direct apply rejected");
                    return Err(WorkflowError::FieldNotEditable(field.to_string()));
                }
                // Whole edited row, no re-fetch: concurrent edits to other fields are lost.
                if let Err(e) = self.store.save_record(&key, edited) {
                    tracing::warn!(seat_no = %key, actor = %actor.id, error = %e, "direct apply failed");
                    return Err(write_err(e));
                }
                tracing::info!(seat_no = %key, actor = %actor.id, changes = diff.len(), "direct apply saved");
                Ok(SubmitOutcome {
                    applied: true,
                    pending_request_id: None,
                    diff,
                    record: Some(edited.clone()),
                    clear_view: false,
                })
            }
            Role::Teacher => {
                let request = self.ledger.append(NewChangeRequest {
                    teacher_id: actor.id.clone(),
                    teacher_name: actor.name.clone(),
                    student_seat_no: key.clone(),
                    student_name: original.student_name().unwrap_or_default(),
                    changes: diff.clone(),
                })?;
                tracing::info!(
                    request_id = %request.id,
                    seat_no = %key,
                    teacher = %actor.id,
                    changes = diff.len(),
                    "change request submitted"
                );
                Ok(SubmitOutcome {
                    applied: false,
                    pending_request_id: Some(request.id),
                    diff,
                    record: None,
                    clear_view: true,
                })
            }
        }
    }

    /// Queues a change set built outside the diff engine. Only editable fields are accepted.
    pub fn create_request(
        &mut self,
        actor: &Actor,
        student_seat_no: &str,
        student_name: &str,
        changes: Vec<ChangeLogEntry>,
    ) -> Result<ChangeRequest, WorkflowError> {
        if let Some(bad) = changes
            .iter()
            .find(|c| !EDITABLE_FIELDS.contains(&c.field.as_str()))
        {
            return Err(WorkflowError::FieldNotEditable(bad.field.clone()));
        }
        let request = self.ledger.append(NewChangeRequest {
            teacher_id: actor.id.clone(),
            teacher_name: actor.name.clone(),
            student_seat_no: student_seat_no.to_string(),
            student_name: student_name.to_string(),
            changes,
        })?;
        tracing::info!(request_id = %request.id, teacher = %actor.id, "change request created");
        Ok(request)
    }

    pub fn get_request(&self, id: &str) -> Result<ChangeRequest, WorkflowError> {
        self.ledger
            .find_by_id(id)?
            .ok_or_else(|| WorkflowError::RequestNotFound(id.to_string()))
    }

    pub fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<ChangeRequest>, WorkflowError> {
        Ok(self.ledger.list(filter)?)
    }

    /// Parses the wire decision first so an unknown status fails before anything is touched.
    pub fn resolve_request_str(
        &mut self,
        id: &str,
        status: &str,
        reviewed_by: &str,
        admin_comment: Option<&str>,
    ) -> Result<ResolveOutcome, WorkflowError> {
        let Some(decision) = Decision::parse(status) else {
            return Err(WorkflowError::InvalidStatus(status.to_string()));
        };
        self.resolve_request(id, decision, reviewed_by, admin_comment)
    }

    /// Approval marks the request first and applies it second. If the fetch or save
    /// fails the request stays approved without the record change.
    pub fn resolve_request(
        &mut self,
        id: &str,
        decision: Decision,
        reviewed_by: &str,
        admin_comment: Option<&str>,
    ) -> Result<ResolveOutcome, WorkflowError> {
        if !self.policy.allow_retransition {
            let current = self
                .ledger
                .find_by_id(id)?
                .ok_or_else(|| WorkflowError::RequestNotFound(id.to_string()))?;
            if current.status != RequestStatus::Pending {
                return Err(WorkflowError::AlreadyResolved {
                    id: id.to_string(),
                    status: current.status.as_str(),
                });
            }
        }

        let request = self
            .ledger
            .transition(id, decision, reviewed_by, admin_comment)?
            .ok_or_else(|| WorkflowError::RequestNotFound(id.to_string()))?;

        match decision {
            Decision::Rejected => {
                tracing::info!(request_id = %id, reviewer = %reviewed_by, "change request rejected");
                Ok(ResolveOutcome {
                    request,
                    record: None,
                    refresh_requests: true,
                })
            }
            Decision::Approved => {
                let record = self.apply_request(&request).inspect_err(|e| {
                    tracing::warn!(
                        request_id = %id,
                        seat_no = %request.student_seat_no,
                        error = %e,
                        "request approved but record not updated"
                    );
                })?;
                tracing::info!(
                    request_id = %id,
                    seat_no = %request.student_seat_no,
                    reviewer = %reviewed_by,
                    "change request approved and applied"
                );
                Ok(ResolveOutcome {
                    request,
                    record: Some(record),
                    refresh_requests: true,
                })
            }
        }
    }

    /// Applies onto the row as it is now, not as it was at submission, so unrelated
    /// fields edited in between survive.
    fn apply_request(&mut self, request: &ChangeRequest) -> Result<Record, WorkflowError> {
        let key = &request.student_seat_no;
        let mut current = self
            .store
            .fetch_record(key)
            .map_err(read_err)?
            .ok_or_else(|| WorkflowError::RecordNotFound(key.clone()))?;
        apply_changes(&mut current, &request.changes);
        self.store.save_record(key, &current).map_err(write_err)?;
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::record::Scalar;
    use crate::store::MemoryRecordStore;
    use serde_json::json;

    fn record(v: serde_json::Value) -> Record {
        serde_json::from_value(v).expect("record")
    }

    fn admin() -> Actor {
        Actor {
            id: "admin1".into(),
            name: "Dr. Rajesh Kumar".into(),
            role: Role::Admin,
        }
    }

    fn teacher() -> Actor {
        Actor {
            id: "teacher1".into(),
            name: "Prof. Amit Desai".into(),
            role: Role::Teacher,
        }
    }

    /// Store whose reads or writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryRecordStore,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl RecordStore for FlakyStore {
        fn fetch_record(&self, key: &str) -> Result<Option<Record>, StoreError> {
            if self.fail_reads {
                return Err(StoreError::Backend("disk unavailable".into()));
            }
            self.inner.fetch_record(key)
        }

        fn save_record(&mut self, key: &str, record: &Record) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Backend("read-only file".into()));
            }
            self.inner.save_record(key, record)
        }
    }

    #[test]
    fn teacher_proposal_queues_request_without_touching_store() {
        let original = record(json!({ "SEAT_NO": 1001, "NAME": "ASHA RAO", "P1_T": 40 }));
        let edited = record(json!({ "SEAT_NO": 1001, "NAME": "ASHA RAO", "P1_T": 45 }));
        let mut store = MemoryRecordStore::new();
        store.insert("1001", original.clone());
        let mut ledger = MemoryLedger::new();

        let outcome = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .submit_edit(&teacher(), &original, &edited)
            .expect("submit");

        assert!(!outcome.applied);
        assert!(outcome.clear_view);
        let id = outcome.pending_request_id.expect("request id");
        let all = ledger.list_all().expect("list");
        assert_eq!(all.len(), 1);
        let req = &all[0];
        assert_eq!(req.id, id);
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.teacher_id, "teacher1");
        assert_eq!(req.teacher_name, "Prof. Amit Desai");
        assert_eq!(req.student_seat_no, "1001");
        assert_eq!(req.student_name, "ASHA RAO");
        assert_eq!(
            req.changes,
            vec![ChangeLogEntry {
                field: "P1_T".into(),
                old_value: Some(Scalar::from(40)),
                new_value: Some(Scalar::from(45)),
            }]
        );
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.fetch_record("1001").expect("fetch"), Some(original));
    }

    #[test]
    fn admin_direct_apply_saves_whole_edited_record() {
        let original = record(json!({ "SEAT_NO": 1001, "NAME": "ASHA RAO", "CGPA": 7.2 }));
        let edited = record(json!({ "SEAT_NO": 1001, "NAME": "ASHA RAO", "CGPA": 7.8 }));
        let mut store = MemoryRecordStore::new();
        store.insert("1001", original.clone());
        let mut ledger = MemoryLedger::new();

        let outcome = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .submit_edit(&admin(), &original, &edited)
            .expect("submit");

        assert!(outcome.applied);
        assert!(outcome.pending_request_id.is_none());
        assert_eq!(outcome.record.as_ref(), Some(&edited));
        assert_eq!(store.save_count(), 1);
        let stored = store.fetch_record("1001").expect("fetch").expect("row");
        assert_eq!(stored.number("CGPA"), Some(7.8));
        assert!(ledger.list_all().expect("list").is_empty());
    }

    #[test]
    fn direct_apply_overwrites_concurrent_edits_to_other_fields() {
        let original = record(json!({ "SEAT_NO": 5, "P1_T": 40, "P3_T": 20 }));
        let edited = record(json!({ "SEAT_NO": 5, "P1_T": 41, "P3_T": 20 }));
        let mut store = MemoryRecordStore::new();
        // Someone else changed P3_T after our snapshot was taken.
        store.insert("5", record(json!({ "SEAT_NO": 5, "P1_T": 40, "P3_T": 50 })));
        let mut ledger = MemoryLedger::new();

        Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .submit_edit(&admin(), &original, &edited)
            .expect("submit");

        let stored = store.fetch_record("5").expect("fetch").expect("row");
        assert_eq!(stored.number("P3_T"), Some(20.0));
    }

    #[test]
    fn approval_applies_against_latest_record() {
        let at_submit = record(json!({ "SEAT_NO": 7, "P2_T": 30 }));
        let mut store = MemoryRecordStore::new();
        store.insert("7", at_submit.clone());
        let mut ledger = MemoryLedger::new();

        let id = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .submit_edit(&teacher(), &at_submit, &record(json!({ "SEAT_NO": 7, "P2_T": 35 })))
            .expect("submit")
            .pending_request_id
            .expect("id");

        // Unrelated admin edit lands before the review.
        store.insert("7", record(json!({ "SEAT_NO": 7, "P2_T": 30, "P3_T": 50 })));

        let outcome = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .resolve_request(&id, Decision::Approved, "Dr. Rajesh Kumar", Some("verified"))
            .expect("approve");

        assert!(outcome.refresh_requests);
        assert_eq!(outcome.request.status, RequestStatus::Approved);
        let stored = store.fetch_record("7").expect("fetch").expect("row");
        assert_eq!(stored, record(json!({ "SEAT_NO": 7, "P2_T": 35, "P3_T": 50 })));

        let found = ledger.find_by_id(&id).expect("find").expect("request");
        let review = found.review.expect("review");
        assert_eq!(review.reviewed_by, "Dr. Rajesh Kumar");
        assert_eq!(review.admin_comment.as_deref(), Some("verified"));
    }

    #[test]
    fn empty_diff_is_rejected_without_ledger_entry() {
        let r = record(json!({ "SEAT_NO": 1, "P1_T": 40 }));
        let mut store = MemoryRecordStore::new();
        store.insert("1", r.clone());
        let mut ledger = MemoryLedger::new();
        let mut orch = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());

        assert!(matches!(
            orch.submit_edit(&teacher(), &r, &r),
            Err(WorkflowError::EmptyChangeSet)
        ));
        assert!(matches!(
            orch.submit_edit(&admin(), &r, &r),
            Err(WorkflowError::EmptyChangeSet)
        ));
        assert!(ledger.list_all().expect("list").is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn rejection_leaves_store_untouched() {
        let original = record(json!({ "SEAT_NO": 9, "C1": 20 }));
        let mut store = MemoryRecordStore::new();
        store.insert("9", original.clone());
        let mut ledger = MemoryLedger::new();
        let mut orch = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());

        let id = orch
            .submit_edit(&teacher(), &original, &record(json!({ "SEAT_NO": 9, "C1": 22 })))
            .expect("submit")
            .pending_request_id
            .expect("id");
        let outcome = orch
            .resolve_request_str(&id, "rejected", "Dr. Priya Sharma", None)
            .expect("reject");

        assert_eq!(outcome.request.status, RequestStatus::Rejected);
        assert!(outcome.record.is_none());
        assert_eq!(store.fetch_record("9").expect("fetch"), Some(original));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn resolving_unknown_request_is_not_found() {
        let mut store = MemoryRecordStore::new();
        let mut ledger = MemoryLedger::new();
        let mut orch = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());
        let res = orch.resolve_request("req_1_nothere", Decision::Approved, "x", None);
        assert!(matches!(res, Err(WorkflowError::RequestNotFound(_))));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn unknown_decision_is_invalid_status() {
        let mut store = MemoryRecordStore::new();
        let mut ledger = MemoryLedger::new();
        let mut orch = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());
        let res = orch.resolve_request_str("req_1_x", "pending", "x", None);
        assert!(matches!(res, Err(WorkflowError::InvalidStatus(s)) if s == "pending"));
    }

    #[test]
    fn direct_apply_store_failure_is_reported_and_record_unchanged() {
        let original = record(json!({ "SEAT_NO": 3, "CGPA": 6.0 }));
        let mut store = FlakyStore::default();
        store.inner.insert("3", original.clone());
        store.fail_writes = true;
        let mut ledger = MemoryLedger::new();

        let res = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default()).submit_edit(
            &admin(),
            &original,
            &record(json!({ "SEAT_NO": 3, "CGPA": 6.5 })),
        );
        assert!(matches!(res, Err(WorkflowError::StoreWriteFailed(_))));
        assert_eq!(store.inner.fetch_record("3").expect("fetch"), Some(original));
    }

    #[test]
    fn failed_apply_after_approval_leaves_request_approved() {
        let original = record(json!({ "SEAT_NO": 4, "P4_I": 10 }));
        let mut store = FlakyStore::default();
        store.inner.insert("4", original.clone());
        let mut ledger = MemoryLedger::new();

        let id = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .submit_edit(&teacher(), &original, &record(json!({ "SEAT_NO": 4, "P4_I": 12 })))
            .expect("submit")
            .pending_request_id
            .expect("id");

        store.fail_writes = true;
        let res = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .resolve_request(&id, Decision::Approved, "Dr. Admin", None);
        assert!(matches!(res, Err(WorkflowError::StoreWriteFailed(_))));

        let req = ledger.find_by_id(&id).expect("find").expect("request");
        assert_eq!(req.status, RequestStatus::Approved);
        assert_eq!(store.inner.fetch_record("4").expect("fetch"), Some(original));

        store.fail_writes = false;
        store.fail_reads = true;
        let res = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .resolve_request(&id, Decision::Approved, "Dr. Admin", None);
        assert!(matches!(res, Err(WorkflowError::StoreReadFailed(_))));
    }

    #[test]
    fn approval_of_vanished_record_is_not_found_but_request_is_approved() {
        let mut store = MemoryRecordStore::new();
        let mut ledger = MemoryLedger::new();
        let req = ledger
            .append(NewChangeRequest {
                teacher_id: "teacher1".into(),
                teacher_name: "Prof. Amit Desai".into(),
                student_seat_no: "404".into(),
                student_name: "GHOST".into(),
                changes: vec![ChangeLogEntry {
                    field: "C2".into(),
                    old_value: None,
                    new_value: Some(Scalar::from(4)),
                }],
            })
            .expect("append");
        let res = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default())
            .resolve_request(&req.id, Decision::Approved, "Dr. Admin", None);
        assert!(matches!(res, Err(WorkflowError::RecordNotFound(k)) if k == "404"));
        let stored = ledger.find_by_id(&req.id).expect("find").expect("request");
        assert_eq!(stored.status, RequestStatus::Approved);
    }

    #[test]
    fn retransition_allowed_by_default() {
        let original = record(json!({ "SEAT_NO": 2, "SGP1": 7.0 }));
        let mut store = MemoryRecordStore::new();
        store.insert("2", original.clone());
        let mut ledger = MemoryLedger::new();
        let mut orch = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());
        let id = orch
            .submit_edit(&teacher(), &original, &record(json!({ "SEAT_NO": 2, "SGP1": 7.5 })))
            .expect("submit")
            .pending_request_id
            .expect("id");
        orch.resolve_request(&id, Decision::Rejected, "A", None)
            .expect("reject");
        let again = orch
            .resolve_request(&id, Decision::Approved, "B", None)
            .expect("approve after reject");
        assert_eq!(again.request.status, RequestStatus::Approved);
        assert_eq!(
            again.record.and_then(|r| r.number("SGP1")),
            Some(7.5)
        );
    }

    #[test]
    fn retransition_blocked_when_policy_disallows() {
        let original = record(json!({ "SEAT_NO": 2, "SGP1": 7.0 }));
        let mut store = MemoryRecordStore::new();
        store.insert("2", original.clone());
        let mut ledger = MemoryLedger::new();
        let policy = WorkflowPolicy {
            allow_retransition: false,
        };
        let mut orch = Orchestrator::new(&mut store, &mut ledger, policy);
        let id = orch
            .submit_edit(&teacher(), &original, &record(json!({ "SEAT_NO": 2, "SGP1": 7.5 })))
            .expect("submit")
            .pending_request_id
            .expect("id");
        orch.resolve_request(&id, Decision::Rejected, "A", Some("no"))
            .expect("reject");
        let res = orch.resolve_request(&id, Decision::Approved, "B", None);
        assert!(matches!(
            res,
            Err(WorkflowError::AlreadyResolved { status: "rejected", .. })
        ));
        let req = ledger.find_by_id(&id).expect("find").expect("request");
        assert_eq!(req.status, RequestStatus::Rejected);
        assert_eq!(req.review.expect("review").reviewed_by, "A");
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn direct_apply_rejects_identity_changes() {
        let original = record(json!({ "SEAT_NO": 1001, "NAME": "ASHA RAO", "P1_T": 40 }));
        let mut store = MemoryRecordStore::new();
        store.insert("1001", original.clone());
        store.insert(
            "1002",
            record(json!({ "SEAT_NO": 1002, "NAME": "VIKRAM SHAH", "P1_T": 22 })),
        );
        let mut ledger = MemoryLedger::new();
        let mut orch = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());

        let moved = record(json!({ "SEAT_NO": 1002, "NAME": "X", "P1_T": 41 }));
        let res = orch.submit_edit(&admin(), &original, &moved);
        assert!(matches!(res, Err(WorkflowError::FieldNotEditable(f)) if f == "NAME"));

        let reseated = record(json!({ "SEAT_NO": 1002, "NAME": "ASHA RAO", "P1_T": 41 }));
        let res = orch.submit_edit(&admin(), &original, &reseated);
        assert!(matches!(res, Err(WorkflowError::FieldNotEditable(f)) if f == "SEAT_NO"));

        let gender = record(json!({ "SEAT_NO": 1001, "NAME": "ASHA RAO", "SEX": 1, "P1_T": 41 }));
        let res = orch.submit_edit(&admin(), &original, &gender);
        assert!(matches!(res, Err(WorkflowError::FieldNotEditable(f)) if f == "SEX"));

        // Same seat written as a float is not a change.
        let same = record(json!({ "SEAT_NO": 1001.0, "NAME": "ASHA RAO", "P1_T": 41 }));
        orch.submit_edit(&admin(), &original, &same).expect("apply");

        assert_eq!(store.save_count(), 1);
        assert_eq!(
            store.fetch_record("1002").expect("fetch").and_then(|r| r.number("P1_T")),
            Some(22.0)
        );
        let asha = store.fetch_record("1001").expect("fetch").expect("row");
        assert_eq!(asha.student_name().as_deref(), Some("ASHA RAO"));
        assert_eq!(asha.number("P1_T"), Some(41.0));
    }

    #[test]
    fn created_requests_only_touch_editable_fields() {
        let mut store = MemoryRecordStore::new();
        let mut ledger = MemoryLedger::new();
        let mut orch = Orchestrator::new(&mut store, &mut ledger, WorkflowPolicy::default());

        let name_change = vec![ChangeLogEntry {
            field: "NAME".into(),
            old_value: Some(Scalar::from("ASHA RAO")),
            new_value: Some(Scalar::from("A. RAO")),
        }];
        let res = orch.create_request(&teacher(), "1001", "ASHA RAO", name_change);
        assert!(matches!(res, Err(WorkflowError::FieldNotEditable(f)) if f == "NAME"));

        let res = orch.create_request(&teacher(), "1001", "ASHA RAO", Vec::new());
        assert!(matches!(res, Err(WorkflowError::EmptyChangeSet)));

        let created = orch
            .create_request(
                &teacher(),
                "1001",
                "ASHA RAO",
                vec![ChangeLogEntry {
                    field: "C1".into(),
                    old_value: None,
                    new_value: Some(Scalar::from(20)),
                }],
            )
            .expect("create");
        assert!(created.is_pending());
        assert_eq!(orch.get_request(&created.id).expect("get"), created);
        assert!(matches!(
            orch.get_request("req_missing"),
            Err(WorkflowError::RequestNotFound(_))
        ));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(WorkflowError::EmptyChangeSet.code(), "empty_change_set");
        assert_eq!(WorkflowError::EmptyChangeSet.to_string(), "No changes detected");
        assert_eq!(WorkflowError::RequestNotFound("x".into()).code(), "not_found");
        assert_eq!(WorkflowError::RecordNotFound("x".into()).code(), "not_found");
        assert_eq!(WorkflowError::InvalidStatus("x".into()).code(), "invalid_status");
        assert_eq!(WorkflowError::FieldNotEditable("NAME".into()).code(), "field_not_editable");
    }
}
