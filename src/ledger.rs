use crate::diff::ChangeLogEntry;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Terminal outcome an admin can give a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn status(self) -> RequestStatus {
        match self {
            Self::Approved => RequestStatus::Approved,
            Self::Rejected => RequestStatus::Rejected,
        }
    }
}

/// Set together on a terminal transition, absent while pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub reviewed_at: String,
    pub reviewed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub student_seat_no: String,
    pub student_name: String,
    pub changes: Vec<ChangeLogEntry>,
    pub status: RequestStatus,
    pub submitted_at: String,
    #[serde(flatten)]
    pub review: Option<Review>,
}

impl ChangeRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// What a submitter supplies; the ledger fills in id, status and timestamp.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangeRequest {
    pub teacher_id: String,
    pub teacher_name: String,
    pub student_seat_no: String,
    pub student_name: String,
    pub changes: Vec<ChangeLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFilter {
    All,
    Pending,
    ByTeacher(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("change request has no changes")]
    EmptyChangeSet,

    #[error("ledger storage error: {0}")]
    Backend(String),
}

/// Append-only collection of change requests.
///
/// `transition` overwrites status and review fields unconditionally, including on
/// requests that are already approved or rejected. Guarding terminal requests is a
/// workflow policy, see `workflow::WorkflowPolicy::allow_retransition`.
pub trait Ledger {
    fn append(&mut self, draft: NewChangeRequest) -> Result<ChangeRequest, LedgerError>;

    /// All requests in insertion order.
    fn list_all(&self) -> Result<Vec<ChangeRequest>, LedgerError>;

    fn find_by_id(&self, id: &str) -> Result<Option<ChangeRequest>, LedgerError>;

    fn transition(
        &mut self,
        id: &str,
        decision: Decision,
        reviewed_by: &str,
        admin_comment: Option<&str>,
    ) -> Result<Option<ChangeRequest>, LedgerError>;

    fn list_pending(&self) -> Result<Vec<ChangeRequest>, LedgerError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(ChangeRequest::is_pending)
            .collect())
    }

    fn list_by_teacher(&self, teacher_id: &str) -> Result<Vec<ChangeRequest>, LedgerError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|r| r.teacher_id == teacher_id)
            .collect())
    }

    fn list(&self, filter: &RequestFilter) -> Result<Vec<ChangeRequest>, LedgerError> {
        match filter {
            RequestFilter::All => self.list_all(),
            RequestFilter::Pending => self.list_pending(),
            RequestFilter::ByTeacher(id) => self.list_by_teacher(id),
        }
    }
}

/// `req_<epoch millis>_<9 base-36 chars>`; the suffix comes from a v4 uuid so ids
/// created within the same millisecond still differ.
pub fn new_request_id() -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(9);
    for _ in 0..9 {
        suffix.push(ALPHABET[(n % 36) as usize] as char);
        n /= 36;
    }
    format!("req_{}_{}", Utc::now().timestamp_millis(), suffix)
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the stored entity for a draft; shared by every ledger backend.
pub fn materialize(draft: NewChangeRequest) -> Result<ChangeRequest, LedgerError> {
    if draft.changes.is_empty() {
        return Err(LedgerError::EmptyChangeSet);
    }
    Ok(ChangeRequest {
        id: new_request_id(),
        teacher_id: draft.teacher_id,
        teacher_name: draft.teacher_name,
        student_seat_no: draft.student_seat_no,
        student_name: draft.student_name,
        changes: draft.changes,
        status: RequestStatus::Pending,
        submitted_at: now_timestamp(),
        review: None,
    })
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    requests: Vec<ChangeRequest>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn append(&mut self, draft: NewChangeRequest) -> Result<ChangeRequest, LedgerError> {
        let request = materialize(draft)?;
        self.requests.push(request.clone());
        Ok(request)
    }

    fn list_all(&self) -> Result<Vec<ChangeRequest>, LedgerError> {
        Ok(self.requests.clone())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<ChangeRequest>, LedgerError> {
        Ok(self.requests.iter().find(|r| r.id == id).cloned())
    }

    fn transition(
        &mut self,
        id: &str,
        decision: Decision,
        reviewed_by: &str,
        admin_comment: Option<&str>,
    ) -> Result<Option<ChangeRequest>, LedgerError> {
        let Some(request) = self.requests.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        request.status = decision.status();
        request.review = Some(Review {
            reviewed_at: now_timestamp(),
            reviewed_by: reviewed_by.to_string(),
            admin_comment: admin_comment.map(str::to_string),
        });
        Ok(Some(request.clone()))
    }
}
