use crate::record::{Record, Scalar};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentType {
    /// Result ledger extract, for regular passes.
    #[serde(rename = "RLE")]
    Rle,
    /// Re-verification / improvement statement, for ATKT and fail cases.
    #[serde(rename = "RPV")]
    Rpv,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentBlock {
    pub name: Option<String>,
    pub seat_no: Option<String>,
    pub college_no: Option<String>,
    pub gender: Option<&'static str>,
    pub result: Option<String>,
    pub res: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRow {
    pub paper: u8,
    pub code: Option<String>,
    pub theory: Option<Scalar>,
    pub theory_remark: Option<String>,
    pub internal: Option<Scalar>,
    pub internal_remark: Option<String>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterRow {
    pub semester: u8,
    pub sgp: Scalar,
    pub credits: Option<Scalar>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptModel {
    pub document_type: DocumentType,
    pub student: StudentBlock,
    pub papers: Vec<PaperRow>,
    pub semesters: Vec<SemesterRow>,
    pub cgpa: Option<Scalar>,
    pub gcgpa: Option<Scalar>,
}

pub fn document_type(record: &Record) -> DocumentType {
    let result = record.text("RSLT").unwrap_or_default().to_uppercase();
    let res = record.text("RES").unwrap_or_default().to_uppercase();
    if result.contains("PASS") || res.contains("PASS") {
        DocumentType::Rle
    } else if result.contains("ATKT") || result.contains("FAIL") || res.contains("ATKT") {
        DocumentType::Rpv
    } else if result.is_empty() {
        DocumentType::Rpv
    } else {
        DocumentType::Rle
    }
}

fn gender(record: &Record) -> Option<&'static str> {
    match record.number("SEX") {
        Some(v) if v == 1.0 => Some("Male"),
        Some(v) if v == 2.0 => Some("Female"),
        _ => None,
    }
}

fn paper_row(record: &Record, paper: u8) -> Option<PaperRow> {
    let code = record.text(&format!("P{paper}_CD"));
    let theory = record.value(&format!("P{paper}_T")).cloned();
    let internal = record.value(&format!("P{paper}_I")).cloned();
    if code.is_none() && theory.is_none() && internal.is_none() {
        return None;
    }
    let t = theory.as_ref().and_then(Scalar::as_f64);
    let i = internal.as_ref().and_then(Scalar::as_f64);
    let total = match (t, i) {
        (None, None) => None,
        (t, i) => Some(t.unwrap_or(0.0) + i.unwrap_or(0.0)),
    };
    Some(PaperRow {
        paper,
        code,
        theory,
        theory_remark: record.text(&format!("P{paper}_T_RM")),
        internal,
        internal_remark: record.text(&format!("P{paper}_I_RM")),
        total,
    })
}

/// Print model for a finalized record. Pure: reads the row, decides nothing.
pub fn transcript_model(record: &Record) -> TranscriptModel {
    let papers = (1..=6).filter_map(|p| paper_row(record, p)).collect();
    let semesters = (1..=6)
        .filter_map(|sem| {
            let sgp = record.value(&format!("SGP{sem}"))?.clone();
            Some(SemesterRow {
                semester: sem,
                sgp,
                credits: record.value(&format!("C{sem}")).cloned(),
            })
        })
        .collect();

    TranscriptModel {
        document_type: document_type(record),
        student: StudentBlock {
            name: record.student_name(),
            seat_no: record.seat_no(),
            college_no: record.text("COLL_NO"),
            gender: gender(record),
            result: record.text("RSLT"),
            res: record.text("RES"),
            remark: record.text("FREM"),
        },
        papers,
        semesters,
        cgpa: record.value("CGPA").cloned(),
        gcgpa: record.value("GCGPA").cloned(),
    }
}
