use std::collections::{HashMap, HashSet};
use std::fmt;

/// Column headers the import batch must declare. Checked once against
/// the sheet's header row, never per row.
pub const KEY_COLUMN: &str = "student_id";
pub const NAME_COLUMN: &str = "full_name";

/// One candidate student from an import batch. Optional columns absent
/// from a row come through as empty strings, never as missing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub student_no: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub class_name: String,
    pub major: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// The batch's declared schema lacks a required column. The whole
    /// batch is rejected before any row is processed.
    MalformedBatch { missing: Vec<String> },
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::MalformedBatch { missing } => {
                write!(f, "batch is missing required columns: {}", missing.join(", "))
            }
        }
    }
}

impl std::error::Error for RosterError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Rows accepted for insertion, in input order.
    pub to_insert: Vec<CandidateRow>,
    pub inserted: usize,
    pub skipped: usize,
}

fn field(row: &HashMap<String, String>, column: &str) -> String {
    row.get(column).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Partitions an import batch into rows to insert and rows to skip.
///
/// A row is skipped when its key is already in `existing_keys` or when
/// the same key appeared earlier in this batch, so only the first
/// occurrence of a key survives. Rows with an empty key or name are
/// skipped as well. The reconciler never touches the store; the caller
/// commits `to_insert` in one transaction and hands every new student
/// the "active" status.
pub fn reconcile(
    headers: &[String],
    rows: &[HashMap<String, String>],
    existing_keys: &HashSet<String>,
) -> Result<Reconciliation, RosterError> {
    let missing: Vec<String> = [KEY_COLUMN, NAME_COLUMN]
        .into_iter()
        .filter(|required| !headers.iter().any(|h| h == required))
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RosterError::MalformedBatch { missing });
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut to_insert: Vec<CandidateRow> = Vec::new();

    for row in rows {
        let student_no = field(row, KEY_COLUMN);
        let full_name = field(row, NAME_COLUMN);
        if student_no.is_empty() || full_name.is_empty() {
            continue;
        }
        if existing_keys.contains(&student_no) || !seen.insert(student_no.clone()) {
            continue;
        }
        to_insert.push(CandidateRow {
            student_no,
            full_name,
            email: field(row, "email"),
            phone: field(row, "phone"),
            class_name: field(row, "class_name"),
            major: field(row, "major"),
        });
    }

    let inserted = to_insert.len();
    let skipped = rows.len() - inserted;
    Ok(Reconciliation {
        to_insert,
        inserted,
        skipped,
    })
}
