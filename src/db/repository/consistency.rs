use rusqlite::Connection;
use serde::Serialize;

use crate::db::DatabaseError;

/// A single anomaly detected by the checker.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyIssue {
    pub category: String,
    pub severity: String,
    pub description: String,
    pub entity_id: Option<String>,
}

/// Result of a read-only pass over cross-table conventions the schema cannot express.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub issues: Vec<ConsistencyIssue>,
    pub appointments_checked: i64,
    pub invoices_checked: i64,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run a full consistency check across the database.
///
/// Detects:
/// - Doctor rows whose staff member does not carry the doctor role
/// - Invoices marked paid whose payments fall short of the amount
/// - Pending invoices whose payments already cover the amount
/// - Payments recorded against cancelled invoices
/// - Open appointments (scheduled / checked in) with an inactive doctor
///
/// Nothing is repaired: status lifecycles are conventions, not rules.
pub fn check_consistency(conn: &Connection) -> Result<ConsistencyReport, DatabaseError> {
    let mut issues = Vec::new();

    // 1. Doctor extension on a non-doctor staff member
    collect(
        conn,
        "SELECT d.staff_id, s.role FROM doctors d JOIN staff s ON s.id = d.staff_id
         WHERE s.role <> 'doctor'",
        |id, detail| ConsistencyIssue {
            category: "doctor_role_mismatch".into(),
            severity: "medium".into(),
            description: format!("Doctor record attached to staff with role '{detail}'"),
            entity_id: Some(id),
        },
        &mut issues,
    )?;

    // 2. Paid but under-covered
    collect(
        conn,
        "SELECT i.id, CAST(i.amount_cents - COALESCE(SUM(p.amount_cents), 0) AS TEXT)
         FROM invoices i LEFT JOIN payments p ON p.invoice_id = i.id
         WHERE i.status = 'paid'
         GROUP BY i.id
         HAVING COALESCE(SUM(p.amount_cents), 0) < i.amount_cents",
        |id, detail| ConsistencyIssue {
            category: "paid_invoice_underpaid".into(),
            severity: "high".into(),
            description: format!("Invoice marked paid with {detail} cents outstanding"),
            entity_id: Some(id),
        },
        &mut issues,
    )?;

    // 3. Pending but already covered
    collect(
        conn,
        "SELECT i.id, CAST(SUM(p.amount_cents) AS TEXT)
         FROM invoices i JOIN payments p ON p.invoice_id = i.id
         WHERE i.status = 'pending'
         GROUP BY i.id
         HAVING SUM(p.amount_cents) >= i.amount_cents",
        |id, detail| ConsistencyIssue {
            category: "pending_invoice_settled".into(),
            severity: "low".into(),
            description: format!("Pending invoice already covered by {detail} cents of payments"),
            entity_id: Some(id),
        },
        &mut issues,
    )?;

    // 4. Money taken on a cancelled invoice
    collect(
        conn,
        "SELECT i.id, CAST(COUNT(p.id) AS TEXT)
         FROM invoices i JOIN payments p ON p.invoice_id = i.id
         WHERE i.status = 'cancelled'
         GROUP BY i.id",
        |id, detail| ConsistencyIssue {
            category: "payment_on_cancelled_invoice".into(),
            severity: "high".into(),
            description: format!("Cancelled invoice has {detail} payment(s) recorded"),
            entity_id: Some(id),
        },
        &mut issues,
    )?;

    // 5. Open appointments with an inactive doctor
    collect(
        conn,
        "SELECT a.id, a.status FROM appointments a JOIN staff s ON s.id = a.doctor_id
         WHERE a.status IN ('scheduled', 'checked_in') AND s.is_active = 0",
        |id, detail| ConsistencyIssue {
            category: "inactive_doctor_booked".into(),
            severity: "medium".into(),
            description: format!("Appointment '{detail}' with an inactive doctor"),
            entity_id: Some(id),
        },
        &mut issues,
    )?;

    let appointments_checked: i64 =
        conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    let invoices_checked: i64 =
        conn.query_row("SELECT COUNT(*) FROM invoices", [], |row| row.get(0))?;

    if !issues.is_empty() {
        tracing::warn!(count = issues.len(), "Consistency check found issues");
    }

    Ok(ConsistencyReport {
        issues,
        appointments_checked,
        invoices_checked,
    })
}

/// Run a two-column (id, detail) query and turn each row into an issue.
fn collect(
    conn: &Connection,
    sql: &str,
    to_issue: impl Fn(String, String) -> ConsistencyIssue,
    issues: &mut Vec<ConsistencyIssue>,
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (id, detail) = row?;
        issues.push(to_issue(id, detail));
    }
    Ok(())
}
