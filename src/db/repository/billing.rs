use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

// ═══════════════════════════════════════════
// Invoices
// ═══════════════════════════════════════════

/// One invoice per appointment; the amount may be zero but never negative.
pub fn insert_invoice(conn: &Connection, invoice: &Invoice) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO invoices (id, appointment_id, amount_cents, status, issued_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            invoice.id.to_string(),
            invoice.appointment_id.to_string(),
            invoice.amount_cents,
            invoice.status.as_str(),
            format_timestamp(&invoice.issued_at),
        ],
    )?;
    tracing::debug!(invoice_id = %invoice.id, amount_cents = invoice.amount_cents, "Inserted invoice");
    Ok(())
}

pub fn get_invoice(conn: &Connection, id: &Uuid) -> Result<Option<Invoice>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, appointment_id, amount_cents, status, issued_at FROM invoices WHERE id = ?1",
            params![id.to_string()],
            invoice_tuple,
        )
        .optional()?;
    row.map(invoice_from_tuple).transpose()
}

pub fn get_invoice_for_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Option<Invoice>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, appointment_id, amount_cents, status, issued_at
             FROM invoices WHERE appointment_id = ?1",
            params![appointment_id.to_string()],
            invoice_tuple,
        )
        .optional()?;
    row.map(invoice_from_tuple).transpose()
}

pub fn list_invoices(conn: &Connection, filter: &InvoiceFilter) -> Result<Vec<Invoice>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.appointment_id, i.amount_cents, i.status, i.issued_at
         FROM invoices i JOIN appointments a ON a.id = i.appointment_id
         WHERE (?1 IS NULL OR i.status = ?1)
           AND (?2 IS NULL OR a.patient_id = ?2)
         ORDER BY i.issued_at, i.id",
    )?;
    let rows = stmt.query_map(
        params![
            filter.status.map(|s| s.as_str()),
            filter.patient_id.map(|id| id.to_string()),
        ],
        invoice_tuple,
    )?;

    let mut invoices = Vec::new();
    for row in rows {
        invoices.push(invoice_from_tuple(row?)?);
    }
    Ok(invoices)
}

/// Write any status from the enumerated set. No transition rule is applied.
pub fn update_invoice_status(
    conn: &Connection,
    id: &Uuid,
    status: InvoiceStatus,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE invoices SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::not_found("invoice", id));
    }
    tracing::info!(invoice_id = %id, status = status.as_str(), "Invoice status updated");
    Ok(())
}

/// Delete an invoice and its payments.
pub fn delete_invoice(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM invoices WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("invoice", id));
    }
    Ok(())
}

type InvoiceTuple = (String, String, i64, String, String);

fn invoice_tuple(row: &rusqlite::Row<'_>) -> Result<InvoiceTuple, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn invoice_from_tuple(
    (id, appointment_id, amount_cents, status, issued_at): InvoiceTuple,
) -> Result<Invoice, DatabaseError> {
    Ok(Invoice {
        id: parse_uuid("invoices.id", &id)?,
        appointment_id: parse_uuid("invoices.appointment_id", &appointment_id)?,
        amount_cents,
        status: InvoiceStatus::from_str(&status)?,
        issued_at: parse_timestamp("invoices.issued_at", &issued_at)?,
    })
}

// ═══════════════════════════════════════════
// Payments
// ═══════════════════════════════════════════

/// Record a payment; the amount must be strictly positive.
pub fn insert_payment(conn: &Connection, payment: &Payment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO payments (id, invoice_id, amount_cents, method, paid_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            payment.id.to_string(),
            payment.invoice_id.to_string(),
            payment.amount_cents,
            payment.method.as_str(),
            format_timestamp(&payment.paid_at),
        ],
    )?;
    tracing::debug!(
        payment_id = %payment.id,
        invoice_id = %payment.invoice_id,
        amount_cents = payment.amount_cents,
        "Recorded payment"
    );
    Ok(())
}

pub fn get_payments_for_invoice(
    conn: &Connection,
    invoice_id: &Uuid,
) -> Result<Vec<Payment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, invoice_id, amount_cents, method, paid_at FROM payments
         WHERE invoice_id = ?1 ORDER BY paid_at, id",
    )?;
    let rows = stmt.query_map(params![invoice_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut payments = Vec::new();
    for row in rows {
        let (id, invoice_id, amount_cents, method, paid_at) = row?;
        payments.push(Payment {
            id: parse_uuid("payments.id", &id)?,
            invoice_id: parse_uuid("payments.invoice_id", &invoice_id)?,
            amount_cents,
            method: PaymentMethod::from_str(&method)?,
            paid_at: parse_timestamp("payments.paid_at", &paid_at)?,
        });
    }
    Ok(payments)
}

/// Sum of recorded payments for an invoice (0 when none).
pub fn total_paid_cents(conn: &Connection, invoice_id: &Uuid) -> Result<i64, DatabaseError> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE invoice_id = ?1",
        params![invoice_id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::delete_appointment;
    use crate::db::sqlite::open_memory_database;
    use crate::db::ConstraintKind;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn booked(conn: &Connection) -> (Patient, Appointment) {
        let patient = make_patient(conn, "ada@example.com", "+15550100");
        let doctor = make_doctor(conn, "lind@clinic.test");
        let appt = make_appointment(conn, &patient, &doctor);
        (patient, appt)
    }

    #[test]
    fn invoice_insert_and_lookup() {
        let conn = test_db();
        let (_, appt) = booked(&conn);
        let invoice = make_invoice(&conn, &appt, 8_500);

        assert_eq!(get_invoice(&conn, &invoice.id).unwrap(), Some(invoice.clone()));
        assert_eq!(get_invoice_for_appointment(&conn, &appt.id).unwrap(), Some(invoice));
    }

    #[test]
    fn negative_invoice_amount_rejected_zero_accepted() {
        let conn = test_db();
        let (_, appt) = booked(&conn);
        let mut invoice = Invoice {
            id: Uuid::new_v4(),
            appointment_id: appt.id,
            amount_cents: -1,
            status: InvoiceStatus::Pending,
            issued_at: ts("2024-03-01 10:00:00"),
        };
        let err = insert_invoice(&conn, &invoice).unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Check));

        invoice.amount_cents = 0;
        insert_invoice(&conn, &invoice).unwrap();
    }

    #[test]
    fn one_invoice_per_appointment() {
        let conn = test_db();
        let (_, appt) = booked(&conn);
        make_invoice(&conn, &appt, 1_000);
        let err = insert_invoice(&conn, &Invoice {
            id: Uuid::new_v4(),
            appointment_id: appt.id,
            amount_cents: 2_000,
            status: InvoiceStatus::Pending,
            issued_at: ts("2024-03-01 11:00:00"),
        })
        .unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
    }

    #[test]
    fn non_positive_payment_rejected() {
        let conn = test_db();
        let (_, appt) = booked(&conn);
        let invoice = make_invoice(&conn, &appt, 5_000);

        for amount in [0, -100] {
            let err = insert_payment(&conn, &payment_for(&invoice, amount)).unwrap_err();
            assert_eq!(err.constraint_kind(), Some(ConstraintKind::Check));
        }
        insert_payment(&conn, &payment_for(&invoice, 1)).unwrap();
        assert_eq!(total_paid_cents(&conn, &invoice.id).unwrap(), 1);
    }

    #[test]
    fn payments_total_and_listing() {
        let conn = test_db();
        let (_, appt) = booked(&conn);
        let invoice = make_invoice(&conn, &appt, 5_000);
        assert_eq!(total_paid_cents(&conn, &invoice.id).unwrap(), 0);

        let mut first = payment_for(&invoice, 2_000);
        first.paid_at = ts("2024-03-02 09:00:00");
        let mut second = payment_for(&invoice, 3_000);
        second.method = PaymentMethod::Insurance;
        second.paid_at = ts("2024-03-05 09:00:00");
        insert_payment(&conn, &second).unwrap();
        insert_payment(&conn, &first).unwrap();

        assert_eq!(get_payments_for_invoice(&conn, &invoice.id).unwrap(), vec![first, second]);
        assert_eq!(total_paid_cents(&conn, &invoice.id).unwrap(), 5_000);
    }

    #[test]
    fn deleting_invoice_cascades_payments() {
        let conn = test_db();
        let (_, appt) = booked(&conn);
        let invoice = make_invoice(&conn, &appt, 5_000);
        insert_payment(&conn, &payment_for(&invoice, 2_500)).unwrap();

        delete_invoice(&conn, &invoice.id).unwrap();
        assert!(get_payments_for_invoice(&conn, &invoice.id).unwrap().is_empty());
        assert!(get_invoice_for_appointment(&conn, &appt.id).unwrap().is_none());
    }

    #[test]
    fn deleting_appointment_cascades_invoice() {
        let conn = test_db();
        let (_, appt) = booked(&conn);
        let invoice = make_invoice(&conn, &appt, 5_000);

        delete_appointment(&conn, &appt.id).unwrap();
        assert!(get_invoice(&conn, &invoice.id).unwrap().is_none());
    }

    #[test]
    fn list_and_status_update() {
        let conn = test_db();
        let (patient, appt) = booked(&conn);
        let invoice = make_invoice(&conn, &appt, 5_000);

        update_invoice_status(&conn, &invoice.id, InvoiceStatus::Paid).unwrap();
        // Lifecycle is convention only: a settled invoice may be reopened.
        update_invoice_status(&conn, &invoice.id, InvoiceStatus::Pending).unwrap();
        update_invoice_status(&conn, &invoice.id, InvoiceStatus::Refunded).unwrap();

        let refunded = list_invoices(&conn, &InvoiceFilter {
            status: Some(InvoiceStatus::Refunded),
            patient_id: None,
        })
        .unwrap();
        assert_eq!(refunded.len(), 1);

        let pending = list_invoices(&conn, &InvoiceFilter {
            status: Some(InvoiceStatus::Pending),
            patient_id: None,
        })
        .unwrap();
        assert!(pending.is_empty());

        let for_patient = list_invoices(&conn, &InvoiceFilter {
            status: None,
            patient_id: Some(patient.id),
        })
        .unwrap();
        assert_eq!(for_patient.len(), 1);
        assert_eq!(for_patient[0].status, InvoiceStatus::Refunded);

        let missing = update_invoice_status(&conn, &Uuid::new_v4(), InvoiceStatus::Paid);
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }
}
