use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_optional_uuid, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, room_id, scheduled_start, \
     scheduled_end, status, reason, created_at";

/// Insert an appointment. The engine rejects an end time that is not after
/// the start, and unknown patient, doctor or room references.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, room_id, scheduled_start,
         scheduled_end, status, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.room_id.map(|id| id.to_string()),
            format_timestamp(&appt.scheduled_start),
            format_timestamp(&appt.scheduled_end),
            appt.status.as_str(),
            appt.reason,
            format_timestamp(&appt.created_at),
        ],
    )?;
    tracing::debug!(
        appointment_id = %appt.id,
        patient_id = %appt.patient_id,
        doctor_id = %appt.doctor_id,
        "Inserted appointment"
    );
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_row_from_rusqlite,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// Appointments matching every set field of the filter, earliest first.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE (?1 IS NULL OR patient_id = ?1)
           AND (?2 IS NULL OR doctor_id = ?2)
           AND (?3 IS NULL OR room_id = ?3)
           AND (?4 IS NULL OR status = ?4)
           AND (?5 IS NULL OR julianday(scheduled_start) >= julianday(?5))
           AND (?6 IS NULL OR julianday(scheduled_start) < julianday(?6))
         ORDER BY scheduled_start, id"
    ))?;

    let rows = stmt.query_map(
        params![
            filter.patient_id.map(|id| id.to_string()),
            filter.doctor_id.map(|id| id.to_string()),
            filter.room_id.map(|id| id.to_string()),
            filter.status.map(|s| s.as_str()),
            filter.starts_from.as_ref().map(format_timestamp),
            filter.starts_before.as_ref().map(format_timestamp),
        ],
        appointment_row_from_rusqlite,
    )?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

/// Write any status from the enumerated set. No transition rule is applied.
pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE appointments SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::not_found("appointment", id));
    }
    tracing::info!(appointment_id = %id, status = status.as_str(), "Appointment status updated");
    Ok(())
}

/// Set or clear the room of an appointment.
pub fn assign_room(
    conn: &Connection,
    appointment_id: &Uuid,
    room_id: Option<&Uuid>,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE appointments SET room_id = ?2 WHERE id = ?1",
        params![appointment_id.to_string(), room_id.map(|id| id.to_string())],
    )?;
    if affected == 0 {
        return Err(DatabaseError::not_found("appointment", appointment_id));
    }
    Ok(())
}

/// Delete an appointment together with its prescriptions, invoice and payments.
pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("appointment", id));
    }
    tracing::info!(appointment_id = %id, "Deleted appointment");
    Ok(())
}

struct AppointmentRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    room_id: Option<String>,
    scheduled_start: String,
    scheduled_end: String,
    status: String,
    reason: Option<String>,
    created_at: String,
}

fn appointment_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        room_id: row.get(3)?,
        scheduled_start: row.get(4)?,
        scheduled_end: row.get(5)?,
        status: row.get(6)?,
        reason: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid("appointments.id", &row.id)?,
        patient_id: parse_uuid("appointments.patient_id", &row.patient_id)?,
        doctor_id: parse_uuid("appointments.doctor_id", &row.doctor_id)?,
        room_id: parse_optional_uuid("appointments.room_id", row.room_id)?,
        scheduled_start: parse_timestamp("appointments.scheduled_start", &row.scheduled_start)?,
        scheduled_end: parse_timestamp("appointments.scheduled_end", &row.scheduled_end)?,
        status: AppointmentStatus::from_str(&row.status)?,
        reason: row.reason,
        created_at: parse_timestamp("appointments.created_at", &row.created_at)?,
    })
}
