use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

// ═══════════════════════════════════════════
// Prescriptions
// ═══════════════════════════════════════════

pub fn insert_prescription(conn: &Connection, rx: &Prescription) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, appointment_id, issued_at, notes) VALUES (?1, ?2, ?3, ?4)",
        params![
            rx.id.to_string(),
            rx.appointment_id.to_string(),
            format_timestamp(&rx.issued_at),
            rx.notes,
        ],
    )?;
    Ok(())
}

pub fn get_prescriptions_for_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, appointment_id, issued_at, notes FROM prescriptions
         WHERE appointment_id = ?1 ORDER BY issued_at, id",
    )?;
    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut prescriptions = Vec::new();
    for row in rows {
        let (id, appointment_id, issued_at, notes) = row?;
        prescriptions.push(Prescription {
            id: parse_uuid("prescriptions.id", &id)?,
            appointment_id: parse_uuid("prescriptions.appointment_id", &appointment_id)?,
            issued_at: parse_timestamp("prescriptions.issued_at", &issued_at)?,
            notes,
        });
    }
    Ok(prescriptions)
}

/// Delete a prescription and its items.
pub fn delete_prescription(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("prescription", id));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Medication catalogue
// ═══════════════════════════════════════════

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, name, form, strength) VALUES (?1, ?2, ?3, ?4)",
        params![med.id.to_string(), med.name, med.form.as_str(), med.strength],
    )?;
    Ok(())
}

pub fn get_medication_by_name(conn: &Connection, name: &str) -> Result<Option<Medication>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, form, strength FROM medications WHERE name = ?1",
            params![name],
            medication_tuple,
        )
        .optional()?;
    row.map(medication_from_tuple).transpose()
}

pub fn list_medications(conn: &Connection) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name, form, strength FROM medications ORDER BY name")?;
    let rows = stmt.query_map([], medication_tuple)?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_tuple(row?)?);
    }
    Ok(meds)
}

/// Rejected while any prescription item still names the medication.
pub fn delete_medication(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM medications WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("medication", id));
    }
    Ok(())
}

type MedicationTuple = (String, String, String, Option<String>);

fn medication_tuple(row: &rusqlite::Row<'_>) -> Result<MedicationTuple, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn medication_from_tuple((id, name, form, strength): MedicationTuple) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: parse_uuid("medications.id", &id)?,
        name,
        form: MedicationForm::from_str(&form)?,
        strength,
    })
}

// ═══════════════════════════════════════════
// Prescription items
// ═══════════════════════════════════════════

/// Add a medication line. At most one line per medication per prescription;
/// `duration_days` must be positive.
pub fn add_prescription_item(conn: &Connection, item: &PrescriptionItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescription_items (prescription_id, medication_id, dosage, frequency, duration_days)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            item.prescription_id.to_string(),
            item.medication_id.to_string(),
            item.dosage,
            item.frequency,
            item.duration_days,
        ],
    )?;
    Ok(())
}

pub fn get_prescription_items(
    conn: &Connection,
    prescription_id: &Uuid,
) -> Result<Vec<PrescriptionItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT pi.prescription_id, pi.medication_id, pi.dosage, pi.frequency, pi.duration_days
         FROM prescription_items pi JOIN medications m ON m.id = pi.medication_id
         WHERE pi.prescription_id = ?1
         ORDER BY m.name",
    )?;
    let rows = stmt.query_map(params![prescription_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut items = Vec::new();
    for row in rows {
        let (prescription_id, medication_id, dosage, frequency, duration_days) = row?;
        items.push(PrescriptionItem {
            prescription_id: parse_uuid("prescription_items.prescription_id", &prescription_id)?,
            medication_id: parse_uuid("prescription_items.medication_id", &medication_id)?,
            dosage,
            frequency,
            duration_days,
        });
    }
    Ok(items)
}

pub fn remove_prescription_item(
    conn: &Connection,
    prescription_id: &Uuid,
    medication_id: &Uuid,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM prescription_items WHERE prescription_id = ?1 AND medication_id = ?2",
        params![prescription_id.to_string(), medication_id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::not_found(
            "prescription_item",
            format!("{prescription_id}/{medication_id}"),
        ));
    }
    Ok(())
}
