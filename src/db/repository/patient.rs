use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, date_of_birth, sex, email, phone,
         address, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.date_of_birth.to_string(),
            patient.sex.as_str(),
            patient.email,
            patient.phone,
            patient.address,
            format_timestamp(&patient.created_at),
        ],
    )?;
    tracing::debug!(patient_id = %patient.id, "Inserted patient");
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, first_name, last_name, date_of_birth, sex, email, phone, address, created_at
             FROM patients WHERE id = ?1",
            params![id.to_string()],
            patient_row_from_rusqlite,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

pub fn get_patient_by_email(conn: &Connection, email: &str) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, first_name, last_name, date_of_birth, sex, email, phone, address, created_at
             FROM patients WHERE email = ?1",
            params![email],
            patient_row_from_rusqlite,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// All patients ordered by last name, first name.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, date_of_birth, sex, email, phone, address, created_at
         FROM patients ORDER BY last_name, first_name",
    )?;

    let rows = stmt.query_map([], patient_row_from_rusqlite)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

/// Replace the contact fields. Uniqueness of email and phone is checked by the engine.
pub fn update_patient_contact(
    conn: &Connection,
    id: &Uuid,
    email: &str,
    phone: &str,
    address: Option<&str>,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET email = ?2, phone = ?3, address = ?4 WHERE id = ?1",
        params![id.to_string(), email, phone, address],
    )?;
    if affected == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    Ok(())
}

/// Delete a patient. Rejected while appointments reference it; the profile goes with it.
pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    tracing::info!(patient_id = %id, "Deleted patient");
    Ok(())
}

pub fn upsert_patient_profile(conn: &Connection, profile: &PatientProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_profiles (patient_id, blood_type, emergency_contact_name,
         emergency_contact_phone, allergies, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(patient_id) DO UPDATE SET
           blood_type = excluded.blood_type,
           emergency_contact_name = excluded.emergency_contact_name,
           emergency_contact_phone = excluded.emergency_contact_phone,
           allergies = excluded.allergies,
           updated_at = excluded.updated_at",
        params![
            profile.patient_id.to_string(),
            profile.blood_type.map(|b| b.as_str()),
            profile.emergency_contact_name,
            profile.emergency_contact_phone,
            profile.allergies,
            format_timestamp(&profile.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient_profile(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<PatientProfile>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT patient_id, blood_type, emergency_contact_name, emergency_contact_phone,
             allergies, updated_at
             FROM patient_profiles WHERE patient_id = ?1",
            params![patient_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, blood_type, contact_name, contact_phone, allergies, updated_at)) = row else {
        return Ok(None);
    };
    Ok(Some(PatientProfile {
        patient_id: parse_uuid("patient_profiles.patient_id", &id)?,
        blood_type: blood_type.map(|b| BloodType::from_str(&b)).transpose()?,
        emergency_contact_name: contact_name,
        emergency_contact_phone: contact_phone,
        allergies,
        updated_at: parse_timestamp("patient_profiles.updated_at", &updated_at)?,
    }))
}

struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    date_of_birth: String,
    sex: String,
    email: String,
    phone: String,
    address: Option<String>,
    created_at: String,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        sex: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        address: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid("patients.id", &row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        date_of_birth: parse_date("patients.date_of_birth", &row.date_of_birth)?,
        sex: Sex::from_str(&row.sex)?,
        email: row.email,
        phone: row.phone,
        address: row.address,
        created_at: parse_timestamp("patients.created_at", &row.created_at)?,
    })
}
