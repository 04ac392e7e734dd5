use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

// ═══════════════════════════════════════════
// Staff
// ═══════════════════════════════════════════

pub fn insert_staff(conn: &Connection, staff: &Staff) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO staff (id, first_name, last_name, role, email, phone, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            staff.id.to_string(),
            staff.first_name,
            staff.last_name,
            staff.role.as_str(),
            staff.email,
            staff.phone,
            staff.is_active as i32,
            format_timestamp(&staff.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_staff(conn: &Connection, id: &Uuid) -> Result<Option<Staff>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, first_name, last_name, role, email, phone, is_active, created_at
             FROM staff WHERE id = ?1",
            params![id.to_string()],
            staff_row_from_rusqlite,
        )
        .optional()?;
    row.map(staff_from_row).transpose()
}

pub fn list_staff(conn: &Connection, filter: &StaffFilter) -> Result<Vec<Staff>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, role, email, phone, is_active, created_at
         FROM staff
         WHERE (?1 IS NULL OR role = ?1)
           AND (?2 = 0 OR is_active = 1)
         ORDER BY last_name, first_name",
    )?;

    let rows = stmt.query_map(
        params![filter.role.map(|r| r.as_str()), filter.active_only as i32],
        staff_row_from_rusqlite,
    )?;

    let mut members = Vec::new();
    for row in rows {
        members.push(staff_from_row(row?)?);
    }
    Ok(members)
}

pub fn set_staff_active(conn: &Connection, id: &Uuid, active: bool) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE staff SET is_active = ?2 WHERE id = ?1",
        params![id.to_string(), active as i32],
    )?;
    if affected == 0 {
        return Err(DatabaseError::not_found("staff", id));
    }
    tracing::info!(staff_id = %id, active, "Staff active flag changed");
    Ok(())
}

/// Delete a staff member. A doctor row goes with it, unless that doctor
/// still has appointments, in which case the whole delete is rejected.
pub fn delete_staff(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM staff WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("staff", id));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Doctors
// ═══════════════════════════════════════════

/// Attach the doctor extension to an existing staff member.
pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (staff_id, license_number) VALUES (?1, ?2)",
        params![doctor.staff_id.to_string(), doctor.license_number],
    )?;
    Ok(())
}

/// Create the staff row and its doctor extension together.
///
/// The staff member must carry the `doctor` role.
pub fn register_doctor(
    conn: &Connection,
    staff: &Staff,
    license_number: Option<&str>,
) -> Result<Doctor, DatabaseError> {
    if staff.role != StaffRole::Doctor {
        return Err(DatabaseError::ConstraintViolation(format!(
            "cannot register staff with role '{}' as a doctor",
            staff.role
        )));
    }

    let doctor = Doctor {
        staff_id: staff.id,
        license_number: license_number.map(str::to_string),
    };

    let tx = conn.unchecked_transaction()?;
    insert_staff(&tx, staff)?;
    insert_doctor(&tx, &doctor)?;
    tx.commit()?;

    tracing::info!(staff_id = %staff.id, "Registered doctor");
    Ok(doctor)
}

pub fn get_doctor(conn: &Connection, staff_id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT staff_id, license_number FROM doctors WHERE staff_id = ?1",
            params![staff_id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
        )
        .optional()?;

    row.map(|(id, license_number)| {
        Ok(Doctor {
            staff_id: parse_uuid("doctors.staff_id", &id)?,
            license_number,
        })
    })
    .transpose()
}

/// Doctors joined with their staff record, ordered by name.
pub fn list_doctors(conn: &Connection) -> Result<Vec<(Doctor, Staff)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.first_name, s.last_name, s.role, s.email, s.phone, s.is_active,
                s.created_at, d.license_number
         FROM doctors d JOIN staff s ON s.id = d.staff_id
         ORDER BY s.last_name, s.first_name",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((staff_row_from_rusqlite(row)?, row.get::<_, Option<String>>(8)?))
    })?;

    let mut doctors = Vec::new();
    for row in rows {
        let (staff_row, license_number) = row?;
        let staff = staff_from_row(staff_row)?;
        doctors.push((
            Doctor {
                staff_id: staff.id,
                license_number,
            },
            staff,
        ));
    }
    Ok(doctors)
}

// ═══════════════════════════════════════════
// Specialties
// ═══════════════════════════════════════════

pub fn insert_specialty(conn: &Connection, specialty: &Specialty) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO specialties (id, name, description) VALUES (?1, ?2, ?3)",
        params![specialty.id.to_string(), specialty.name, specialty.description],
    )?;
    Ok(())
}

pub fn list_specialties(conn: &Connection) -> Result<Vec<Specialty>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM specialties ORDER BY name")?;
    let rows = stmt.query_map([], specialty_tuple)?;

    let mut specialties = Vec::new();
    for row in rows {
        specialties.push(specialty_from_tuple(row?)?);
    }
    Ok(specialties)
}

/// Rejected while any doctor still holds the specialty.
pub fn delete_specialty(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM specialties WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::not_found("specialty", id));
    }
    Ok(())
}

pub fn assign_specialty(
    conn: &Connection,
    doctor_id: &Uuid,
    specialty_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_specialties (doctor_id, specialty_id) VALUES (?1, ?2)",
        params![doctor_id.to_string(), specialty_id.to_string()],
    )?;
    Ok(())
}

pub fn unassign_specialty(
    conn: &Connection,
    doctor_id: &Uuid,
    specialty_id: &Uuid,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM doctor_specialties WHERE doctor_id = ?1 AND specialty_id = ?2",
        params![doctor_id.to_string(), specialty_id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::not_found(
            "doctor_specialty",
            format!("{doctor_id}/{specialty_id}"),
        ));
    }
    Ok(())
}

pub fn get_doctor_specialties(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Specialty>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT sp.id, sp.name, sp.description
         FROM doctor_specialties ds JOIN specialties sp ON sp.id = ds.specialty_id
         WHERE ds.doctor_id = ?1
         ORDER BY sp.name",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], specialty_tuple)?;

    let mut specialties = Vec::new();
    for row in rows {
        specialties.push(specialty_from_tuple(row?)?);
    }
    Ok(specialties)
}

type SpecialtyTuple = (String, String, Option<String>);

fn specialty_tuple(row: &rusqlite::Row<'_>) -> Result<SpecialtyTuple, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn specialty_from_tuple((id, name, description): SpecialtyTuple) -> Result<Specialty, DatabaseError> {
    Ok(Specialty {
        id: parse_uuid("specialties.id", &id)?,
        name,
        description,
    })
}

struct StaffRow {
    id: String,
    first_name: String,
    last_name: String,
    role: String,
    email: String,
    phone: Option<String>,
    is_active: i32,
    created_at: String,
}

fn staff_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<StaffRow, rusqlite::Error> {
    Ok(StaffRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        role: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn staff_from_row(row: StaffRow) -> Result<Staff, DatabaseError> {
    Ok(Staff {
        id: parse_uuid("staff.id", &row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        role: StaffRole::from_str(&row.role)?,
        email: row.email,
        phone: row.phone,
        is_active: row.is_active != 0,
        created_at: parse_timestamp("staff.created_at", &row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::ConstraintKind;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn nurse(email: &str) -> Staff {
        Staff {
            id: Uuid::new_v4(),
            first_name: "Mara".into(),
            last_name: "Quist".into(),
            role: StaffRole::Nurse,
            email: email.into(),
            phone: Some("+15550200".into()),
            is_active: true,
            created_at: ts("2024-01-01 08:00:00"),
        }
    }

    fn specialty(conn: &Connection, name: &str) -> Specialty {
        let s = Specialty {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
        };
        insert_specialty(conn, &s).unwrap();
        s
    }

    #[test]
    fn staff_insert_and_filter() {
        let conn = test_db();
        let n = nurse("quist@clinic.test");
        insert_staff(&conn, &n).unwrap();
        let doctor = make_doctor(&conn, "lind@clinic.test");
        set_staff_active(&conn, &n.id, false).unwrap();

        assert!(!get_staff(&conn, &n.id).unwrap().unwrap().is_active);
        assert_eq!(list_staff(&conn, &StaffFilter::default()).unwrap().len(), 2);

        let active = list_staff(&conn, &StaffFilter { role: None, active_only: true }).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, doctor.staff_id);

        let nurses = list_staff(&conn, &StaffFilter {
            role: Some(StaffRole::Nurse),
            active_only: false,
        })
        .unwrap();
        assert_eq!(nurses.len(), 1);
        assert_eq!(nurses[0].email, "quist@clinic.test");
    }

    #[test]
    fn staff_email_unique() {
        let conn = test_db();
        insert_staff(&conn, &nurse("quist@clinic.test")).unwrap();
        let err = insert_staff(&conn, &nurse("quist@clinic.test")).unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
    }

    #[test]
    fn register_doctor_creates_both_rows() {
        let conn = test_db();
        let doctor = make_doctor(&conn, "lind@clinic.test");

        let staff = get_staff(&conn, &doctor.staff_id).unwrap().unwrap();
        assert_eq!(staff.role, StaffRole::Doctor);
        assert_eq!(get_doctor(&conn, &doctor.staff_id).unwrap(), Some(doctor.clone()));

        let listed = list_doctors(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, doctor);
        assert_eq!(listed[0].1.email, "lind@clinic.test");
    }

    #[test]
    fn register_doctor_rejects_other_roles() {
        let conn = test_db();
        let n = nurse("quist@clinic.test");
        let err = register_doctor(&conn, &n, None).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        assert!(get_staff(&conn, &n.id).unwrap().is_none());
    }

    #[test]
    fn register_doctor_rolls_back_on_duplicate_license() {
        let conn = test_db();
        let mut first = nurse("a@clinic.test");
        first.role = StaffRole::Doctor;
        register_doctor(&conn, &first, Some("MD-1")).unwrap();

        let mut second = nurse("b@clinic.test");
        second.role = StaffRole::Doctor;
        let err = register_doctor(&conn, &second, Some("MD-1")).unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
        assert!(get_staff(&conn, &second.id).unwrap().is_none());
    }

    #[test]
    fn doctor_requires_staff_member() {
        let conn = test_db();
        let err = insert_doctor(&conn, &Doctor {
            staff_id: Uuid::new_v4(),
            license_number: None,
        })
        .unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::ForeignKey));
    }

    #[test]
    fn deleting_staff_cascades_doctor_and_specialty_links() {
        let conn = test_db();
        let doctor = make_doctor(&conn, "lind@clinic.test");
        let cardio = specialty(&conn, "Cardiology");
        assign_specialty(&conn, &doctor.staff_id, &cardio.id).unwrap();

        delete_staff(&conn, &doctor.staff_id).unwrap();
        assert!(get_doctor(&conn, &doctor.staff_id).unwrap().is_none());
        assert!(get_doctor_specialties(&conn, &doctor.staff_id).unwrap().is_empty());
        // Specialty is free again
        delete_specialty(&conn, &cardio.id).unwrap();
    }

    #[test]
    fn duplicate_doctor_specialty_pair_rejected() {
        let conn = test_db();
        let doctor = make_doctor(&conn, "lind@clinic.test");
        let cardio = specialty(&conn, "Cardiology");
        let derm = specialty(&conn, "Dermatology");

        assign_specialty(&conn, &doctor.staff_id, &cardio.id).unwrap();
        assign_specialty(&conn, &doctor.staff_id, &derm.id).unwrap();
        let err = assign_specialty(&conn, &doctor.staff_id, &cardio.id).unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::PrimaryKey));

        let names: Vec<String> = get_doctor_specialties(&conn, &doctor.staff_id)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Cardiology", "Dermatology"]);
    }

    #[test]
    fn specialty_delete_restricted_while_referenced() {
        let conn = test_db();
        let doctor = make_doctor(&conn, "lind@clinic.test");
        let cardio = specialty(&conn, "Cardiology");
        assign_specialty(&conn, &doctor.staff_id, &cardio.id).unwrap();

        let err = delete_specialty(&conn, &cardio.id).unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::ForeignKey));

        unassign_specialty(&conn, &doctor.staff_id, &cardio.id).unwrap();
        delete_specialty(&conn, &cardio.id).unwrap();
        assert!(list_specialties(&conn).unwrap().is_empty());
    }

    #[test]
    fn specialty_name_unique() {
        let conn = test_db();
        specialty(&conn, "Cardiology");
        let err = insert_specialty(&conn, &Specialty {
            id: Uuid::new_v4(),
            name: "Cardiology".into(),
            description: Some("dup".into()),
        })
        .unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
    }
}
