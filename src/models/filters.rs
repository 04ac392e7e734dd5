use chrono::NaiveDateTime;
use uuid::Uuid;

use super::enums::{AppointmentStatus, InvoiceStatus, StaffRole};

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Inclusive lower bound on `scheduled_start`.
    pub starts_from: Option<NaiveDateTime>,
    /// Exclusive upper bound on `scheduled_start`.
    pub starts_before: Option<NaiveDateTime>,
}

#[derive(Debug, Default)]
pub struct StaffFilter {
    pub role: Option<StaffRole>,
    pub active_only: bool,
}

#[derive(Debug, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<Uuid>,
}
