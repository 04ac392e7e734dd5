use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            /// Every value in the enumerated set, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Sex {
    Male => "male",
    Female => "female",
    Other => "other",
    Unknown => "unknown",
});

str_enum!(BloodType {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    OPositive => "O+",
    ONegative => "O-",
});

str_enum!(StaffRole {
    Doctor => "doctor",
    Nurse => "nurse",
    Admin => "admin",
    LabTech => "lab_tech",
});

str_enum!(RoomType {
    Consultation => "consultation",
    Examination => "examination",
    Procedure => "procedure",
    Laboratory => "laboratory",
    Imaging => "imaging",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    CheckedIn => "checked_in",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(MedicationForm {
    Tablet => "tablet",
    Capsule => "capsule",
    Syrup => "syrup",
    Injection => "injection",
    Cream => "cream",
    Inhaler => "inhaler",
    Drops => "drops",
    Other => "other",
});

str_enum!(InvoiceStatus {
    Pending => "pending",
    Paid => "paid",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

str_enum!(PaymentMethod {
    Cash => "cash",
    Card => "card",
    Insurance => "insurance",
    BankTransfer => "bank_transfer",
    Mobile => "mobile",
});

impl AppointmentStatus {
    /// End states of the documented progression
    /// (scheduled → checked_in → completed / cancelled / no_show).
    ///
    /// Informational only: the store accepts any status change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

impl InvoiceStatus {
    /// Pending is the only open state; the store does not enforce this.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn appointment_status_round_trip() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::from_str(status.as_str()).unwrap(), *status);
        }
        assert_eq!(AppointmentStatus::CheckedIn.as_str(), "checked_in");
        assert_eq!(AppointmentStatus::NoShow.as_str(), "no_show");
    }

    #[test]
    fn blood_type_uses_clinical_notation() {
        assert_eq!(BloodType::AbNegative.as_str(), "AB-");
        assert_eq!(BloodType::from_str("O+").unwrap(), BloodType::OPositive);
        assert_eq!(BloodType::ALL.len(), 8);
    }

    #[test]
    fn staff_role_display_matches_stored_text() {
        assert_eq!(StaffRole::LabTech.to_string(), "lab_tech");
        assert_eq!(PaymentMethod::BankTransfer.to_string(), "bank_transfer");
    }

    #[test]
    fn terminal_and_settled_states() {
        assert!(!AppointmentStatus::Scheduled.is_terminal());
        assert!(!AppointmentStatus::CheckedIn.is_terminal());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::NoShow.is_terminal());
        assert!(!InvoiceStatus::Pending.is_settled());
        assert!(InvoiceStatus::Refunded.is_settled());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(StaffRole::from_str("surgeon").is_err());
        assert!(AppointmentStatus::from_str("Scheduled").is_err());
        assert!(InvoiceStatus::from_str("").is_err());

        match Sex::from_str("x") {
            Err(DatabaseError::InvalidEnum { field, value }) => {
                assert_eq!(field, "Sex");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn serde_uses_stored_text() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
        let back: AppointmentStatus = serde_json::from_str("\"no_show\"").unwrap();
        assert_eq!(back, AppointmentStatus::NoShow);
        let json = serde_json::to_string(&BloodType::AbNegative).unwrap();
        assert_eq!(json, "\"AB-\"");
        assert!(serde_json::from_str::<RoomType>("\"ballroom\"").is_err());
    }

    #[test]
    fn serde_text_matches_as_str_for_every_value() {
        for blood in BloodType::ALL {
            let json = serde_json::to_value(blood).unwrap();
            assert_eq!(json, serde_json::Value::from(blood.as_str()));
        }
        for form in MedicationForm::ALL {
            let back: MedicationForm = serde_json::from_value(form.as_str().into()).unwrap();
            assert_eq!(back, *form);
        }
    }
}
