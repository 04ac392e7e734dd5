use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "ClinicBooking";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "CLINIC_DATA_DIR";
/// Overrides the database file path outright.
pub const DB_PATH_ENV: &str = "CLINIC_DB_PATH";

const DATABASE_FILE: &str = "clinic.db";

/// Get the application data directory
/// ~/ClinicBooking/ unless `CLINIC_DATA_DIR` is set; falls back to the
/// working directory when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Location of the SQLite database file
pub fn database_path() -> PathBuf {
    match std::env::var_os(DB_PATH_ENV) {
        Some(path) => PathBuf::from(path),
        None => app_data_dir().join(DATABASE_FILE),
    }
}

/// Log filter used when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "clinic_booking_lib=info,clinic_booking=info,warn"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_file_lives_in_data_dir_by_default() {
        if std::env::var_os(DB_PATH_ENV).is_some() {
            return;
        }
        let path = database_path();
        assert!(path.starts_with(app_data_dir()));
        assert!(path.ends_with(DATABASE_FILE));
    }

    #[test]
    fn default_data_dir_named_after_app() {
        if std::env::var_os(DATA_DIR_ENV).is_some() {
            return;
        }
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn default_filter_targets_this_crate() {
        assert!(default_log_filter().contains("clinic_booking_lib=info"));
    }
}
