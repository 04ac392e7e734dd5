fn main() {
    if let Err(e) = clinic_booking_lib::run() {
        tracing::error!("{e}");
        eprintln!("clinic-booking: {e}");
        std::process::exit(1);
    }
}
