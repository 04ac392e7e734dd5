pub mod appointment;
pub mod billing;
pub mod enums;
pub mod filters;
pub mod patient;
pub mod prescription;
pub mod room;
pub mod staff;

pub use appointment::*;
pub use billing::*;
pub use filters::*;
pub use patient::*;
pub use prescription::*;
pub use room::*;
pub use staff::*;
