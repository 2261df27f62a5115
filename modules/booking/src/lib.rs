//! Booking module.
//!
//! Opens bookings with their line items. It registers its error codes with
//! the host's status registry, persists through the corekit repository base
//! and writes header and details in one unit of work.

pub mod module;
pub use module::BookingModule;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod errors;
#[doc(hidden)]
pub mod infra;
