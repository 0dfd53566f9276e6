pub mod booking;
pub mod error;
pub mod lease;
pub mod payment;
pub mod repository;

pub use booking::{Booking, BookingStatus, ConfirmOutcome, ConflictReason, Seat, Trip, TripStatus};
pub use error::{LedgerError, StoreError};
pub use lease::{AcquireOutcome, ConsumeOutcome, Lease, ReleaseOutcome};
pub use payment::{
    CanonicalStatus, InitiatedPayment, NormalizedEvent, PaymentAdapter, PaymentRecord,
    PaymentStatus, WebhookAck,
};
pub use repository::{LeaseStore, NewBooking, ReservationLedger, SettlementOutcome};
