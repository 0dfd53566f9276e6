use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Cancelled => "cancelled",
            TripStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(TripStatus::Scheduled),
            "cancelled" => Some(TripStatus::Cancelled),
            "completed" => Some(TripStatus::Completed),
            _ => None,
        }
    }
}

/// A scheduled trip with a seat-availability counter.
///
/// `seats_available` only moves through the booking transaction (conditioned
/// decrement) and the reconciler's compensating path (gated increment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub status: TripStatus,
    pub seats_available: i32,
}

/// A seat in a trip's seat map. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub seat_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Paid,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "paid" => Some(BookingStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub seat_id: Uuid,
    pub booker_id: Uuid,
    pub status: BookingStatus,
    pub amount_cents: i64,
    pub booked_at: DateTime<Utc>,
}

/// Why a confirm attempt conflicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The conditioned capacity decrement matched zero rows.
    NoSeats,
    /// The (trip, seat) uniqueness constraint rejected the insert.
    SeatBooked,
}

/// Result of a booking confirmation attempt. Contention is control flow
/// here, not an error.
#[derive(Debug)]
pub enum ConfirmOutcome {
    Confirmed(Booking),
    Conflict(ConflictReason),
    /// The lease was gone or held under a different token; re-acquire.
    Expired,
}
