use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Appointment document. `start` is a Unix timestamp in milliseconds,
/// the end of the slot is derived as `start + duration_minutes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub patient_id: String,
    pub staff_id: String,
    pub facility_id: String,

    /// Slot start (Unix timestamp, milliseconds)
    pub start: i64,
    pub duration_minutes: i64,

    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,

    /// Set by the reminder sweep once the 24h-before reminder went out
    #[serde(default)]
    pub reminder_sent: bool,

    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

impl AppointmentStatus {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

/// Staff leave window. `from`/`to` are Unix timestamps in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub staff_id: String,
    pub from: i64,
    pub to: i64,
    pub reason: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateLeaveRequest {
    /// Staff member taking leave; staff may only file their own,
    /// admins may file for anyone
    pub staff_id: Option<String>,
    pub from: i64,
    pub to: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveListQuery {
    pub staff_id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LeaveResponse {
    pub id: String,
    pub staff_id: String,
    pub from: i64,
    pub to: i64,
    pub reason: Option<String>,
    pub created_at: i64,
}

impl From<LeaveRecord> for LeaveResponse {
    fn from(leave: LeaveRecord) -> Self {
        LeaveResponse {
            id: leave.id.map(|id| id.to_hex()).unwrap_or_default(),
            staff_id: leave.staff_id,
            from: leave.from,
            to: leave.to,
            reason: leave.reason,
            created_at: leave.created_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BookAppointmentRequest {
    pub staff_id: String,
    pub facility_id: String,
    pub start: i64,
    pub duration_minutes: i64,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub start: i64,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub patient_id: Option<String>,
    pub staff_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub staff_id: String,
    /// Day in `YYYY-MM-DD` (UTC)
    pub date: String,
}

/// One free 30-minute slot in the availability grid
#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
pub struct FreeSlot {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AppointmentResponse {
    pub id: String,
    pub patient_id: String,
    pub staff_id: String,
    pub facility_id: String,
    pub start: i64,
    pub end: i64,
    pub duration_minutes: i64,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appt: Appointment) -> Self {
        AppointmentResponse {
            id: appt.id.map(|id| id.to_hex()).unwrap_or_default(),
            end: appt.start + appt.duration_minutes * 60_000,
            patient_id: appt.patient_id,
            staff_id: appt.staff_id,
            facility_id: appt.facility_id,
            start: appt.start,
            duration_minutes: appt.duration_minutes,
            reason: appt.reason,
            status: appt.status,
            notes: appt.notes,
            created_at: appt.created_at,
            updated_at: appt.updated_at,
        }
    }
}
