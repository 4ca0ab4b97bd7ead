use crate::database::MongoDB;
use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, FreeSlot, LeaveRecord, User,
    BOOKABLE_ROLES,
};
use crate::services::notification_service;
use crate::utils::error::AppError;
use chrono::{NaiveDate, TimeZone, Timelike, Utc};
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};

// Business hours are a single fixed UTC range; per-facility calendars
// are not modeled.
pub const OPEN_HOUR: u32 = 8;
pub const CLOSE_HOUR: u32 = 17;
pub const SLOT_MINUTES: i64 = 30;
pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 120;

const MS_PER_MINUTE: i64 = 60_000;

/// Half-open interval overlap
pub fn overlaps(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && b_start < a_end
}

/// Slot must start at or after opening and end at or before closing,
/// on a single UTC day.
pub fn within_business_hours(start_ms: i64, duration_minutes: i64) -> Result<(), String> {
    let start = Utc
        .timestamp_millis_opt(start_ms)
        .single()
        .ok_or_else(|| "Invalid start timestamp".to_string())?;

    let minutes_of_day = (start.hour() * 60 + start.minute()) as i64;
    let open = (OPEN_HOUR * 60) as i64;
    let close = (CLOSE_HOUR * 60) as i64;

    if minutes_of_day < open {
        return Err(format!("Clinic opens at {:02}:00 UTC", OPEN_HOUR));
    }
    if minutes_of_day + duration_minutes > close {
        return Err(format!("Appointment must end by {:02}:00 UTC", CLOSE_HOUR));
    }

    Ok(())
}

/// Status transition rules: terminal states are final and a confirmed
/// appointment cannot fall back to scheduled.
pub fn validate_transition(
    current: AppointmentStatus,
    next: AppointmentStatus,
) -> Result<(), String> {
    if current == next {
        return Err(format!("Appointment is already {}", current));
    }
    if current.is_terminal() {
        return Err(format!("Cannot change a {} appointment", current));
    }
    if current == AppointmentStatus::Confirmed && next == AppointmentStatus::Scheduled {
        return Err("A confirmed appointment cannot go back to scheduled".to_string());
    }
    Ok(())
}

/// Compute the free 30-minute slots of one UTC day: the business-hours
/// grid minus booked intervals minus leave windows.
pub fn free_slots(day: NaiveDate, busy: &[(i64, i64)]) -> Vec<FreeSlot> {
    let day_start = Utc
        .from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("midnight"))
        .timestamp_millis();
    let open = day_start + (OPEN_HOUR as i64) * 60 * MS_PER_MINUTE;
    let close = day_start + (CLOSE_HOUR as i64) * 60 * MS_PER_MINUTE;

    let mut slots = Vec::new();
    let mut cursor = open;
    while cursor + SLOT_MINUTES * MS_PER_MINUTE <= close {
        let end = cursor + SLOT_MINUTES * MS_PER_MINUTE;
        let taken = busy.iter().any(|(b_start, b_end)| overlaps(cursor, end, *b_start, *b_end));
        if !taken {
            slots.push(FreeSlot { start: cursor, end });
        }
        cursor = end;
    }
    slots
}

/// The unique (staff_id, start) index is the DB-level backstop for slot
/// races: if two identical-start bookings pass the overlap scan
/// concurrently, the second insert fails with a duplicate key.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

fn map_slot_insert_error(err: mongodb::error::Error) -> AppError {
    if is_duplicate_key(&err) {
        AppError::Conflict("Requested slot is already booked".to_string())
    } else {
        AppError::DatabaseError(err.to_string())
    }
}

fn validate_request(start: i64, duration_minutes: i64, reason: &str) -> Result<(), AppError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(AppError::InvalidRequest(format!(
            "Duration must be between {} and {} minutes",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
        )));
    }
    if reason.trim().is_empty() {
        return Err(AppError::InvalidRequest("Reason is required".to_string()));
    }
    if start <= Utc::now().timestamp_millis() {
        return Err(AppError::InvalidRequest("Appointment must be in the future".to_string()));
    }
    within_business_hours(start, duration_minutes).map_err(AppError::InvalidRequest)
}

/// Staff member must exist at the facility, be active, and hold a bookable role
async fn verify_staff(
    db: &MongoDB,
    staff_id: &str,
    facility_id: &str,
) -> Result<User, AppError> {
    let collection = db.collection::<User>("users");

    let staff = collection
        .find_one(doc! { "user_id": staff_id })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", staff_id)))?;

    if !staff.is_active {
        return Err(AppError::InvalidRequest("Staff member is inactive".to_string()));
    }
    if !staff.roles.iter().any(|r| BOOKABLE_ROLES.contains(&r.as_str())) {
        return Err(AppError::InvalidRequest(
            "Staff member cannot take appointments".to_string(),
        ));
    }
    if staff.facility_id.as_deref() != Some(facility_id) {
        return Err(AppError::InvalidRequest(
            "Staff member does not work at this facility".to_string(),
        ));
    }

    Ok(staff)
}

/// Leave lookup: any leave record overlapping the slot blocks booking
async fn check_staff_leave(
    db: &MongoDB,
    staff_id: &str,
    start: i64,
    end: i64,
) -> Result<(), AppError> {
    let collection = db.collection::<LeaveRecord>("leave_records");

    let on_leave = collection
        .find_one(doc! {
            "staff_id": staff_id,
            "from": { "$lt": end },
            "to": { "$gt": start },
        })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if on_leave.is_some() {
        return Err(AppError::Conflict(
            "Staff member is on leave for the requested time".to_string(),
        ));
    }

    Ok(())
}

/// Overlap scan against the staff member's non-cancelled appointments.
/// The Mongo query over-fetches by MAX_DURATION so the precise interval
/// check can run in code (end is derived, not stored).
async fn find_conflict(
    db: &MongoDB,
    staff_id: &str,
    start: i64,
    end: i64,
    exclude: Option<&ObjectId>,
) -> Result<Option<Appointment>, AppError> {
    let collection = db.collection::<Appointment>("appointments");

    let window_start = start - MAX_DURATION_MINUTES * MS_PER_MINUTE;

    let mut cursor = collection
        .find(doc! {
            "staff_id": staff_id,
            "status": { "$ne": "cancelled" },
            "start": { "$gt": window_start, "$lt": end },
        })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    while let Some(result) = cursor.next().await {
        let existing = result.map_err(|e| AppError::DatabaseError(e.to_string()))?;
        if let (Some(id), Some(skip)) = (existing.id.as_ref(), exclude) {
            if id == skip {
                continue;
            }
        }
        let existing_end = existing.start + existing.duration_minutes * MS_PER_MINUTE;
        if overlaps(start, end, existing.start, existing_end) {
            return Ok(Some(existing));
        }
    }

    Ok(None)
}

/// Book a new appointment: validate → verify staff → leave check →
/// conflict scan → insert → notify staff.
pub async fn book_appointment(
    db: &MongoDB,
    patient_id: &str,
    request: &BookAppointmentRequest,
) -> Result<Appointment, AppError> {
    validate_request(request.start, request.duration_minutes, &request.reason)?;

    let staff = verify_staff(db, &request.staff_id, &request.facility_id).await?;

    let end = request.start + request.duration_minutes * MS_PER_MINUTE;

    check_staff_leave(db, &request.staff_id, request.start, end).await?;

    if let Some(existing) = find_conflict(db, &request.staff_id, request.start, end, None).await? {
        log::warn!(
            "⚠️ Booking conflict: staff {} already has appointment {} at {}",
            request.staff_id,
            existing.id.map(|id| id.to_hex()).unwrap_or_default(),
            existing.start
        );
        return Err(AppError::Conflict("Requested slot is already booked".to_string()));
    }

    let now = Utc::now().timestamp_millis();
    let mut appointment = Appointment {
        id: None,
        patient_id: patient_id.to_string(),
        staff_id: request.staff_id.clone(),
        facility_id: request.facility_id.clone(),
        start: request.start,
        duration_minutes: request.duration_minutes,
        reason: request.reason.clone(),
        status: AppointmentStatus::Scheduled,
        notes: request.notes.clone(),
        reminder_sent: false,
        created_at: now,
        updated_at: now,
    };

    let collection = db.collection::<Appointment>("appointments");
    let insert_result = collection
        .insert_one(&appointment)
        .await
        .map_err(map_slot_insert_error)?;

    appointment.id = insert_result.inserted_id.as_object_id();

    crate::api::metrics::increment_booking_count();

    notification_service::notify(
        db,
        &staff.user_id,
        "appointment_booked",
        "New appointment",
        &format!("A patient booked the {} slot ({})", request.start, request.reason),
    )
    .await;

    Ok(appointment)
}

pub async fn get_appointment(db: &MongoDB, id: &ObjectId) -> Result<Appointment, AppError> {
    let collection = db.collection::<Appointment>("appointments");

    collection
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))
}

pub async fn list_appointments(
    db: &MongoDB,
    filter: mongodb::bson::Document,
) -> Result<Vec<Appointment>, AppError> {
    let collection = db.collection::<Appointment>("appointments");

    let mut cursor = collection
        .find(filter)
        .sort(doc! { "start": 1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut appointments = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(appt) => appointments.push(appt),
            Err(e) => log::error!("❌ Failed to decode appointment: {}", e),
        }
    }

    Ok(appointments)
}

/// Reschedule: same validation pipeline as booking, with the moved
/// appointment excluded from the conflict scan. Status resets to scheduled.
pub async fn reschedule_appointment(
    db: &MongoDB,
    id: &ObjectId,
    new_start: i64,
    new_duration: Option<i64>,
) -> Result<Appointment, AppError> {
    let current = get_appointment(db, id).await?;

    if current.status.is_terminal() {
        return Err(AppError::InvalidRequest(format!(
            "Cannot reschedule a {} appointment",
            current.status
        )));
    }

    let duration = new_duration.unwrap_or(current.duration_minutes);
    validate_request(new_start, duration, &current.reason)?;

    let end = new_start + duration * MS_PER_MINUTE;
    check_staff_leave(db, &current.staff_id, new_start, end).await?;

    if find_conflict(db, &current.staff_id, new_start, end, Some(id))
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Requested slot is already booked".to_string()));
    }

    let now = Utc::now().timestamp_millis();
    let collection = db.collection::<Appointment>("appointments");
    collection
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "start": new_start,
                "duration_minutes": duration,
                "status": "scheduled",
                "reminder_sent": false,
                "updated_at": now,
            }},
        )
        .await
        .map_err(map_slot_insert_error)?;

    notification_service::notify(
        db,
        &current.patient_id,
        "appointment_status",
        "Appointment rescheduled",
        &format!("Your appointment was moved to {}", new_start),
    )
    .await;

    get_appointment(db, id).await
}

pub async fn update_status(
    db: &MongoDB,
    id: &ObjectId,
    next: AppointmentStatus,
    notes: Option<String>,
) -> Result<Appointment, AppError> {
    let current = get_appointment(db, id).await?;

    validate_transition(current.status, next).map_err(AppError::InvalidRequest)?;

    let now = Utc::now().timestamp_millis();
    let mut set = doc! {
        "status": next.to_string(),
        "updated_at": now,
    };
    if let Some(notes) = notes {
        set.insert("notes", notes);
    }

    let collection = db.collection::<Appointment>("appointments");
    collection
        .update_one(doc! { "_id": id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    notification_service::notify(
        db,
        &current.patient_id,
        "appointment_status",
        "Appointment update",
        &format!("Your appointment is now {}", next),
    )
    .await;

    get_appointment(db, id).await
}

/// Cancel frees the slot: cancelled appointments are excluded from
/// conflict scans.
pub async fn cancel_appointment(db: &MongoDB, id: &ObjectId) -> Result<Appointment, AppError> {
    update_status(db, id, AppointmentStatus::Cancelled, None).await
}

/// File a leave window for a staff member
pub async fn create_leave(
    db: &MongoDB,
    staff_id: &str,
    from: i64,
    to: i64,
    reason: Option<String>,
) -> Result<LeaveRecord, AppError> {
    if from >= to {
        return Err(AppError::InvalidRequest("Leave must end after it starts".to_string()));
    }

    let users = db.collection::<User>("users");
    let staff = users
        .find_one(doc! { "user_id": staff_id })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", staff_id)))?;

    if !staff.roles.iter().any(|r| BOOKABLE_ROLES.contains(&r.as_str())) {
        return Err(AppError::InvalidRequest(
            "Leave records apply to bookable staff only".to_string(),
        ));
    }

    let mut leave = LeaveRecord {
        id: None,
        staff_id: staff_id.to_string(),
        from,
        to,
        reason,
        created_at: Utc::now().timestamp_millis(),
    };

    let collection = db.collection::<LeaveRecord>("leave_records");
    let result = collection
        .insert_one(&leave)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    leave.id = result.inserted_id.as_object_id();
    Ok(leave)
}

pub async fn list_leaves(
    db: &MongoDB,
    staff_id: Option<&str>,
) -> Result<Vec<LeaveRecord>, AppError> {
    let collection = db.collection::<LeaveRecord>("leave_records");

    let mut filter = doc! {};
    if let Some(staff_id) = staff_id {
        filter.insert("staff_id", staff_id);
    }

    let mut cursor = collection
        .find(filter)
        .sort(doc! { "from": 1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut leaves = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(leave) => leaves.push(leave),
            Err(e) => log::error!("❌ Failed to decode leave record: {}", e),
        }
    }

    Ok(leaves)
}

/// Free 30-minute slots of one staff member for one day
pub async fn availability(
    db: &MongoDB,
    staff_id: &str,
    date: &str,
) -> Result<Vec<FreeSlot>, AppError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidRequest("Date must be YYYY-MM-DD".to_string()))?;

    let day_start = Utc
        .from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("midnight"))
        .timestamp_millis();
    let day_end = day_start + 24 * 60 * MS_PER_MINUTE;

    let mut busy: Vec<(i64, i64)> = Vec::new();

    let appointments = db.collection::<Appointment>("appointments");
    let mut cursor = appointments
        .find(doc! {
            "staff_id": staff_id,
            "status": { "$ne": "cancelled" },
            "start": { "$gte": day_start - MAX_DURATION_MINUTES * MS_PER_MINUTE, "$lt": day_end },
        })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    while let Some(result) = cursor.next().await {
        let appt = result.map_err(|e| AppError::DatabaseError(e.to_string()))?;
        busy.push((appt.start, appt.start + appt.duration_minutes * MS_PER_MINUTE));
    }

    let leaves = db.collection::<LeaveRecord>("leave_records");
    let mut cursor = leaves
        .find(doc! {
            "staff_id": staff_id,
            "from": { "$lt": day_end },
            "to": { "$gt": day_start },
        })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    while let Some(result) = cursor.next().await {
        let leave = result.map_err(|e| AppError::DatabaseError(e.to_string()))?;
        busy.push((leave.from, leave.to));
    }

    Ok(free_slots(day, &busy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ms(date: &str, hour: u32, minute: u32) -> i64 {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Utc.from_utc_datetime(&day.and_hms_opt(hour, minute, 0).unwrap())
            .timestamp_millis()
    }

    #[test]
    fn overlap_predicate() {
        // touching intervals do not overlap
        assert!(!overlaps(0, 10, 10, 20));
        assert!(!overlaps(10, 20, 0, 10));
        // containment and partial overlap do
        assert!(overlaps(0, 30, 10, 20));
        assert!(overlaps(0, 15, 10, 20));
        assert!(overlaps(15, 25, 10, 20));
    }

    #[test]
    fn business_hours_bounds() {
        // 08:00 for 30 min is the first valid slot
        assert!(within_business_hours(ms("2026-09-01", 8, 0), 30).is_ok());
        // ends exactly at close: allowed
        assert!(within_business_hours(ms("2026-09-01", 16, 0), 60).is_ok());
        // before opening
        assert!(within_business_hours(ms("2026-09-01", 7, 30), 30).is_err());
        // runs past close
        assert!(within_business_hours(ms("2026-09-01", 16, 45), 30).is_err());
        // starts at close
        assert!(within_business_hours(ms("2026-09-01", 17, 0), 15).is_err());
    }

    #[test]
    fn transition_rules() {
        use AppointmentStatus::*;
        assert!(validate_transition(Scheduled, Confirmed).is_ok());
        assert!(validate_transition(Scheduled, Cancelled).is_ok());
        assert!(validate_transition(Confirmed, Completed).is_ok());
        assert!(validate_transition(Confirmed, NoShow).is_ok());
        // terminal states are final
        assert!(validate_transition(Completed, Confirmed).is_err());
        assert!(validate_transition(Cancelled, Scheduled).is_err());
        assert!(validate_transition(NoShow, Completed).is_err());
        // no going back and no no-ops
        assert!(validate_transition(Confirmed, Scheduled).is_err());
        assert!(validate_transition(Scheduled, Scheduled).is_err());
    }

    #[test]
    fn empty_day_has_full_grid() {
        let day = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let slots = free_slots(day, &[]);
        // 08:00..17:00 in 30-minute steps = 18 slots
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0].start, ms("2026-09-01", 8, 0));
        assert_eq!(slots.last().unwrap().end, ms("2026-09-01", 17, 0));
    }

    #[test]
    fn booked_and_leave_windows_remove_slots() {
        let day = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        // one appointment 09:00-09:45 and leave 14:00-16:00
        let busy = vec![
            (ms("2026-09-01", 9, 0), ms("2026-09-01", 9, 45)),
            (ms("2026-09-01", 14, 0), ms("2026-09-01", 16, 0)),
        ];
        let slots = free_slots(day, &busy);
        // 09:00 and 09:30 gone (45-min booking spills into the second slot),
        // 14:00..16:00 = 4 slots gone
        assert_eq!(slots.len(), 18 - 2 - 4);
        assert!(!slots.iter().any(|s| s.start == ms("2026-09-01", 9, 0)));
        assert!(!slots.iter().any(|s| s.start == ms("2026-09-01", 9, 30)));
        assert!(slots.iter().any(|s| s.start == ms("2026-09-01", 10, 0)));
        assert!(!slots.iter().any(|s| s.start == ms("2026-09-01", 15, 30)));
        assert!(slots.iter().any(|s| s.start == ms("2026-09-01", 16, 0)));
    }
}
