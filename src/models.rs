// src/models.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    /// Anything the admin UI added later; kept so a page still loads.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Pending,
    Attended,
    NoShow,
    Cancelled,
    #[serde(other)]
    Other,
}

/// A row of the `bookings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// `HH:MM` or `HH:MM:SS`, as entered.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub attendance_status: Option<AttendanceStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub customer_profile_id: Option<i64>, // Foreign key to customers.id
    #[serde(default)]
    pub is_as_visit: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Minimal row, mostly useful for fixtures.
    pub fn new(id: i64, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            phone: Some(phone.into()),
            email: None,
            date: None,
            time: None,
            status: None,
            attendance_status: None,
            notes: None,
            customer_profile_id: None,
            is_as_visit: None,
            created_at: None,
        }
    }

    pub fn apply(&mut self, patch: &BookingPatch) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(id) = patch.customer_profile_id {
            self.customer_profile_id = Some(id);
        }
        if let Some(flag) = patch.is_as_visit {
            self.is_as_visit = Some(flag);
        }
    }
}

/// A row of the `customers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub visit_count: Option<i64>,
}

impl Customer {
    pub fn apply(&mut self, patch: &CustomerPatch) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(count) = patch.visit_count {
            self.visit_count = Some(count);
        }
    }
}

/// Partial update for `bookings`; unset fields are left out of the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_profile_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_as_visit: Option<bool>,
}

/// Partial update for `customers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub visit_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booking_row_from_postgrest() {
        let row = json!({
            "id": 129,
            "name": "조영택외 1명",
            "phone": "010-4245-0013",
            "date": "2025-11-26",
            "time": "14:00",
            "status": "confirmed",
            "attendance_status": "no_show",
            "notes": null,
            "customer_profile_id": null,
            "created_at": "2025-11-20T03:12:45.123456+00:00",
            "club": "드라이버"
        });
        let b: Booking = serde_json::from_value(row).unwrap();
        assert_eq!(b.id, 129);
        assert_eq!(b.date, NaiveDate::from_ymd_opt(2025, 11, 26));
        assert_eq!(b.status, Some(BookingStatus::Confirmed));
        assert_eq!(b.attendance_status, Some(AttendanceStatus::NoShow));
        assert!(b.created_at.is_some());
        assert_eq!(b.is_as_visit, None);
    }

    #[test]
    fn unknown_status_does_not_fail() {
        let b: Booking =
            serde_json::from_value(json!({ "id": 1, "status": "rescheduled" })).unwrap();
        assert_eq!(b.status, Some(BookingStatus::Other));
        assert_eq!(b.name, None);
    }

    #[test]
    fn patch_skips_unset_fields() {
        let patch = BookingPatch {
            name: Some("조영택".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "name": "조영택" }));
        assert_eq!(
            serde_json::to_value(CustomerPatch::default()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn apply_patch() {
        let mut b = Booking::new(1, "김민수(여자)", "01012345678");
        b.apply(&BookingPatch {
            name: Some("김민수".into()),
            notes: Some("[여자 동반 방문]".into()),
            ..Default::default()
        });
        assert_eq!(b.name.as_deref(), Some("김민수"));
        assert_eq!(b.notes.as_deref(), Some("[여자 동반 방문]"));
        assert_eq!(b.phone.as_deref(), Some("01012345678"));
    }
}
