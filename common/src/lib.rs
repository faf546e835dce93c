use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(not(target_arch = "wasm32"))]
use sqlx::FromRow;

pub mod utils;

/// Name of the channel staff dashboards subscribe to.
pub const DASHBOARD_CHANNEL: &str = "dashboard";

#[cfg_attr(not(target_arch = "wasm32"), derive(FromRow))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CarDto {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub seats: i64,
    pub price_per_day: i64,
    pub available: bool,
}

#[cfg_attr(not(target_arch = "wasm32"), derive(FromRow))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BookingDto {
    pub id: i64,
    pub car_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_date: String,
    pub return_date: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Validate)]
pub struct NewBookingDto {
    pub car_id: i64,
    #[validate(length(min = 1, max = 120))]
    pub customer_name: String,
    #[validate(custom(function = "utils::validate_phone"))]
    pub customer_phone: String,
    /// `YYYY-MM-DD`
    pub pickup_date: String,
    /// `YYYY-MM-DD`, not before `pickup_date`.
    pub return_date: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Validate)]
pub struct BookingStatusUpdate {
    #[validate(custom(function = "utils::validate_booking_status"))]
    pub status: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
}

/// Control messages a realtime client may send.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientMessage {
    JoinDashboard,
    LeaveDashboard,
}

/// Frame pushed to realtime clients: `{"event": ..., "data": ...}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ServerEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ServerEvent {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}
