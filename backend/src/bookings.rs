//! Car and booking handlers. Every successful booking write is announced on
//! the dashboard channel.

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use common::{BookingDto, BookingStatusUpdate, CarDto, NewBookingDto, DASHBOARD_CHANNEL};
use validator::Validate;

use crate::error::AppError;
use crate::extractors::JsonOrForm;
use crate::web_server::AppState;

pub const BOOKING_CREATED: &str = "bookingCreated";
pub const BOOKING_UPDATED: &str = "bookingUpdated";

const BOOKING_COLUMNS: &str =
    "id, car_id, customer_name, customer_phone, pickup_date, return_date, status, created_at";

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::invalid_field(field, format!("{field} must be a YYYY-MM-DD date")))
}

/// The write already happened, so a failed announcement is only logged.
fn announce(state: &AppState, event: &str, booking: &BookingDto) {
    if let Err(e) = state.gateway.publish_json(DASHBOARD_CHANNEL, event, booking) {
        tracing::error!("Failed to serialize booking {}: {}", booking.id, e);
    }
}

#[debug_handler]
pub async fn list_cars(State(state): State<AppState>) -> Result<Json<Vec<CarDto>>, AppError> {
    tracing::info!("Fetching all cars");

    let cars = sqlx::query_as::<_, CarDto>(
        "SELECT id, name, category, seats, price_per_day, available FROM cars ORDER BY id",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(cars))
}

#[debug_handler]
pub async fn list_bookings(
    State(state): State<AppState>,
) -> Result<Json<Vec<BookingDto>>, AppError> {
    tracing::info!("Fetching all bookings");

    let bookings = sqlx::query_as::<_, BookingDto>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(bookings))
}

#[debug_handler]
pub async fn create_booking(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<NewBookingDto>,
) -> Result<(StatusCode, Json<BookingDto>), AppError> {
    payload.validate()?;
    let pickup = parse_date("pickup_date", &payload.pickup_date)?;
    let return_date = parse_date("return_date", &payload.return_date)?;
    if return_date < pickup {
        return Err(AppError::invalid_field(
            "return_date",
            "return_date must not be before pickup_date",
        ));
    }

    let car_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM cars WHERE id = ?")
        .bind(payload.car_id)
        .fetch_optional(&state.db_pool)
        .await?;
    if car_exists.is_none() {
        return Err(AppError::NotFound);
    }

    tracing::info!("Creating booking for car {}", payload.car_id);

    let booking = sqlx::query_as::<_, BookingDto>(&format!(
        "INSERT INTO bookings (car_id, customer_name, customer_phone, pickup_date, return_date)
         VALUES (?, ?, ?, ?, ?)
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(payload.car_id)
    .bind(payload.customer_name.trim())
    .bind(payload.customer_phone.trim())
    .bind(pickup.to_string())
    .bind(return_date.to_string())
    .fetch_one(&state.db_pool)
    .await?;

    announce(&state, BOOKING_CREATED, &booking);
    Ok((StatusCode::CREATED, Json(booking)))
}

#[debug_handler]
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonOrForm(update): JsonOrForm<BookingStatusUpdate>,
) -> Result<Json<BookingDto>, AppError> {
    update.validate()?;
    tracing::info!("Updating booking {} to {}", id, update.status);

    let booking = sqlx::query_as::<_, BookingDto>(&format!(
        "UPDATE bookings SET status = ? WHERE id = ? RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(&update.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::NotFound)?;

    announce(&state, BOOKING_UPDATED, &booking);
    Ok(Json(booking))
}
