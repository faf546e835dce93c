//! Car rental backend: HTTP API, database bootstrap and the realtime
//! dashboard notification channel.
pub mod bookings;
pub mod bootstrap;
pub mod config;
pub mod cors;
pub mod db;
pub mod error;
pub mod extractors;
pub mod realtime;
pub mod web_server;
