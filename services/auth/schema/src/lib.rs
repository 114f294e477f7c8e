//! sea-orm entities for the auth service schema.

pub mod bridge_tokens;
pub mod otp_devices;
pub mod outbox_events;
pub mod trusted_devices;
pub mod users;
