pub mod auth;
pub mod colors;
pub mod notes;
pub mod otp;
pub mod tags;
pub mod users;
