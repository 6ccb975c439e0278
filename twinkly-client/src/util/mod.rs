pub mod auth;
pub mod rc4;
