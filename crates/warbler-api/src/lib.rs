pub mod auth;
pub mod error;
pub mod messages;
pub mod pages;
pub mod password;
pub mod routes;
pub mod sessions;
pub mod users;
