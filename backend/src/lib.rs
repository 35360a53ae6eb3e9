pub mod api;
pub mod authenticate;
pub mod booker;
pub mod config;
pub mod draft;
pub mod error;
pub mod flow;
pub mod json_db;
pub mod payment;
pub mod pricing;
pub mod spots;
