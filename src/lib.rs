pub mod config;
pub mod errors;
pub mod init;
pub mod logging;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod reservation;
pub mod ticket;
pub mod ui;
