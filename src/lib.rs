pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod platform;
pub mod providers;
pub mod router;
pub mod routes;
pub mod state;
pub mod store;
pub mod supervisor;
pub mod vault;
