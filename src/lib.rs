pub mod auth;
pub mod db;
pub mod hierarchy;
pub mod ipc;
pub mod reconcile;
pub mod taxonomy;
