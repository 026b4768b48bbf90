pub mod db;
pub mod draft;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod service;
