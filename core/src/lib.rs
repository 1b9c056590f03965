pub mod csv_io;
pub mod db;
pub mod engine;
pub mod models;
pub mod service;
