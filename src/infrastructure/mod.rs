pub mod config;
pub mod db;
pub mod rate_limiter;
pub mod repositories;
