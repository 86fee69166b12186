pub mod access_service;
pub mod change_service;
pub mod rate_limit;
