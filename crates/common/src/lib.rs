pub mod admin_http;
pub mod env;
pub mod utils;
