pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use config::*;
pub use errors::*;
pub use models::*;
pub use services::*;
pub use utils::*;
