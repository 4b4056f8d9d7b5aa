pub mod cognito_service;
pub mod jwt_service;

pub use cognito_service::*;
pub use jwt_service::*;
