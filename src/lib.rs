pub mod error;
pub mod impact;
pub mod product;
pub mod service;
pub mod time;
pub mod transaction;
pub mod user;
pub mod utils;
