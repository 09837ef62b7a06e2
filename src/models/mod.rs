pub mod category;
pub mod envelope;
pub mod health;
pub mod payload;
pub mod role;
