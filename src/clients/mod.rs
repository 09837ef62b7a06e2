pub mod facade;
pub mod health;
pub mod rbmq;
