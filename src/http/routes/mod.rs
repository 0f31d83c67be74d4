pub mod admin;
pub mod coordinator;
pub mod faculty;
pub mod health;
pub mod panels;
