pub mod health;
pub mod objects;
