pub mod persistence;
pub mod push;
