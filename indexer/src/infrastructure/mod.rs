pub mod chaindata;
pub mod node;
pub mod persistence;
pub mod publisher;
pub mod web;
