pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod frames;
pub mod jobs;
pub mod model;
pub mod postgres;
pub mod resolver;
pub mod shape;
pub mod store;
pub mod temporal;
pub mod validation;
