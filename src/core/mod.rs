// Core modules implementing library resolution, handle ownership, and errors.
pub mod config;
pub mod context;
pub mod digest;
pub mod error;
pub mod library;
pub mod resolve;
pub mod sys;
