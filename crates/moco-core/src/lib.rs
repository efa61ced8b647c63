pub mod config;
pub mod consts;
pub mod decompose;
pub mod engine;
pub mod error;
pub mod filters;
pub mod io;
pub mod pipeline;
pub mod reference;
pub mod register;
pub mod stack;
pub mod workspace;
