//! CLI Commands

pub mod new_module;
pub mod run;
pub mod scenarios;
pub mod serve;
pub mod session;
