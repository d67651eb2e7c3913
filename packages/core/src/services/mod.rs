//! Business Services
//!
//! - `NestedSetService` - create, delete, move, rebuild and refresh of
//!   nested-set records, each in its own transaction

pub mod nested_set_service;

pub use nested_set_service::NestedSetService;
