//! Data Models
//!
//! This module contains the data structures shared by every tree operation:
//!
//! - `Role`, `TreeMapping`, `TreeSchema` - declarative field-role mapping
//! - `TreeRecord` - the trait caller record types implement
//! - `NodeDescriptor` - uniform view of a tree row, independent of record type
//! - `TreeValue` - field ↔ column value conversions
//! - `MoveDirection` - where a moved subtree lands relative to its target

mod direction;
mod mapping;
mod record;
mod value;

pub use direction::MoveDirection;
pub use mapping::{MappingError, Role, TreeMapping, TreeSchema};
pub use record::{NodeDescriptor, TreeRecord};
pub use value::{same_value, TreeValue, ValueKey};
