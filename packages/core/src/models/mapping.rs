//! Field-Role Mapping
//!
//! Every record type stored as a nested set declares which of its columns plays
//! each tree role. The declaration is a [`TreeMapping`] built once per type; the
//! resolver validates it into a [`TreeSchema`], which is the only shape the
//! operations ever look at.
//!
//! # Examples
//!
//! ```rust
//! use nestedset_core::models::{Role, TreeMapping, TreeSchema};
//!
//! let mapping = TreeMapping::new("categories")
//!     .id("id")
//!     .parent_id("parent_id")
//!     .lft("lft")
//!     .rgt("rgt")
//!     .depth("depth")
//!     .children_count("children_count")
//!     .scope("user_id")
//!     .scope("user_type");
//!
//! let schema = TreeSchema::from_mapping("Category", mapping).unwrap();
//! assert_eq!(schema.column(Role::Lft), Some("lft"));
//! assert_eq!(schema.scope_columns(), ["user_id", "user_type"]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Abstract responsibility a column can play in the tree encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Id,
    ParentId,
    Lft,
    Rgt,
    Depth,
    ChildrenCount,
    Scope,
}

impl Role {
    /// Roles that can appear as `:name` placeholders in statement templates
    pub const PLACEHOLDERS: [Role; 6] = [
        Role::Id,
        Role::ParentId,
        Role::Lft,
        Role::Rgt,
        Role::Depth,
        Role::ChildrenCount,
    ];

    /// Roles every record type must declare
    pub const REQUIRED: [Role; 4] = [Role::Id, Role::ParentId, Role::Lft, Role::Rgt];

    /// Canonical role name, as used in placeholders and `column_names()`
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Id => "id",
            Role::ParentId => "parent_id",
            Role::Lft => "lft",
            Role::Rgt => "rgt",
            Role::Depth => "depth",
            Role::ChildrenCount => "children_count",
            Role::Scope => "scope",
        }
    }

    /// Parse a canonical role name
    pub fn from_name(name: &str) -> Option<Role> {
        match name {
            "id" => Some(Role::Id),
            "parent_id" => Some(Role::ParentId),
            "lft" => Some(Role::Lft),
            "rgt" => Some(Role::Rgt),
            "depth" => Some(Role::Depth),
            "children_count" => Some(Role::ChildrenCount),
            "scope" => Some(Role::Scope),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while resolving a record type's role declaration
///
/// All of these are fatal to the call that triggered resolution and are raised
/// before any statement touches storage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    /// The declaration names no table
    #[error("Record type '{type_name}' declares an empty table name")]
    EmptyTable { type_name: String },

    /// One of id, parent_id, lft, rgt is not declared
    #[error("Record type '{type_name}' does not declare the required '{role}' role")]
    MissingRole { type_name: String, role: Role },

    /// A single-valued role is declared more than once
    #[error("Record type '{type_name}' declares the '{role}' role more than once")]
    DuplicateRole { type_name: String, role: Role },

    /// The same column is bound to two roles
    #[error("Record type '{type_name}' binds column '{column}' to more than one role")]
    DuplicateColumn { type_name: String, column: String },

    /// The record returned a different number of scope values than it declared
    #[error("Record type '{type_name}' declares {expected} scope column(s) but supplied {actual} value(s)")]
    ScopeArity {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// A field value could not be converted to or from its column value
    #[error("Invalid value for '{role}': {reason}")]
    InvalidValue { role: Role, reason: String },
}

impl MappingError {
    /// Create an invalid value error
    pub fn invalid_value(role: Role, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            role,
            reason: reason.into(),
        }
    }
}

/// Unvalidated declaration of a record type's table and role columns
#[derive(Debug, Clone, Default)]
pub struct TreeMapping {
    table: String,
    bindings: Vec<(Role, String)>,
}

impl TreeMapping {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            bindings: Vec::new(),
        }
    }

    /// Bind `column` to `role`
    ///
    /// Scope may be bound any number of times; the declaration order of scope
    /// columns is the order of [`TreeRecord::scope_values`](crate::models::TreeRecord::scope_values).
    pub fn role(mut self, role: Role, column: impl Into<String>) -> Self {
        self.bindings.push((role, column.into()));
        self
    }

    pub fn id(self, column: impl Into<String>) -> Self {
        self.role(Role::Id, column)
    }

    pub fn parent_id(self, column: impl Into<String>) -> Self {
        self.role(Role::ParentId, column)
    }

    pub fn lft(self, column: impl Into<String>) -> Self {
        self.role(Role::Lft, column)
    }

    pub fn rgt(self, column: impl Into<String>) -> Self {
        self.role(Role::Rgt, column)
    }

    pub fn depth(self, column: impl Into<String>) -> Self {
        self.role(Role::Depth, column)
    }

    pub fn children_count(self, column: impl Into<String>) -> Self {
        self.role(Role::ChildrenCount, column)
    }

    pub fn scope(self, column: impl Into<String>) -> Self {
        self.role(Role::Scope, column)
    }
}

/// Validated column layout of a nested-set table
///
/// A pure function of the record type: two instances of the same type always
/// resolve to equal schemas, which is what makes per-type statement caching
/// sound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSchema {
    type_name: String,
    table: String,
    id: String,
    parent_id: String,
    lft: String,
    rgt: String,
    depth: Option<String>,
    children_count: Option<String>,
    scope: Vec<String>,
}

impl TreeSchema {
    /// Validate a declaration
    ///
    /// # Errors
    ///
    /// - `EmptyTable` if the table name is blank
    /// - `MissingRole` if id, parent_id, lft or rgt is absent
    /// - `DuplicateRole` if a non-scope role is bound twice
    /// - `DuplicateColumn` if one column is bound to two roles
    pub fn from_mapping(
        type_name: impl Into<String>,
        mapping: TreeMapping,
    ) -> Result<Self, MappingError> {
        let type_name = type_name.into();

        if mapping.table.trim().is_empty() {
            return Err(MappingError::EmptyTable { type_name });
        }

        let mut singles: BTreeMap<Role, String> = BTreeMap::new();
        let mut scope = Vec::new();
        let mut seen_columns = HashSet::new();

        for (role, column) in mapping.bindings {
            if !seen_columns.insert(column.clone()) {
                return Err(MappingError::DuplicateColumn { type_name, column });
            }
            if role == Role::Scope {
                scope.push(column);
            } else if singles.insert(role, column).is_some() {
                return Err(MappingError::DuplicateRole { type_name, role });
            }
        }

        for role in Role::REQUIRED {
            if !singles.contains_key(&role) {
                return Err(MappingError::MissingRole { type_name, role });
            }
        }

        let mut take = |role: Role| singles.remove(&role);

        Ok(Self {
            table: mapping.table,
            id: take(Role::Id).unwrap_or_default(),
            parent_id: take(Role::ParentId).unwrap_or_default(),
            lft: take(Role::Lft).unwrap_or_default(),
            rgt: take(Role::Rgt).unwrap_or_default(),
            depth: take(Role::Depth),
            children_count: take(Role::ChildrenCount),
            scope,
            type_name,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Physical column bound to `role`
    ///
    /// Returns `None` for undeclared optional roles. Scope may have several
    /// columns, so `Role::Scope` resolves to the first one; use
    /// [`scope_columns`](Self::scope_columns) for the full list.
    pub fn column(&self, role: Role) -> Option<&str> {
        match role {
            Role::Id => Some(&self.id),
            Role::ParentId => Some(&self.parent_id),
            Role::Lft => Some(&self.lft),
            Role::Rgt => Some(&self.rgt),
            Role::Depth => self.depth.as_deref(),
            Role::ChildrenCount => self.children_count.as_deref(),
            Role::Scope => self.scope.first().map(String::as_str),
        }
    }

    pub fn id_column(&self) -> &str {
        &self.id
    }

    pub fn parent_id_column(&self) -> &str {
        &self.parent_id
    }

    pub fn lft_column(&self) -> &str {
        &self.lft
    }

    pub fn rgt_column(&self) -> &str {
        &self.rgt
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn has_children_count(&self) -> bool {
        self.children_count.is_some()
    }

    pub fn scope_columns(&self) -> &[String] {
        &self.scope
    }

    /// Role name → column for every declared single-valued role
    pub fn column_names(&self) -> BTreeMap<&'static str, String> {
        Role::PLACEHOLDERS
            .iter()
            .filter_map(|role| {
                self.column(*role)
                    .map(|column| (role.as_str(), column.to_string()))
            })
            .collect()
    }
}
