//! Tree records and their uniform descriptor
//!
//! Callers keep their own record types. [`TreeRecord`] is the registration
//! point: it declares the role mapping and gives role-addressed access to the
//! fields. The engine never sees the concrete type past the resolver; it works
//! on [`NodeDescriptor`]s.

use crate::models::mapping::{Role, TreeMapping, TreeSchema};
use crate::models::value::same_value;
use libsql::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A caller-defined record type stored in a nested-set table
///
/// # Examples
///
/// ```rust
/// use libsql::Value;
/// use nestedset_core::models::{Role, TreeMapping, TreeRecord, TreeValue};
///
/// struct Folder {
///     id: i64,
///     parent: Option<i64>,
///     lft: i64,
///     rgt: i64,
///     name: String,
/// }
///
/// impl TreeRecord for Folder {
///     fn tree_mapping() -> TreeMapping {
///         TreeMapping::new("folders").id("id").parent_id("parent").lft("lft").rgt("rgt")
///     }
///
///     fn read_role(&self, role: Role) -> Value {
///         match role {
///             Role::Id => self.id.to_value(),
///             Role::ParentId => self.parent.to_value(),
///             Role::Lft => self.lft.to_value(),
///             Role::Rgt => self.rgt.to_value(),
///             _ => Value::Null,
///         }
///     }
///
///     fn write_role(&mut self, role: Role, value: Value) -> Result<(), String> {
///         match role {
///             Role::Id => self.id = TreeValue::from_value(value)?,
///             Role::ParentId => self.parent = TreeValue::from_value(value)?,
///             Role::Lft => self.lft = TreeValue::from_value(value)?,
///             Role::Rgt => self.rgt = TreeValue::from_value(value)?,
///             _ => {}
///         }
///         Ok(())
///     }
///
///     fn data_columns(&self) -> Vec<(String, Value)> {
///         vec![("name".to_string(), self.name.to_value())]
///     }
/// }
/// ```
pub trait TreeRecord: Send + Sync + 'static {
    /// Table and role columns for this type
    fn tree_mapping() -> TreeMapping;

    /// Current value of the field playing `role`
    ///
    /// Only called for declared single-valued roles. `Role::ParentId` must
    /// read as `Value::Null` for roots; `Role::Id` may read as `Value::Null`
    /// before insertion when the table generates ids.
    fn read_role(&self, role: Role) -> Value;

    /// Scope field values, in the order the scope columns were declared
    fn scope_values(&self) -> Vec<Value> {
        Vec::new()
    }

    /// Store `value` into the field playing `role`
    ///
    /// Called after a successful operation to reflect new bounds, depth,
    /// children count, parent and generated id.
    fn write_role(&mut self, role: Role, value: Value) -> Result<(), String>;

    /// Non-tree columns written when the record is inserted
    fn data_columns(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// Canonical in-memory view of one tree row
///
/// Built by the resolver for the duration of a single operation and never
/// persisted as such.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub id: Value,
    pub parent_id: Option<Value>,
    pub lft: i64,
    pub rgt: i64,
    pub depth: i64,
    pub children_count: i64,
    pub scope: Vec<(String, Value)>,
    schema: Arc<TreeSchema>,
}

impl NodeDescriptor {
    pub(crate) fn new(schema: Arc<TreeSchema>, id: Value, scope: Vec<(String, Value)>) -> Self {
        Self {
            id,
            parent_id: None,
            lft: 0,
            rgt: 0,
            depth: 0,
            children_count: 0,
            scope,
            schema,
        }
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    pub fn schema(&self) -> &TreeSchema {
        &self.schema
    }

    /// Role name → physical column
    pub fn column_names(&self) -> BTreeMap<&'static str, String> {
        self.schema.column_names()
    }

    /// Number of lft/rgt slots the node and its subtree occupy
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether `other` lies inside this node's interval (itself included)
    pub fn contains(&self, other: &NodeDescriptor) -> bool {
        self.lft <= other.lft && other.rgt <= self.rgt
    }

    pub fn same_id(&self, other: &NodeDescriptor) -> bool {
        same_value(&self.id, &other.id)
    }

    pub fn same_scope(&self, other: &NodeDescriptor) -> bool {
        self.scope.len() == other.scope.len()
            && self
                .scope
                .iter()
                .zip(other.scope.iter())
                .all(|((a_col, a_val), (b_col, b_val))| a_col == b_col && same_value(a_val, b_val))
    }

    pub fn scope_values(&self) -> Vec<Value> {
        self.scope.iter().map(|(_, value)| value.clone()).collect()
    }
}
