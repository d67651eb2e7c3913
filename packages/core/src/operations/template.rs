//! Statement Templater
//!
//! Mutation statements are written once in terms of abstract roles (`:id`,
//! `:parent_id`, `:lft`, `:rgt`, `:depth`, `:children_count`) and rendered
//! against a record type's physical column names. Positional `?` markers and
//! any other text pass through untouched; a placeholder the type does not
//! declare is left as literal text.
//!
//! [`TreeStatements`] holds the full rendered statement set for one record
//! type. It depends only on the type, never on an instance, so the service
//! builds it once per type and caches it.

use crate::models::{NodeDescriptor, Role, TreeSchema};
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};

const SELECT_NODE: &str =
    "SELECT :id, :parent_id, :lft, :rgt, {depth}, {children_count} FROM {table} WHERE :id = ?{scope}";
const SELECT_SCOPE: &str = "SELECT :id, :parent_id, :lft, :rgt, {depth}, {children_count} FROM {table} WHERE :id IS NOT NULL{scope} ORDER BY :lft, :id";
const MAX_RGT: &str = "SELECT COALESCE(MAX(:rgt), 0) FROM {table} WHERE :rgt > 0{scope}";
const SHIFT_LFT: &str = "UPDATE {table} SET :lft = :lft + ? WHERE :lft >= ?{scope}";
const SHIFT_RGT: &str = "UPDATE {table} SET :rgt = :rgt + ? WHERE :rgt >= ?{scope}";
const ADJUST_CHILDREN_COUNT: &str =
    "UPDATE {table} SET :children_count = :children_count + ? WHERE :id = ?{scope}";
const DELETE_RANGE: &str = "DELETE FROM {table} WHERE :lft >= ? AND :rgt <= ?{scope}";
const DETACH_RANGE: &str =
    "UPDATE {table} SET :lft = 0 - :lft, :rgt = 0 - :rgt WHERE :lft >= ? AND :rgt <= ?{scope}";
const REATTACH_WITH_DEPTH: &str = "UPDATE {table} SET :lft = ? - :lft, :rgt = ? - :rgt, :depth = :depth + ? WHERE :lft < 0{scope}";
const REATTACH: &str = "UPDATE {table} SET :lft = ? - :lft, :rgt = ? - :rgt WHERE :lft < 0{scope}";
const SET_PARENT: &str = "UPDATE {table} SET :parent_id = ? WHERE :id = ?{scope}";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r":(id|parent_id|lft|rgt|depth|children_count)\b")
            .expect("placeholder pattern is a valid regex")
    })
}

/// Substitute role placeholders with the schema's column names
///
/// # Examples
///
/// ```rust
/// use nestedset_core::models::{TreeMapping, TreeSchema};
/// use nestedset_core::operations::render;
///
/// let schema = TreeSchema::from_mapping(
///     "SpecialItem",
///     TreeMapping::new("special_items").id("item_id").parent_id("pid").lft("left").rgt("right"),
/// )
/// .unwrap();
///
/// assert_eq!(render(":id = ? AND :lft > :rgt", &schema), "item_id = ? AND left > right");
/// // depth is not declared by this type, so it stays literal
/// assert_eq!(render(":depth = 0", &schema), ":depth = 0");
/// ```
pub fn render(template: &str, schema: &TreeSchema) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            Role::from_name(&caps[1])
                .and_then(|role| schema.column(role))
                .map(str::to_string)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Render a template against the columns of the descriptor's record type
pub fn render_for(template: &str, node: &NodeDescriptor) -> String {
    render(template, node.schema())
}

/// Rendered statement set for one record type
///
/// Every statement except [`insert`](Self::insert) ends with the scope filter,
/// so the scope values are always the trailing positional parameters.
#[derive(Debug, Clone)]
pub struct TreeStatements {
    schema: Arc<TreeSchema>,
    scope_clause: String,
    pub select_node: String,
    pub select_scope: String,
    pub max_rgt: String,
    pub shift_lft: String,
    pub shift_rgt: String,
    pub adjust_children_count: Option<String>,
    pub delete_range: String,
    pub detach_range: String,
    pub reattach: String,
    pub set_parent: String,
    pub rewrite_node: String,
}

impl TreeStatements {
    pub fn new(schema: Arc<TreeSchema>) -> Self {
        // `IS` so a NULL scope value selects the NULL-scoped forest
        let scope_clause = schema
            .scope_columns()
            .iter()
            .map(|column| format!("{} IS ?", column))
            .collect::<Vec<_>>()
            .join(" AND ");
        let scope_suffix = if scope_clause.is_empty() {
            String::new()
        } else {
            format!(" AND {}", scope_clause)
        };

        let build = |template: &str| -> String {
            let structural = template
                .replace("{table}", schema.table_name())
                .replace("{scope}", &scope_suffix)
                .replace(
                    "{depth}",
                    if schema.has_depth() { ":depth" } else { "0" },
                )
                .replace(
                    "{children_count}",
                    if schema.has_children_count() {
                        ":children_count"
                    } else {
                        "0"
                    },
                );
            render(&structural, &schema)
        };

        let mut rewrite = String::from("UPDATE {table} SET :lft = ?, :rgt = ?");
        if schema.has_depth() {
            rewrite.push_str(", :depth = ?");
        }
        if schema.has_children_count() {
            rewrite.push_str(", :children_count = ?");
        }
        rewrite.push_str(" WHERE :id = ?{scope}");

        Self {
            select_node: build(SELECT_NODE),
            select_scope: build(SELECT_SCOPE),
            max_rgt: build(MAX_RGT),
            shift_lft: build(SHIFT_LFT),
            shift_rgt: build(SHIFT_RGT),
            adjust_children_count: schema
                .has_children_count()
                .then(|| build(ADJUST_CHILDREN_COUNT)),
            delete_range: build(DELETE_RANGE),
            detach_range: build(DETACH_RANGE),
            reattach: if schema.has_depth() {
                build(REATTACH_WITH_DEPTH)
            } else {
                build(REATTACH)
            },
            set_parent: build(SET_PARENT),
            rewrite_node: build(&rewrite),
            scope_clause,
            schema,
        }
    }

    pub fn schema(&self) -> &Arc<TreeSchema> {
        &self.schema
    }

    /// Scope filter as it appears in every scoped statement, without the
    /// leading `AND`; empty for unscoped types
    pub fn scope_clause(&self) -> &str {
        &self.scope_clause
    }

    /// INSERT for the given physical columns, in order
    pub fn insert(&self, columns: &[String]) -> String {
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.schema.table_name(),
            columns.join(", "),
            placeholders
        )
    }
}
