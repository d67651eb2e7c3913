//! Shared fixtures for the integration tests
//!
//! Each test gets its own on-disk libsql database in a `TempDir`, with the
//! fixture tables created up front.

#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use libsql::params::Params;
use libsql::{Connection, Value};
use nestedset_core::db::DatabaseService;
use nestedset_core::models::{Role, TreeMapping, TreeRecord, TreeValue};
use nestedset_core::services::NestedSetService;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Once};
use tempfile::TempDir;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE categories (
        id TEXT PRIMARY KEY,
        parent_id TEXT,
        lft INTEGER NOT NULL DEFAULT 0,
        rgt INTEGER NOT NULL DEFAULT 0,
        depth INTEGER NOT NULL DEFAULT 0,
        children_count INTEGER NOT NULL DEFAULT 0,
        user_id INTEGER NOT NULL,
        user_type TEXT NOT NULL,
        title TEXT NOT NULL
    )",
    "CREATE TABLE special_items (
        item_id INTEGER PRIMARY KEY,
        pid INTEGER,
        item_left INTEGER NOT NULL DEFAULT 0,
        item_right INTEGER NOT NULL DEFAULT 0,
        depth1 INTEGER NOT NULL DEFAULT 0,
        nodes_count INTEGER NOT NULL DEFAULT 0,
        name TEXT
    )",
    "CREATE TABLE journal_entries (
        id INTEGER PRIMARY KEY,
        parent_id INTEGER,
        lft INTEGER NOT NULL DEFAULT 0,
        rgt INTEGER NOT NULL DEFAULT 0,
        depth INTEGER NOT NULL DEFAULT 0,
        children_count INTEGER NOT NULL DEFAULT 0,
        entry_date TEXT NOT NULL,
        body TEXT
    )",
    "CREATE TABLE plain_nodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pid INTEGER,
        l INTEGER NOT NULL DEFAULT 0,
        r INTEGER NOT NULL DEFAULT 0,
        label TEXT
    )",
    "CREATE TABLE tagged_nodes (
        id INTEGER PRIMARY KEY,
        parent_id INTEGER,
        lft INTEGER NOT NULL DEFAULT 0,
        rgt INTEGER NOT NULL DEFAULT 0,
        depth INTEGER NOT NULL DEFAULT 0,
        children_count INTEGER NOT NULL DEFAULT 0,
        tag TEXT
    )",
];

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Fresh database with every fixture table, plus a service bound to it
///
/// Keep the `TempDir` alive for the duration of the test.
pub async fn create_test_env() -> Result<(NestedSetService, TempDir)> {
    init_tracing();

    let temp_dir = TempDir::new()?;
    let db = DatabaseService::new(temp_dir.path().join("tree.db")).await?;

    let conn = db.connect_with_timeout().await?;
    for sql in SCHEMA {
        conn.execute(sql, ()).await?;
    }

    Ok((NestedSetService::new(Arc::new(db)), temp_dir))
}

pub async fn connect(service: &NestedSetService) -> Result<Connection> {
    Ok(service.database().connect_with_timeout().await?)
}

// =========================================================================
// Category: UUID ids, two scope columns
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub lft: i64,
    pub rgt: i64,
    pub depth: i64,
    pub children_count: i64,
    pub user_id: i64,
    pub user_type: String,
    pub title: String,
}

impl Category {
    pub fn new(title: &str, user_id: i64, user_type: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_type: user_type.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.lft, self.rgt)
    }
}

impl TreeRecord for Category {
    fn tree_mapping() -> TreeMapping {
        TreeMapping::new("categories")
            .id("id")
            .parent_id("parent_id")
            .lft("lft")
            .rgt("rgt")
            .depth("depth")
            .children_count("children_count")
            .scope("user_id")
            .scope("user_type")
    }

    fn read_role(&self, role: Role) -> Value {
        match role {
            Role::Id => self.id.to_value(),
            Role::ParentId => self.parent_id.to_value(),
            Role::Lft => self.lft.to_value(),
            Role::Rgt => self.rgt.to_value(),
            Role::Depth => self.depth.to_value(),
            Role::ChildrenCount => self.children_count.to_value(),
            Role::Scope => Value::Null,
        }
    }

    fn scope_values(&self) -> Vec<Value> {
        vec![self.user_id.to_value(), self.user_type.to_value()]
    }

    fn write_role(&mut self, role: Role, value: Value) -> Result<(), String> {
        match role {
            Role::Id => self.id = TreeValue::from_value(value)?,
            Role::ParentId => self.parent_id = TreeValue::from_value(value)?,
            Role::Lft => self.lft = TreeValue::from_value(value)?,
            Role::Rgt => self.rgt = TreeValue::from_value(value)?,
            Role::Depth => self.depth = TreeValue::from_value(value)?,
            Role::ChildrenCount => self.children_count = TreeValue::from_value(value)?,
            Role::Scope => {}
        }
        Ok(())
    }

    fn data_columns(&self) -> Vec<(String, Value)> {
        vec![("title".to_string(), self.title.to_value())]
    }
}

/// Stored layout of one category: (lft, rgt, depth, children_count)
pub type Layout = (i64, i64, i64, i64);

/// Title → stored layout for every category in a scope
pub async fn category_layout(
    service: &NestedSetService,
    user_id: i64,
    user_type: &str,
) -> Result<BTreeMap<String, Layout>> {
    let conn = connect(service).await?;
    let mut rows = conn
        .query(
            "SELECT title, lft, rgt, depth, children_count FROM categories \
             WHERE user_id = ? AND user_type = ? ORDER BY lft",
            Params::Positional(vec![
                Value::Integer(user_id),
                Value::Text(user_type.to_string()),
            ]),
        )
        .await?;

    let mut layout = BTreeMap::new();
    while let Some(row) = rows.next().await? {
        layout.insert(
            row.get::<String>(0)?,
            (
                row.get::<i64>(1)?,
                row.get::<i64>(2)?,
                row.get::<i64>(3)?,
                row.get::<i64>(4)?,
            ),
        );
    }
    Ok(layout)
}

/// The clothing catalogue, built child by child in pre-order:
///
/// ```text
/// clothing [1,22]
/// ├── mens [2,9]
/// │   └── suits [3,8]
/// │       ├── slacks [4,5]
/// │       └── jackets [6,7]
/// └── womens [10,21]
///     ├── dresses [11,16]
///     │   ├── evening_gowns [12,13]
///     │   └── sun_dresses [14,15]
///     ├── skirts [17,18]
///     └── blouses [19,20]
/// ```
pub async fn build_clothing_tree(
    service: &NestedSetService,
    user_id: i64,
    user_type: &str,
) -> Result<HashMap<String, Category>> {
    const TREE: &[(&str, Option<&str>)] = &[
        ("clothing", None),
        ("mens", Some("clothing")),
        ("suits", Some("mens")),
        ("slacks", Some("suits")),
        ("jackets", Some("suits")),
        ("womens", Some("clothing")),
        ("dresses", Some("womens")),
        ("evening_gowns", Some("dresses")),
        ("sun_dresses", Some("dresses")),
        ("skirts", Some("womens")),
        ("blouses", Some("womens")),
    ];

    let mut nodes: HashMap<String, Category> = HashMap::new();
    for (title, parent) in TREE {
        let mut category = Category::new(title, user_id, user_type);
        let parent = parent.and_then(|p| nodes.get(p)).cloned();
        service.create(&mut category, parent.as_ref()).await?;
        nodes.insert(title.to_string(), category);
    }
    Ok(nodes)
}

/// Re-read every record in `nodes` from storage
pub async fn refresh_all(
    service: &NestedSetService,
    nodes: &mut HashMap<String, Category>,
) -> Result<()> {
    for category in nodes.values_mut() {
        service.refresh(category).await?;
    }
    Ok(())
}

// =========================================================================
// SpecialItem: renamed columns, no scope
// =========================================================================

#[derive(Debug, Clone, Default)]
pub struct SpecialItem {
    pub item_id: i64,
    pub pid: Option<i64>,
    pub item_left: i64,
    pub item_right: i64,
    pub depth1: i64,
    pub nodes_count: i64,
    pub name: String,
}

impl SpecialItem {
    pub fn new(item_id: i64, name: &str) -> Self {
        Self {
            item_id,
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl TreeRecord for SpecialItem {
    fn tree_mapping() -> TreeMapping {
        TreeMapping::new("special_items")
            .id("item_id")
            .parent_id("pid")
            .lft("item_left")
            .rgt("item_right")
            .depth("depth1")
            .children_count("nodes_count")
    }

    fn read_role(&self, role: Role) -> Value {
        match role {
            Role::Id => self.item_id.to_value(),
            Role::ParentId => self.pid.to_value(),
            Role::Lft => self.item_left.to_value(),
            Role::Rgt => self.item_right.to_value(),
            Role::Depth => self.depth1.to_value(),
            Role::ChildrenCount => self.nodes_count.to_value(),
            Role::Scope => Value::Null,
        }
    }

    fn write_role(&mut self, role: Role, value: Value) -> Result<(), String> {
        match role {
            Role::Id => self.item_id = TreeValue::from_value(value)?,
            Role::ParentId => self.pid = TreeValue::from_value(value)?,
            Role::Lft => self.item_left = TreeValue::from_value(value)?,
            Role::Rgt => self.item_right = TreeValue::from_value(value)?,
            Role::Depth => self.depth1 = TreeValue::from_value(value)?,
            Role::ChildrenCount => self.nodes_count = TreeValue::from_value(value)?,
            Role::Scope => {}
        }
        Ok(())
    }

    fn data_columns(&self) -> Vec<(String, Value)> {
        vec![("name".to_string(), self.name.to_value())]
    }
}

// =========================================================================
// Journal: scoped by a date
// =========================================================================

#[derive(Debug, Clone)]
pub struct Journal {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub lft: i64,
    pub rgt: i64,
    pub depth: i64,
    pub children_count: i64,
    pub entry_date: NaiveDate,
    pub body: String,
}

impl Journal {
    pub fn new(id: i64, entry_date: NaiveDate, body: &str) -> Self {
        Self {
            id,
            parent_id: None,
            lft: 0,
            rgt: 0,
            depth: 0,
            children_count: 0,
            entry_date,
            body: body.to_string(),
        }
    }
}

impl TreeRecord for Journal {
    fn tree_mapping() -> TreeMapping {
        TreeMapping::new("journal_entries")
            .id("id")
            .parent_id("parent_id")
            .lft("lft")
            .rgt("rgt")
            .depth("depth")
            .children_count("children_count")
            .scope("entry_date")
    }

    fn read_role(&self, role: Role) -> Value {
        match role {
            Role::Id => self.id.to_value(),
            Role::ParentId => self.parent_id.to_value(),
            Role::Lft => self.lft.to_value(),
            Role::Rgt => self.rgt.to_value(),
            Role::Depth => self.depth.to_value(),
            Role::ChildrenCount => self.children_count.to_value(),
            Role::Scope => Value::Null,
        }
    }

    fn scope_values(&self) -> Vec<Value> {
        vec![self.entry_date.to_value()]
    }

    fn write_role(&mut self, role: Role, value: Value) -> Result<(), String> {
        match role {
            Role::Id => self.id = TreeValue::from_value(value)?,
            Role::ParentId => self.parent_id = TreeValue::from_value(value)?,
            Role::Lft => self.lft = TreeValue::from_value(value)?,
            Role::Rgt => self.rgt = TreeValue::from_value(value)?,
            Role::Depth => self.depth = TreeValue::from_value(value)?,
            Role::ChildrenCount => self.children_count = TreeValue::from_value(value)?,
            Role::Scope => {}
        }
        Ok(())
    }

    fn data_columns(&self) -> Vec<(String, Value)> {
        vec![("body".to_string(), self.body.to_value())]
    }
}

// =========================================================================
// Plain: generated ids, no depth or children count
// =========================================================================

#[derive(Debug, Clone, Default)]
pub struct Plain {
    pub id: Option<i64>,
    pub pid: Option<i64>,
    pub l: i64,
    pub r: i64,
    pub label: String,
}

impl Plain {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }
}

impl TreeRecord for Plain {
    fn tree_mapping() -> TreeMapping {
        TreeMapping::new("plain_nodes")
            .id("id")
            .parent_id("pid")
            .lft("l")
            .rgt("r")
    }

    fn read_role(&self, role: Role) -> Value {
        match role {
            Role::Id => self.id.to_value(),
            Role::ParentId => self.pid.to_value(),
            Role::Lft => self.l.to_value(),
            Role::Rgt => self.r.to_value(),
            _ => Value::Null,
        }
    }

    fn write_role(&mut self, role: Role, value: Value) -> Result<(), String> {
        match role {
            Role::Id => self.id = TreeValue::from_value(value)?,
            Role::ParentId => self.pid = TreeValue::from_value(value)?,
            Role::Lft => self.l = TreeValue::from_value(value)?,
            Role::Rgt => self.r = TreeValue::from_value(value)?,
            _ => {}
        }
        Ok(())
    }

    fn data_columns(&self) -> Vec<(String, Value)> {
        vec![("label".to_string(), self.label.to_value())]
    }
}

// =========================================================================
// Tagged: scoped by a nullable column
// =========================================================================

#[derive(Debug, Clone, Default)]
pub struct Tagged {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub lft: i64,
    pub rgt: i64,
    pub depth: i64,
    pub children_count: i64,
    pub tag: Option<String>,
    /// Refuse every write-back, as a record with an unconvertible field would
    pub read_only: bool,
}

impl Tagged {
    pub fn new(id: i64, tag: Option<&str>) -> Self {
        Self {
            id,
            tag: tag.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.lft, self.rgt)
    }
}

impl TreeRecord for Tagged {
    fn tree_mapping() -> TreeMapping {
        TreeMapping::new("tagged_nodes")
            .id("id")
            .parent_id("parent_id")
            .lft("lft")
            .rgt("rgt")
            .depth("depth")
            .children_count("children_count")
            .scope("tag")
    }

    fn read_role(&self, role: Role) -> Value {
        match role {
            Role::Id => self.id.to_value(),
            Role::ParentId => self.parent_id.to_value(),
            Role::Lft => self.lft.to_value(),
            Role::Rgt => self.rgt.to_value(),
            Role::Depth => self.depth.to_value(),
            Role::ChildrenCount => self.children_count.to_value(),
            Role::Scope => Value::Null,
        }
    }

    fn scope_values(&self) -> Vec<Value> {
        vec![self.tag.to_value()]
    }

    fn write_role(&mut self, role: Role, value: Value) -> Result<(), String> {
        if self.read_only {
            return Err(format!("{} is read-only", role));
        }
        match role {
            Role::Id => self.id = TreeValue::from_value(value)?,
            Role::ParentId => self.parent_id = TreeValue::from_value(value)?,
            Role::Lft => self.lft = TreeValue::from_value(value)?,
            Role::Rgt => self.rgt = TreeValue::from_value(value)?,
            Role::Depth => self.depth = TreeValue::from_value(value)?,
            Role::ChildrenCount => self.children_count = TreeValue::from_value(value)?,
            Role::Scope => {}
        }
        Ok(())
    }
}

/// Id → stored layout for every tagged node whose tag `IS` the given one
pub async fn tagged_layout(
    service: &NestedSetService,
    tag: Option<&str>,
) -> Result<BTreeMap<i64, Layout>> {
    let conn = connect(service).await?;
    let mut rows = conn
        .query(
            "SELECT id, lft, rgt, depth, children_count FROM tagged_nodes \
             WHERE tag IS ? ORDER BY lft",
            Params::Positional(vec![tag.map(str::to_string).to_value()]),
        )
        .await?;

    let mut layout = BTreeMap::new();
    while let Some(row) = rows.next().await? {
        layout.insert(
            row.get::<i64>(0)?,
            (
                row.get::<i64>(1)?,
                row.get::<i64>(2)?,
                row.get::<i64>(3)?,
                row.get::<i64>(4)?,
            ),
        );
    }
    Ok(layout)
}

/// Invariants of one tag scope, NULL included
pub async fn assert_tagged_invariants(service: &NestedSetService, tag: Option<&str>) -> Result<()> {
    let conn = connect(service).await?;
    assert_tree_invariants(
        &conn,
        "SELECT id, parent_id, lft, rgt, depth, children_count FROM tagged_nodes WHERE tag IS ?",
        vec![tag.map(str::to_string).to_value()],
    )
    .await
}

// =========================================================================
// Invariant checking
// =========================================================================

/// One stored row, normalised for invariant checks
#[derive(Debug, Clone)]
struct Row {
    id: String,
    parent: Option<String>,
    lft: i64,
    rgt: i64,
    depth: Option<i64>,
    children_count: Option<i64>,
}

/// Assert the nested-set invariants over the rows returned by `sql`
///
/// `sql` must select `id, parent, lft, rgt, depth, children_count` (the last
/// two may be `NULL` for types that do not store them), all as one scope.
pub async fn assert_tree_invariants(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> Result<()> {
    let mut rows = conn.query(sql, Params::Positional(params)).await?;
    let mut nodes = Vec::new();
    while let Some(row) = rows.next().await? {
        nodes.push(Row {
            id: key(row.get_value(0)?),
            parent: match row.get_value(1)? {
                Value::Null => None,
                parent => Some(key(parent)),
            },
            lft: row.get::<i64>(2)?,
            rgt: row.get::<i64>(3)?,
            depth: Option::<i64>::from_value(row.get_value(4)?).map_err(anyhow::Error::msg)?,
            children_count: Option::<i64>::from_value(row.get_value(5)?)
                .map_err(anyhow::Error::msg)?,
        });
    }

    // Bounds are a permutation of 1..=2n
    let mut bounds: Vec<i64> = nodes.iter().flat_map(|n| [n.lft, n.rgt]).collect();
    bounds.sort_unstable();
    let expected: Vec<i64> = (1..=2 * nodes.len() as i64).collect();
    assert_eq!(bounds, expected, "bounds are not a dense 1..2n numbering");

    let by_id: HashMap<&str, &Row> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    for node in &nodes {
        let descendants = nodes
            .iter()
            .filter(|other| node.lft < other.lft && other.rgt < node.rgt)
            .count() as i64;
        assert_eq!(
            node.rgt - node.lft,
            1 + 2 * descendants,
            "width of {} does not match its {} descendants",
            node.id,
            descendants
        );

        if let Some(parent) = node.parent.as_deref().and_then(|p| by_id.get(p)) {
            assert!(
                parent.lft < node.lft && node.rgt < parent.rgt,
                "{} is not inside its parent {}",
                node.id,
                parent.id
            );
            if let (Some(child_depth), Some(parent_depth)) = (node.depth, parent.depth) {
                assert_eq!(child_depth, parent_depth + 1, "depth of {}", node.id);
            }
        } else if let Some(depth) = node.depth {
            assert_eq!(depth, 0, "root {} has depth {}", node.id, depth);
        }

        if let Some(count) = node.children_count {
            let children = nodes
                .iter()
                .filter(|other| other.parent.as_deref() == Some(node.id.as_str()))
                .count() as i64;
            assert_eq!(count, children, "children_count of {}", node.id);
        }
    }

    Ok(())
}

fn key(value: Value) -> String {
    match value {
        Value::Integer(i) => i.to_string(),
        Value::Text(s) => s,
        other => format!("{:?}", other),
    }
}

/// Invariants of one category scope
pub async fn assert_category_invariants(
    service: &NestedSetService,
    user_id: i64,
    user_type: &str,
) -> Result<()> {
    let conn = connect(service).await?;
    assert_tree_invariants(
        &conn,
        "SELECT id, parent_id, lft, rgt, depth, children_count FROM categories \
         WHERE user_id = ? AND user_type = ?",
        vec![Value::Integer(user_id), Value::Text(user_type.to_string())],
    )
    .await
}
