//! Navigation columns and their derivation from the root

use std::sync::Arc;

use tracing::debug;

use crate::app::catalog::CatalogCache;
use crate::app::models::CatalogItem;
use crate::errors::CatalogResult;

/// One depth level of the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationColumn {
    /// Id whose children this column lists, empty for the root
    pub parent_id: String,
    /// Children in server order
    pub items: Arc<Vec<CatalogItem>>,
    /// Index of the focused item
    pub cursor: usize,
}

impl NavigationColumn {
    pub fn new(parent_id: impl Into<String>, items: Arc<Vec<CatalogItem>>, cursor: usize) -> Self {
        let cursor = cursor.min(items.len().saturating_sub(1));
        Self {
            parent_id: parent_id.into(),
            items,
            cursor,
        }
    }

    /// The item under the cursor
    pub fn focused(&self) -> Option<&CatalogItem> {
        self.items.get(self.cursor)
    }

    /// Move the cursor by `delta`, clamped to the column
    ///
    /// Returns whether the cursor moved.
    pub fn move_cursor(&mut self, delta: i32) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let last = self.items.len() as i64 - 1;
        let target = (self.cursor as i64 + delta as i64).clamp(0, last) as usize;
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cursor positions to restore, keyed by depth and parent id
#[derive(Debug, Clone, Default)]
pub struct CursorMemory {
    positions: Vec<(String, usize)>,
}

impl CursorMemory {
    /// Remember the cursors of the current columns
    pub fn from_columns(columns: &[NavigationColumn]) -> Self {
        Self {
            positions: columns
                .iter()
                .map(|column| (column.parent_id.clone(), column.cursor))
                .collect(),
        }
    }

    /// Remembered cursor for the column at `depth` listing `parent_id`
    pub fn cursor_for(&self, depth: usize, parent_id: &str) -> usize {
        match self.positions.get(depth) {
            Some((parent, cursor)) if parent == parent_id => *cursor,
            _ => 0,
        }
    }
}

/// Derive every column from the root
///
/// Each step lists the children of the id focused in the previous column,
/// restoring a remembered cursor when that column already existed. Stops on an
/// empty listing, when the focused item is not a folder, or after `max_depth`
/// columns.
pub async fn derive_columns(
    cache: &CatalogCache,
    memory: &CursorMemory,
    max_depth: usize,
) -> CatalogResult<Vec<NavigationColumn>> {
    let mut columns: Vec<NavigationColumn> = Vec::new();
    let mut parent_id = String::new();

    while columns.len() < max_depth {
        let items = cache.children_of(&parent_id).await?;
        if items.is_empty() {
            break;
        }

        let cursor = memory.cursor_for(columns.len(), &parent_id);
        let column = NavigationColumn::new(parent_id, items, cursor);
        let next = column
            .focused()
            .filter(|item| item.is_folder)
            .map(|item| item.id.clone());
        columns.push(column);

        match next {
            Some(id) => parent_id = id,
            None => break,
        }
    }

    debug!("Derived {} columns", columns.len());
    Ok(columns)
}
