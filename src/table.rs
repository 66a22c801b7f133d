//! Tabular projection of the bound catalogs.
//!
//! One row per catalog with the columns Layer, Group, Total, Select, Highlight and
//! Zoom. The table only mirrors [`CatalogEvent`]s and turns checkbox clicks into
//! [`ToggleIntent`]s; it never calls a controller itself.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::event::{Publisher, Subscription};
use crate::message::{CatalogEvent, ToggleIntent, ToggleKind};
use crate::model::LayerId;

/// Column headers, in display order.
pub const HEADERS: [&str; 6] = ["Layer", "Group", "Total", "Select", "Highlight", "Zoom"];

/// Placeholder shown for an unknown group or total.
const NONE_TEXT: &str = "None";

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub layer_id: LayerId,
    pub layer_name: String,
    pub group: String,
    pub total: String,
    pub enabled: bool,
    pub select: bool,
    pub highlight: bool,
    pub zoom: bool,
}

impl CatalogRow {
    fn new(layer_id: &str, layer_name: &str) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            layer_name: layer_name.to_string(),
            group: NONE_TEXT.to_string(),
            total: NONE_TEXT.to_string(),
            enabled: false,
            select: false,
            highlight: false,
            zoom: false,
        }
    }

    /// Mode checkboxes are editable only while the catalog is enabled.
    pub fn modes_editable(&self) -> bool {
        self.enabled
    }

    pub fn is_checked(&self, kind: ToggleKind) -> bool {
        match kind {
            ToggleKind::Enable => self.enabled,
            ToggleKind::Select => self.select,
            ToggleKind::Highlight => self.highlight,
            ToggleKind::Zoom => self.zoom,
        }
    }

    fn set_checked(&mut self, kind: ToggleKind, on: bool) {
        match kind {
            ToggleKind::Enable => self.enabled = on,
            ToggleKind::Select => self.select = on,
            ToggleKind::Highlight => self.highlight = on,
            ToggleKind::Zoom => self.zoom = on,
        }
    }
}

/// Rows of the catalog table, in insertion order.
#[derive(Debug, Default)]
pub struct CatalogTableView {
    rows: Vec<CatalogRow>,
}

impl CatalogTableView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror `events` into `table` until the subscription is dropped.
    pub fn connect(table: &Rc<RefCell<Self>>, events: &Publisher<CatalogEvent>) -> Subscription {
        let table = Rc::downgrade(table);
        events.subscribe(move |event| {
            if let Some(table) = table.upgrade() {
                table.borrow_mut().apply(event);
            }
        })
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    pub fn row(&self, layer_id: &str) -> Option<&CatalogRow> {
        self.rows.iter().find(|r| r.layer_id == layer_id)
    }

    fn row_mut(&mut self, layer_id: &str) -> Option<&mut CatalogRow> {
        self.rows.iter_mut().find(|r| r.layer_id == layer_id)
    }

    /// Update the display from a controller notification.
    pub fn apply(&mut self, event: &CatalogEvent) {
        match event {
            CatalogEvent::Bound {
                layer_id,
                layer_name,
            } => {
                if self.row(layer_id).is_none() {
                    self.rows.push(CatalogRow::new(layer_id, layer_name));
                }
            }
            CatalogEvent::Removed { layer_id } => {
                self.rows.retain(|r| &r.layer_id != layer_id);
            }
            CatalogEvent::LayerRenamed { layer_id, name } => {
                if let Some(row) = self.row_mut(layer_id) {
                    row.layer_name = name.clone();
                }
            }
            CatalogEvent::GroupRenamed { layer_id, name } => {
                let Some(row) = self.row_mut(layer_id) else {
                    return;
                };
                match name {
                    Some(name) => row.group = name.clone(),
                    None => {
                        row.group = NONE_TEXT.to_string();
                        row.total = NONE_TEXT.to_string();
                        row.enabled = false;
                    }
                }
            }
            CatalogEvent::TotalChanged { layer_id, count } => {
                if let Some(row) = self.row_mut(layer_id) {
                    row.total = count.to_string();
                }
            }
        }
    }

    /// A checkbox was clicked. Returns the intent to forward, or `None` when the
    /// row is unknown or the checkbox is not editable.
    pub fn toggle(&mut self, layer_id: &str, kind: ToggleKind, on: bool) -> Option<ToggleIntent> {
        let row = self.row_mut(layer_id)?;
        if kind.is_mode() && !row.modes_editable() {
            log::debug!("{} toggle of {} ignored while disabled", kind.name(), layer_id);
            return None;
        }
        row.set_checked(kind, on);
        Some(ToggleIntent {
            layer_id: layer_id.to_string(),
            kind,
            on,
        })
    }

    /// Plain-text rendering, one line per row.
    pub fn render(&self) -> String {
        let check = |on: bool| if on { "[x]" } else { "[ ]" };
        let mut out = HEADERS.join(" | ");
        for row in &self.rows {
            let _ = write!(
                out,
                "\n{} {} | {} | {} | {} | {} | {}",
                check(row.enabled),
                row.layer_name,
                row.group,
                row.total,
                check(row.select),
                check(row.highlight),
                check(row.zoom)
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(table: &mut CatalogTableView, id: &str) {
        table.apply(&CatalogEvent::Bound {
            layer_id: id.into(),
            layer_name: format!("{id} layer"),
        });
    }

    #[test]
    fn test_new_row_defaults() {
        let mut table = CatalogTableView::new();
        bound(&mut table, "a");
        let row = table.row("a").unwrap();
        assert_eq!(row.group, "None");
        assert_eq!(row.total, "None");
        assert!(!row.enabled);
    }

    #[test]
    fn test_modes_locked_until_enabled() {
        let mut table = CatalogTableView::new();
        bound(&mut table, "a");
        assert!(table.toggle("a", ToggleKind::Zoom, true).is_none());
        assert!(table.toggle("missing", ToggleKind::Enable, true).is_none());

        let intent = table.toggle("a", ToggleKind::Enable, true).unwrap();
        assert_eq!(intent.kind, ToggleKind::Enable);
        assert!(table.toggle("a", ToggleKind::Zoom, true).is_some());
        assert!(table.row("a").unwrap().zoom);

        // disabling keeps mode checks but locks them
        table.toggle("a", ToggleKind::Enable, false).unwrap();
        assert!(table.row("a").unwrap().zoom);
        assert!(table.toggle("a", ToggleKind::Zoom, false).is_none());
    }

    #[test]
    fn test_group_removed_resets_row() {
        let mut table = CatalogTableView::new();
        bound(&mut table, "a");
        table.toggle("a", ToggleKind::Enable, true);
        table.apply(&CatalogEvent::GroupRenamed {
            layer_id: "a".into(),
            name: Some("a layer - Catalog".into()),
        });
        table.apply(&CatalogEvent::TotalChanged {
            layer_id: "a".into(),
            count: 2,
        });
        assert_eq!(table.row("a").unwrap().total, "2");

        table.apply(&CatalogEvent::GroupRenamed {
            layer_id: "a".into(),
            name: None,
        });
        let row = table.row("a").unwrap();
        assert_eq!(row.group, "None");
        assert_eq!(row.total, "None");
        assert!(!row.enabled);
        assert!(!row.modes_editable());
    }

    #[test]
    fn test_connect_follows_publisher() {
        let table = Rc::new(RefCell::new(CatalogTableView::new()));
        let events = Publisher::new();
        let sub = CatalogTableView::connect(&table, &events);

        events.emit(&CatalogEvent::Bound {
            layer_id: "a".into(),
            layer_name: "Scenes".into(),
        });
        events.emit(&CatalogEvent::LayerRenamed {
            layer_id: "a".into(),
            name: "Scenes 2020".into(),
        });
        assert_eq!(table.borrow().rows()[0].layer_name, "Scenes 2020");
        assert!(table.borrow().render().contains("[ ] Scenes 2020 | None | None"));

        events.emit(&CatalogEvent::Removed {
            layer_id: "a".into(),
        });
        assert!(table.borrow().rows().is_empty());
        drop(sub);
    }
}
