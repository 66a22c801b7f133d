//! Registry of catalog controllers, one per bound polygon layer.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use super::controller::{CatalogController, SharedController};
use super::detect::{detect_catalog_fields, CatalogFields};
use crate::config::ControllerSettings;
use crate::constants::{INFO_MESSAGE_SECS, WARNING_MESSAGE_SECS};
use crate::event::{Publisher, Subscription};
use crate::fetch::SourceProbe;
use crate::host::HostContext;
use crate::message::{CatalogEvent, HostEvent, MessageLevel, ToggleKind};
use crate::model::{LayerId, LayerInfo};
use crate::table::CatalogTableView;

type ControllerMap = BTreeMap<LayerId, SharedController>;

/// Owns every [`CatalogController`] and the table mirroring them.
///
/// Controllers are created by [`CatalogRegistry::find_catalogs`] and dropped when
/// their layer leaves the project. Table toggles are routed back to the controllers
/// through [`CatalogRegistry::apply_toggle`].
pub struct CatalogRegistry {
    ctx: HostContext,
    settings: ControllerSettings,
    probe: SourceProbe,
    events: Publisher<CatalogEvent>,
    controllers: Rc<RefCell<ControllerMap>>,
    table: Rc<RefCell<CatalogTableView>>,
    _table_sub: Subscription,
    _removal_sub: Subscription,
}

impl CatalogRegistry {
    pub fn new(ctx: HostContext, settings: ControllerSettings) -> Self {
        let events = Publisher::new();
        let table = Rc::new(RefCell::new(CatalogTableView::new()));
        let table_sub = CatalogTableView::connect(&table, &events);

        let controllers: Rc<RefCell<ControllerMap>> = Rc::default();
        let weak = Rc::downgrade(&controllers);
        let removal_sub = ctx.events.subscribe(move |event: &HostEvent| {
            let HostEvent::LayersAboutToBeRemoved { layer_ids } = event else {
                return;
            };
            let Some(controllers) = weak.upgrade() else {
                return;
            };
            let removed: Vec<SharedController> = {
                let mut map = controllers.borrow_mut();
                layer_ids.iter().filter_map(|id| map.remove(id)).collect()
            };
            for controller in removed {
                match controller.try_borrow_mut() {
                    Ok(mut controller) => {
                        controller.on_external_layer_removed(layer_ids);
                    }
                    Err(_) => log::warn!("Catalog busy while its layer was removed"),
                }
            }
        });

        Self {
            probe: SourceProbe::new(Rc::clone(&ctx.fetcher)),
            ctx,
            settings,
            events,
            controllers,
            table,
            _table_sub: table_sub,
            _removal_sub: removal_sub,
        }
    }

    /// Publisher of every controller's notifications.
    pub fn events(&self) -> &Publisher<CatalogEvent> {
        &self.events
    }

    pub fn table(&self) -> Rc<RefCell<CatalogTableView>> {
        Rc::clone(&self.table)
    }

    pub fn controller(&self, layer_id: &str) -> Option<SharedController> {
        self.controllers.borrow().get(layer_id).cloned()
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.controllers.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.controllers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.borrow().is_empty()
    }

    /// Register every loaded polygon layer that looks like a catalog and is not
    /// registered yet. Returns how many were added.
    pub fn find_catalogs(&self) -> usize {
        let polygons: Vec<LayerInfo> = self
            .ctx
            .store
            .layers()
            .into_iter()
            .filter(LayerInfo::is_polygon)
            .collect();

        let mut found = 0;
        for layer in &polygons {
            if self.controllers.borrow().contains_key(&layer.id) {
                continue;
            }
            if let Some(fields) = detect_catalog_fields(self.ctx.store.as_ref(), &self.probe, layer)
            {
                self.register(layer.clone(), fields);
                found += 1;
            }
        }

        if found == 0 {
            let text = format!(
                "Did not find a new catalog. Catalog layers {} of {} (polygon layers)",
                self.len(),
                polygons.len()
            );
            self.ctx.report(
                MessageLevel::Info,
                &text,
                Duration::from_secs(INFO_MESSAGE_SECS),
            );
        } else {
            log::info!("Found {} new catalog(s)", found);
        }
        found
    }

    /// Bind `layer` under a new controller.
    pub fn register(&self, layer: LayerInfo, fields: CatalogFields) -> SharedController {
        let controller =
            CatalogController::new(self.ctx.clone(), self.settings.clone(), self.events.clone());
        self.controllers
            .borrow_mut()
            .insert(layer.id.clone(), Rc::clone(&controller));
        controller.borrow_mut().bind(layer, fields);
        controller
    }

    /// Route a table checkbox click to its controller.
    ///
    /// Returns false when the table rejected the click or the catalog is unknown.
    pub fn apply_toggle(&self, layer_id: &str, kind: ToggleKind, on: bool) -> bool {
        let intent = self.table.borrow_mut().toggle(layer_id, kind, on);
        let Some(intent) = intent else {
            return false;
        };
        let Some(controller) = self.controller(&intent.layer_id) else {
            return false;
        };

        let mut controller = controller.borrow_mut();
        match intent.kind {
            ToggleKind::Enable => {
                if let Err(e) = controller.enable(intent.on) {
                    self.ctx.report(
                        MessageLevel::Warning,
                        &e.to_string(),
                        Duration::from_secs(WARNING_MESSAGE_SECS),
                    );
                }
            }
            ToggleKind::Select => controller.enable_selected(intent.on),
            ToggleKind::Highlight => controller.enable_highlight(intent.on),
            ToggleKind::Zoom => controller.enable_zoom(intent.on),
        }
        true
    }

    /// Advance highlight timers. Returns true if any highlight was hidden.
    pub fn poll(&self) -> bool {
        let controllers: Vec<SharedController> =
            self.controllers.borrow().values().cloned().collect();
        let mut hidden = false;
        for controller in controllers {
            hidden |= controller.borrow_mut().poll();
        }
        hidden
    }
}

impl std::fmt::Debug for CatalogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogRegistry")
            .field("layers", &self.layer_ids())
            .finish_non_exhaustive()
    }
}
