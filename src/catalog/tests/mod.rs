//! Scenario tests for catalog controllers and the registry.
//!
//! Everything runs against [`MemoryHost`], which fires host events synchronously
//! from inside its setters just like a desktop canvas does.

mod activation_tests;
mod recompute_tests;

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use chrono::NaiveDate;
use cotf_geo::{Crs, Extent, Footprint};
use geo::{coord, polygon, MultiPolygon, Rect};
use tempfile::TempDir;

use super::{CatalogController, CatalogFields, SharedController};
use crate::config::ControllerSettings;
use crate::event::{Publisher, Subscription};
use crate::host::{HostContext, LayerTree, MemoryHost, MemoryRasterLoader, RemoteFetcher};
use crate::message::CatalogEvent;
use crate::model::{
    AttributeValue, Feature, FeatureId, Field, GeometryType, LayerInfo, LayerKind, NodeId,
};

pub(super) const LAYER_ID: &str = "scenes";
pub(super) const LAYER_NAME: &str = "Scenes";

pub(super) fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Extent {
    Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })
}

pub(super) fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Footprint {
    MultiPolygon(vec![polygon![
        (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)
    ]])
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(super) fn catalog_layer(id: &str, name: &str, crs: Crs) -> LayerInfo {
    LayerInfo {
        id: id.to_string(),
        name: name.to_string(),
        kind: LayerKind::Vector(GeometryType::Polygon),
        crs,
        extent: None,
        fields: vec![Field::text("path"), Field::date("day")],
    }
}

pub(super) fn scene(fid: u64, path: &str, day: Option<NaiveDate>, footprint: Footprint) -> Feature {
    Feature {
        id: FeatureId(fid),
        geometry: Some(footprint),
        attributes: vec![
            path.into(),
            day.map(AttributeValue::from).unwrap_or_default(),
        ],
    }
}

pub(super) fn fields() -> CatalogFields {
    CatalogFields {
        source: "path".into(),
        date: "day".into(),
    }
}

/// Fetcher that pretends every URL exists and serves a small body.
pub(super) struct StubFetcher {
    pub online: bool,
    pub fetches: Cell<usize>,
}

impl RemoteFetcher for StubFetcher {
    fn exists(&self, _url: &str) -> bool {
        self.online
    }

    fn fetch_to(&self, _url: &str, destination: &Path) -> Result<u64, String> {
        self.fetches.set(self.fetches.get() + 1);
        if !self.online {
            return Err("offline".to_string());
        }
        std::fs::write(destination, b"<GDAL_WMS/>").map_err(|e| e.to_string())?;
        Ok(11)
    }
}

/// A memory host with a scratch directory and recorded catalog events.
pub(super) struct Fixture {
    pub host: Rc<MemoryHost>,
    pub loader: Rc<MemoryRasterLoader>,
    pub fetcher: Rc<StubFetcher>,
    pub ctx: HostContext,
    pub scratch: TempDir,
    pub events: Publisher<CatalogEvent>,
    pub recorded: Rc<RefCell<Vec<CatalogEvent>>>,
    _recorder: Subscription,
}

impl Fixture {
    /// WGS84 canvas showing `canvas`.
    pub fn new(canvas: Extent) -> Self {
        Self::with_crs(Crs::wgs84(), canvas)
    }

    pub fn with_crs(crs: Crs, canvas: Extent) -> Self {
        let host = MemoryHost::new(crs, canvas);
        let loader = Rc::new(MemoryRasterLoader::new());
        let fetcher = Rc::new(StubFetcher {
            online: true,
            fetches: Cell::new(0),
        });
        let ctx = host.context(loader.clone(), fetcher.clone());

        let events = Publisher::new();
        let recorded = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&recorded);
        let recorder = events.subscribe(move |e: &CatalogEvent| sink.borrow_mut().push(e.clone()));

        Self {
            host,
            loader,
            fetcher,
            ctx,
            scratch: tempfile::tempdir().unwrap(),
            events,
            recorded,
            _recorder: recorder,
        }
    }

    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            scratch_dir: self.scratch.path().to_path_buf(),
            ..ControllerSettings::default()
        }
    }

    /// Load the catalog layer with `features` and bind a controller to it.
    pub fn bound(&self, features: Vec<Feature>) -> SharedController {
        self.host
            .add_vector_layer(catalog_layer(LAYER_ID, LAYER_NAME, Crs::wgs84()), features);
        self.bind_loaded(LAYER_ID)
    }

    pub fn bind_loaded(&self, layer_id: &str) -> SharedController {
        let layer = self.ctx.store.layer(layer_id).unwrap();
        let controller =
            CatalogController::new(self.ctx.clone(), self.settings(), self.events.clone());
        controller.borrow_mut().bind(layer, fields());
        controller
    }

    /// Display names of the rasters in `controller`'s group, top to bottom.
    pub fn shown(&self, controller: &SharedController) -> Vec<String> {
        match controller.borrow().group() {
            Some(group) => self
                .ctx
                .tree
                .layers_in(group)
                .into_iter()
                .map(|l| l.name)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Tree node of the raster named `name` in `controller`'s group.
    pub fn node_of(&self, controller: &SharedController, name: &str) -> NodeId {
        let group = controller.borrow().group().unwrap();
        self.ctx
            .tree
            .layers_in(group)
            .into_iter()
            .find(|l| l.name == name)
            .map(|l| l.node)
            .unwrap()
    }

    pub fn totals(&self) -> Vec<usize> {
        self.recorded
            .borrow()
            .iter()
            .filter_map(|e| match e {
                CatalogEvent::TotalChanged { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }
}

/// The three-scene catalog: A and B inside (0,0)-(10,10), C far outside.
pub(super) fn abc_scenes() -> Vec<Feature> {
    vec![
        scene(1, "/data/a.tif", Some(date(2020, 1, 1)), square(1.0, 1.0, 3.0, 3.0)),
        scene(2, "/data/b.tif", Some(date(2021, 6, 15)), square(5.0, 5.0, 7.0, 7.0)),
        scene(3, "/data/c.tif", Some(date(2019, 1, 1)), square(20.0, 20.0, 22.0, 22.0)),
    ]
}

pub(super) const A: &str = "2020-01-01 (a.tif)";
pub(super) const B: &str = "2021-06-15 (b.tif)";
