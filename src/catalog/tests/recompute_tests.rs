//! Visible-set computation and reconciliation of the catalog group.

use cotf_geo::{CoordinateBridge, Crs};
use geo::polygon;

use super::*;
use crate::host::{LayerTree, TransparentPixel, ViewProvider};
use crate::message::MessageLevel;

#[test]
fn test_scenario_recent_first_and_total() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(abc_scenes());

    controller.borrow_mut().enable(true).unwrap();

    assert_eq!(fx.shown(&controller), vec![B, A]);
    assert_eq!(fx.totals(), vec![2]);
    assert_eq!(fx.loader.load_count(), 2);
}

#[test]
fn test_order_ignores_feature_order() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(vec![
        scene(1, "/d/old.tif", Some(date(2001, 1, 1)), square(1.0, 1.0, 2.0, 2.0)),
        scene(2, "/d/new.tif", Some(date(2024, 3, 1)), square(2.0, 2.0, 3.0, 3.0)),
        scene(3, "/d/mid.tif", Some(date(2012, 7, 4)), square(3.0, 3.0, 4.0, 4.0)),
    ]);

    controller.borrow_mut().enable(true).unwrap();

    assert_eq!(
        fx.shown(&controller),
        vec![
            "2024-03-01 (new.tif)",
            "2012-07-04 (mid.tif)",
            "2001-01-01 (old.tif)"
        ]
    );
}

#[test]
fn test_bbox_overlap_without_intersection_excluded() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    // bounding box reaches into the canvas corner, the triangle itself does not
    let triangle = geo::MultiPolygon(vec![polygon![
        (x: 9.0, y: 20.0), (x: 20.0, y: 20.0), (x: 20.0, y: 9.0)
    ]]);
    let controller = fx.bound(vec![
        scene(1, "/d/inside.tif", Some(date(2020, 1, 1)), square(1.0, 1.0, 2.0, 2.0)),
        scene(2, "/d/corner.tif", Some(date(2021, 1, 1)), triangle),
    ]);

    controller.borrow_mut().enable(true).unwrap();

    assert_eq!(fx.shown(&controller), vec!["2020-01-01 (inside.tif)"]);
    assert_eq!(fx.totals(), vec![1]);
}

#[test]
fn test_pan_rebuilds_group() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(abc_scenes());
    controller.borrow_mut().enable(true).unwrap();

    fx.host.set_extent(rect(15.0, 15.0, 25.0, 25.0));
    assert_eq!(fx.shown(&controller), vec!["2019-01-01 (c.tif)"]);

    fx.host.set_extent(rect(100.0, 50.0, 110.0, 60.0));
    assert!(fx.shown(&controller).is_empty());
    assert_eq!(fx.totals(), vec![2, 1, 0]);
}

#[test]
fn test_canvas_in_other_crs() {
    let to_mercator = CoordinateBridge::new(&Crs::wgs84(), &Crs::web_mercator()).unwrap();
    let canvas = to_mercator
        .transform_extent(&rect(0.0, 0.0, 10.0, 10.0))
        .unwrap();
    let fx = Fixture::with_crs(Crs::web_mercator(), canvas);
    let controller = fx.bound(abc_scenes());

    controller.borrow_mut().enable(true).unwrap();

    assert_eq!(fx.shown(&controller), vec![B, A]);
}

#[test]
fn test_unconvertible_crs_reported() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    fx.host.add_vector_layer(
        catalog_layer(LAYER_ID, LAYER_NAME, Crs::custom("LOCAL:1", "+proj=nonsense")),
        abc_scenes(),
    );
    let controller = fx.bind_loaded(LAYER_ID);

    controller.borrow_mut().enable(true).unwrap();

    assert!(fx.shown(&controller).is_empty());
    assert!(fx.totals().is_empty());
    let messages = fx.host.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, MessageLevel::Critical);
}

#[test]
fn test_world_canvas_over_mercator_catalog() {
    let fx = Fixture::new(rect(-180.0, -90.0, 180.0, 90.0));
    fx.host.add_vector_layer(
        catalog_layer(LAYER_ID, LAYER_NAME, Crs::web_mercator()),
        vec![scene(
            1,
            "/data/a.tif",
            Some(date(2020, 1, 1)),
            square(0.0, 0.0, 1e5, 1e5),
        )],
    );
    let controller = fx.bind_loaded(LAYER_ID);

    controller.borrow_mut().enable(true).unwrap();

    assert_eq!(fx.shown(&controller), vec![A]);
    assert_eq!(fx.totals(), vec![1]);
    assert!(fx.host.messages().is_empty());
}

#[test]
fn test_transform_failure_clears_group() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(abc_scenes());
    controller.borrow_mut().enable(true).unwrap();
    assert_eq!(fx.shown(&controller), vec![B, A]);

    fx.host
        .set_canvas_crs(Crs::custom("LOCAL:1", "+proj=nonsense"));

    assert!(fx.shown(&controller).is_empty());
    assert_eq!(fx.totals(), vec![2]);
    let messages = fx.host.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, MessageLevel::Critical);
}

#[test]
fn test_failed_load_aggregated_without_total() {
    let fx = Fixture::new(rect(0.0, 0.0, 4.0, 4.0));
    fx.loader.reject("a.tif");
    let controller = fx.bound(abc_scenes());

    controller.borrow_mut().enable(true).unwrap();

    assert!(fx.shown(&controller).is_empty());
    assert!(fx.totals().is_empty());
    let messages = fx.host.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, MessageLevel::Critical);
    assert_eq!(messages[0].text, "Images invalid:\na.tif");
}

#[test]
fn test_partial_failure_keeps_loaded_images() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    fx.loader.reject("b.tif");
    let controller = fx.bound(abc_scenes());

    controller.borrow_mut().enable(true).unwrap();

    assert_eq!(fx.shown(&controller), vec![A]);
    assert!(fx.totals().is_empty());
    assert_eq!(fx.host.messages()[0].text, "Images invalid:\nb.tif");
}

#[test]
fn test_rasters_hidden_and_masked() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(vec![
        scene(1, "/d/plain.tif", Some(date(2020, 1, 1)), square(1.0, 1.0, 2.0, 2.0)),
        scene(
            2,
            "https://tiles.example.com/wms/service.xml",
            Some(date(2020, 1, 2)),
            square(2.0, 2.0, 3.0, 3.0),
        ),
    ]);
    controller.borrow_mut().enable(true).unwrap();

    let group = controller.borrow().group().unwrap();
    let layers = fx.ctx.tree.layers_in(group);
    assert_eq!(layers.len(), 2);
    assert!(layers.iter().all(|l| !l.visible));

    let remote = &layers[0];
    assert_eq!(remote.name, "2020-01-02 (service.xml)");
    assert_eq!(
        remote.source,
        fx.scratch.path().join("service.xml").display().to_string()
    );
    assert_eq!(fx.host.raster_transparency(remote.node), Some(vec![]));
    assert_eq!(
        fx.host.raster_transparency(layers[1].node),
        Some(vec![TransparentPixel::BLACK_NO_DATA])
    );
}

#[test]
fn test_remote_source_fetched_once() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(vec![scene(
        1,
        "https://tiles.example.com/wms/service.xml",
        Some(date(2020, 1, 2)),
        square(2.0, 2.0, 3.0, 3.0),
    )]);
    controller.borrow_mut().enable(true).unwrap();
    fx.host.set_extent(rect(0.0, 0.0, 9.0, 9.0));
    fx.host.set_extent(rect(0.0, 0.0, 8.0, 8.0));

    assert_eq!(fx.fetcher.fetches.get(), 1);
    assert_eq!(fx.totals(), vec![1, 1, 1]);
}

#[test]
fn test_selection_only_mode() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(abc_scenes());
    controller.borrow_mut().enable(true).unwrap();

    controller.borrow_mut().enable_selected(true);
    assert!(fx.shown(&controller).is_empty());

    fx.host.select(LAYER_ID, [FeatureId(2), FeatureId(3)]);
    assert_eq!(fx.shown(&controller), vec![B]);

    // selection changes are ignored outside selection-only mode
    controller.borrow_mut().enable_selected(false);
    let before = controller.borrow().recompute_count();
    fx.host.select(LAYER_ID, [FeatureId(1)]);
    assert_eq!(controller.borrow().recompute_count(), before);
    assert_eq!(fx.shown(&controller), vec![B, A]);
}

#[test]
fn test_disabled_controller_ignores_view() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(abc_scenes());
    controller.borrow_mut().enable(true).unwrap();
    controller.borrow_mut().enable(false).unwrap();

    let before = controller.borrow().recompute_count();
    fx.host.set_extent(rect(15.0, 15.0, 25.0, 25.0));
    assert_eq!(controller.borrow().recompute_count(), before);
    assert_eq!(fx.shown(&controller), vec![B, A]);

    // re-enabling reuses the same group
    let group = controller.borrow().group();
    controller.borrow_mut().enable(true).unwrap();
    assert_eq!(controller.borrow().group(), group);
    assert_eq!(fx.shown(&controller), vec!["2019-01-01 (c.tif)"]);
    assert_eq!(fx.host.group_names(), vec!["Scenes - Catalog"]);
}

#[test]
fn test_extent_is_read_from_view() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(abc_scenes());
    controller.borrow_mut().enable(true).unwrap();
    assert_eq!(fx.ctx.view.extent(), rect(0.0, 0.0, 10.0, 10.0));
    assert_eq!(controller.borrow().recompute_count(), 1);
}
