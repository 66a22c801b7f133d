//! Activation of catalog rasters: active feature, zoom and highlight modes.

use std::time::Duration;

use web_time::Instant;

use super::*;
use crate::host::{LayerTree, ViewProvider};
use crate::message::MessageLevel;

fn enabled_abc() -> (Fixture, SharedController) {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let controller = fx.bound(abc_scenes());
    controller.borrow_mut().enable(true).unwrap();
    (fx, controller)
}

#[test]
fn test_activation_binds_active_feature() {
    let (fx, controller) = enabled_abc();

    fx.host.activate(fx.node_of(&controller, B));

    assert_eq!(controller.borrow().active_image(), Some("b.tif"));
    assert_eq!(fx.host.highlight_count(), 1);
    assert!(fx.host.visible_highlights().is_empty());
}

#[test]
fn test_activating_other_node_clears_active_feature() {
    let (fx, controller) = enabled_abc();
    fx.host.activate(fx.node_of(&controller, B));

    let vector_node = fx.ctx.tree.find_layer_node(LAYER_ID).unwrap();
    fx.host.activate(vector_node);

    assert_eq!(controller.borrow().active_image(), None);
    assert_eq!(fx.host.highlight_count(), 0);
}

#[test]
fn test_zoom_mode_recomputes_once() {
    let (fx, controller) = enabled_abc();
    controller.borrow_mut().enable_zoom(true);
    let before = controller.borrow().recompute_count();

    fx.host.activate(fx.node_of(&controller, A));

    // set_extent fired ExtentChanged synchronously; only the explicit recompute ran
    assert_eq!(fx.host.extent_requests(), 1);
    assert_eq!(controller.borrow().recompute_count(), before + 1);
    assert_eq!(fx.ctx.view.extent(), rect(1.0, 1.0, 3.0, 3.0));
    assert_eq!(fx.shown(&controller), vec![A]);
}

#[test]
fn test_zoom_restores_current_raster() {
    let (fx, controller) = enabled_abc();
    controller.borrow_mut().enable_zoom(true);

    fx.host.activate(fx.node_of(&controller, B));

    let current = fx.ctx.tree.current_layer().unwrap();
    assert_eq!(current.name, B);
    assert_eq!(current.node, fx.node_of(&controller, B));
}

#[test]
fn test_visibility_of_current_raster_survives_recompute() {
    let (fx, controller) = enabled_abc();
    let node = fx.node_of(&controller, B);
    fx.host.activate(node);
    fx.ctx.tree.set_visible(node, true);

    fx.host.set_extent(rect(0.0, 0.0, 9.0, 9.0));

    let current = fx.ctx.tree.current_layer().unwrap();
    assert_eq!(current.name, B);
    assert_ne!(current.node, node);
    assert!(current.visible);
    let a = fx.node_of(&controller, A);
    assert!(!fx.ctx.tree.layer_node(a).unwrap().visible);
}

#[test]
fn test_enable_zoom_applies_to_current_raster() {
    let (fx, controller) = enabled_abc();
    fx.host.activate(fx.node_of(&controller, A));
    assert_eq!(fx.host.extent_requests(), 0);

    controller.borrow_mut().enable_zoom(true);

    assert_eq!(fx.host.extent_requests(), 1);
    assert_eq!(fx.ctx.view.extent(), rect(1.0, 1.0, 3.0, 3.0));
}

#[test]
fn test_highlight_mode_flashes_and_expires() {
    let (fx, controller) = enabled_abc();
    controller.borrow_mut().enable_highlight(true);

    fx.host.activate(fx.node_of(&controller, B));
    assert_eq!(fx.host.visible_highlights().len(), 1);
    assert!(controller.borrow().is_highlighted());

    let later = Instant::now() + Duration::from_secs(4);
    assert!(controller.borrow_mut().poll_at(later));
    assert!(fx.host.visible_highlights().is_empty());
}

#[test]
fn test_highlight_repeats_after_pan() {
    let (fx, controller) = enabled_abc();
    controller.borrow_mut().enable_highlight(true);
    fx.host.activate(fx.node_of(&controller, B));
    controller
        .borrow_mut()
        .poll_at(Instant::now() + Duration::from_secs(4));
    assert!(fx.host.visible_highlights().is_empty());

    fx.host.set_extent(rect(0.0, 0.0, 9.0, 9.0));

    assert_eq!(fx.host.visible_highlights().len(), 1);
}

#[test]
fn test_highlight_then_clear_leaves_no_overlay() {
    let (fx, controller) = enabled_abc();
    controller.borrow_mut().enable_highlight(true);
    fx.host.activate(fx.node_of(&controller, B));

    controller.borrow_mut().unbind();

    assert!(fx.host.visible_highlights().is_empty());
    assert_eq!(fx.host.highlight_count(), 0);
}

#[test]
fn test_raster_not_in_catalog_reported() {
    let (fx, controller) = enabled_abc();
    let group = controller.borrow().group().unwrap();
    let stray = fx
        .ctx
        .loader
        .load(std::path::Path::new("/elsewhere/stray.tif"), "stray")
        .unwrap();
    let stray = fx.ctx.tree.add_raster(group, stray, "stray").unwrap();

    fx.host.activate(stray.node);

    assert_eq!(controller.borrow().active_image(), None);
    let messages = fx.host.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, MessageLevel::Critical);
    assert_eq!(
        messages[0].text,
        "Image (stray.tif) not in catalog layer ('Scenes')"
    );
}

#[test]
fn test_invalid_geometry_reported() {
    let fx = Fixture::new(rect(0.0, 0.0, 10.0, 10.0));
    let mut features = abc_scenes();
    features.push(Feature {
        id: FeatureId(9),
        geometry: None,
        attributes: vec!["/data/nogeom.tif".into(), date(2022, 2, 2).into()],
    });
    let controller = fx.bound(features);
    controller.borrow_mut().enable(true).unwrap();

    let group = controller.borrow().group().unwrap();
    let raster = fx
        .ctx
        .loader
        .load(std::path::Path::new("/data/nogeom.tif"), "nogeom")
        .unwrap();
    let node = fx.ctx.tree.add_raster(group, raster, "nogeom").unwrap().node;
    fx.host.activate(node);

    assert_eq!(controller.borrow().active_image(), None);
    assert_eq!(
        fx.host.messages()[0].text,
        "Geometry of feature (fid = 9) of layer ('Scenes') is invalid"
    );
}
