use super::*;
use crate::events::EventSink;
use crate::models::layer::RawLayerNode;
use crate::widget::{HeadlessExplorer, HeadlessMap};
use chrono::NaiveTime;
use serde_json::json;

fn nodes(value: Value) -> Vec<LayerNode> {
    let raw: Vec<RawLayerNode> = serde_json::from_value(value).expect("raw layers");
    raw.into_iter()
        .map(|node| LayerNode::try_from(node).expect("valid layer"))
        .collect()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 15).expect("date")
}

fn sample_tree() -> Vec<LayerNode> {
    nodes(json!([
        { "Id": "fires", "Name": "Fires", "Visible": true, "AddsInTheStart": true,
          "Params": { "Url": "http://maps/wms" } },
        { "Id": "base", "Name": "Base", "LayerGroup": true, "Layers": [
            { "Id": "osm", "Name": "OSM", "Background": true, "Visible": true, "AddsInTheStart": true,
              "Params": { "TerraMA2WebComponentsFunction": "addOSMLayer" } },
            { "Id": "gebco", "Name": "GEBCO", "Background": true, "AddsInTheStart": true,
              "Params": { "Url": "http://gebco/wms" } }
        ]},
        { "Id": "terrama2:states", "Name": "States", "Params": { "Url": "http://maps/wms" } }
    ]))
}

struct Fixture {
    registry: LayerRegistry,
    map: HeadlessMap,
    explorer: HeadlessExplorer,
    events: crossbeam_channel::Receiver<DashboardEvent>,
}

fn loaded(use_layer_groups: bool) -> Fixture {
    let (sink, events) = EventSink::channel();
    let mut registry = LayerRegistry::new(
        RegistryOptions {
            use_layer_groups,
            enable_add_and_remove_layers: true,
        },
        sink,
    );
    let mut map = HeadlessMap::default();
    let mut explorer = HeadlessExplorer::default();
    registry.load(&sample_tree(), &mut map, &mut explorer, today());
    Fixture {
        registry,
        map,
        explorer,
        events,
    }
}

fn visible_ids(registry: &LayerRegistry) -> Vec<String> {
    registry
        .visible_layers()
        .iter()
        .map(|entry| entry.layer_id.clone())
        .collect()
}

#[test]
fn tree_resolution_is_depth_first_and_reversed_per_level() {
    let tree = sample_tree();
    let ids = |items: &[TreeItem]| -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                TreeItem::Group(group) => format!("group:{}", group.id),
                TreeItem::Leaf(layer) => format!("{}@{}", layer.id(), layer.parent.id),
            })
            .collect()
    };

    assert_eq!(
        ids(&resolve_layer_tree(&tree, true)),
        vec![
            "terrama2:states@terrama2-layerexplorer",
            "group:base",
            "gebco@base",
            "osm@base",
            "fires@terrama2-layerexplorer",
        ]
    );
    assert_eq!(
        ids(&resolve_layer_tree(&tree, false)),
        vec![
            "terrama2:states@terrama2-layerexplorer",
            "gebco@terrama2-layerexplorer",
            "osm@terrama2-layerexplorer",
            "fires@terrama2-layerexplorer",
        ]
    );
}

#[test]
fn bulk_load_places_every_leaf_in_exactly_one_registry() {
    for use_layer_groups in [true, false] {
        let (sink, events) = EventSink::channel();
        let mut registry = LayerRegistry::new(
            RegistryOptions {
                use_layer_groups,
                enable_add_and_remove_layers: false,
            },
            sink,
        );
        let mut map = HeadlessMap::default();
        map.refuse("gebco");
        let mut explorer = HeadlessExplorer::default();

        let summary = registry.load(&sample_tree(), &mut map, &mut explorer, today());
        assert_eq!(summary.added, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.not_added, 1);

        for id in ["fires", "osm", "gebco", "terrama2:states"] {
            let added = registry.is_added(id);
            let not_added = registry.not_added_layers().iter().any(|l| l.id() == id);
            assert!(added ^ not_added, "layer {} must be in exactly one registry", id);
        }
        assert!(
            events.try_iter().all(|event| event != DashboardEvent::ApplyFilter),
            "initial load never asks for a filter re-run"
        );
    }
}

#[test]
fn groups_and_visible_entries_follow_explorer_tree() {
    let fixture = loaded(true);
    assert!(fixture.map.has_group("base"));
    assert_eq!(fixture.explorer.parent_of("osm"), Some("base"));
    assert!(!fixture.explorer.contains("terrama2:states"));

    let osm = fixture
        .registry
        .visible_layers()
        .iter()
        .find(|entry| entry.layer_id == "osm")
        .expect("osm visible");
    assert_eq!(osm.parent_name, "Base > ");
    assert_eq!(osm.parent_id, "base");
    assert_eq!(visible_ids(&fixture.registry), vec!["osm", "fires"]);
}

#[test]
fn activating_background_hides_the_previous_one() {
    let mut fixture = loaded(true);
    assert!(fixture.map.is_layer_visible("osm"));
    fixture.events.try_iter().for_each(drop);

    fixture
        .registry
        .set_layer_visibility("gebco", true, &mut fixture.map, &fixture.explorer, today())
        .expect("toggle");

    assert!(!fixture.map.is_layer_visible("osm"));
    assert!(fixture.map.is_layer_visible("gebco"));
    let visible = visible_ids(&fixture.registry);
    assert!(!visible.iter().any(|id| id == "osm"));
    assert_eq!(visible.iter().filter(|id| **id == "gebco").count(), 1);
    assert_eq!(
        fixture.events.try_iter().collect::<Vec<_>>(),
        vec![DashboardEvent::UpdateMapInformationsBox]
    );

    // selecting the active background again changes nothing
    assert!(fixture.registry.set_background_visibility(
        "gebco",
        &mut fixture.map,
        &fixture.explorer,
        today()
    ));
    assert_eq!(visible_ids(&fixture.registry), visible);
    assert!(!fixture.registry.set_background_visibility(
        "fires",
        &mut fixture.map,
        &fixture.explorer,
        today()
    ));
}

#[test]
fn hiding_a_layer_drops_its_entry() {
    let mut fixture = loaded(false);
    fixture
        .registry
        .set_layer_visibility("fires", false, &mut fixture.map, &fixture.explorer, today())
        .expect("toggle");
    assert!(!fixture.map.is_layer_visible("fires"));
    assert_eq!(visible_ids(&fixture.registry), vec!["osm"]);

    let err = fixture
        .registry
        .set_layer_visibility("terrama2:states", true, &mut fixture.map, &fixture.explorer, today())
        .expect_err("not added");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn add_then_remove_round_trips_between_registries() {
    let mut fixture = loaded(true);
    fixture.events.try_iter().for_each(drop);

    fixture
        .registry
        .add_layer("terrama2:states", &mut fixture.map, &mut fixture.explorer, today())
        .expect("add");
    assert!(fixture.registry.is_added("terrama2:states"));
    assert!(fixture.registry.not_added_layers().is_empty());
    assert!(fixture.explorer.contains("terrama2:states"));
    assert_eq!(
        fixture.events.try_iter().collect::<Vec<_>>(),
        vec![DashboardEvent::ApplyFilter]
    );

    assert!(fixture
        .registry
        .remove_layer("terrama2:states", &mut fixture.map, &mut fixture.explorer));
    assert!(!fixture.registry.is_added("terrama2:states"));
    assert!(fixture.map.layer("terrama2:states").is_none());
    assert!(!fixture.explorer.contains("terrama2:states"));
    assert_eq!(fixture.registry.not_added_layers().len(), 1);
}

#[test]
fn removing_an_unknown_layer_is_a_no_op() {
    let mut fixture = loaded(true);
    let before = fixture.registry.layers();
    let visible_before = fixture.registry.visible_layers().to_vec();

    assert!(!fixture
        .registry
        .remove_layer("nope", &mut fixture.map, &mut fixture.explorer));
    assert!(!fixture
        .registry
        .remove_layer("terrama2:states", &mut fixture.map, &mut fixture.explorer));

    assert_eq!(fixture.registry.layers(), before);
    assert_eq!(fixture.registry.visible_layers(), visible_before.as_slice());
}

#[test]
fn map_refusing_removal_keeps_layer_added() {
    let mut fixture = loaded(true);
    fixture.events.try_iter().for_each(drop);
    assert!(fixture.map.remove_layer("fires"));
    let visible_before = fixture.registry.visible_layers().to_vec();

    assert!(!fixture
        .registry
        .remove_layer("fires", &mut fixture.map, &mut fixture.explorer));
    assert!(fixture.registry.is_added("fires"));
    assert!(fixture.explorer.contains("fires"));
    assert_eq!(fixture.registry.visible_layers(), visible_before.as_slice());
    assert!(fixture.events.try_iter().next().is_none());
}

#[test]
fn rejected_add_keeps_layer_not_added() {
    let mut fixture = loaded(true);
    fixture.map.refuse("terrama2:states");

    let err = fixture
        .registry
        .add_layer("terrama2:states", &mut fixture.map, &mut fixture.explorer, today())
        .expect_err("widget refuses");
    assert!(matches!(err, AppError::LayerRejected(id) if id == "terrama2:states"));
    assert!(!fixture.registry.is_added("terrama2:states"));
    assert_eq!(fixture.registry.not_added_layers().len(), 1);
    assert!(!fixture.explorer.contains("terrama2:states"));

    let err = fixture
        .registry
        .add_layer("fires", &mut fixture.map, &mut fixture.explorer, today())
        .expect_err("already added");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn layers_snapshot_is_detached_from_registry() {
    let fixture = loaded(true);
    let mut snapshot = fixture.registry.layers();
    snapshot[0].config.name = "mutated".to_string();
    snapshot.clear();
    assert_eq!(fixture.registry.layers().len(), 3);
    assert!(fixture
        .registry
        .layers()
        .iter()
        .all(|layer| layer.config.name != "mutated"));
}

#[test]
fn element_ids_drop_the_first_colon() {
    let mut fixture = loaded(true);
    let tree = nodes(json!([
        { "Id": "terrama2:a:b", "Name": "A", "Visible": true, "Params": { "Url": "u" } }
    ]));
    fixture
        .registry
        .load(&tree, &mut fixture.map, &mut fixture.explorer, today());
    fixture
        .registry
        .add_layer("terrama2:a:b", &mut fixture.map, &mut fixture.explorer, today())
        .expect("add");
    let entry = fixture
        .registry
        .visible_layers()
        .iter()
        .find(|entry| entry.layer_id == "terrama2:a:b")
        .expect("entry");
    assert_eq!(entry.element_id, "terrama2a:b");
}

fn timed_registry() -> (LayerRegistry, HeadlessMap, HeadlessExplorer) {
    let tree = nodes(json!([
        { "Id": "modis", "Name": "MODIS {{YYYY/MM/DD}}", "Visible": true, "AddsInTheStart": true,
          "Params": {
              "Url": "http://maps/wms",
              "Time": "{{YYYY-MM-DD}}",
              "TimeYear": "year", "TimeMonth": "month", "TimeDay": "day",
              "Styles": "fires",
              "MinTimeForTodaysImage": "10:00:00"
          } }
    ]));
    let mut registry = LayerRegistry::new(RegistryOptions::default(), EventSink::detached());
    let mut map = HeadlessMap::default();
    let mut explorer = HeadlessExplorer::default();
    registry.load(&tree, &mut map, &mut explorer, today());
    (registry, map, explorer)
}

#[test]
fn dated_names_and_source_params_resolve_on_add() {
    let (registry, map, _) = timed_registry();
    let drawn = map.layer("modis").expect("drawn");
    assert_eq!(drawn.name, "MODIS 2020/01/15");
    assert_eq!(drawn.time.as_deref(), Some("2020-01-15"));
    assert_eq!(drawn.source_params.get("year").map(String::as_str), Some("2020"));
    assert_eq!(drawn.source_params.get("day").map(String::as_str), Some("15"));
    assert_eq!(drawn.source_params.get("STYLES").map(String::as_str), Some("fires"));
    assert_eq!(
        registry.layer("modis").and_then(|l| l.current_time.as_deref()),
        Some("2020-01-15")
    );
}

#[test]
fn layer_time_falls_back_to_previous_day_before_cutoff() {
    let (mut registry, mut map, _) = timed_registry();
    let early = today().and_time(NaiveTime::from_hms_opt(9, 30, 0).expect("time"));

    let update = registry
        .update_layer_time("modis", &mut map, early)
        .expect("update");
    assert!(update.used_previous_day);
    assert_eq!(update.time, "2020-01-14");
    assert_eq!(update.name, "MODIS 2020/01/14");
    let drawn = map.layer("modis").expect("drawn");
    assert_eq!(drawn.time.as_deref(), Some("2020-01-14"));
    assert_eq!(drawn.source_params.get("day").map(String::as_str), Some("14"));
    assert_eq!(registry.visible_layers()[0].layer_name, "MODIS 2020/01/14");

    let late = today().and_time(NaiveTime::from_hms_opt(10, 0, 1).expect("time"));
    let update = registry
        .update_layer_time("modis", &mut map, late)
        .expect("update");
    assert!(!update.used_previous_day);
    assert_eq!(update.time, "2020-01-15");
    assert_eq!(map.layer("modis").map(|l| l.name.as_str()), Some("MODIS 2020/01/15"));
}

#[test]
fn layer_time_update_requires_an_added_timed_layer() {
    let mut fixture = loaded(true);
    let now = today().and_time(NaiveTime::MIN);
    assert!(matches!(
        fixture.registry.update_layer_time("missing", &mut fixture.map, now),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        fixture.registry.update_layer_time("fires", &mut fixture.map, now),
        Err(AppError::InvalidConfig(_))
    ));
}

#[test]
fn removable_layers_depend_on_configuration() {
    let fixture = loaded(true);
    assert_eq!(fixture.registry.removable_layer_ids().len(), 3);

    let mut registry = LayerRegistry::new(RegistryOptions::default(), EventSink::detached());
    registry.load(
        &sample_tree(),
        &mut HeadlessMap::default(),
        &mut HeadlessExplorer::default(),
        today(),
    );
    assert!(registry.removable_layer_ids().is_empty());
}
