//! End-to-end behaviour of snapshot, resolve and rebase.

use rebaser::asset::{Clip, Container, ContainerKind, Curve, Mask};
use rebaser::{
    Asset, AssetData, AssetId, AssetStore, ClipRebaser, Hierarchy, HierarchySnapshot, ObjectId,
    RebaseConfig, RebaseDocument, RebasePass,
};

fn clip(store: &mut AssetStore, name: &str, paths: &[&str]) -> AssetId {
    let mut clip = Clip::default();
    for path in paths {
        clip.set_curve(*path, "Transform", "m_LocalPosition.y", Curve::constant(0.0, 2.0, 1.0));
    }
    store.insert(Asset::new(name, AssetData::Clip(clip)))
}

fn container(store: &mut AssetStore, name: &str, kind: ContainerKind, targets: &[Option<AssetId>]) -> AssetId {
    let mut c = Container::new(kind);
    for (i, t) in targets.iter().enumerate() {
        c = c.with_slot(format!("slot{}", i), *t);
    }
    store.insert(Asset::new(name, AssetData::Container(c)))
}

/// A/B/C and A/D; returns (hierarchy, A, B, C, D).
fn abcd() -> (Hierarchy, ObjectId, ObjectId, ObjectId, ObjectId) {
    let mut h = Hierarchy::new();
    let a = h.create_root("A");
    let b = h.create_child(a, "B").unwrap();
    let c = h.create_child(b, "C").unwrap();
    let d = h.create_child(a, "D").unwrap();
    (h, a, b, c, d)
}

#[test]
fn test_path_resolution_after_move() {
    let (mut h, a, _, c, d) = abcd();
    let snapshot = HierarchySnapshot::build(&h, a).unwrap();
    h.set_parent(c, d).unwrap();

    let mut resolver = snapshot.create_resolver(&h, a).unwrap();
    assert_eq!(resolver.resolve("B/C").as_deref(), Some("D/C"));
    assert_eq!(resolver.resolve("D").as_deref(), Some("D"));
    assert_eq!(resolver.resolve("B/X"), None);
}

#[test]
fn test_absent_root_fails() {
    let (mut h, a, ..) = abcd();
    h.destroy(a).unwrap();
    assert!(HierarchySnapshot::build(&h, a).is_err());
    assert!(RebasePass::begin(&h, a, RebaseConfig::default()).is_err());
}

#[test]
fn test_mask_dropping() {
    let mut h = Hierarchy::new();
    let root = h.create_root("Root");
    let x = h.create_child(root, "X").unwrap();
    h.create_child(x, "Y").unwrap();
    h.create_child(x, "W").unwrap();
    let snapshot = HierarchySnapshot::build(&h, root).unwrap();

    let config = RebaseConfig::default();
    let pattern = config.pass_through_regex().unwrap();
    let mut store = AssetStore::new();
    let mut mask = Mask::default();
    mask.push_transform("X/Y", true);
    mask.push_transform("X/Z", true);
    mask.push_transform("X/Gone", false);
    mask.push_transform("X/W", false);
    let mask = store.insert(Asset::new("arms", AssetData::Mask(mask)));

    let mut rebaser = ClipRebaser::new(snapshot.create_resolver(&h, root).unwrap(), &config, &pattern);
    let mapped = rebaser.map_object(&mut store, Some(mask)).unwrap().unwrap();

    let entries: Vec<(&str, bool)> = store
        .mask(mapped)
        .unwrap()
        .transforms
        .iter()
        .map(|t| (t.path.as_str(), t.active))
        .collect();
    assert_eq!(entries, vec![("X/Y", true), ("X/W", false)]);
}

#[test]
fn test_identity_and_idempotence() {
    let (mut h, a, _, c, d) = abcd();
    let snapshot = HierarchySnapshot::build(&h, a).unwrap();
    h.set_parent(c, d).unwrap();

    let config = RebaseConfig::default();
    let pattern = config.pass_through_regex().unwrap();
    let mut store = AssetStore::new();
    let still = clip(&mut store, "still", &["D"]);
    let moved = clip(&mut store, "moved", &["B/C"]);
    let clean = container(&mut store, "clean", ContainerKind::StateMachine, &[Some(still)]);
    let dirty = container(&mut store, "dirty", ContainerKind::StateMachine, &[Some(moved), Some(clean)]);

    let mut rebaser = ClipRebaser::new(snapshot.create_resolver(&h, a).unwrap(), &config, &pattern);
    assert_eq!(rebaser.map_object(&mut store, Some(clean)).unwrap(), Some(clean));

    let once = rebaser.map_object(&mut store, Some(dirty)).unwrap();
    assert_ne!(once, Some(dirty));
    assert_eq!(rebaser.map_object(&mut store, once).unwrap(), once);
    assert_eq!(rebaser.map_object(&mut store, Some(dirty)).unwrap(), once);

    // The clean sub-machine is shared, not copied.
    let copy = store.container(once.unwrap()).unwrap();
    assert_eq!(copy.slot("slot1"), Some(clean));
}

#[test]
fn test_cycle_and_sharing_preserved() {
    let (mut h, a, _, c, d) = abcd();
    let snapshot = HierarchySnapshot::build(&h, a).unwrap();
    h.set_parent(c, d).unwrap();

    let config = RebaseConfig::default();
    let pattern = config.pass_through_regex().unwrap();
    let mut store = AssetStore::new();
    let moved = clip(&mut store, "moved", &["B/C"]);

    // machine -> state -> transition -> state, both states use the same clip.
    let state = container(&mut store, "Idle", ContainerKind::State, &[Some(moved), None]);
    let other = container(&mut store, "Walk", ContainerKind::State, &[Some(moved)]);
    let transition = container(&mut store, "Idle->Idle", ContainerKind::Transition, &[Some(state)]);
    store.container_mut(state).unwrap().slots[1].target = Some(transition);
    let machine = container(
        &mut store,
        "Base",
        ContainerKind::StateMachine,
        &[Some(state), Some(other)],
    );
    let before = store.len();

    let mut rebaser = ClipRebaser::new(snapshot.create_resolver(&h, a).unwrap(), &config, &pattern);
    let new_machine = rebaser.map_object(&mut store, Some(machine)).unwrap().unwrap();

    let m = store.container(new_machine).unwrap();
    let new_state = m.slot("slot0").unwrap();
    let new_other = m.slot("slot1").unwrap();
    let new_transition = store.container(new_state).unwrap().slot("slot1").unwrap();

    assert_eq!(store.container(new_transition).unwrap().slot("slot0"), Some(new_state));
    assert_eq!(
        store.container(new_state).unwrap().slot("slot0"),
        store.container(new_other).unwrap().slot("slot0")
    );
    // One clip, two states, one transition, one machine.
    assert_eq!(store.len(), before + 5);
}

#[test]
fn test_document_round_trip_through_pass() {
    let json = r#"{
        "root": 0,
        "objects": [
            { "name": "Avatar", "children": [1, 2] },
            { "name": "Armature", "children": [3] },
            { "name": "Accessory" },
            { "name": "Hat" }
        ],
        "components": [
            { "object": 0, "typeName": "Animator",
              "references": [{ "name": "controller", "asset": 2 }] }
        ],
        "assets": [
            { "name": "hat on", "kind": "clip",
              "curves": [{ "path": "Armature/Hat", "typeName": "GameObject",
                           "property": "m_IsActive",
                           "curve": { "keys": [{ "time": 0.0, "value": 1.0 }] } }] },
            { "name": "proxy_idle", "kind": "clip",
              "curves": [{ "path": "Armature/Hat", "typeName": "Transform",
                           "property": "m_LocalScale.x",
                           "curve": { "keys": [{ "time": 0.0, "value": 1.0 }] } }] },
            { "name": "FX", "kind": "container", "type": "controller",
              "slots": [{ "name": "hat", "target": 0 }, { "name": "idle", "target": 1 }] }
        ],
        "makeChildren": [{ "parent": 2, "children": [3] }]
    }"#;

    let mut doc = RebaseDocument::from_json(json).unwrap();
    let report = doc.apply(&RebaseConfig::default()).unwrap();
    assert_eq!(report.references_rewritten, 1);

    let controller = doc.components[0].references[0].asset.unwrap();
    let fx = doc.assets.container(controller).unwrap();
    assert_eq!(fx.slot("idle"), Some(AssetId(1)));
    let hat = fx.slot("hat").unwrap();
    assert_eq!(doc.assets.get(hat).unwrap().name, "rebased hat on");
    assert_eq!(doc.assets.clip(hat).unwrap().curves[0].path, "Accessory/Hat");
}
