use svs_runtime::extract::mirrored_values;
use svs_runtime::{SceneUpdate, Svs, SvsConfig, Symbol, WorkingMemory};
use svs_scene::Aabb;
use svs_types::Vec3;

fn cube(x: f64, z: f64) -> Aabb {
    Aabb::around(Vec3::new(x, 0.0, z), Vec3::new(0.5, 0.5, 0.5))
}

fn add(svs: &mut Svs, name: &str, bounds: Aabb) {
    svs.queue(SceneUpdate::Add {
        name: name.to_string(),
        bounds,
    });
}

fn status(wm: &WorkingMemory, root: svs_runtime::Identifier) -> Option<String> {
    wm.find(root, "status").and_then(Symbol::as_str).map(str::to_string)
}

#[test]
fn combine_of_constants() {
    let mut wm = WorkingMemory::new();
    let mut svs = Svs::new(&mut wm, SvsConfig::default());
    let spec = wm.make_id('F');
    wm.add(spec, "type", "combine");
    wm.add(spec, "first", 5_i64);
    wm.add(spec, "second", "hello");
    wm.add(svs.command_link(), "extract", spec);

    svs.cycle(&mut wm);

    assert_eq!(status(&wm, spec).as_deref(), Some("success"));
    assert_eq!(mirrored_values(&wm, spec), ["5", "hello"]);
}

#[test]
fn extract_follows_scene_input() {
    let mut wm = WorkingMemory::new();
    let mut svs = Svs::new(&mut wm, SvsConfig::default());
    add(&mut svs, "table", cube(0.0, 0.0));
    add(&mut svs, "cup", cube(3.0, 1.0));

    // (spec ^type above ^a (^type node ^id cup) ^b (^type node ^id table))
    let spec = wm.make_id('F');
    wm.add(spec, "type", "above");
    for (attr, name) in [("a", "cup"), ("b", "table")] {
        let n = wm.make_id('N');
        wm.add(n, "type", "node");
        wm.add(n, "id", name);
        wm.add(spec, attr, n);
    }
    wm.add(svs.command_link(), "extract", spec);

    svs.cycle(&mut wm);
    assert_eq!(mirrored_values(&wm, spec), ["false"]);

    svs.queue(SceneUpdate::SetBounds {
        name: "cup".to_string(),
        bounds: cube(0.0, 1.0),
    });
    svs.cycle(&mut wm);
    assert_eq!(mirrored_values(&wm, spec), ["true"]);

    svs.queue(SceneUpdate::Remove {
        name: "cup".to_string(),
    });
    svs.cycle(&mut wm);
    assert!(mirrored_values(&wm, spec).is_empty());
    assert_eq!(
        status(&wm, spec).as_deref(),
        Some("scene node 'cup' not found")
    );
}

#[test]
fn quiet_cycles_do_not_reevaluate() {
    let mut wm = WorkingMemory::new();
    let mut svs = Svs::new(&mut wm, SvsConfig::default());
    add(&mut svs, "a", cube(0.0, 0.0));

    let spec = wm.make_id('F');
    wm.add(spec, "type", "all_nodes");
    wm.add(svs.command_link(), "extract", spec);
    svs.cycle(&mut wm);
    assert_eq!(mirrored_values(&wm, spec), ["id:a"]);

    // Edit the scene behind the driver's back: without input the gate stays
    // low and the mirror is left alone.
    svs.scene()
        .borrow_mut()
        .add_node("b", cube(5.0, 0.0))
        .unwrap();
    svs.cycle(&mut wm);
    assert_eq!(mirrored_values(&wm, spec).len(), 1);

    add(&mut svs, "c", cube(9.0, 0.0));
    svs.cycle(&mut wm);
    assert_eq!(mirrored_values(&wm, spec), ["id:a", "id:b", "id:c"]);
}

#[test]
fn removing_command_drops_its_results() {
    let mut wm = WorkingMemory::new();
    let mut svs = Svs::new(&mut wm, SvsConfig::default());
    let spec = wm.make_id('F');
    wm.add(spec, "type", "combine");
    wm.add(spec, "x", 1_i64);
    let link = wm.add(svs.command_link(), "extract", spec);
    svs.cycle(&mut wm);
    assert!(wm.exists(spec));

    wm.remove(link);
    svs.cycle(&mut wm);
    assert!(!wm.exists(spec));
}

#[test]
fn spec_edit_is_picked_up_next_cycle() {
    let mut wm = WorkingMemory::new();
    let mut svs = Svs::new(&mut wm, SvsConfig::default());
    let spec = wm.make_id('F');
    wm.add(spec, "type", "combine");
    wm.add(spec, "x", 1_i64);
    wm.add(svs.command_link(), "extract", spec);
    svs.cycle(&mut wm);

    wm.add(spec, "y", 2_i64);
    svs.cycle(&mut wm);
    assert_eq!(mirrored_values(&wm, spec), ["1", "2"]);
}

#[test]
fn bad_spec_reports_syntax_error() {
    let mut wm = WorkingMemory::new();
    let mut svs = Svs::new(&mut wm, SvsConfig::default());
    let spec = wm.make_id('F');
    wm.add(spec, "type", "warp");
    wm.add(svs.command_link(), "extract", spec);
    svs.cycle(&mut wm);
    assert_eq!(
        status(&wm, spec).as_deref(),
        Some("incorrect filter syntax")
    );
    assert!(wm.find(spec, "result").is_none());
}
