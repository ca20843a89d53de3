//! Integration tests: raw input through gestures, tools and rendering.

use diagram_core::{DiagramGraph, DiagramModel, DiagramNode, NodeId, Point, Size, Vec2};
use diagram_editor::{Editor, EditorConfig, InputEvent, Modifiers, PointerButton};
use diagram_render::{Damage, DrawCall, Hit};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn n(id: &str) -> NodeId {
    NodeId::intern(id)
}

/// An editor over 50×50 nodes, with the first frame already drawn so hit
/// testing has geometry to work with.
fn editor_with(nodes: &[(&str, f64, f64)]) -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut graph = DiagramGraph::new();
    for (id, x, y) in nodes {
        graph
            .add_node(
                DiagramNode::new(n(id), Point::new(*x, *y)).with_size(Size::new(50.0, 50.0)),
                NodeId::root(),
            )
            .unwrap();
    }
    let mut editor = Editor::headless(graph, EditorConfig::default());
    assert!(editor.render());
    editor
}

fn click(editor: &mut Editor, x: f64, y: f64, ts: u64) {
    editor.handle_event(&InputEvent::mouse_down(x, y, ts));
    editor.handle_event(&InputEvent::mouse_up(x, y, ts + 20));
}

fn key(editor: &mut Editor, key: &str, modifiers: Modifiers) -> bool {
    editor.handle_event(&InputEvent::KeyDown {
        key: key.to_string(),
        modifiers,
    })
}

fn position(editor: &Editor, id: &str) -> Point {
    editor.model().node(n(id)).unwrap().position
}

// ─── Selection & dragging ───────────────────────────────────────────────

#[test]
fn dragging_a_node_moves_it_in_one_step() {
    let mut editor = editor_with(&[("i_a", 0.0, 0.0), ("i_b", 200.0, 0.0)]);
    editor.handle_event(&InputEvent::mouse_down(10.0, 10.0, 0));
    editor.handle_event(&InputEvent::mouse_move(25.0, 10.0, 16));
    editor.handle_event(&InputEvent::mouse_move(40.0, 20.0, 32));

    // Preview only: the model is untouched until release.
    assert_eq!(position(&editor, "i_a"), Point::ZERO);
    assert!(editor.view().is_previewing(n("i_a")));
    assert!(editor.render());
    assert!(matches!(
        editor.renderer().node_call(n("i_a")),
        Some(DrawCall::Node { bounds, previewing: true, .. }) if bounds.origin() == Point::new(30.0, 10.0)
    ));

    editor.handle_event(&InputEvent::mouse_up(40.0, 20.0, 48));
    assert_eq!(position(&editor, "i_a"), Point::new(30.0, 10.0));
    assert_eq!(editor.selection(), &[n("i_a")]);
    assert_eq!(editor.view().history().len(), 1);
    assert!(!editor.view().is_previewing(n("i_a")));

    assert!(editor.undo());
    assert_eq!(position(&editor, "i_a"), Point::ZERO);
}

#[test]
fn dragging_a_selection_moves_every_member_as_one_batch() {
    let mut editor = editor_with(&[("g_a", 0.0, 0.0), ("g_b", 100.0, 0.0)]);
    click(&mut editor, 10.0, 10.0, 0);
    editor.handle_event(&InputEvent::MouseDown {
        position: Point::new(110.0, 10.0),
        button: PointerButton::Primary,
        modifiers: Modifiers::SHIFT,
        timestamp: 1000,
    });
    editor.handle_event(&InputEvent::MouseUp {
        position: Point::new(110.0, 10.0),
        button: PointerButton::Primary,
        modifiers: Modifiers::SHIFT,
        timestamp: 1020,
    });
    assert_eq!(editor.selection(), &[n("g_a"), n("g_b")]);

    editor.handle_event(&InputEvent::mouse_down(110.0, 10.0, 2000));
    editor.handle_event(&InputEvent::mouse_move(110.0, 60.0, 2016));
    editor.handle_event(&InputEvent::mouse_up(110.0, 60.0, 2032));

    assert_eq!(position(&editor, "g_a"), Point::new(0.0, 50.0));
    assert_eq!(position(&editor, "g_b"), Point::new(100.0, 50.0));
    assert_eq!(editor.view().history().len(), 1);
    assert!(editor.undo());
    assert_eq!(position(&editor, "g_a"), Point::ZERO);
    assert_eq!(position(&editor, "g_b"), Point::new(100.0, 0.0));
}

#[test]
fn escape_mid_drag_restores_positions_without_history() {
    let mut editor = editor_with(&[("c_a", 0.0, 0.0)]);
    editor.handle_event(&InputEvent::mouse_down(10.0, 10.0, 0));
    editor.handle_event(&InputEvent::mouse_move(80.0, 80.0, 16));
    assert!(key(&mut editor, "Escape", Modifiers::NONE));

    assert_eq!(position(&editor, "c_a"), Point::ZERO);
    assert!(!editor.view().is_previewing(n("c_a")));
    assert!(!editor.can_undo());
    assert!(editor.coordinator().gestures().is_idle());

    // The release that follows belongs to no gesture.
    editor.handle_event(&InputEvent::mouse_up(80.0, 80.0, 32));
    assert!(!editor.can_undo());
}

#[test]
fn small_jitter_stays_a_click() {
    let mut editor = editor_with(&[("j_a", 0.0, 0.0)]);
    editor.handle_event(&InputEvent::mouse_down(10.0, 10.0, 0));
    editor.handle_event(&InputEvent::mouse_move(12.0, 11.0, 10));
    editor.handle_event(&InputEvent::mouse_up(12.0, 11.0, 20));

    assert_eq!(editor.selection(), &[n("j_a")]);
    assert_eq!(position(&editor, "j_a"), Point::ZERO);
    assert!(!editor.can_undo());
    let stats = editor.coordinator().gestures().statistics();
    assert_eq!(stats.clicks, 1);
    assert_eq!(stats.drags, 0);
}

#[test]
fn background_click_clears_selection() {
    let mut editor = editor_with(&[("k_a", 0.0, 0.0)]);
    click(&mut editor, 10.0, 10.0, 0);
    assert_eq!(editor.selection(), &[n("k_a")]);
    click(&mut editor, 400.0, 400.0, 1000);
    assert!(editor.selection().is_empty());
}

#[test]
fn second_click_in_time_is_a_double_click() {
    let mut editor = editor_with(&[("dc_a", 0.0, 0.0)]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    editor.on_interaction(move |e| sink.borrow_mut().push(e.action.name()));

    click(&mut editor, 10.0, 10.0, 0);
    click(&mut editor, 12.0, 10.0, 200);
    // Too late for a third to pair with the second.
    click(&mut editor, 12.0, 10.0, 2000);

    assert_eq!(*seen.borrow(), vec!["click", "doubleClick", "click"]);
}

#[test]
fn tap_on_a_node_selects_it() {
    let mut editor = editor_with(&[("tp_a", 0.0, 0.0)]);
    editor.handle_event(&InputEvent::TouchStart {
        id: 1,
        position: Point::new(20.0, 20.0),
        timestamp: 0,
    });
    editor.handle_event(&InputEvent::TouchEnd {
        id: 1,
        position: Point::new(21.0, 20.0),
        timestamp: 40,
    });
    assert_eq!(editor.selection(), &[n("tp_a")]);
}

#[test]
fn release_away_from_the_last_move_lands_at_the_release() {
    let mut editor = editor_with(&[("rl_a", 0.0, 0.0)]);
    editor.handle_event(&InputEvent::mouse_down(10.0, 10.0, 0));
    editor.handle_event(&InputEvent::mouse_move(40.0, 10.0, 16));
    editor.handle_event(&InputEvent::mouse_up(90.0, 10.0, 32));

    assert_eq!(position(&editor, "rl_a"), Point::new(80.0, 0.0));
    assert_eq!(editor.view().history().len(), 1);
    assert!(editor.undo());
    assert_eq!(position(&editor, "rl_a"), Point::ZERO);
}

#[test]
fn touch_release_away_from_the_last_move_lands_at_the_release() {
    let mut editor = editor_with(&[("rt_a", 0.0, 0.0)]);
    editor.handle_event(&InputEvent::TouchStart {
        id: 1,
        position: Point::new(10.0, 10.0),
        timestamp: 0,
    });
    editor.handle_event(&InputEvent::TouchMove {
        id: 1,
        position: Point::new(40.0, 10.0),
        timestamp: 16,
    });
    editor.handle_event(&InputEvent::TouchEnd {
        id: 1,
        position: Point::new(90.0, 10.0),
        timestamp: 32,
    });

    assert_eq!(position(&editor, "rt_a"), Point::new(80.0, 0.0));
    assert_eq!(editor.view().history().len(), 1);
}

#[test]
fn marquee_covers_the_release_point() {
    let mut editor = editor_with(&[("mq_a", 0.0, 0.0), ("mq_b", 200.0, 0.0)]);
    editor.handle_event(&InputEvent::mouse_down(-20.0, -20.0, 0));
    editor.handle_event(&InputEvent::mouse_move(20.0, 20.0, 16));
    assert_eq!(editor.selection(), &[n("mq_a")]);

    editor.handle_event(&InputEvent::mouse_up(220.0, 20.0, 32));
    assert_eq!(editor.selection(), &[n("mq_a"), n("mq_b")]);
    assert!(editor.view().marquee().is_none());
    assert!(!editor.can_undo());
}

// ─── Hover ──────────────────────────────────────────────────────────────

#[test]
fn hover_follows_the_pointer() {
    let mut editor = editor_with(&[("hv_a", 0.0, 0.0)]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    editor.on_hover_change(move |h| sink.borrow_mut().push(*h));

    editor.handle_event(&InputEvent::mouse_move(10.0, 10.0, 0));
    editor.handle_event(&InputEvent::mouse_move(12.0, 10.0, 10));
    editor.handle_event(&InputEvent::PointerLeave);

    assert_eq!(*seen.borrow(), vec![Some(Hit::Node(n("hv_a"))), None]);
}

// ─── Connect tool ───────────────────────────────────────────────────────

#[test]
fn connect_tool_links_two_nodes_once() {
    let mut editor = editor_with(&[("cn_a", 0.0, 0.0), ("cn_b", 200.0, 0.0)]);
    assert!(key(&mut editor, "c", Modifiers::NONE));
    assert_eq!(editor.active_tool(), Some("connect"));
    assert_eq!(editor.cursor(), "crosshair");

    click(&mut editor, 10.0, 10.0, 0);
    assert!(editor.view().connection_preview().is_some());
    editor.handle_event(&InputEvent::mouse_move(150.0, 30.0, 500));
    assert_eq!(editor.view().connection_preview().unwrap().to, Point::new(150.0, 30.0));

    click(&mut editor, 210.0, 10.0, 1000);
    assert!(editor.view().connection_preview().is_none());
    assert_eq!(editor.model().edges().len(), 1);
    let edge = editor.model().edges()[0].clone();
    assert_eq!((edge.source, edge.target), (n("cn_a"), n("cn_b")));

    // Same pair again is a duplicate.
    click(&mut editor, 10.0, 10.0, 3000);
    click(&mut editor, 210.0, 10.0, 4000);
    assert_eq!(editor.model().edges().len(), 1);
    assert_eq!(editor.view().history().len(), 1);

    // Clicking the source twice disarms instead of self-looping.
    click(&mut editor, 10.0, 10.0, 6000);
    click(&mut editor, 10.0, 10.0, 8000);
    assert!(editor.view().connection_preview().is_none());
    assert_eq!(editor.model().edges().len(), 1);
}

// ─── Shortcuts ──────────────────────────────────────────────────────────

#[test]
fn keyboard_delete_and_undo() {
    let mut editor = editor_with(&[("kd_a", 0.0, 0.0), ("kd_b", 100.0, 0.0)]);
    assert!(key(&mut editor, "a", Modifiers::CTRL));
    assert_eq!(editor.selection().len(), 2);

    assert!(key(&mut editor, "Delete", Modifiers::NONE));
    assert!(editor.model().nodes().is_empty());
    assert!(editor.selection().is_empty());

    assert!(key(&mut editor, "z", Modifiers::CTRL));
    assert_eq!(editor.model().nodes().len(), 2);
    let redo = Modifiers {
        ctrl: true,
        shift: true,
        ..Modifiers::NONE
    };
    assert!(key(&mut editor, "z", redo));
    assert!(editor.model().nodes().is_empty());

    assert!(!key(&mut editor, "q", Modifiers::NONE));
}

#[test]
fn keyboard_zoom_respects_config_limits() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EditorConfig::from_json(r#"{"maxZoom": 1.2}"#).unwrap();
    let mut editor = Editor::headless(DiagramGraph::new(), config);
    for _ in 0..5 {
        key(&mut editor, "=", Modifiers::CTRL);
    }
    assert_eq!(editor.camera().zoom, 1.2);
}

// ─── Panning & zooming ──────────────────────────────────────────────────

#[test]
fn pan_tool_drags_the_viewport() {
    let mut editor = editor_with(&[("p_a", 0.0, 0.0)]);
    assert!(key(&mut editor, "h", Modifiers::NONE));
    assert_eq!(editor.cursor(), "grab");

    // Even starting on a node, the pan tool moves the camera, not the node.
    editor.handle_event(&InputEvent::mouse_down(10.0, 10.0, 0));
    editor.handle_event(&InputEvent::mouse_move(60.0, 10.0, 16));
    editor.handle_event(&InputEvent::mouse_up(70.0, 30.0, 32));

    assert_eq!(editor.camera().pan, Vec2::new(60.0, 20.0));
    assert_eq!(position(&editor, "p_a"), Point::ZERO);
    assert!(!editor.can_undo());
}

#[test]
fn hit_testing_follows_the_camera() {
    let mut editor = editor_with(&[("hc_a", 0.0, 0.0)]);
    editor.handle_event(&InputEvent::Wheel {
        position: Point::ZERO,
        delta: Vec2::new(0.0, -1.0),
        modifiers: Modifiers::NONE,
        timestamp: 0,
    });
    assert!(editor.camera().zoom > 1.0);
    editor.render();

    // (52, 52) is outside the node at zoom 1 but inside once zoomed in.
    click(&mut editor, 52.0, 52.0, 100);
    assert_eq!(editor.selection(), &[n("hc_a")]);
}

// ─── Rendering ──────────────────────────────────────────────────────────

#[test]
fn render_is_a_noop_when_clean() {
    let mut editor = editor_with(&[("rn_a", 0.0, 0.0)]);
    let frames = editor.renderer().frame_count();
    assert!(!editor.render());
    assert_eq!(editor.renderer().frame_count(), frames);
}

#[test]
fn moving_a_node_damages_only_its_old_and_new_bounds() {
    let mut editor = editor_with(&[("rd_a", 0.0, 0.0), ("rd_b", 500.0, 500.0)]);
    assert!(editor.execute(diagram_editor::CommandKind::move_node(
        n("rd_a"),
        Point::new(100.0, 0.0)
    )));
    assert!(editor.render());

    let Some(Damage::Regions(regions)) = editor.renderer().last_damage().cloned() else {
        panic!("expected partial damage");
    };
    assert_eq!(regions.len(), 2);
    assert!(regions.iter().all(|r| r.x1 <= 150.0 && r.y1 <= 50.0));
    // The frame itself still paints the whole scene.
    assert_eq!(editor.renderer().drawn_nodes(), vec![n("rd_a"), n("rd_b")]);
}

#[test]
fn set_camera_repaints_everything() {
    let mut editor = editor_with(&[("sc_a", 0.0, 0.0)]);
    let mut camera = *editor.camera();
    camera.pan = Vec2::new(5.0, 5.0);
    editor.set_camera(camera);
    assert!(editor.render());
    assert!(editor.renderer().last_damage().is_some_and(Damage::is_full));
}
