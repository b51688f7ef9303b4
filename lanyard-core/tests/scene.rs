use lanyard_core::na::{Point3, UnitQuaternion, Vector3};
use lanyard_core::{
    AssetKind, CursorHint, DragController, FrameObserver, LanyardConfig, LanyardError,
    MotionMode, NoOpObserver, Scene, SegmentId,
};

const DT: f32 = 1.0 / 60.0;
const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Default)]
struct Recorder {
    errors: Vec<String>,
    corruptions: usize,
    reinitialized: usize,
    frames: usize,
}

impl FrameObserver for Recorder {
    fn on_error(&mut self, error: &LanyardError) {
        if error.is_corruption() {
            self.corruptions += 1;
        }
        self.errors.push(error.to_string());
    }

    fn on_reinitialize(&mut self) {
        self.reinitialized += 1;
    }

    fn on_frame_complete(&mut self, _output: &lanyard_core::FrameOutput) {
        self.frames += 1;
    }
}

fn still_scene() -> Scene {
    Scene::new(LanyardConfig::default().without_entrance(), 0.0, 1.0).unwrap()
}

fn run(scene: &mut Scene, frames: usize, start_ms: f64) -> f64 {
    let mut now = start_ms;
    for _ in 0..frames {
        now += FRAME_MS;
        scene.frame(now, DT, &mut NoOpObserver);
    }
    now
}

fn card_ndc(scene: &Scene) -> [f32; 2] {
    let p = scene
        .camera()
        .project(&scene.chain().position(SegmentId::Card))
        .unwrap();
    [p.x, p.y]
}

fn drag_follows_pointer_at(dt: f32) {
    let mut scene = still_scene();
    let grab = card_ndc(&scene);
    assert!(scene.pointer_down(7, grab).unwrap());
    let offset = scene.drag().grab_offset().unwrap();

    let mut now = 0.0;
    for i in 0..30 {
        let ndc = [grab[0] - 0.01 * i as f32, grab[1] - 0.005 * i as f32];
        scene.pointer_move(ndc);
        now += f64::from(dt) * 1000.0;
        scene.frame(now, dt, &mut NoOpObserver);
        let target = DragController::drag_target(scene.camera(), ndc).unwrap();
        let card = scene.chain().position(SegmentId::Card);
        assert!(
            (card - (target - offset)).norm() < 1e-3,
            "frame {i}: card {card:?} target {target:?}"
        );
    }
    assert_eq!(scene.cursor(), CursorHint::Grabbing);
    assert_eq!(scene.pointer_up(7).unwrap(), Some(7));
    assert!(!scene.drag().is_dragging());
}

#[test]
fn dragged_card_follows_pointer_minus_grab_offset() {
    drag_follows_pointer_at(DT);
}

#[test]
fn drag_keeps_up_on_high_refresh_displays() {
    drag_follows_pointer_at(1.0 / 120.0);
}

#[test]
fn drag_keeps_up_on_slow_frames() {
    drag_follows_pointer_at(1.0 / 30.0);
}

#[test]
fn joints_stay_near_their_length_limits() {
    let mut scene = still_scene();
    let mut now = 0.0;
    for _ in 0..300 {
        now += FRAME_MS;
        scene.frame(now, DT, &mut NoOpObserver);
        for (i, stretch) in scene.chain().link_stretch().iter().enumerate() {
            assert!(*stretch < 0.25, "link {i} stretched by {stretch}");
        }
    }
    assert_eq!(scene.chain().position(SegmentId::Anchor), Point3::new(0.0, 4.0, 0.0));
}

#[test]
fn rope_runs_from_j3_to_anchor() {
    let mut scene = still_scene();
    run(&mut scene, 20, 0.0);
    let out = scene.output();
    assert_eq!(out.rope.len(), 32);
    assert!((out.rope[0] - scene.chain().position(SegmentId::J3)).norm() < 1e-4);
    assert!((out.rope[31] - scene.chain().position(SegmentId::Anchor)).norm() < 1e-4);
    assert!(out.rope.iter().all(|p| p.iter().all(|v| v.is_finite())));
    assert_eq!(out.connectors[0], scene.chain().position(SegmentId::J3));
    assert!((out.connectors[1] - (out.card.position + Vector3::new(0.0, 1.4, 0.0))).norm() < 1e-6);
}

#[test]
fn entrance_plays_once_then_hands_over_to_physics() {
    let mut scene = Scene::new(LanyardConfig::default(), 0.0, 1.0).unwrap();
    let first = scene.frame(0.0, 0.0, &mut NoOpObserver);
    assert!(first.entrance_running);
    assert_eq!(first.rope_opacity, 0.0);
    assert_eq!(first.card.scale, 0.0);

    let mut now = 0.0;
    let mut max_opacity = 0.0f32;
    while now < 1999.0 {
        now += FRAME_MS;
        let out = scene.frame(now, DT, &mut NoOpObserver);
        if out.entrance_running {
            max_opacity = max_opacity.max(out.rope_opacity);
            assert!(out.rope_opacity <= 0.8 + 1e-5);
            assert!(out.card.scale <= 3.0 + 1e-4);
        }
    }
    assert!(max_opacity > 0.5);

    let done = scene.frame(2100.0, DT, &mut NoOpObserver);
    assert!(!done.entrance_running);
    assert_eq!(done.rope_opacity, 1.0);
    assert_eq!(done.card.scale, 3.0);
    assert_eq!(done.connector_scale, 1.0);

    run(&mut scene, 120, 2100.0);
    assert!(scene.chain().check_finite().is_ok());
}

#[test]
fn entrance_card_cannot_be_grabbed_while_tiny() {
    let mut scene = Scene::new(LanyardConfig::default(), 0.0, 1.0).unwrap();
    let mut now = 0.0;
    while now < 50.0 {
        now += FRAME_MS;
        let out = scene.frame(now, DT, &mut NoOpObserver);
        assert!(out.card.scale < 0.3, "scale {} at {now}", out.card.scale);
    }
    let ndc = card_ndc(&scene);
    assert_eq!(scene.pointer_move(ndc), CursorHint::Default);
    assert!(!scene.pointer_down(1, ndc).unwrap());
    assert!(!scene.drag().is_dragging());

    scene.frame(2100.0, DT, &mut NoOpObserver);
    let ndc = card_ndc(&scene);
    assert_eq!(scene.pointer_move(ndc), CursorHint::Grab);
    assert!(scene.pointer_down(1, ndc).unwrap());
}

#[test]
fn released_card_spin_settles() {
    let mut scene = still_scene();
    let grab = card_ndc(&scene);
    assert!(scene.pointer_down(4, grab).unwrap());
    let mut now = 0.0;
    for i in 0..10 {
        scene.pointer_move([grab[0] + 0.01 * i as f32, grab[1]]);
        now += FRAME_MS;
        scene.frame(now, DT, &mut NoOpObserver);
    }
    assert_eq!(scene.chain().motion(SegmentId::Card), MotionMode::Kinematic);
    assert_eq!(scene.pointer_up(4).unwrap(), Some(4));
    assert_eq!(scene.chain().motion(SegmentId::Card), MotionMode::Dynamic);

    let spin = 3.0;
    scene
        .chain_mut()
        .set_angvel(SegmentId::Card, Vector3::new(0.0, spin, 0.0))
        .unwrap();
    run(&mut scene, 120, now);
    let settled = scene.chain().angvel(SegmentId::Card).y.abs();
    assert!(settled < 0.5 && settled < spin, "yaw rate still {settled}");
    assert!(scene.chain().check_finite().is_ok());
}

#[test]
fn torsion_opposes_yaw_offset() {
    let mut scene = still_scene();
    scene
        .chain_mut()
        .set_rotation(
            SegmentId::Card,
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.8),
        )
        .unwrap();
    scene
        .chain_mut()
        .set_angvel(SegmentId::Card, Vector3::zeros())
        .unwrap();
    scene.frame(FRAME_MS, DT, &mut NoOpObserver);
    assert!(scene.chain().angvel(SegmentId::Card).y < 0.0);
}

#[test]
fn non_finite_state_rebuilds_chain() {
    let mut scene = still_scene();
    run(&mut scene, 10, 0.0);
    scene
        .chain_mut()
        .set_linvel(SegmentId::J2, Vector3::new(f32::NAN, 0.0, 0.0))
        .unwrap();
    let mut recorder = Recorder::default();
    scene.frame(200.0, DT, &mut recorder);
    assert_eq!(recorder.corruptions, 1);
    assert_eq!(recorder.reinitialized, 1);
    assert_eq!(recorder.frames, 1);
    assert!(scene.chain().check_finite().is_ok());
    assert_eq!(scene.chain().position(SegmentId::J2), Point3::new(1.0, 4.0, 0.0));

    scene.frame(220.0, DT, &mut recorder);
    assert_eq!(recorder.errors.len(), 1);
}

#[test]
fn rebuild_releases_the_dragging_pointer() {
    let mut scene = still_scene();
    let grab = card_ndc(&scene);
    assert!(scene.pointer_down(3, grab).unwrap());
    scene
        .chain_mut()
        .set_translation(SegmentId::J1, Vector3::new(f32::INFINITY, 0.0, 0.0))
        .unwrap();
    scene.frame(FRAME_MS, DT, &mut NoOpObserver);
    assert!(!scene.drag().is_dragging());
    assert_eq!(scene.take_released_pointer(), Some(3));
    assert_eq!(scene.take_released_pointer(), None);
}

#[test]
fn second_pointer_cannot_steal_the_drag() {
    let mut scene = still_scene();
    let grab = card_ndc(&scene);
    assert!(scene.pointer_down(1, grab).unwrap());
    assert!(!scene.pointer_down(2, grab).unwrap());
    assert_eq!(scene.pointer_up(2).unwrap(), None);
    assert!(scene.drag().is_dragging());
    assert_eq!(scene.pointer_up(1).unwrap(), Some(1));
}

#[test]
fn pointer_off_card_does_not_grab() {
    let mut scene = still_scene();
    assert_eq!(scene.pointer_move([-0.9, -0.9]), CursorHint::Default);
    assert!(!scene.pointer_down(1, [-0.9, -0.9]).unwrap());
    assert!(!scene.drag().is_dragging());
}

#[test]
fn cursor_tracks_hover_and_drag() {
    let mut scene = still_scene();
    let grab = card_ndc(&scene);
    assert_eq!(scene.pointer_move(grab), CursorHint::Grab);
    scene.pointer_down(1, grab).unwrap();
    assert_eq!(scene.cursor(), CursorHint::Grabbing);
    scene.pointer_up(1).unwrap();
    assert_eq!(scene.cursor(), CursorHint::Grab);
    scene.pointer_leave();
    assert_eq!(scene.cursor(), CursorHint::Default);
    assert_eq!(CursorHint::Grabbing.as_css(), "grabbing");
}

#[test]
fn teardown_releases_capture_and_freezes() {
    let mut scene = still_scene();
    let grab = card_ndc(&scene);
    scene.pointer_down(9, grab).unwrap();
    assert_eq!(scene.teardown(), Some(9));
    assert!(scene.is_torn_down());
    let before = scene.chain().position(SegmentId::J1);
    run(&mut scene, 5, 0.0);
    assert_eq!(scene.chain().position(SegmentId::J1), before);
    assert!(!scene.pointer_down(9, grab).unwrap());
    assert_eq!(scene.teardown(), None);
}

#[test]
fn torn_down_scene_ignores_hover() {
    let mut scene = still_scene();
    let grab = card_ndc(&scene);
    assert_eq!(scene.pointer_move(grab), CursorHint::Grab);
    scene.teardown();
    assert_eq!(scene.pointer_move(grab), CursorHint::Default);
    assert_eq!(scene.cursor(), CursorHint::Default);
}

#[test]
fn invalid_config_is_rejected_before_building() {
    let mut config = LanyardConfig::default();
    config.camera.near = 5.0;
    config.camera.far = 5.0;
    let err = Scene::new(config, 0.0, 1.0).err().unwrap();
    assert!(matches!(err, LanyardError::InvalidConfig { field: "camera.far", .. }));

    let config = LanyardConfig::default().with_timestep(0.0);
    assert!(Scene::new(config, 0.0, 1.0).is_err());
}

#[test]
fn resize_switches_line_resolution() {
    let mut scene = still_scene();
    scene.resize(800.0, 600.0);
    assert_eq!(scene.output().line_resolution, [1000.0, 2000.0]);
    scene.resize(1600.0, 900.0);
    assert_eq!(scene.output().line_resolution, [1000.0, 1000.0]);
    assert!((scene.camera().aspect - 16.0 / 9.0).abs() < 1e-6);
}

#[test]
fn failed_texture_is_reported_without_stopping_frames() {
    let mut scene = still_scene();
    let mut recorder = Recorder::default();
    scene.asset_loaded(AssetKind::Rope);
    scene.asset_failed(AssetKind::CardFront, "404", &mut recorder);
    assert_eq!(recorder.errors.len(), 1);
    assert_eq!(recorder.corruptions, 0);
    scene.frame(FRAME_MS, DT, &mut recorder);
    assert_eq!(recorder.frames, 1);
    assert!(scene.assets().is_loaded(AssetKind::Rope));
}

#[test]
fn huge_frame_gap_is_clamped() {
    let mut scene = still_scene();
    let mut recorder = Recorder::default();
    scene.frame(10_000.0, 10.0, &mut recorder);
    scene.frame(10_016.0, f32::NAN, &mut recorder);
    assert!(recorder.errors.is_empty());
    assert!(scene.chain().check_finite().is_ok());
}
