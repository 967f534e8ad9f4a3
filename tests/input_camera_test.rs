use indirect_ngin::{
    Deg, InnerSpace, KeyCode,
    camera::{Camera, CameraController, CameraUniform, MAX_PITCH, Projection},
    config::CameraConfig,
    input::{EventQueue, InputEvent},
};
use instant::Duration;
use winit::event::MouseButton;

fn key(key: KeyCode, pressed: bool) -> InputEvent {
    InputEvent::Keyboard { key, pressed }
}

#[test]
fn full_queue_drops_new_events() {
    let mut queue = EventQueue::new(2);
    assert!(queue.push(key(KeyCode::KeyA, true)));
    assert!(queue.push(key(KeyCode::KeyB, true)));
    assert!(!queue.push(key(KeyCode::KeyC, true)));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.dropped(), 1);

    let drained: Vec<_> = queue.drain().collect();
    assert_eq!(drained, vec![key(KeyCode::KeyA, true), key(KeyCode::KeyB, true)]);
    assert!(queue.is_empty());
    // draining frees room again
    assert!(queue.push(key(KeyCode::KeyC, true)));
    assert_eq!(queue.dropped(), 1);
}

#[test]
fn camera_looks_down_negative_z() {
    let camera = Camera::new([0.0, 0.0, 0.0]);
    let front = camera.front();
    assert!((front.z + 1.0).abs() < 1e-6);
    assert!(front.x.abs() < 1e-6);
    assert!((camera.right().x - 1.0).abs() < 1e-6);
}

#[test]
fn yaw_turns_the_camera_left() {
    let mut camera = Camera::new([0.0, 0.0, 0.0]);
    camera.rotate_y(Deg(90.0));
    let front = camera.front();
    assert!((front.x + 1.0).abs() < 1e-5);
    assert!(front.z.abs() < 1e-5);
    assert!((front.magnitude() - 1.0).abs() < 1e-5);
}

#[test]
fn holding_w_moves_forward_at_movement_speed() {
    let config = CameraConfig::default();
    let mut camera = Camera::new(config.position);
    let mut controller = CameraController::new(config.movement_speed, config.rotation_speed);

    assert!(controller.process_event(&key(KeyCode::KeyW, true)));
    assert!(controller.update(&mut camera, Duration::from_secs(1)));
    assert!((camera.position.z + 5.0).abs() < 1e-5);
    assert!(camera.position.x.abs() < 1e-5);

    assert!(controller.process_event(&key(KeyCode::KeyW, false)));
    assert!(!controller.update(&mut camera, Duration::from_secs(1)));
    assert!(!controller.process_event(&key(KeyCode::KeyQ, true)));
}

#[test]
fn dragging_with_the_right_button_rotates() {
    let mut camera = Camera::new([0.0, 0.0, 0.0]);
    let mut controller = CameraController::new(5.0, 0.1);

    // moves without the button only track the cursor
    assert!(!controller.process_event(&InputEvent::MouseMove { x: 0.0, y: 0.0 }));
    controller.process_event(&InputEvent::MouseButton {
        button: MouseButton::Right,
        pressed: true,
    });
    assert!(controller.process_event(&InputEvent::MouseMove { x: 10.0, y: 0.0 }));
    assert!(controller.update(&mut camera, Duration::from_secs(1)));
    // moving right turns right
    assert!(camera.front().x > 0.5);
    assert_eq!(camera.position.z, 0.0);
}

#[test]
fn pitch_stops_short_of_vertical() {
    let mut camera = Camera::new([0.0, 0.0, 0.0]);
    camera.rotate_x(Deg(80.0));
    assert!(camera.front().y > 0.9);
    camera.rotate_x(Deg(80.0));
    assert!((camera.pitch().0 - MAX_PITCH.0).abs() < 1e-3);
    assert!(camera.front().z < 0.0);

    camera.rotate_x(Deg(-400.0));
    assert!((camera.pitch().0 + MAX_PITCH.0).abs() < 1e-3);
    let right = camera.right();
    assert!(right.x.is_finite() && (right.magnitude() - 1.0).abs() < 1e-4);
}

#[test]
fn dragging_past_the_top_keeps_the_camera_valid() {
    let mut camera = Camera::new([0.0, 0.0, 0.0]);
    let mut controller = CameraController::new(5.0, 0.1);
    controller.process_event(&InputEvent::MouseButton {
        button: MouseButton::Right,
        pressed: true,
    });
    controller.process_event(&InputEvent::MouseMove { x: 0.0, y: 0.0 });
    for step in 1..=10 {
        let y = -100.0 * step as f64;
        controller.process_event(&InputEvent::MouseMove { x: 0.0, y });
        controller.update(&mut camera, Duration::from_secs(1));
    }
    let front = camera.front();
    assert!(front.y > 0.99);
    assert!(front.z < 0.0);
    assert!(camera.view_matrix().x.x.is_finite());
}

#[test]
fn projection_follows_the_surface_size() {
    let mut projection = Projection::new(800, 600, Deg(60.0), 0.1, 100.0);
    assert!((projection.aspect() - 800.0 / 600.0).abs() < 1e-6);
    projection.resize(600, 0);
    assert_eq!(projection.aspect(), 600.0);

    let camera = Camera::new([1.0, 2.0, 3.0]);
    let uniform = CameraUniform::new(&camera, &projection);
    assert_eq!(uniform.position, [1.0, 2.0, 3.0, 1.0]);
}
