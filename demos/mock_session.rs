//! Drive a full AR session against the in-process mock provider.
//!
//! Usage: RUST_LOG=debug WEBAR_TRANSPORT=handle cargo run --example mock_session

use webar::mock::MockProvider;
use webar::{BridgeConfig, HostPose, PoseBuffer, SessionController, SessionState, TickOutcome};

fn main() {
    env_logger::init();

    let config = match BridgeConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Bad configuration: {}", e);
            std::process::exit(1);
        }
    };

    let provider = MockProvider::new(config.fields);
    let mut session = match SessionController::initialize(provider, &config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    println!("Transport: {:?}", config.transport);
    println!("Fields:    {:?}", config.fields);
    println!("State:     {:?}", session.current_state());
    println!();

    session.on_button_pressed();
    session.provider_mut().notify(SessionState::Requested);
    session.provider_mut().notify(SessionState::Tracking);
    session.provider_mut().notify(SessionState::PoseValid);

    let mut camera = HostPose::default();
    for frame in 0..8u32 {
        let t = frame as f32 * 0.1;
        let rotation = glam::Quat::from_rotation_y(t);
        let view = glam::Mat4::from_rotation_translation(rotation, glam::Vec3::new(t, 1.6, -t));

        // Over the handle transport, every third frame hands out a null pointer.
        if frame % 3 == 2 {
            session.provider_mut().set_view_matrix(None);
        } else {
            session.provider_mut().publish(&PoseBuffer {
                view: view.to_cols_array(),
                ..Default::default()
            });
        }

        match session.tick(&mut camera) {
            TickOutcome::Applied(pose) => println!(
                "frame={}  pos=[{:+.3}, {:+.3}, {:+.3}]  quat=[{:+.3}, {:+.3}, {:+.3}, {:+.3}]",
                frame,
                pose.position.x,
                pose.position.y,
                pose.position.z,
                pose.rotation.x,
                pose.rotation.y,
                pose.rotation.z,
                pose.rotation.w,
            ),
            TickOutcome::Held => println!("frame={}  held", frame),
            TickOutcome::Inactive => println!("frame={}  inactive", frame),
        }
    }

    session.on_button_pressed();
    session.provider_mut().notify(SessionState::Idle);
    println!("\nFinal state: {:?}", session.current_state());
}
