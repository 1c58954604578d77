mod brain;
mod config;
mod constants;
mod genome;
mod organism;
mod registry;
mod renderer;
mod universe;
mod utils;
mod world;

use crate::config::SimulationConfig;
use crate::constants::{
    CAMERA_MOVE_PER_SEC, CAMERA_TURN_PER_SEC, FIXED_TIMESTEP, FPS_UPDATE_INTERVAL_SECS,
    WINDOW_HEIGHT, WINDOW_WIDTH,
};
use crate::renderer::Renderer;
use crate::universe::Universe;
use crate::utils::heading_vector;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

/// Outer-loop state: `FreezeFrame` advances exactly one tick, then holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RunMode {
    Running,
    Paused,
    FreezeFrame,
}

/// Held-key state for the free camera.
#[derive(Default)]
struct CameraInput {
    forward: bool,
    back: bool,
    turn_left: bool,
    turn_right: bool,
    up: bool,
    down: bool,
}

impl CameraInput {
    fn apply(&self, universe: &mut Universe, dt: f32) {
        let world = &mut universe.world;
        // The camera looks opposite its heading vector.
        let dir = -heading_vector(world.camera_yaw);
        let step = CAMERA_MOVE_PER_SEC * dt;
        if self.forward {
            world.camera_pos += dir * step;
        }
        if self.back {
            world.camera_pos -= dir * step;
        }
        if self.up {
            world.camera_pos.y += step;
        }
        if self.down {
            world.camera_pos.y -= step;
        }
        if self.turn_left {
            world.camera_yaw += CAMERA_TURN_PER_SEC * dt;
        }
        if self.turn_right {
            world.camera_yaw -= CAMERA_TURN_PER_SEC * dt;
        }
    }
}

// --- Main Function ---
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Primeval")
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .build(&event_loop)?,
    );
    let mut renderer = pollster::block_on(Renderer::new(window.clone()));
    let mut universe = Universe::new(SimulationConfig::default());

    let mut run_mode = RunMode::Running;
    let mut camera_input = CameraInput::default();
    let mut screenshot_requested = false;
    let mut screenshot_index = 0u32;

    let mut last_sim_update_time = Instant::now();
    let mut last_frame_time = Instant::now();
    let mut time_accumulator = 0.0_f64;
    let mut last_fps_update_time = Instant::now();
    let mut frames_since_last_fps_update = 0u32;
    let mut current_fps = 0.0_f64;

    event_loop.run(move |event, elwt: &EventLoopWindowTarget<()>| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::AboutToWait => {
                let now = Instant::now();
                let frame_dt = now.duration_since(last_frame_time).as_secs_f32();
                last_frame_time = now;
                camera_input.apply(&mut universe, frame_dt);

                match run_mode {
                    RunMode::Running => {
                        let delta_time = now.duration_since(last_sim_update_time).as_secs_f64();
                        last_sim_update_time = now;
                        time_accumulator += delta_time;
                        while time_accumulator >= FIXED_TIMESTEP {
                            universe.update();
                            time_accumulator -= FIXED_TIMESTEP;
                        }
                    }
                    RunMode::FreezeFrame => {
                        universe.update();
                        run_mode = RunMode::Paused;
                        last_sim_update_time = now;
                        time_accumulator = 0.0;
                    }
                    RunMode::Paused => {
                        last_sim_update_time = now;
                        time_accumulator = 0.0;
                    }
                }
                window.request_redraw();
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(physical_size) => renderer.resize(physical_size),
                WindowEvent::ScaleFactorChanged { .. } => renderer.resize(window.inner_size()),
                WindowEvent::KeyboardInput {
                    event: key_event, ..
                } => {
                    if let PhysicalKey::Code(code) = key_event.physical_key {
                        let pressed = key_event.state == ElementState::Pressed;
                        match code {
                            KeyCode::ArrowUp => camera_input.forward = pressed,
                            KeyCode::ArrowDown => camera_input.back = pressed,
                            KeyCode::ArrowLeft => camera_input.turn_left = pressed,
                            KeyCode::ArrowRight => camera_input.turn_right = pressed,
                            KeyCode::PageUp => camera_input.up = pressed,
                            KeyCode::PageDown => camera_input.down = pressed,
                            KeyCode::Space if pressed && !key_event.repeat => {
                                run_mode = match run_mode {
                                    RunMode::Running => RunMode::Paused,
                                    _ => RunMode::Running,
                                };
                                println!(
                                    "Simulation {}",
                                    if run_mode == RunMode::Paused {
                                        "Paused"
                                    } else {
                                        "Resumed"
                                    }
                                );
                            }
                            KeyCode::KeyN if pressed && !key_event.repeat => {
                                if run_mode == RunMode::Paused {
                                    run_mode = RunMode::FreezeFrame;
                                    println!("Single step");
                                }
                            }
                            KeyCode::F12 if pressed && !key_event.repeat => {
                                screenshot_requested = true;
                            }
                            KeyCode::Escape if pressed => elwt.exit(),
                            _ => {}
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    frames_since_last_fps_update += 1;
                    let now = Instant::now();
                    let elapsed_secs = now.duration_since(last_fps_update_time).as_secs_f64();
                    if elapsed_secs >= FPS_UPDATE_INTERVAL_SECS {
                        current_fps = frames_since_last_fps_update as f64 / elapsed_secs;
                        log::info!("Frames per second: {:.1}", current_fps);
                        last_fps_update_time = now;
                        frames_since_last_fps_update = 0;
                    }

                    let capture: Option<PathBuf> = if screenshot_requested {
                        screenshot_requested = false;
                        screenshot_index += 1;
                        Some(PathBuf::from(format!(
                            "screenshot-{:04}.png",
                            screenshot_index
                        )))
                    } else {
                        None
                    };

                    match renderer.render(&universe, capture.as_deref()) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            eprintln!("WGPU Error: OutOfMemory");
                            elwt.exit();
                        }
                        Err(e) => eprintln!("WGPU Error: {:?}", e),
                    }

                    let (live, food) = universe.counts();
                    let paused_text = if run_mode == RunMode::Paused {
                        " [PAUSED]"
                    } else {
                        ""
                    };
                    window.set_title(&format!(
                        "Primeval - L: {}, F: {} - Tick {} - FPS: {:.1}{}",
                        live,
                        food,
                        universe.tick(),
                        current_fps,
                        paused_text
                    ));
                }
                _ => {}
            },
            _ => {}
        }
    })?;
    Ok(())
}
