//! Main engine orchestrator
//!
//! [`Engine::run`] owns the winit event loop: it creates the window,
//! initializes the renderer, and renders one frame per loop iteration after
//! ticking the caller's update closure.

use crate::renderer::{Renderer, RendererError};
use crate::scene::{Node, Scene};
use crate::window::Window;
use crate::RendererConfig;
use std::time::Instant;
use thiserror::Error;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Renderer(#[from] RendererError),
}

/// Names of the nodes the renderer draws from each frame: the main camera,
/// the shadow camera, and the directional light
#[derive(Debug, Clone)]
pub struct FrameTargets {
    pub camera: String,
    pub shadow_camera: String,
    pub light: String,
}

impl Default for FrameTargets {
    fn default() -> Self {
        Self {
            camera: "Camera".to_string(),
            shadow_camera: "ShadowCamera".to_string(),
            light: "Light".to_string(),
        }
    }
}

/// Windowed runner around [`Renderer`]
pub struct Engine {
    config: RendererConfig,
    targets: FrameTargets,
}

impl Engine {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            targets: FrameTargets::default(),
        }
    }

    pub fn with_targets(mut self, targets: FrameTargets) -> Self {
        self.targets = targets;
        self
    }

    /// Run until the window closes. `update` is called once per frame with
    /// the scene and the elapsed time in seconds.
    pub fn run<F>(self, scene: Scene, mut update: F) -> Result<(), EngineError>
    where
        F: FnMut(&mut Scene, f32) + 'static,
    {
        let event_loop = EventLoop::new()?;
        let mut window = Window::new(&event_loop, &self.config)?;
        let mut renderer =
            pollster::block_on(Renderer::initialize(window.window_arc(), &self.config))?;

        let targets = self.targets;
        let mut scene = scene;
        let mut last_frame = Instant::now();

        event_loop.run(move |event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => {
                    window.handle_event(&event);

                    // F1 toggles the shadow-map debug view
                    if let WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::F1),
                                repeat: false,
                                ..
                            },
                        ..
                    } = event
                    {
                        renderer.set_show_shadow_map(!renderer.show_shadow_map());
                    }

                    if window.should_close() {
                        elwt.exit();
                    }
                }
                Event::AboutToWait => {
                    if window.take_resized() {
                        let (width, height) = window.dimensions();
                        renderer.resize(width, height);
                        if width > 0 && height > 0 {
                            set_aspect(&mut scene.root, width as f32 / height as f32);
                        }
                    }

                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;

                    update(&mut scene, dt);
                    if let Err(err) = renderer.render_frame(
                        &scene,
                        &targets.camera,
                        &targets.shadow_camera,
                        &targets.light,
                    ) {
                        log::error!("frame dropped: {err}");
                    }

                    window.request_redraw();
                }
                _ => {}
            }
        })?;
        Ok(())
    }
}

/// Keep perspective cameras in step with the surface aspect ratio;
/// orthographic shadow cameras are left alone
fn set_aspect(node: &mut Node, aspect: f32) {
    if let Some(camera) = node.camera.as_mut() {
        camera.projection.set_aspect(aspect);
    }
    for child in &mut node.children {
        set_aspect(child, aspect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Camera, Projection};

    #[test]
    fn set_aspect_skips_orthographic_cameras() {
        let mut root = Node::new("root")
            .with_child(
                Node::new("main").with_camera(Camera::new(Projection::perspective(
                    60.0,
                    1.0,
                    0.1,
                    100.0,
                ))),
            )
            .with_child(Node::new("shadow").with_camera(Camera::new(
                Projection::orthographic(160.0, 160.0, -200.0, 300.0),
            )));

        set_aspect(&mut root, 2.0);

        let main = root.find("main").unwrap().camera.as_ref().unwrap();
        match main.projection {
            Projection::Perspective { aspect, .. } => assert_eq!(aspect, 2.0),
            _ => unreachable!(),
        }
        let shadow = root.find("shadow").unwrap().camera.as_ref().unwrap();
        assert!(shadow.projection.is_orthographic());
    }

    #[test]
    fn default_targets_name_the_conventional_nodes() {
        let targets = FrameTargets::default();
        assert_eq!(targets.camera, "Camera");
        assert_eq!(targets.shadow_camera, "ShadowCamera");
        assert_eq!(targets.light, "Light");
    }
}
