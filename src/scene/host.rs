//! Owner of the backend and the single active scene

use crate::{config::AppConfig, error::Result, gfx::backend::Backend};

use super::{ActiveScene, SceneKind};

/// Holds one scene at a time and forwards the frame loop to it
///
/// Switching releases the previous scene before the next one is built, so two
/// scenes never hold resources at once. Dropping the host releases the active
/// scene before the backend itself is dropped.
pub struct SceneHost<B: Backend> {
    backend: B,
    config: AppConfig,
    scene: Option<ActiveScene>,
}

impl<B: Backend> SceneHost<B> {
    pub fn new(mut backend: B, config: AppConfig, initial: SceneKind) -> Result<Self> {
        let scene = ActiveScene::create(initial, &mut backend, &config)?;
        log::info!("starting with the {}", initial.display_name());

        Ok(Self {
            backend,
            config,
            scene: Some(scene),
        })
    }

    pub fn active_kind(&self) -> Option<SceneKind> {
        self.scene.as_ref().map(ActiveScene::kind)
    }

    pub fn tick(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            scene.tick(&mut self.backend);
        }
    }

    pub fn draw(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            scene.draw(&mut self.backend);
        }
    }

    /// One iteration of the frame loop
    pub fn frame(&mut self) {
        self.tick();
        self.draw();
    }

    /// Replaces the active scene
    ///
    /// On failure the host is left without a scene and the error is returned.
    pub fn switch_to(&mut self, kind: SceneKind) -> Result<()> {
        if let Some(previous) = self.scene.take() {
            log::info!(
                "switching from the {} to the {}",
                previous.kind().display_name(),
                kind.display_name()
            );
            previous.release(&mut self.backend);
        }

        self.scene = Some(ActiveScene::create(kind, &mut self.backend, &self.config)?);
        Ok(())
    }

    /// Releases the active scene; safe to call more than once
    pub fn shutdown(&mut self) {
        if let Some(scene) = self.scene.take() {
            log::info!("releasing the {}", scene.kind().display_name());
            scene.release(&mut self.backend);
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl<B: Backend> Drop for SceneHost<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
