//! # Scenes
//!
//! The demo has two scenes, a main menu and a model viewer. They form a closed
//! set, so the active scene is the enum [`ActiveScene`] tagged by
//! [`SceneKind`] rather than a trait object.
//!
//! A scene acquires its backend resources in its constructor and gives them
//! back in `release`, which consumes the scene. [`SceneHost`] is the only
//! caller of `release` and guarantees it runs on every exit path.

pub mod host;
pub mod layout;
pub mod main_menu;
pub mod model_viewer;

pub use host::SceneHost;
pub use main_menu::MainMenu;
pub use model_viewer::ModelViewer;

use crate::{config::AppConfig, error::Result, gfx::backend::Backend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    MainMenu,
    ModelViewer,
}

impl SceneKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SceneKind::MainMenu => "main menu",
            SceneKind::ModelViewer => "model viewer",
        }
    }
}

pub enum ActiveScene {
    MainMenu(MainMenu),
    ModelViewer(ModelViewer),
}

impl ActiveScene {
    pub fn create<B: Backend>(kind: SceneKind, backend: &mut B, config: &AppConfig) -> Result<Self> {
        Ok(match kind {
            SceneKind::MainMenu => ActiveScene::MainMenu(MainMenu::new(backend, config)?),
            SceneKind::ModelViewer => ActiveScene::ModelViewer(ModelViewer::new(backend, config)?),
        })
    }

    pub fn kind(&self) -> SceneKind {
        match self {
            ActiveScene::MainMenu(_) => SceneKind::MainMenu,
            ActiveScene::ModelViewer(_) => SceneKind::ModelViewer,
        }
    }

    pub fn tick<B: Backend>(&mut self, backend: &mut B) {
        match self {
            ActiveScene::MainMenu(scene) => scene.tick(backend),
            ActiveScene::ModelViewer(scene) => scene.tick(backend),
        }
    }

    pub fn draw<B: Backend>(&mut self, backend: &mut B) {
        match self {
            ActiveScene::MainMenu(scene) => scene.draw(backend),
            ActiveScene::ModelViewer(scene) => scene.draw(backend),
        }
    }

    pub fn release<B: Backend>(self, backend: &mut B) {
        match self {
            ActiveScene::MainMenu(scene) => scene.release(backend),
            ActiveScene::ModelViewer(scene) => scene.release(backend),
        }
    }
}
