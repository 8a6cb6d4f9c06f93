//! Application configuration
//!
//! All tunables of the demo live here with their defaults. The binary runs with
//! [`AppConfig::default`]; tests and embedders adjust it through the `with_*`
//! builder methods.

use std::path::PathBuf;

use cgmath::Vector3;

/// Window creation settings
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    /// Requested inner width; 0 together with `height == 0` means the native
    /// monitor resolution
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Sample count of the screen target; 1 disables multisampling
    pub msaa_samples: u32,
    pub undecorated: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "solaris".to_string(),
            width: 0,
            height: 0,
            vsync: true,
            msaa_samples: 4,
            undecorated: true,
        }
    }
}

impl WindowConfig {
    /// True when the window should cover the native monitor resolution
    pub fn wants_native_size(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// Loose asset locations, relative to the working directory
#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub root: PathBuf,
    pub background: PathBuf,
    pub font: PathBuf,
    pub music: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("sresources"),
            background: PathBuf::from("graphics/mainmenu.jpg"),
            font: PathBuf::from("fonts/Orbitron/Orbitron-Regular.ttf"),
            music: PathBuf::from("sounds/mainmenu.ogg"),
        }
    }
}

impl AssetPaths {
    pub fn background_path(&self) -> PathBuf {
        self.root.join(&self.background)
    }

    pub fn font_path(&self) -> PathBuf {
        self.root.join(&self.font)
    }

    pub fn music_path(&self) -> PathBuf {
        self.root.join(&self.music)
    }
}

/// Main menu look, expressed at the reference resolution
#[derive(Debug, Clone)]
pub struct MenuConfig {
    pub title: String,
    pub font_size: u32,
    pub font_spacing: u32,
    pub title_y: f32,
    pub music_volume: f32,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            title: "SOLARIS".to_string(),
            font_size: 256,
            font_spacing: 64,
            title_y: 150.0,
            music_volume: 0.25,
        }
    }
}

/// Model viewer camera and grid
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub camera_position: Vector3<f32>,
    pub model_position: Vector3<f32>,
    pub fovy: f32,
    pub grid_slices: u32,
    pub grid_spacing: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera_position: Vector3::new(2.0, 2.0, 2.0),
            model_position: Vector3::new(0.0, 1.0, 0.0),
            fovy: 50.0,
            grid_slices: 10,
            grid_spacing: 1.0,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window: WindowConfig,
    /// Screen height the menu layout was designed for
    pub reference_resolution: u32,
    pub assets: AssetPaths,
    pub menu: MenuConfig,
    pub viewer: ViewerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            reference_resolution: 1600,
            assets: AssetPaths::default(),
            menu: MenuConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    pub fn with_reference_resolution(mut self, reference_resolution: u32) -> Self {
        self.reference_resolution = reference_resolution;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets.root = root.into();
        self
    }

    pub fn with_menu(mut self, menu: MenuConfig) -> Self {
        self.menu = menu;
        self
    }

    pub fn with_viewer(mut self, viewer: ViewerConfig) -> Self {
        self.viewer = viewer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo() {
        let config = AppConfig::default();
        assert_eq!(config.window.title, "solaris");
        assert!(config.window.wants_native_size());
        assert!(config.window.vsync);
        assert_eq!(config.window.msaa_samples, 4);
        assert_eq!(config.reference_resolution, 1600);
        assert_eq!(config.menu.font_size, 256);
        assert_eq!(config.menu.font_spacing, 64);
        assert_eq!(config.viewer.grid_slices, 10);
    }

    #[test]
    fn test_asset_paths_join_root() {
        let config = AppConfig::default().with_asset_root("assets");
        assert_eq!(
            config.assets.music_path(),
            PathBuf::from("assets/sounds/mainmenu.ogg")
        );
        assert_eq!(
            config.assets.font_path(),
            PathBuf::from("assets/fonts/Orbitron/Orbitron-Regular.ttf")
        );
    }
}
