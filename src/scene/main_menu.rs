//! Main menu splash: background image, title and looping music

use crate::{
    config::AppConfig,
    error::Result,
    gfx::backend::{Backend, Color, Font, Music, Texture},
};

use super::layout::{self, BackgroundPlacement, FontMetrics};

pub struct MainMenu {
    texture: Texture,
    font: Font,
    music: Music,
    metrics: FontMetrics,
    title: String,
    background: BackgroundPlacement,
    title_position: [f32; 2],
}

impl MainMenu {
    pub fn new<B: Backend>(backend: &mut B, config: &AppConfig) -> Result<Self> {
        let factor = layout::scaling_factor(backend.screen_height(), config.reference_resolution);
        let metrics = FontMetrics::scaled(config.menu.font_size, config.menu.font_spacing, factor);

        let texture = backend.load_texture(&config.assets.background_path())?;
        // tiny windows truncate the size to zero, which no atlas accepts
        let font = match backend.load_font(&config.assets.font_path(), metrics.size.max(1)) {
            Ok(font) => font,
            Err(err) => {
                backend.unload_texture(texture);
                return Err(err);
            }
        };
        let music = match backend.load_music(&config.assets.music_path()) {
            Ok(music) => music,
            Err(err) => {
                backend.unload_font(font);
                backend.unload_texture(texture);
                return Err(err);
            }
        };

        backend.set_music_volume(&music, config.menu.music_volume);
        backend.play_music(&music);

        let screen_width = backend.screen_width();
        let background = layout::background_placement(
            screen_width,
            backend.screen_height(),
            texture.width,
            texture.height,
        );

        let title = config.menu.title.clone();
        let [text_width, _] = backend.measure_text(
            &font,
            &title,
            metrics.size as f32,
            metrics.spacing as f32,
        );
        let title_position = [layout::centered_x(screen_width, text_width), config.menu.title_y];

        log::info!(
            "main menu ready: font {}px spacing {}px, background scale {:.3}",
            metrics.size,
            metrics.spacing,
            background.scale
        );

        Ok(Self {
            texture,
            font,
            music,
            metrics,
            title,
            background,
            title_position,
        })
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn background(&self) -> BackgroundPlacement {
        self.background
    }

    pub fn title_position(&self) -> [f32; 2] {
        self.title_position
    }

    pub fn tick<B: Backend>(&mut self, backend: &mut B) {
        backend.update_music(&self.music);
    }

    pub fn draw<B: Backend>(&mut self, backend: &mut B) {
        backend.begin_drawing();
        backend.clear_background(Color::BLACK);

        backend.draw_texture_ex(
            &self.texture,
            self.background.position,
            0.0,
            self.background.scale,
            Color::WHITE,
        );
        backend.draw_text_ex(
            &self.font,
            &self.title,
            self.title_position,
            self.metrics.size as f32,
            self.metrics.spacing as f32,
            Color::WHITE,
        );

        backend.end_drawing();
    }

    pub fn release<B: Backend>(self, backend: &mut B) {
        backend.unload_music(self.music);
        backend.unload_font(self.font);
        backend.unload_texture(self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::mock::{Event, MockBackend};

    #[test]
    fn test_metrics_follow_screen_height() {
        let config = AppConfig::default();
        let mut backend = MockBackend::new(2560, 1600);
        let menu = MainMenu::new(&mut backend, &config).unwrap();

        assert_eq!(menu.metrics(), FontMetrics { size: 256, spacing: 64 });
        assert!(backend
            .events
            .contains(&Event::LoadFont { id: 2, size: 256 }));
        menu.release(&mut backend);
    }

    #[test]
    fn test_tiny_window_still_loads_a_font() {
        let config = AppConfig::default();
        let mut backend = MockBackend::new(8, 4);
        let menu = MainMenu::new(&mut backend, &config).unwrap();

        assert_eq!(menu.metrics().size, 0);
        assert!(backend
            .events
            .contains(&Event::LoadFont { id: 2, size: 1 }));
        menu.release(&mut backend);
    }

    #[test]
    fn test_layout_is_centered() {
        let config = AppConfig::default();
        let mut backend = MockBackend::new(1920, 1080);
        backend.image_size = (2400, 1600);
        let menu = MainMenu::new(&mut backend, &config).unwrap();

        let background = menu.background();
        assert!((background.scale - 0.675).abs() < 1e-6);
        assert!((background.position[0] - 150.0).abs() < 1e-3);

        // mock glyphs are size / 2 wide: 7 * 86 + 6 * 43 = 860
        let [x, y] = menu.title_position();
        assert!((x - (1920.0 - 860.0) / 2.0).abs() < 1e-3);
        assert_eq!(y, 150.0);
        menu.release(&mut backend);
    }

    #[test]
    fn test_music_starts_quietly_and_ticks() {
        let config = AppConfig::default();
        let mut backend = MockBackend::new(1920, 1080);
        let mut menu = MainMenu::new(&mut backend, &config).unwrap();

        assert!(backend.events.contains(&Event::SetMusicVolume(3, 0.25)));
        assert!(backend.events.contains(&Event::PlayMusic(3)));

        menu.tick(&mut backend);
        menu.tick(&mut backend);
        assert_eq!(backend.count(|e| matches!(e, Event::UpdateMusic(3))), 2);
        menu.release(&mut backend);
    }

    #[test]
    fn test_draw_brackets_one_frame() {
        let config = AppConfig::default();
        let mut backend = MockBackend::new(1920, 1080);
        let mut menu = MainMenu::new(&mut backend, &config).unwrap();
        backend.events.clear();

        menu.draw(&mut backend);

        assert_eq!(backend.events.first(), Some(&Event::BeginDrawing));
        assert_eq!(backend.events.get(1), Some(&Event::Clear(Color::BLACK)));
        assert!(matches!(backend.events[2], Event::DrawTexture { texture: 1, .. }));
        assert!(matches!(&backend.events[3], Event::DrawText { text, .. } if text == "SOLARIS"));
        assert_eq!(backend.events.last(), Some(&Event::EndDrawing));
        menu.release(&mut backend);
    }

    #[test]
    fn test_release_frees_everything() {
        let config = AppConfig::default();
        let mut backend = MockBackend::new(1920, 1080);
        let menu = MainMenu::new(&mut backend, &config).unwrap();
        assert_eq!(backend.live().total(), 3);

        menu.release(&mut backend);
        assert_eq!(backend.live().total(), 0);
    }

    #[test]
    fn test_missing_music_frees_earlier_loads() {
        let config = AppConfig::default();
        let mut backend = MockBackend::new(1920, 1080);
        backend.missing_paths.insert(config.assets.music_path());

        assert!(MainMenu::new(&mut backend, &config).is_err());
        assert_eq!(backend.live().total(), 0);
    }
}
