use anyhow::Context;
use solaris::{
    config::AppConfig,
    logging::{init_logging, LoggingConfig},
    scene::SceneKind,
    SolarisApp,
};

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let app = SolarisApp::new(AppConfig::default(), SceneKind::MainMenu)
        .context("failed to create the event loop")?;
    app.run().context("solaris stopped with a fatal error")
}
