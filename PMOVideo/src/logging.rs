use pmoconfig::Config;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Niveau minimal lu dans `host.logger.min_level`, INFO à défaut
fn configured_level(config: &Config) -> LevelFilter {
    match config.get_log_min_level() {
        Ok(level) => level.trim().parse().unwrap_or(LevelFilter::INFO),
        Err(_) => LevelFilter::INFO,
    }
}

/// Installe le subscriber global.
///
/// `RUST_LOG` prend le pas sur le niveau configuré. Les logs vont sur
/// stderr pour ne pas se mêler à l'affichage du lecteur.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::builder()
        .with_default_directive(configured_level(config).into())
        .from_env_lossy();

    let enable_console = config.get_log_enable_console().unwrap_or(true);

    let subscriber = tracing_subscriber::registry().with(filter);
    if enable_console {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber.init();
    }
}
