//! Extension pour la configuration de la lecture
//!
//! ```yaml
//! playback:
//!   autoplay_delay_ms: 100
//!   autoload: true
//! ```

use std::time::Duration;

use anyhow::Result;
use pmoconfig::Config;

use crate::session::SessionOptions;

const DEFAULT_AUTOPLAY_DELAY_MS: u64 = 100;
const DEFAULT_AUTOLOAD: bool = true;

/// Trait d'extension pour la configuration de la session de lecture
pub trait PlaybackConfigExt {
    /// Delay before auto-play, in milliseconds
    fn get_playback_autoplay_delay_ms(&self) -> Result<u64>;
    fn set_playback_autoplay_delay_ms(&self, delay_ms: u64) -> Result<()>;

    /// Whether the catalogue is loaded at startup
    fn get_playback_autoload(&self) -> Result<bool>;
    fn set_playback_autoload(&self, enabled: bool) -> Result<()>;
}

impl PlaybackConfigExt for Config {
    pmoconfig::impl_u64_config!(
        get_playback_autoplay_delay_ms,
        set_playback_autoplay_delay_ms,
        &["playback", "autoplay_delay_ms"],
        DEFAULT_AUTOPLAY_DELAY_MS
    );

    pmoconfig::impl_bool_config!(
        get_playback_autoload,
        set_playback_autoload,
        &["playback", "autoload"],
        DEFAULT_AUTOLOAD
    );
}

impl SessionOptions {
    /// Reads the `playback.*` keys
    pub fn configured(config: &Config) -> Result<Self> {
        let delay_ms = config.get_playback_autoplay_delay_ms()?;
        let autoload = config.get_playback_autoload()?;
        tracing::debug!(delay_ms, autoload, "Playback options from configuration");

        Ok(SessionOptions {
            autoplay_delay: Duration::from_millis(delay_ms),
            autoload,
        })
    }
}
