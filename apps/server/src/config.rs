//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use chorus_core::{
    CallerContext, ConversationId, TextChannelId, UserId, VoiceChannelId, VoiceChannelKind,
    VoiceMembership,
};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Prefix that marks a console line as a command.
    /// Override: `CHORUS_PREFIX`
    pub prefix: String,

    /// Identity every console line is issued as.
    pub caller: CallerConfig,

    /// Tracks the simulated resolver can find.
    pub catalogue: Vec<CatalogueEntry>,

    /// How many times faster than real time simulated playback runs.
    /// Override: `CHORUS_PLAYBACK_SPEEDUP`
    pub playback_speedup: f64,

    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,

    /// Capacity of the transport event channel.
    pub transport_event_capacity: usize,
}

/// The console user's identity and voice membership.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallerConfig {
    pub user_id: u64,
    /// Override: `CHORUS_CONVERSATION_ID`
    pub conversation_id: u64,
    pub text_channel_id: u64,
    /// `None` simulates a caller outside any voice channel.
    /// Override: `CHORUS_VOICE_CHANNEL_ID` (`none` clears it)
    pub voice_channel_id: Option<u64>,
    pub voice_channel_name: String,
    pub voice_channel_kind: VoiceChannelKind,
}

/// One track in the simulated catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueEntry {
    pub title: String,
    pub author: String,
    pub uri: String,
    pub duration_secs: u64,
    /// Extra search terms besides title and author.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CatalogueEntry {
    fn new(title: &str, author: &str, uri: &str, duration_secs: u64) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            uri: uri.to_string(),
            duration_secs,
            keywords: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = chorus_core::Config::default();
        Self {
            prefix: chorus_core::constants::DEFAULT_COMMAND_PREFIX.to_string(),
            caller: CallerConfig::default(),
            catalogue: vec![
                CatalogueEntry::new(
                    "Clair de Lune",
                    "Claude Debussy",
                    "https://music.example/debussy/clair-de-lune",
                    300,
                ),
                CatalogueEntry::new(
                    "Gymnopedie No. 1",
                    "Erik Satie",
                    "https://music.example/satie/gymnopedie-1",
                    185,
                ),
                CatalogueEntry::new(
                    "The Entertainer",
                    "Scott Joplin",
                    "https://music.example/joplin/the-entertainer",
                    222,
                ),
            ],
            playback_speedup: 10.0,
            event_channel_capacity: core.event_channel_capacity,
            transport_event_capacity: core.transport_event_capacity,
        }
    }
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            user_id: 1,
            conversation_id: 1,
            text_channel_id: 10,
            voice_channel_id: Some(20),
            voice_channel_name: "General".to_string(),
            voice_channel_kind: VoiceChannelKind::Voice,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CHORUS_PLAYBACK_SPEEDUP") {
            if let Ok(speedup) = val.parse() {
                self.playback_speedup = speedup;
            }
        }

        if let Ok(val) = std::env::var("CHORUS_CONVERSATION_ID") {
            if let Ok(id) = val.parse() {
                self.caller.conversation_id = id;
            }
        }

        if let Ok(val) = std::env::var("CHORUS_VOICE_CHANNEL_ID") {
            if val.eq_ignore_ascii_case("none") {
                self.caller.voice_channel_id = None;
            } else if let Ok(id) = val.parse() {
                self.caller.voice_channel_id = Some(id);
            }
        }

        // Note: CHORUS_PREFIX is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Playback speed-up, clamped to a usable range.
    pub fn effective_speedup(&self) -> f64 {
        if self.playback_speedup.is_finite() && self.playback_speedup > 0.0 {
            self.playback_speedup
        } else {
            1.0
        }
    }

    /// Converts to chorus-core's Config type.
    pub fn to_core_config(&self) -> chorus_core::Config {
        chorus_core::Config {
            event_channel_capacity: self.event_channel_capacity,
            transport_event_capacity: self.transport_event_capacity,
        }
    }
}

impl CallerConfig {
    pub fn to_caller_context(&self) -> CallerContext {
        CallerContext {
            user_id: UserId(self.user_id),
            conversation_id: ConversationId(self.conversation_id),
            text_channel: TextChannelId(self.text_channel_id),
            voice: self.voice_channel_id.map(|id| VoiceMembership {
                channel_id: VoiceChannelId(id),
                name: self.voice_channel_name.clone(),
                kind: self.voice_channel_kind,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_usable() {
        let config = ServerConfig::default();
        assert_eq!(config.prefix, "!");
        assert_eq!(config.catalogue.len(), 3);
        assert!(config.to_core_config().validate().is_ok());

        let caller = config.caller.to_caller_context();
        assert_eq!(caller.voice.unwrap().kind, VoiceChannelKind::Voice);
    }

    #[test]
    fn yaml_overrides_only_given_fields() {
        let yaml = r#"
prefix: "?"
caller:
  conversation_id: 42
  voice_channel_kind: stage
catalogue:
  - title: Song
    author: Band
    uri: https://music.example/song
    duration_secs: 3
    keywords: [tune]
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.prefix, "?");
        assert_eq!(config.caller.conversation_id, 42);
        assert_eq!(config.caller.text_channel_id, 10);
        assert_eq!(config.caller.voice_channel_kind, VoiceChannelKind::Stage);
        assert_eq!(config.catalogue.len(), 1);
        assert_eq!(config.catalogue[0].keywords, vec!["tune"]);
        assert_eq!(config.playback_speedup, 10.0);
    }

    #[test]
    fn null_voice_channel_means_not_in_voice() {
        let config: ServerConfig = serde_yaml::from_str("caller:\n  voice_channel_id: null\n").unwrap();
        assert!(config.caller.to_caller_context().voice.is_none());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "event_channel_capacity: 16").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.to_core_config().event_channel_capacity, 16);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ServerConfig::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn invalid_speedup_falls_back_to_real_time() {
        let config = ServerConfig {
            playback_speedup: 0.0,
            ..Default::default()
        };
        assert_eq!(config.effective_speedup(), 1.0);
    }
}
