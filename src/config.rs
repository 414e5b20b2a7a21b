//! Server configuration loaded from the environment

use crate::types::{RoomSettings, DEFAULT_TOTAL_TASKS};

/// Runtime configuration shared by every room
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (bound on 0.0.0.0)
    pub port: u16,
    /// Settings given to newly created rooms
    pub default_settings: RoomSettings,
    /// Total-task count assigned to each participant at join
    pub tasks_per_player: u32,
    /// When true, voting closes server-side once the room's deadline passes
    pub enforce_phase_timers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            default_settings: RoomSettings::default(),
            tasks_per_player: DEFAULT_TOTAL_TASKS,
            enforce_phase_timers: true,
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_settings = RoomSettings {
            impostors: env_parse(
                "CREWROOM_IMPOSTORS",
                defaults.default_settings.impostors,
            ),
            discussion_time: env_parse(
                "CREWROOM_DISCUSSION_SECONDS",
                defaults.default_settings.discussion_time,
            ),
            voting_time: env_parse(
                "CREWROOM_VOTING_SECONDS",
                defaults.default_settings.voting_time,
            ),
            anonymous_votes: env_flag(
                "CREWROOM_ANONYMOUS_VOTES",
                defaults.default_settings.anonymous_votes,
            ),
        };

        let config = Self {
            port: env_parse("CREWROOM_PORT", defaults.port),
            default_settings,
            tasks_per_player: env_parse("CREWROOM_TASKS_PER_PLAYER", defaults.tasks_per_player),
            enforce_phase_timers: env_flag(
                "CREWROOM_ENFORCE_PHASE_TIMERS",
                defaults.enforce_phase_timers,
            ),
        };

        tracing::info!(
            port = config.port,
            impostors = config.default_settings.impostors,
            discussion_time = config.default_settings.discussion_time,
            voting_time = config.default_settings.voting_time,
            tasks_per_player = config.tasks_per_player,
            enforce_phase_timers = config.enforce_phase_timers,
            "Server config loaded"
        );

        config
    }

    /// Total seconds a voting phase stays open (discussion plus voting)
    pub fn meeting_seconds(settings: &RoomSettings) -> i64 {
        i64::from(settings.discussion_time) + i64::from(settings.voting_time)
    }
}
