use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error,
    menu::{builder::DEFAULT_TELEGRAM_WEB_ORIGIN, ranking::TOP_TOPICS},
    Result,
};

/// Typed configuration for the SwiftShift host.
///
/// Bot tokens are not configured here: they live in the profiles of the store.
#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub store_path: PathBuf,
    pub activity_log_path: PathBuf,
    pub activity_log_json: bool,

    // Menu
    pub telegram_web_origin: String,
    pub top_topics: usize,

    // Recency
    pub recency_retain: usize,
    pub recency_display: usize,
    pub recent_sends_max: usize,

    // Network
    pub preview_timeout: Duration,
    pub send_min_interval: Duration,
    pub chat_min_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let data_dir = env_path("SWIFTSHIFT_DATA_DIR")
            .or_else(|| home_dir().map(|h| h.join(".swiftshift")))
            .ok_or_else(|| Error::Config("HOME is not set".to_string()))?;
        fs::create_dir_all(&data_dir)?;

        let store_path =
            env_path("SWIFTSHIFT_STORE_PATH").unwrap_or_else(|| data_dir.join("store.json"));
        let activity_log_path =
            env_path("SWIFTSHIFT_ACTIVITY_LOG").unwrap_or_else(|| data_dir.join("activity.log"));
        let activity_log_json = env_bool("SWIFTSHIFT_ACTIVITY_LOG_JSON").unwrap_or(true);

        let telegram_web_origin = env_str("SWIFTSHIFT_TELEGRAM_WEB_ORIGIN")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TELEGRAM_WEB_ORIGIN.to_string());
        let top_topics = env_usize("SWIFTSHIFT_TOP_TOPICS").unwrap_or(TOP_TOPICS);

        let recency_retain = env_usize("SWIFTSHIFT_RECENCY_RETAIN").unwrap_or(10);
        let recency_display = env_usize("SWIFTSHIFT_RECENCY_DISPLAY").unwrap_or(5);
        if recency_retain == 0 || recency_display > recency_retain {
            return Err(Error::Config(format!(
                "SWIFTSHIFT_RECENCY_RETAIN ({recency_retain}) must be positive and at least SWIFTSHIFT_RECENCY_DISPLAY ({recency_display})"
            )));
        }
        let recent_sends_max = env_usize("SWIFTSHIFT_RECENT_SENDS_MAX").unwrap_or(50);

        let preview_timeout =
            Duration::from_millis(env_u64("SWIFTSHIFT_PREVIEW_TIMEOUT_MS").unwrap_or(3_000));
        let send_min_interval =
            Duration::from_millis(env_u64("SWIFTSHIFT_SEND_MIN_INTERVAL_MS").unwrap_or(40));
        let chat_min_interval =
            Duration::from_millis(env_u64("SWIFTSHIFT_CHAT_MIN_INTERVAL_MS").unwrap_or(1_050));

        Ok(Self {
            store_path,
            activity_log_path,
            activity_log_json,
            telegram_web_origin,
            top_topics,
            recency_retain,
            recency_display,
            recent_sends_max,
            preview_timeout,
            send_min_interval,
            chat_min_interval,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
