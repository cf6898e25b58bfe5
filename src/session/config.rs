use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Environment variable that overrides the log root
pub const PROJECTS_DIR_ENV: &str = "SESSION_MONITOR_PROJECTS_DIR";

// ---------------------------------------------------------------------------
// TTL Cache
// ---------------------------------------------------------------------------

struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
}

struct TtlCache<T> {
    entry: Option<CacheEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    fn new(ttl: Duration) -> Self {
        TtlCache { entry: None, ttl }
    }

    fn get(&self) -> Option<T> {
        let entry = self.entry.as_ref()?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    fn insert(&mut self, value: T) {
        self.entry = Some(CacheEntry {
            value,
            inserted_at: Instant::now(),
        });
    }

    fn invalidate(&mut self) {
        self.entry = None;
    }
}

// ---------------------------------------------------------------------------
// Static cache
// ---------------------------------------------------------------------------

static CONFIG_CACHE: Lazy<Mutex<TtlCache<MonitorConfig>>> =
    Lazy::new(|| Mutex::new(TtlCache::new(Duration::from_secs(60))));

// ---------------------------------------------------------------------------
// Config file schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    /// Root holding one directory per project. Defaults to `~/.claude/projects`.
    pub projects_dir: Option<PathBuf>,
    /// How many entries of each log to classify on
    pub tail_entries: usize,
    /// Binary name of the assistant process
    pub process_name: String,
    /// Silence after which a running session may be killed as a ghost
    pub ghost_threshold_secs: u64,
}

const DEFAULT_TAIL_ENTRIES: usize = 100;
const DEFAULT_GHOST_THRESHOLD_SECS: u64 = 60 * 60;

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            projects_dir: None,
            tail_entries: DEFAULT_TAIL_ENTRIES,
            process_name: "claude".to_string(),
            ghost_threshold_secs: DEFAULT_GHOST_THRESHOLD_SECS,
        }
    }
}

impl MonitorConfig {
    /// Ghost threshold as a duration. Values too large for `chrono::Duration` fall back
    /// to the one hour default.
    pub fn ghost_threshold(&self) -> chrono::Duration {
        i64::try_from(self.ghost_threshold_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| {
                debug!(
                    "ghostThresholdSecs {} out of range, using default",
                    self.ghost_threshold_secs
                );
                chrono::Duration::seconds(DEFAULT_GHOST_THRESHOLD_SECS as i64)
            })
    }

    /// Number of log entries to classify on; 0 means the default
    pub fn tail_len(&self) -> usize {
        if self.tail_entries == 0 {
            DEFAULT_TAIL_ENTRIES
        } else {
            self.tail_entries
        }
    }

    /// Log root: env override, then the config file, then `~/.claude/projects`
    pub fn resolve_projects_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(PROJECTS_DIR_ENV).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(dir));
        }
        if let Some(dir) = &self.projects_dir {
            return Some(dir.clone());
        }
        default_projects_dir()
    }
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// `~/.claude/projects`
pub fn default_projects_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("projects"))
}

/// `~/.session-monitor/config.json`
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".session-monitor").join("config.json"))
}

/// Read the monitor config. Returns defaults on missing file or parse errors. Cached for 60s.
pub fn get_config() -> MonitorConfig {
    if let Ok(cache) = CONFIG_CACHE.lock() {
        if let Some(cached) = cache.get() {
            return cached;
        }
    }

    let result = match config_path() {
        Some(path) => read_config(&path),
        None => MonitorConfig::default(),
    };

    if let Ok(mut cache) = CONFIG_CACHE.lock() {
        cache.insert(result.clone());
    }
    result
}

/// Drop the cached config so the next `get_config` rereads the file.
pub fn invalidate_config_cache() {
    if let Ok(mut cache) = CONFIG_CACHE.lock() {
        cache.invalidate();
    }
}

/// Read config from an explicit path, bypassing the cache.
pub fn read_config(config_path: &Path) -> MonitorConfig {
    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(_) => return MonitorConfig::default(),
    };

    match serde_json::from_str::<MonitorConfig>(&content) {
        Ok(config) => {
            debug!("Loaded monitor config from {:?}: {:?}", config_path, config);
            config
        }
        Err(e) => {
            debug!("Failed to parse {:?}: {}", config_path, e);
            MonitorConfig::default()
        }
    }
}
