use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "http://localhost:7860/api";
const DEFAULT_REVEAL_RATE: u32 = 2;
const DEFAULT_ARXIV_MAX_RESULTS: u32 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base: String,
    pub history_db: PathBuf,
    /// Lines revealed per second while an answer is "typed" out.
    pub reveal_lines_per_second: u32,
    pub arxiv_max_results: u32,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn load() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("PAPERCHAT_API_BASE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let history_db = lookup("PAPERCHAT_HISTORY_DB")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_history_db);
        let reveal_lines_per_second =
            parse_or(&lookup, "PAPERCHAT_REVEAL_RATE", DEFAULT_REVEAL_RATE).max(1);
        let arxiv_max_results =
            parse_or(&lookup, "PAPERCHAT_ARXIV_MAX_RESULTS", DEFAULT_ARXIV_MAX_RESULTS).max(1);
        let timeout_secs = parse_or(&lookup, "PAPERCHAT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let request_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Self {
            api_base,
            history_db,
            reveal_lines_per_second,
            arxiv_max_results,
            request_timeout,
        }
    }

    fn default_history_db() -> PathBuf {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("paperchat");
        path.push("history.db");
        path
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("ignoring invalid {}={:?}, using {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}
