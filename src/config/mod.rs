use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    env_overlay: bool,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        // A local .env only fills variables that are not already set.
        let _ = dotenvy::dotenv();

        let mut map = default_map();
        let config_path = default_config_path();

        // Read .reportsmithrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, env_overlay: true, config_path }
    }

    /// Defaults plus explicit values, ignoring the process environment.
    #[cfg(test)]
    pub fn with_values(pairs: &[(&str, &str)]) -> Self {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert((*k).to_string(), (*v).to_string());
        }
        Self { inner: map, env_overlay: false, config_path: PathBuf::new() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if self.env_overlay {
            if let Ok(v) = env::var(key) {
                return Some(v);
            }
        }
        self.inner.get(key).cloned()
    }

    /// Like [`Config::get`], but blank values count as missing.
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse::<u32>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// Whole-request timeout in seconds. Unset means requests wait indefinitely.
    pub fn request_timeout_secs(&self) -> Option<u64> {
        self.get_u64("REQUEST_TIMEOUT").filter(|&secs| secs > 0)
    }

    pub fn pandoc_program(&self) -> String {
        self.get_non_empty("PANDOC_PATH").unwrap_or_else(|| "pandoc".into())
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "GOOGLE_API_KEY",
        "ANTHROPIC_API_KEY",
        "OPENAI_API_KEY",
        "GEMINI_API_BASE",
        "ANTHROPIC_API_BASE",
        "OPENAI_API_BASE",
        "GEMINI_MODEL",
        "CLAUDE_MODEL",
        "OPENAI_MODEL",
        "GEMINI_MAX_TOKENS",
        "CLAUDE_MAX_TOKENS",
        "OPENAI_MAX_TOKENS",
        "REQUEST_TIMEOUT",
        "PANDOC_PATH",
        "INPUT_DIR",
        "EXAMPLE_PATH",
        "PROMPTS_PATH",
        "MASTER_FILE_PATH",
        "OUTPUT_DIR",
    ];

    KEYS.contains(&k) || k.starts_with("REPORTSMITH_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("reportsmith").join(".reportsmithrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Paths, relative to the working directory
    m.insert("INPUT_DIR".into(), "./data_files/inputs".into());
    m.insert("EXAMPLE_PATH".into(), "./example/example.txt".into());
    m.insert("PROMPTS_PATH".into(), "./prompts".into());
    m.insert(
        "MASTER_FILE_PATH".into(),
        "./data_files/master_file/master_file.txt".into(),
    );
    m.insert("OUTPUT_DIR".into(), "./data_files/outputs".into());

    // Vendor endpoints
    m.insert(
        "GEMINI_API_BASE".into(),
        "https://generativelanguage.googleapis.com".into(),
    );
    m.insert("ANTHROPIC_API_BASE".into(), "https://api.anthropic.com".into());
    m.insert("OPENAI_API_BASE".into(), "https://api.openai.com/v1".into());

    // Models
    m.insert("GEMINI_MODEL".into(), "gemini-1.5-pro".into());
    m.insert("CLAUDE_MODEL".into(), "claude-3-sonnet-20240229".into());
    m.insert("OPENAI_MODEL".into(), "gpt-4o".into());

    // Numbers
    m.insert("GEMINI_MAX_TOKENS".into(), "8192".into());
    m.insert("CLAUDE_MAX_TOKENS".into(), "4096".into());
    m.insert("OPENAI_MAX_TOKENS".into(), "4096".into());

    m.insert("PANDOC_PATH".into(), "pandoc".into());

    m
}
