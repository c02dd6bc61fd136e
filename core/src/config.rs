use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_PROBLEMS: usize = 100;
pub const DEFAULT_MAX_CACHE_SIZE: usize = 50 * 1024 * 1024;
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_GC_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_CACHE_TTL_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_MAX_PATTERN_DEPTH: usize = 20;
pub const DEFAULT_MAX_PARSE_ERRORS: usize = 100;
pub const DEFAULT_MAX_PATTERN_LINES: usize = 200;
pub const DEFAULT_MAX_NESTED_PATTERNS: usize = 50;

/// Host-supplied analysis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub max_number_of_problems: usize,
    pub enable_syntax_validation: bool,
    pub enable_semantic_validation: bool,
    pub enable_best_practice_warnings: bool,
    pub enable_caching: bool,
    pub max_cache_size: usize,
    pub max_file_size: usize,
    pub debounce_delay: u64,
    pub gc_interval: u64,
    pub cache_ttl: u64,
    pub max_pattern_depth: usize,
    pub max_parse_errors: usize,
    pub max_pattern_lines: usize,
    pub max_nested_patterns: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_number_of_problems: DEFAULT_MAX_PROBLEMS,
            enable_syntax_validation: true,
            enable_semantic_validation: true,
            enable_best_practice_warnings: true,
            enable_caching: true,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            debounce_delay: DEFAULT_DEBOUNCE_MS,
            gc_interval: DEFAULT_GC_INTERVAL_MS,
            cache_ttl: DEFAULT_CACHE_TTL_MS,
            max_pattern_depth: DEFAULT_MAX_PATTERN_DEPTH,
            max_parse_errors: DEFAULT_MAX_PARSE_ERRORS,
            max_pattern_lines: DEFAULT_MAX_PATTERN_LINES,
            max_nested_patterns: DEFAULT_MAX_NESTED_PATTERNS,
        }
    }
}

// Wire shape: every key optional so partial client sections merge onto defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SettingsSection {
    #[serde(default)]
    max_number_of_problems: Option<i64>,
    #[serde(default)]
    enable_syntax_validation: Option<bool>,
    #[serde(default)]
    enable_semantic_validation: Option<bool>,
    #[serde(default)]
    enable_best_practice_warnings: Option<bool>,
    #[serde(default)]
    enable_caching: Option<bool>,
    #[serde(default)]
    max_cache_size: Option<i64>,
    #[serde(default)]
    max_file_size: Option<i64>,
    #[serde(default)]
    debounce_delay: Option<i64>,
    #[serde(default)]
    gc_interval: Option<i64>,
    #[serde(default)]
    cache_ttl: Option<i64>,
    #[serde(default)]
    max_pattern_depth: Option<i64>,
    #[serde(default)]
    max_parse_errors: Option<i64>,
    #[serde(default)]
    max_pattern_lines: Option<i64>,
    #[serde(default)]
    max_nested_patterns: Option<i64>,
}

fn positive(v: Option<i64>) -> Option<usize> {
    v.filter(|v| *v > 0).map(|v| v as usize)
}

impl Settings {
    /// Merge a JSON settings object onto the defaults.
    ///
    /// Unknown keys are ignored and non-positive numbers keep their default.
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        let section: SettingsSection = serde_json::from_value(value)?;
        let mut settings = Settings::default();
        settings.apply(section);
        Ok(settings)
    }

    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    fn apply(&mut self, section: SettingsSection) {
        if let Some(v) = section.enable_syntax_validation {
            self.enable_syntax_validation = v;
        }
        if let Some(v) = section.enable_semantic_validation {
            self.enable_semantic_validation = v;
        }
        if let Some(v) = section.enable_best_practice_warnings {
            self.enable_best_practice_warnings = v;
        }
        if let Some(v) = section.enable_caching {
            self.enable_caching = v;
        }
        if let Some(v) = positive(section.max_number_of_problems) {
            self.max_number_of_problems = v;
        }
        if let Some(v) = positive(section.max_cache_size) {
            self.max_cache_size = v;
        }
        if let Some(v) = positive(section.max_file_size) {
            self.max_file_size = v;
        }
        if let Some(v) = positive(section.debounce_delay) {
            self.debounce_delay = v as u64;
        }
        if let Some(v) = positive(section.gc_interval) {
            self.gc_interval = v as u64;
        }
        if let Some(v) = positive(section.cache_ttl) {
            self.cache_ttl = v as u64;
        }
        if let Some(v) = positive(section.max_pattern_depth) {
            self.max_pattern_depth = v;
        }
        if let Some(v) = positive(section.max_parse_errors) {
            self.max_parse_errors = v;
        }
        if let Some(v) = positive(section.max_pattern_lines) {
            self.max_pattern_lines = v;
        }
        if let Some(v) = positive(section.max_nested_patterns) {
            self.max_nested_patterns = v;
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_delay)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl)
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_errors: self.max_parse_errors,
            max_file_size: self.max_file_size,
            pattern: PatternLimits {
                max_depth: self.max_pattern_depth,
                max_lines: self.max_pattern_lines,
                max_nested: self.max_nested_patterns,
                max_content_len: self.max_file_size / 10,
            },
        }
    }
}

/// Hard caps that bound a single multi-line construct detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternLimits {
    pub max_depth: usize,
    pub max_lines: usize,
    pub max_nested: usize,
    pub max_content_len: usize,
}

impl Default for PatternLimits {
    fn default() -> Self {
        Settings::default().parser_options().pattern
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub max_errors: usize,
    pub max_file_size: usize,
    pub pattern: PatternLimits,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Settings::default().parser_options()
    }
}
