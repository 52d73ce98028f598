//! Configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

use super::types::Config;

pub use crate::domain::value_objects::ConfigWarning;

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
///
/// Relative paths inside the file are resolved against its directory.
pub fn load_with_warnings(path: &Path) -> PipelineResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path).map_err(|e| PipelineError::Config {
        file: path.to_path_buf(),
        message: format!("cannot read: {e}"),
    })?;

    let (mut config, warnings) = parse_with_warnings(&content, path)?;
    config.root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    config.file = Some(path.to_path_buf());
    Ok((config, warnings))
}

/// Parse `content` as if it were read from `path`
pub fn parse_with_warnings(
    content: &str,
    path: &Path,
) -> PipelineResult<(Config, Vec<ConfigWarning>)> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| PipelineError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|key| {
            let leaf = key.split('.').next_back().unwrap_or(key.as_str());
            ConfigWarning {
                line: find_line_number(content, leaf),
                suggestion: suggest_key(leaf),
                file: path.to_path_buf(),
                key,
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Apply `PACKWRIGHT_*` and `SOURCE_DATE_EPOCH` from the process environment
pub fn with_env_overrides(config: Config) -> PipelineResult<Config> {
    apply_env(config, |name| std::env::var(name).ok())
}

/// Apply environment overrides read through `lookup`
pub fn apply_env(
    mut config: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> PipelineResult<Config> {
    // PACKWRIGHT_CACHE_DIR
    if let Some(dir) = lookup("PACKWRIGHT_CACHE_DIR").filter(|v| !v.is_empty()) {
        config.cache_dir = Some(PathBuf::from(dir));
    }

    // PACKWRIGHT_FETCH_JOBS
    if let Some(jobs) = lookup("PACKWRIGHT_FETCH_JOBS") {
        config.fetch.jobs = parse_env(&config, "PACKWRIGHT_FETCH_JOBS", &jobs)?;
    }

    // PACKWRIGHT_FETCH_RETRIES
    if let Some(retries) = lookup("PACKWRIGHT_FETCH_RETRIES") {
        config.fetch.retries = parse_env(&config, "PACKWRIGHT_FETCH_RETRIES", &retries)?;
    }

    // PACKWRIGHT_PROFILE
    if let Some(profile) = lookup("PACKWRIGHT_PROFILE").filter(|v| !v.is_empty()) {
        config.build.profile = profile;
    }

    // SOURCE_DATE_EPOCH
    if let Some(epoch) = lookup("SOURCE_DATE_EPOCH").filter(|v| !v.is_empty()) {
        config.source_date_epoch = Some(parse_env(&config, "SOURCE_DATE_EPOCH", &epoch)?);
    }

    Ok(config)
}

fn parse_env<T: std::str::FromStr>(config: &Config, name: &str, value: &str) -> PipelineResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| config.error(format!("{name}='{value}' is not a valid number")))
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "cache_dir",
        "package",
        "name",
        "source",
        "lockfile",
        "lock",
        "overrides",
        "fetch",
        "retries",
        "backoff_ms",
        "jobs",
        "timeout_secs",
        "build",
        "profile",
        "profiles",
        "deny_unused_dependencies",
        "isolate_network",
        "release",
        "run_tests",
        "features",
        "image",
        "tag",
        "base_paths",
        "paths_to_link",
        "trust_bundle",
        "trust_bundle_path",
        "supervisor",
        "supervisor_path",
        "observability_address",
        "created",
        "env",
        "exposed_ports",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
