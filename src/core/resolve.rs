//! Purpose: Locate the confium shared library on disk without loading it.
//! Exports: `Platform`, `SearchConfig`, `LibraryPattern`, `candidate_dirs`,
//! `find_library`, `resolve_library_path`.
//! Role: Pure search-path logic; `core::library` owns the actual load.
//! Invariants: An override naming a file is used verbatim, never pattern-checked.
//! Invariants: Directories are scanned in order; within a directory the earliest
//! pattern expansion wins (`lib` before bare, unversioned before `-?`), then names sort.
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::core::config::LIBRARY_PATH_ENV;
use crate::core::error::{Error, ErrorKind};

const LIBRARY_STEM: &str = "confium";

const UNIX_SEARCH_DIRS: &[&str] = &[
    "/usr/local/lib64",
    "/usr/local/lib",
    "/opt/local/lib64",
    "/opt/local/lib",
    "/usr/lib64",
    "/usr/lib",
    "/opt/homebrew/lib",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/i386-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Platform {
    Unix,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }

    pub fn library_suffix(self) -> &'static str {
        match self {
            Platform::Unix => "so",
            Platform::MacOs => "dylib",
            Platform::Windows => "dll",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub override_path: Option<PathBuf>,
    pub platform: Platform,
    /// Value of `PATH`, only consulted on Windows.
    pub path_var: Option<OsString>,
}

impl SearchConfig {
    pub fn new(platform: Platform) -> Self {
        Self {
            override_path: None,
            platform,
            path_var: None,
        }
    }

    pub fn from_env() -> Self {
        Self {
            override_path: env::var_os(LIBRARY_PATH_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            platform: Platform::current(),
            path_var: env::var_os("PATH"),
        }
    }

    pub fn with_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_path_var(mut self, value: impl Into<OsString>) -> Self {
        self.path_var = Some(value.into());
        self
    }
}

/// File-name matcher for `{lib,}confium{,-?}.<suffix>{,.?}`.
///
/// Globs are added in brace-expansion order; `rank` reports the earliest one matching.
#[derive(Clone, Debug)]
pub struct LibraryPattern {
    set: GlobSet,
}

impl LibraryPattern {
    pub fn new(platform: Platform) -> Result<Self, Error> {
        let suffix = platform.library_suffix();
        let mut builder = GlobSetBuilder::new();
        for prefix in ["lib", ""] {
            for version in ["", "-?"] {
                for tail in ["", ".?"] {
                    let pattern = format!("{prefix}{LIBRARY_STEM}{version}.{suffix}{tail}");
                    let glob = GlobBuilder::new(&pattern)
                        .case_insensitive(platform == Platform::Windows)
                        .literal_separator(true)
                        .build()
                        .map_err(|err| {
                            Error::new(ErrorKind::Internal)
                                .with_message(format!("invalid library pattern {pattern}"))
                                .with_source(err)
                        })?;
                    builder.add(glob);
                }
            }
        }
        let set = builder.build().map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to build library pattern set")
                .with_source(err)
        })?;
        Ok(Self { set })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }

    /// Index of the first expansion matching `file_name`.
    pub fn rank(&self, file_name: &str) -> Option<usize> {
        self.set.matches(file_name).into_iter().min()
    }
}

pub fn candidate_dirs(platform: Platform, path_var: Option<&OsString>) -> Vec<PathBuf> {
    match platform {
        Platform::Windows => path_var
            .map(|value| env::split_paths(value).collect())
            .unwrap_or_default(),
        Platform::Unix | Platform::MacOs => UNIX_SEARCH_DIRS.iter().map(PathBuf::from).collect(),
    }
}

/// First file in `dirs` whose name matches `pattern`. Unreadable directories are skipped.
pub fn find_library(dirs: &[PathBuf], pattern: &LibraryPattern) -> Option<PathBuf> {
    dirs.iter().find_map(|dir| first_match_in(dir, pattern))
}

fn first_match_in(dir: &Path, pattern: &LibraryPattern) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut ranked: Vec<(usize, String)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| pattern.rank(&name).map(|rank| (rank, name)))
        .collect();
    ranked.sort();
    ranked
        .into_iter()
        .map(|(_, name)| dir.join(name))
        .find(|path| path.is_file())
}

pub fn resolve_library_path(config: &SearchConfig) -> Result<PathBuf, Error> {
    if let Some(path) = &config.override_path {
        if path.is_file() {
            tracing::debug!(path = %path.display(), "using library override");
            return Ok(path.clone());
        }
    }

    let dirs = match &config.override_path {
        Some(path) => vec![path.clone()],
        None => candidate_dirs(config.platform, config.path_var.as_ref()),
    };
    let pattern = LibraryPattern::new(config.platform)?;
    if let Some(found) = find_library(&dirs, &pattern) {
        tracing::debug!(path = %found.display(), "resolved native library");
        return Ok(found);
    }

    let mut err = Error::new(ErrorKind::LibraryNotFound)
        .with_message(format!(
            "no {LIBRARY_STEM} library found in {} search location(s)",
            dirs.len()
        ))
        .with_hint(format!(
            "Install libconfium or set {LIBRARY_PATH_ENV} to the library file."
        ));
    if let Some(path) = &config.override_path {
        err = err.with_path(path.clone());
    }
    Err(err)
}
