// rinne is a snapshot-based history manager for project trees
// Copyright (C) 2025
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::layout::{RINNE_DIR, RINNEIGNORE_FILE};

const BUILTIN_RULES: &[&str] = &[".rinne/**", ".git/**", "bin/**", "obj/**", "*.tmp", "*.log", "*.user"];

/// Compiled glob matcher with three independent rule sets, matching
/// `.rinneignore`'s three sections. Immutable once built.
pub struct IgnoreMatcher {
    exclude: GlobSet,
    exclude_files: GlobSet,
    exclude_dirs: GlobSet,
}

/// Source patterns before compilation, grouped the way `.rinneignore` lines
/// may be grouped (this crate treats every line as applying to both files
/// and dirs; `excludeFiles`/`excludeDirs` exist for programmatic callers).
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    pub exclude: Vec<String>,
    pub exclude_files: Vec<String>,
    pub exclude_dirs: Vec<String>,
}

impl IgnoreRules {
    /// Parses a `.rinneignore` file: UTF-8 lines, blanks and `#`-prefixed
    /// lines ignored. The forced `.rinne/` rule is added separately by
    /// `IgnoreMatcher::build`, so it need not appear here.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ignore file {}", path.display()))?;
        Ok(Self::from_lines(&contents))
    }

    pub fn from_lines(contents: &str) -> Self {
        let exclude = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self {
            exclude,
            exclude_files: Vec::new(),
            exclude_dirs: Vec::new(),
        }
    }

    pub fn with_builtin_defaults(mut self) -> Self {
        for pattern in BUILTIN_RULES {
            self.exclude.push((*pattern).to_string());
        }
        self
    }
}

impl IgnoreMatcher {
    pub fn build(rules: &IgnoreRules) -> Result<Self> {
        Ok(Self {
            exclude: compile(&rules.exclude)?,
            exclude_files: compile(&rules.exclude_files)?,
            exclude_dirs: compile(&rules.exclude_dirs)?,
        })
    }

    /// Matcher with only the built-in default rules (no user `.rinneignore`).
    pub fn defaults() -> Result<Self> {
        Self::build(&IgnoreRules::default().with_builtin_defaults())
    }

    /// Whether `relative_path` (using `/` separators) should be excluded
    /// from ingest/restore. `is_dir` only selects which of the
    /// `excludeFiles`/`excludeDirs` rule sets applies in addition to
    /// `exclude`; directory-only patterns (a trailing `/` in the source
    /// rule) are already compiled to match both the directory itself and
    /// its whole subtree, so the candidate path is never altered here.
    pub fn is_excluded(&self, relative_path: &str, is_dir: bool) -> bool {
        if is_forced_excluded(relative_path) {
            return true;
        }

        let candidate = relative_path.replace('\\', "/");

        if self.exclude.is_match(&candidate) {
            return true;
        }
        if is_dir {
            self.exclude_dirs.is_match(&candidate)
        } else {
            self.exclude_files.is_match(&candidate)
        }
    }
}

/// `.rinne/` and `.rinneignore` itself are excluded from ingest/restore
/// regardless of user-supplied rules.
pub fn is_forced_excluded(relative_path: &str) -> bool {
    let normalized = relative_path.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    normalized == RINNE_DIR
        || normalized.starts_with(&format!("{RINNE_DIR}/"))
        || normalized == RINNEIGNORE_FILE
}

fn compile(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let normalized = pattern.replace('\\', "/");
        let normalized = normalized.trim();
        if normalized.is_empty() {
            continue;
        }

        let dir_only = normalized.ends_with('/');
        let body = normalized.trim_end_matches('/');

        add_glob(&mut builder, body)?;
        if !body.contains('/') {
            // A pattern without a path separator also matches any basename
            // segment anywhere in the tree.
            add_glob(&mut builder, &format!("**/{body}"))?;
        }
        if dir_only {
            // A trailing `/` means the rule also covers everything the
            // directory contains, not just the directory entry itself.
            add_glob(&mut builder, &format!("{body}/**"))?;
            if !body.contains('/') {
                add_glob(&mut builder, &format!("**/{body}/**"))?;
            }
        }
    }
    builder.build().context("failed to compile glob rule set")
}

fn add_glob(builder: &mut GlobSetBuilder, pattern: &str) -> Result<()> {
    let glob = Glob::builder(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid glob pattern '{pattern}'"))?;
    builder.add(glob);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_exclude_rinne_dir() {
        let matcher = IgnoreMatcher::defaults().unwrap();
        assert!(matcher.is_excluded(".rinne/config/version.txt", false));
        assert!(matcher.is_excluded(".git/HEAD", false));
    }

    #[test]
    fn forced_exclusion_applies_without_any_rules() {
        let matcher = IgnoreMatcher::build(&IgnoreRules::default()).unwrap();
        assert!(matcher.is_excluded(".rinne/store/x", false));
        assert!(matcher.is_excluded(".rinneignore", false));
    }

    #[test]
    fn basename_pattern_matches_anywhere() {
        let rules = IgnoreRules::from_lines("*.log");
        let matcher = IgnoreMatcher::build(&rules).unwrap();
        assert!(matcher.is_excluded("a/b/debug.log", false));
        assert!(matcher.is_excluded("debug.log", false));
        assert!(!matcher.is_excluded("debug.txt", false));
    }

    #[test]
    fn double_star_matches_whole_subtree() {
        let rules = IgnoreRules::from_lines("build/**");
        let matcher = IgnoreMatcher::build(&rules).unwrap();
        assert!(matcher.is_excluded("build/out/a.o", false));
        assert!(!matcher.is_excluded("other/out/a.o", false));
    }

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        let rules = IgnoreRules::from_lines("\n# comment\n\n*.tmp\n");
        assert_eq!(rules.exclude, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn directory_only_pattern_excludes_the_directory_and_its_contents() {
        let rules = IgnoreRules::from_lines("node_modules/");
        let matcher = IgnoreMatcher::build(&rules).unwrap();
        assert!(matcher.is_excluded("node_modules", true));
        assert!(matcher.is_excluded("node_modules/x.js", false));
        assert!(matcher.is_excluded("src/node_modules", true));
        assert!(matcher.is_excluded("src/node_modules/x.js", false));
        assert!(!matcher.is_excluded("node_modules.txt", false));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let rules = IgnoreRules::from_lines("*.LOG");
        let matcher = IgnoreMatcher::build(&rules).unwrap();
        assert!(matcher.is_excluded("a.log", false));
    }
}
