//! Buck2 file generation
//!
//! Turns a merged [`ProjectAnalysis`] into BUCK files plus the top-level
//! `.buckconfig`. When a single source directory contributed targets,
//! one BUCK file lands at the output root; otherwise each contributing
//! directory gets its own BUCK file under the output root, preserving
//! the path relative to the source root. Dry-run renders everything and
//! records the would-be files without touching the filesystem.

pub mod mapper;
pub mod starlark;
pub mod templates;

pub use mapper::{map_target, normalize_name, MappedTarget, RuleKind};
pub use starlark::StarlarkWriter;
pub use templates::TemplateRegistry;

use crate::analysis::{ProjectAnalysis, Target};
use crate::error::{Error, GenerationCategory, GenerationError, Result};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Fixed `.buckconfig` stanzas; the cxx settings come from the merged
/// configuration with defaults matching the documented output.
const BUCKCONFIG_TEMPLATE: &str = "[buildfile]
name = BUCK

[parser]
polyglot_parsing_enabled = true
default_build_file_syntax = STARLARK

[project]
ide = vscode

[cxx]
default_platform = //toolchains:cxx
cxxflags = -std={cxx_standard}
cxxppflags = {warning_flags}

[repositories]
prelude = buck2/prelude
toolchains = toolchains
";

/// Generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    /// Source root the per-directory layout is computed against.
    pub source_root: PathBuf,
    pub dry_run: bool,
    pub overwrite: bool,
    pub cxx_standard: String,
    pub warning_flags: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            source_root: PathBuf::from("."),
            dry_run: false,
            overwrite: false,
            cxx_standard: "c++20".to_string(),
            warning_flags: "-Wall -Wextra".to_string(),
        }
    }
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// What a generation run produced. Dry-run yields the same `files` list
/// as a real run.
#[derive(Debug, Default)]
pub struct GenerationResult {
    pub files: Vec<GeneratedFile>,
    pub targets_processed: usize,
    /// Per-file failures; one bad file does not abort the run.
    pub errors: Vec<Error>,
}

/// BUCK/.buckconfig emitter.
pub struct Generator {
    config: GeneratorConfig,
    registry: TemplateRegistry,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            registry: TemplateRegistry::new(),
        }
    }

    pub fn generate(&self, analysis: &ProjectAnalysis) -> GenerationResult {
        let mut result = GenerationResult::default();

        // Group targets by the directory that declared them. BTreeMap
        // keeps emission order deterministic.
        let mut by_dir: BTreeMap<PathBuf, Vec<&Target>> = BTreeMap::new();
        for target in &analysis.targets {
            by_dir
                .entry(target.source_dir.clone())
                .or_default()
                .push(target);
        }

        let multi_dir = by_dir.len() > 1;
        for (dir, targets) in &by_dir {
            let output_path = if multi_dir {
                let relative = dir
                    .strip_prefix(&self.config.source_root)
                    .unwrap_or(dir.as_path());
                self.config.output_dir.join(relative).join("BUCK")
            } else {
                self.config.output_dir.join("BUCK")
            };

            match self.render_buck_file(targets, &mut result) {
                Ok(content) => {
                    result.targets_processed += targets.len();
                    self.emit(output_path, content, &mut result);
                }
                Err(err) => {
                    result.errors.push(err);
                }
            }
        }

        let buckconfig = self.render_buckconfig();
        self.emit(
            self.config.output_dir.join(".buckconfig"),
            buckconfig,
            &mut result,
        );

        info!(
            "generated {} files ({} targets, {} errors{})",
            result.files.len(),
            result.targets_processed,
            result.errors.len(),
            if self.config.dry_run { ", dry-run" } else { "" }
        );
        result
    }

    fn render_buck_file(
        &self,
        targets: &[&Target],
        result: &mut GenerationResult,
    ) -> Result<String> {
        let mut writer = StarlarkWriter::new();

        let mapped: Vec<MappedTarget> = targets.iter().map(|t| map_target(t)).collect();

        // One load statement covering every symbol used in this file.
        let mut loads: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for target in &mapped {
            if let Some(file) = target.rule_kind.load_file() {
                loads
                    .entry(file)
                    .or_default()
                    .insert(target.rule_kind.function_name());
            }
        }
        for (file, symbols) in &loads {
            let symbols: Vec<&str> = symbols.iter().copied().collect();
            writer.add_load(file, &symbols);
        }

        for target in &mapped {
            if target.is_unknown() {
                result.errors.push(
                    GenerationError::new(
                        GenerationCategory::UnsupportedTarget,
                        format!("target '{}' has no Buck2 equivalent", target.name),
                    )
                    .for_target(target.name.clone())
                    .into(),
                );
                continue;
            }
            let template = self.registry.get(target.rule_kind).ok_or_else(|| {
                Error::from(
                    GenerationError::new(
                        GenerationCategory::MissingTemplate,
                        format!("no template for rule kind {:?}", target.rule_kind),
                    )
                    .for_target(target.name.clone()),
                )
            })?;
            writer.add_rule(template.generate(target));
        }

        Ok(writer.finish())
    }

    fn render_buckconfig(&self) -> String {
        BUCKCONFIG_TEMPLATE
            .replace("{cxx_standard}", &self.config.cxx_standard)
            .replace("{warning_flags}", &self.config.warning_flags)
    }

    /// Record the rendered file and, outside dry-run, write it.
    fn emit(&self, path: PathBuf, content: String, result: &mut GenerationResult) {
        if !self.config.dry_run {
            if let Err(err) = self.write_file(&path, &content) {
                result.errors.push(err);
                return;
            }
        }
        debug!("generated {}", path.display());
        result.files.push(GeneratedFile { path, content });
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        if !self.config.overwrite && path.exists() {
            return Err(GenerationError::new(
                GenerationCategory::FileWriteError,
                format!("{} already exists (pass --overwrite to replace)", path.display()),
            )
            .into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::from(
                    GenerationError::new(
                        GenerationCategory::FileWriteError,
                        format!("cannot create {}: {}", parent.display(), e),
                    ),
                )
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::from(GenerationError::new(
                GenerationCategory::FileWriteError,
                format!("cannot write {}: {}", path.display(), e),
            ))
        })
    }
}
