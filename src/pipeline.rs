//! Migration pipeline driver
//!
//! Orders discovery → parse → evaluate → merge → generate. Files are
//! processed in discovery order and their analyses merged into one
//! [`ProjectAnalysis`] before emission, so cross-file references
//! resolve and reruns produce byte-identical output.

use crate::analysis::ProjectAnalysis;
use crate::error::{Error, IoCategory, IoError, Result};
use crate::eval::Evaluator;
use crate::generator::{Generator, GeneratorConfig};
use crate::parser::Parser;
use crate::progress::{Phase, ProgressReporter};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Settings for one migration run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub overwrite: bool,
    /// Target platforms (reserved for platform-select emission).
    pub platforms: Vec<String>,
    pub cxx_standard: String,
    pub warning_flags: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            dry_run: false,
            overwrite: false,
            platforms: vec!["linux".into(), "macos".into(), "windows".into()],
            cxx_standard: "c++20".to_string(),
            warning_flags: "-Wall -Wextra".to_string(),
        }
    }
}

/// Final counters reported to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSummary {
    pub files_processed: usize,
    pub targets_generated: usize,
    pub errors_encountered: usize,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

/// Select CMake inputs: any `CMakeLists.txt`, any `*.cmake`. Results are
/// sorted so reruns see the same order.
pub fn discover_cmake_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(IoError::new(
            IoCategory::FileNotFound,
            format!("source directory does not exist: {}", root.display()),
        )
        .with_path(root.display().to_string())
        .into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            Error::from(
                IoError::new(IoCategory::InvalidPath, format!("walk failed: {}", e))
                    .with_path(root.display().to_string()),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_cmake = path
            .file_name()
            .map(|n| n == "CMakeLists.txt")
            .unwrap_or(false)
            || path.extension().map(|e| e == "cmake").unwrap_or(false);
        if is_cmake {
            files.push(path.to_path_buf());
        }
    }

    if files.is_empty() {
        return Err(IoError::new(
            IoCategory::FileNotFound,
            format!("no CMake files found in {}", root.display()),
        )
        .with_path(root.display().to_string())
        .into());
    }

    files.sort();
    Ok(files)
}

/// One-shot migration driver.
pub struct MigrationPipeline<'r> {
    config: PipelineConfig,
    reporter: &'r mut dyn ProgressReporter,
}

impl<'r> MigrationPipeline<'r> {
    pub fn new(config: PipelineConfig, reporter: &'r mut dyn ProgressReporter) -> Self {
        Self { config, reporter }
    }

    pub fn run(&mut self) -> Result<MigrationSummary> {
        let start = Instant::now();
        let mut summary = MigrationSummary::default();

        // Phase 1: discovery. Input I/O failures abort the run.
        self.reporter
            .start_phase(Phase::Discovery, "Discovering CMake files");
        let files = match discover_cmake_files(&self.config.source_dir) {
            Ok(files) => files,
            Err(err) => {
                self.reporter.report_error(&err);
                self.reporter.finish_phase(false);
                return Err(err);
            }
        };
        info!("discovered {} CMake files", files.len());
        self.reporter.finish_phase(true);

        // Phase 2: parse + evaluate each file, merging in discovery
        // order. Parse errors are reported and counted, never fatal.
        self.reporter
            .start_phase(Phase::Parsing, "Parsing and analyzing CMake files");
        let mut project = ProjectAnalysis::default();
        for (index, file) in files.iter().enumerate() {
            self.reporter.update_progress(index + 1, files.len());
            self.reporter.report_file(&file.display().to_string());

            let analysis = match self.process_file(file, &mut summary) {
                Ok(analysis) => analysis,
                Err(err) => {
                    // Unreadable input aborts: the tree is not in the
                    // state the caller believes it is.
                    self.reporter.report_error(&err);
                    self.reporter.finish_phase(false);
                    return Err(err);
                }
            };
            for warning in &analysis.warnings {
                self.reporter.report_warning(warning);
            }
            summary.warnings.extend(analysis.warnings.iter().cloned());
            project.merge(analysis);
            summary.files_processed += 1;
        }
        self.reporter.finish_phase(summary.errors_encountered == 0);

        // Phase 3: generation. Per-file write errors accumulate.
        self.reporter
            .start_phase(Phase::Generation, "Generating Buck2 files");
        let generator = Generator::new(GeneratorConfig {
            output_dir: self.config.output_dir.clone(),
            source_root: self.config.source_dir.clone(),
            dry_run: self.config.dry_run,
            overwrite: self.config.overwrite,
            cxx_standard: self.config.cxx_standard.clone(),
            warning_flags: self.config.warning_flags.clone(),
        });
        let generation = generator.generate(&project);
        summary.targets_generated = generation.targets_processed;
        for err in &generation.errors {
            self.reporter.report_error(err);
            summary.errors_encountered += 1;
        }
        self.reporter.finish_phase(generation.errors.is_empty());

        summary.duration_ms = start.elapsed().as_millis() as u64;
        self.reporter.report_summary(&summary);
        Ok(summary)
    }

    /// Read, parse and evaluate one file. Only the read can fail; parse
    /// errors are reported and the partial AST is still analyzed.
    fn process_file(
        &mut self,
        path: &Path,
        summary: &mut MigrationSummary,
    ) -> Result<ProjectAnalysis> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(
                IoError::new(
                    IoCategory::FileNotFound,
                    format!("cannot read {}: {}", path.display(), e),
                )
                .with_path(path.display().to_string()),
            )
        })?;

        let outcome = Parser::new(content, path.display().to_string()).parse_file();
        for err in &outcome.errors {
            self.reporter.report_error(err);
            summary.errors_encountered += 1;
        }

        let source_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut evaluator = Evaluator::new().with_source_dir(source_dir);
        debug!("analyzing {}", path.display());
        Ok(evaluator.analyze_file(&outcome.file))
    }
}
