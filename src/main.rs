//! finch CLI - CMake to Buck2 migration tool
//!
//! Commands:
//!   migrate   - Convert a CMake tree to BUCK files
//!   validate  - Parse CMake files and report problems
//!   analyze   - Summarize targets and variables
//!   init      - Write a starter .finch.toml

use finch::config::FinchConfig;
use finch::pipeline::{discover_cmake_files, MigrationPipeline, PipelineConfig};
use finch::progress::{ConsoleReporter, JsonReporter, NullReporter, ProgressReporter};
use finch::{Error, Evaluator, Parser, Result, VERSION};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Flags shared by every subcommand.
struct GlobalOpts {
    config_file: String,
    verbose: bool,
    quiet: bool,
    use_color: bool,
    log_level: Option<String>,
}

impl Default for GlobalOpts {
    fn default() -> Self {
        Self {
            config_file: ".finch.toml".to_string(),
            verbose: false,
            quiet: false,
            use_color: true,
            log_level: None,
        }
    }
}

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let globals = extract_global_opts(&mut args);

    if args.is_empty() {
        print_usage();
        return ExitCode::from(1);
    }

    init_logging(&globals);

    let result = match args[0].as_str() {
        "migrate" => cmd_migrate(&args[1..], &globals),
        "validate" => cmd_validate(&args[1..]),
        "analyze" => cmd_analyze(&args[1..]),
        "init" => cmd_init(&args[1..]),
        "version" | "--version" | "-v" => {
            println!("finch {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err(finch::ConfigError::new(
                finch::error::ConfigCategory::UnknownOption,
                format!("unknown command '{}'", cmd),
            )
            .into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", e.render_human());
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
finch - CMake to Buck2 migration tool

USAGE:
    finch <COMMAND> [OPTIONS]

COMMANDS:
    migrate <source>                 Convert a CMake tree to BUCK files
    validate <path>                  Parse CMake files and report problems
    analyze <path>                   Summarize discovered targets and variables
    init [path]                      Write a starter .finch.toml
    version                          Print the version

MIGRATE OPTIONS:
    -o, --output <dir>               Output directory (default: .)
    -n, --dry-run                    Preview without writing files
    -i, --interactive                Prompt before overwriting files
    --platform <p>                   Target platform (repeatable)
    --overwrite                      Replace existing BUCK files
    --template-dir <dir>             Custom rule template directory
    --json                           JSON progress events on stdout

GLOBAL OPTIONS:
    --config <file>                  Configuration file (default: .finch.toml)
    --verbose                        Show per-file progress
    --quiet                          Only errors
    --no-color                       Disable colored output
    --log-level <level>              trace, debug, info, warn or error

EXAMPLES:
    finch migrate ./my-project -o ./buck-out
    finch migrate . --dry-run --json
    finch validate ./CMakeLists.txt
"#
    );
}

fn extract_global_opts(args: &mut Vec<String>) -> GlobalOpts {
    let mut globals = GlobalOpts::default();
    let mut remaining = Vec::with_capacity(args.len());
    let mut iter = std::mem::take(args).into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(value) = iter.next() {
                    globals.config_file = value;
                }
            }
            "--verbose" => globals.verbose = true,
            "--quiet" => globals.quiet = true,
            "--no-color" => globals.use_color = false,
            "--log-level" => globals.log_level = iter.next(),
            _ => remaining.push(arg),
        }
    }

    *args = remaining;
    globals
}

fn init_logging(globals: &GlobalOpts) {
    let level = globals.log_level.as_deref().unwrap_or("warn");
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level),
    );
    builder.format_timestamp(None);
    let _ = builder.try_init();
}

fn cmd_migrate(args: &[String], globals: &GlobalOpts) -> Result<()> {
    let mut source: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut dry_run = false;
    let mut interactive = false;
    let mut overwrite = false;
    let mut json_output = false;
    let mut platforms: Vec<String> = Vec::new();
    let mut template_dir: Option<PathBuf> = None;

    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--output" => output = iter.next().map(PathBuf::from),
            "-n" | "--dry-run" => dry_run = true,
            "-i" | "--interactive" => interactive = true,
            "--overwrite" => overwrite = true,
            "--json" => json_output = true,
            "--platform" => {
                if let Some(platform) = iter.next() {
                    platforms.push(platform.clone());
                }
            }
            "--template-dir" => template_dir = iter.next().map(PathBuf::from),
            other if !other.starts_with('-') && source.is_none() => {
                source = Some(PathBuf::from(other));
            }
            other => {
                return Err(finch::ConfigError::new(
                    finch::error::ConfigCategory::UnknownOption,
                    format!("unknown migrate option '{}'", other),
                )
                .for_option(other.to_string())
                .into());
            }
        }
    }

    // Layering: built-in defaults, then .finch.toml, then flags.
    let file_config =
        FinchConfig::load_from_path(Path::new(&globals.config_file))?.unwrap_or_default();

    // A bad template path should fail before any work happens.
    if let Some(dir) = &template_dir {
        if !dir.is_dir() {
            return Err(finch::ConfigError::new(
                finch::error::ConfigCategory::InvalidValue,
                format!("template directory {} does not exist", dir.display()),
            )
            .for_option("--template-dir")
            .into());
        }
    }

    if interactive {
        log::warn!("interactive mode prompts are not implemented; running non-interactively");
    }

    let config = PipelineConfig {
        source_dir: source.unwrap_or_else(|| PathBuf::from(".")),
        output_dir: output
            .unwrap_or_else(|| PathBuf::from(&file_config.migrate.output_dir)),
        dry_run: dry_run || file_config.migrate.dry_run,
        overwrite: overwrite || file_config.migrate.overwrite,
        platforms: if platforms.is_empty() {
            file_config.migrate.platforms.clone()
        } else {
            platforms
        },
        cxx_standard: file_config.generator.cxx_standard.clone(),
        warning_flags: file_config.generator.warning_flags.clone(),
    };

    let mut reporter: Box<dyn ProgressReporter> = if json_output {
        Box::new(JsonReporter::new(std::io::stdout()))
    } else if globals.quiet {
        Box::new(NullReporter)
    } else {
        Box::new(ConsoleReporter::new(globals.use_color, globals.verbose, false))
    };

    let summary = MigrationPipeline::new(config, reporter.as_mut()).run()?;
    if summary.errors_encountered > 0 {
        return Err(finch::GenerationError::new(
            finch::error::GenerationCategory::InvalidRule,
            format!("{} errors during migration", summary.errors_encountered),
        )
        .into());
    }
    Ok(())
}

fn cmd_validate(args: &[String]) -> Result<()> {
    let path = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let files = if path.is_file() {
        vec![path]
    } else {
        discover_cmake_files(&path)?
    };

    let mut total_errors = 0usize;
    for file in &files {
        let content = std::fs::read_to_string(file).map_err(Error::from)?;
        let outcome = Parser::new(content, file.display().to_string()).parse_file();
        for err in &outcome.errors {
            eprint!("{}", err.render_human());
        }
        total_errors += outcome.errors.len();
    }

    if total_errors == 0 {
        println!("{} file(s) parsed cleanly", files.len());
        Ok(())
    } else {
        Err(finch::ParseError::syntax(format!(
            "{} parse error(s) in {} file(s)",
            total_errors,
            files.len()
        ))
        .into())
    }
}

fn cmd_analyze(args: &[String]) -> Result<()> {
    let path = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let files = if path.is_file() {
        vec![path]
    } else {
        discover_cmake_files(&path)?
    };

    let mut project = finch::ProjectAnalysis::default();
    for file in &files {
        let content = std::fs::read_to_string(file).map_err(Error::from)?;
        let outcome = Parser::new(content, file.display().to_string()).parse_file();
        let source_dir = file.parent().unwrap_or_else(|| Path::new("."));
        let mut evaluator = Evaluator::new().with_source_dir(source_dir);
        project.merge(evaluator.analyze_file(&outcome.file));
    }

    println!("project: {}", orelse(&project.project_name, "(unnamed)"));
    println!("version: {}", orelse(&project.project_version, "(none)"));
    println!("targets: {}", project.targets.len());
    for target in &project.targets {
        println!(
            "  {} ({:?}): {} sources, {} deps",
            target.name,
            target.kind,
            target.sources.len(),
            target.link_libs.len()
        );
    }
    println!("variables: {}", project.global_vars.len());
    println!("cache variables: {}", project.cache_vars.len());
    println!("warnings: {}", project.warnings.len());
    for warning in &project.warnings {
        println!("  {}", warning);
    }
    Ok(())
}

fn cmd_init(args: &[String]) -> Result<()> {
    let dir = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join(".finch.toml");

    if path.exists() {
        return Err(finch::ConfigError::new(
            finch::error::ConfigCategory::ConflictingOptions,
            format!("{} already exists", path.display()),
        )
        .with_help("remove the file first to regenerate it")
        .into());
    }

    std::fs::create_dir_all(&dir).map_err(Error::from)?;
    std::fs::write(&path, FinchConfig::default().to_toml_string()).map_err(Error::from)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn orelse<'a>(s: &'a str, fallback: &'a str) -> &'a str {
    if s.is_empty() {
        fallback
    } else {
        s
    }
}
