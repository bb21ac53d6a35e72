use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use wirepatch::config::{
    apply_script, check_script, load_manifest_from_path, load_script_from_path, ActionResult,
    ProjectManifest, MANIFEST_FILE,
};

#[derive(Parser)]
#[command(name = "wirepatch")]
#[command(about = "Structural source patching for generated Go projects", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply wiring scripts to a generated project
    Apply {
        /// Specific script file to apply (otherwise applies all in wiring/)
        script: Option<PathBuf>,

        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check status of wiring scripts without applying
    Status {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        project: Option<PathBuf>,
    },

    /// List available wiring scripts and their version gates
    List {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        project: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            script,
            project,
            dry_run,
            diff,
        } => cmd_apply(project, script, dry_run, diff),

        Commands::Status { project } => cmd_status(project),

        Commands::List { project } => cmd_list(project),
    }
}

/// Helper: Discover all .toml wiring scripts in a wiring/ directory.
///
/// Discovery order:
/// 1. `<project>/wiring` (scripts kept alongside the generated project).
/// 2. `./wiring` relative to the current working directory (typical when
///    running from a schematic repo against an external project).
fn discover_script_files(project: &Path) -> Result<Vec<PathBuf>> {
    let cwd_wiring_dir = env::current_dir().ok().map(|cwd| cwd.join("wiring"));
    let project_wiring_dir = project.join("wiring");

    let candidate_dirs: Vec<PathBuf> = std::iter::once(project_wiring_dir)
        .chain(cwd_wiring_dir)
        .collect();

    for wiring_dir in candidate_dirs {
        if !wiring_dir.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&wiring_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();

        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No .toml wiring scripts found in either ./wiring or {}/wiring",
        project.display()
    )
}

/// Resolve project path using multiple detection strategies
///
/// Priority order:
/// 1. Explicit --project flag
/// 2. WIREPATCH_PROJECT environment variable
/// 3. Walk up from the current directory looking for the project manifest
fn resolve_project(cli_project: Option<PathBuf>) -> Result<PathBuf> {
    // 1. Explicit flag (highest priority)
    if let Some(path) = cli_project {
        return Ok(path.canonicalize()?);
    }

    // 2. Environment variable
    if let Ok(env_path) = env::var("WIREPATCH_PROJECT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: WIREPATCH_PROJECT is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    // 3. Walk up looking for the manifest the generator leaves behind
    if let Some(path) = auto_detect_project() {
        println!(
            "{}",
            format!("Auto-detected project: {}", path.display()).dimmed()
        );
        return Ok(path);
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}\n  {}",
        "Could not find a generated project.".red(),
        "Try one of:".bold(),
        "1. cd into the generated project: cd /path/to/project && wirepatch apply",
        "2. Specify explicitly: wirepatch apply --project /path/to/project",
        "3. Set environment variable: export WIREPATCH_PROJECT=/path/to/project"
    )
}

/// Auto-detect the project by walking up from the current directory.
fn auto_detect_project() -> Option<PathBuf> {
    let current = env::current_dir().ok()?;

    for ancestor in current.ancestors() {
        if ancestor.join(MANIFEST_FILE).exists() {
            return Some(ancestor.to_path_buf());
        }
    }

    None
}

/// Helper: Read the project manifest from the project root.
fn read_manifest(project: &Path) -> Result<ProjectManifest> {
    let manifest_path = project.join(MANIFEST_FILE);
    load_manifest_from_path(&manifest_path).map_err(|e| {
        anyhow::anyhow!(
            "{}\n  {}",
            format!("Could not read {}: {e}", manifest_path.display()).red(),
            "wirepatch only runs against projects carrying a generator manifest"
        )
    })
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    project: Option<PathBuf>,
    script: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    // 1. Resolve project root and manifest
    let project = resolve_project(project)?;
    let manifest = read_manifest(&project)?;

    // 2. Determine script files to load
    let script_files = if let Some(path) = script {
        vec![path]
    } else {
        discover_script_files(&project)?
    };

    println!("Project: {}", project.display());
    println!("Module: {}", manifest.module);
    println!("Generator version: {}", manifest.generator_version);
    println!();

    // 3. Load and run each script file
    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_skipped = 0;
    let mut total_failed = 0;

    for script_file in script_files {
        println!("Loading wiring script {}...", script_file.display());

        let script = load_script_from_path(&script_file)?;

        // Capture file contents before applying (for diff output). Only the
        // files the script targets are read.
        let mut file_contents_before: HashMap<PathBuf, String> = HashMap::new();
        if show_diff {
            let target_files: HashSet<PathBuf> = script
                .actions
                .iter()
                .map(|a| project.join(a.file.replace("{module}", &manifest.module)))
                .collect();
            for file_path in target_files {
                if let Ok(content) = fs::read_to_string(&file_path) {
                    file_contents_before.insert(file_path.canonicalize()?, content);
                }
            }
        }

        // 4. Run the script (or dry-run)
        let report = if dry_run {
            println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
            check_script(&script, &project, &manifest)
        } else {
            apply_script(&script, &project, &manifest)
        };

        let report = match report {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), script_file.display(), e);
                total_failed += 1;
                continue;
            }
        };

        // 5. Report per-action results
        for (action_id, result) in report {
            match result {
                ActionResult::Applied { ref file } => {
                    let verb = if dry_run { "Would apply" } else { "Applied" };
                    println!(
                        "{} {}: {} to {}",
                        "✓".green(),
                        action_id,
                        verb,
                        file.display()
                    );
                    total_applied += 1;

                    if show_diff && !dry_run {
                        if let Some(before) = file_contents_before.get(file) {
                            if let Ok(after) = fs::read_to_string(file) {
                                if before != &after {
                                    display_diff(file, before, &after);
                                }
                            }
                        }
                    }
                }
                ActionResult::AlreadyApplied { file } => {
                    println!(
                        "{} {}: Already applied to {}",
                        "⊙".yellow(),
                        action_id,
                        file.display()
                    );
                    total_already_applied += 1;
                }
                ActionResult::SkippedVersion { requirement } => {
                    println!(
                        "{} {}: Skipped (version gate '{}')",
                        "⊘".cyan(),
                        action_id,
                        requirement
                    );
                    total_skipped += 1;
                }
                ActionResult::Failed { reason } => {
                    eprintln!("{} {}: Failed - {}", "✗".red(), action_id, reason);
                    total_failed += 1;
                }
            }
        }

        println!();
    }

    // 6. Summary
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already applied",
        format!("{}", total_already_applied).yellow()
    );
    println!("  {} skipped", format!("{}", total_skipped).cyan());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_status(project: Option<PathBuf>) -> Result<()> {
    // 1. Resolve project root and manifest
    let project = resolve_project(project)?;
    let manifest = read_manifest(&project)?;

    // 2. Discover script files
    let script_files = discover_script_files(&project)?;

    println!("{}", "Wiring Status Report".bold());
    println!("Project: {}", project.display());
    println!("Generator version: {}", manifest.generator_version);
    println!();

    let mut applied = Vec::new();
    let mut not_applied = Vec::new();
    let mut skipped = Vec::new();

    // 3. Check every script read-only; project files are never written
    for script_file in script_files {
        let script = load_script_from_path(&script_file)?;
        let report = match check_script(&script, &project, &manifest) {
            Ok(report) => report,
            Err(e) => {
                not_applied.push((script_file.display().to_string(), e.to_string()));
                continue;
            }
        };

        for (action_id, result) in report {
            match result {
                ActionResult::Applied { .. } => {
                    // Would change the target, so it has not been wired yet.
                    not_applied.push((action_id, "not yet applied".to_string()));
                }
                ActionResult::AlreadyApplied { .. } => {
                    applied.push(action_id);
                }
                ActionResult::SkippedVersion { requirement } => {
                    skipped.push((action_id, requirement));
                }
                ActionResult::Failed { reason } => {
                    not_applied.push((action_id, reason));
                }
            }
        }
    }

    // 4. Report grouped by status
    if !applied.is_empty() {
        println!(
            "{} {} ({} actions)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for id in &applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !not_applied.is_empty() {
        println!(
            "{} {} ({} actions)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            not_applied.len()
        );
        for (id, reason) in &not_applied {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if !skipped.is_empty() {
        println!(
            "{} {} ({} actions)",
            "⊘".cyan(),
            "SKIPPED".cyan().bold(),
            skipped.len()
        );
        for (id, requirement) in &skipped {
            println!("  - {} (version gate '{}')", id, requirement.dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_list(project: Option<PathBuf>) -> Result<()> {
    let project = resolve_project(project)?;
    let script_files = discover_script_files(&project)?;

    println!("{}", "Available wiring scripts:".bold());
    for script_file in script_files {
        match load_script_from_path(&script_file) {
            Ok(script) => {
                let name = if script.meta.name.is_empty() {
                    script_file.display().to_string()
                } else {
                    script.meta.name.clone()
                };
                print!("  {} ({} actions)", name.bold(), script.actions.len());
                if let Some(range) = &script.meta.version_range {
                    print!(" [requires generator {}]", range.cyan());
                }
                println!();
                if let Some(description) = &script.meta.description {
                    println!("    {}", description.dimmed());
                }
                println!("    {}", script_file.display().to_string().dimmed());
            }
            Err(e) => {
                eprintln!("  {} {}: {}", "✗".red(), script_file.display(), e);
            }
        }
    }

    Ok(())
}
