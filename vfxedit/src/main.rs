#![warn(clippy::pedantic)]

mod preferences;

use anyhow::{Context, Result as AnyResult};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use vfxedit_core::commands::CommandError;
use vfxedit_core::field::{FieldState, ScalarValue};
use vfxedit_core::state::DocumentInfo;
use vfxedit_core::vfx::{enums::NodeKind, Document};

#[derive(clap::Parser)]
#[command(version, about = "Inspect, verify and edit visual-effect containers")]
struct Cli {
    /// Log more. Repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Settings file to use instead of the one in the preferences directory.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand)]
enum Action {
    /// Check that each file re-encodes to exactly its own bytes.
    Verify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print header values, node counts and selections.
    Info { file: PathBuf },
    /// Decode then encode again.
    Resave { input: PathBuf, output: PathBuf },
    /// Point one selector of a node at another node, and save.
    Select {
        input: PathBuf,
        output: PathBuf,
        /// Kind of the node owning the selector.
        #[arg(long, value_parser = parse_kind)]
        kind: NodeKind,
        /// Position of the node within its kind.
        #[arg(long)]
        node: usize,
        /// Which of the node's selectors, in the order `info` lists them.
        #[arg(long)]
        selector: usize,
        /// Position of the new target within the selector's target kind, or -1 for none.
        #[arg(long, allow_hyphen_values = true)]
        target: i64,
    },
    /// Print the settings in use.
    Settings {
        /// Also write them to the settings file.
        #[arg(long)]
        save: bool,
    },
}

fn parse_kind(kind: &str) -> Result<NodeKind, String> {
    kind.parse().map_err(|_| {
        let kinds: Vec<&str> = NodeKind::iter().map(Into::into).collect();
        format!("expected one of {}", kinds.join(", "))
    })
}

fn describe(state: &FieldState<ScalarValue>) -> String {
    match state {
        FieldState::Unset => "unset".into(),
        FieldState::Default => "default".into(),
        FieldState::Value(value) => value.to_string(),
    }
}

fn load(path: &Path, verify: bool) -> AnyResult<Document> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let document =
        Document::load(&bytes, verify).with_context(|| format!("decoding {}", path.display()))?;
    log::info!(
        "{}: {} loaded",
        path.display(),
        human_bytes::human_bytes(bytes.len() as f64)
    );
    Ok(document)
}

fn verify(files: Vec<PathBuf>) -> AnyResult<()> {
    use rayon::iter::{IntoParallelIterator, ParallelIterator};
    let results: Vec<(PathBuf, AnyResult<Document>)> = files
        .into_par_iter()
        .map(|path| {
            let document = load(&path, true);
            (path, document)
        })
        .collect();
    let mut failed = 0;
    for (path, document) in &results {
        match document {
            Ok(document) => {
                let report = document.report();
                println!("{}: {}", path.display(), report.verification);
                for issue in &report.issues {
                    println!("  {issue}");
                }
            }
            Err(err) => {
                failed += 1;
                println!("{}: {err:#}", path.display());
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} files failed to load", results.len());
    }
    Ok(())
}

fn info(file: &Path, verify: bool) -> AnyResult<()> {
    let document = load(file, verify)?;
    println!("{}", DocumentInfo::from_path(file.to_owned()).name);
    for field in document.header.fields() {
        println!("  {} = {}", field.id(), describe(&field.value_state()));
    }
    for kind in NodeKind::iter() {
        let group = document.graph.group(kind);
        if group.is_empty() {
            continue;
        }
        println!("{kind}: {}", group.len());
        for &key in group {
            let Some(node) = document.graph.node(key) else {
                continue;
            };
            let name = document.display_name(key).unwrap_or_default();
            let assigned = if node.is_assigned() { "" } else { " (unassigned)" };
            println!("  {name}{assigned}");
            for (idx, &sel) in node.selectors().iter().enumerate() {
                let Some(entry) = document.graph.selector(sel) else {
                    continue;
                };
                let target = entry
                    .selected()
                    .and_then(|target| document.display_name(target))
                    .unwrap_or_else(|| "none".into());
                let enabled = if entry.is_enabled() { "" } else { " (disabled)" };
                println!("    selector {idx} -> {target}{enabled}");
            }
        }
    }
    let report = document.report();
    println!("{}", report.verification);
    for issue in &report.issues {
        println!("  {issue}");
    }
    Ok(())
}

fn resave(input: &Path, output: &Path, verify: bool) -> AnyResult<()> {
    let document = load(input, verify)?;
    let bytes = document.encode().context("encoding")?;
    std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "wrote {} to {}",
        human_bytes::human_bytes(bytes.len() as f64),
        output.display()
    );
    Ok(())
}

fn select(
    settings: &vfxedit_core::settings::Settings,
    input: &Path,
    output: &Path,
    (kind, node, selector, target): (NodeKind, usize, usize, i64),
) -> AnyResult<()> {
    let document = load(input, settings.verify_on_load)?;
    let queue = settings.open_queue(document, DocumentInfo::from_path(input.to_owned()));
    let changed = queue
        .write_with(|writer| {
            let document = writer.document();
            let owner = document
                .node_at(kind, node)
                .ok_or(CommandError::UnknownResource)?;
            let sel = *document
                .graph
                .node(owner)
                .and_then(|entry| entry.selectors().get(selector))
                .ok_or(CommandError::UnknownResource)?;
            let target_kind = document
                .graph
                .selector(sel)
                .ok_or(CommandError::UnknownResource)?
                .target_group();
            let target = match usize::try_from(target) {
                Err(_) => None,
                Ok(idx) => Some(
                    document
                        .node_at(target_kind, idx)
                        .ok_or(CommandError::UnknownResource)?,
                ),
            };
            writer.graph().select(sel, target)
        })
        .with_context(|| format!("selecting {target} with selector {selector} of {kind} {node}"))?;
    if !changed {
        println!("selector already had that target");
    }
    queue
        .save_to(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("saved {}", output.display());
    Ok(())
}

fn main() -> AnyResult<()> {
    let cli = <Cli as clap::Parser>::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stderr());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Trace)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Trace);
    }
    log::set_max_level(level);

    let preferences = preferences::Preferences::load(cli.settings);
    let settings = &preferences.settings;
    if settings.log_debug && level < log::LevelFilter::Debug {
        log::set_max_level(log::LevelFilter::Debug);
    }

    match cli.action {
        Action::Verify { files } => verify(files),
        Action::Info { file } => info(&file, settings.verify_on_load),
        Action::Resave { input, output } => resave(&input, &output, settings.verify_on_load),
        Action::Select {
            input,
            output,
            kind,
            node,
            selector,
            target,
        } => select(settings, &input, &output, (kind, node, selector, target)),
        Action::Settings { save } => {
            if preferences.did_fail_to_load() {
                eprintln!("settings file missing or invalid, showing defaults");
            }
            print!("{}", preferences.to_toml()?);
            if save {
                let path = preferences.save()?;
                println!("saved to {}", path.display());
            }
            Ok(())
        }
    }
}
