use anyhow::{Context, Result, bail};
use article_linker_config::Config;
use article_linker_engine::{
    Boundary, ContainerId, Document, GroupId, LinkState, Linker, LinkerSettings, OverlaySettings,
    RawSelection, ResourceId, ResourceRegistry, RestoreReport, Rgb, SelectionLimits, StaticLayout,
    io,
};
use std::collections::BTreeMap;
use std::{env, path::Path, path::PathBuf, process};

// Headless layout: every container one row tall on a fixed track.
const ROW_HEIGHT: f64 = 24.0;
const TRACK_HEIGHT: f64 = 800.0;

const USAGE: &str = "\
Usage:
  article-linker replay <document.json> [links.json] [--write <out.json>]
  article-linker check <document.json> [links.json]
  article-linker link <document.json> <links.json> <container:offset> <container:offset> <resource>
  article-linker unlink <document.json> <links.json> <group>

Offsets given to `link` count bytes of the container's content without link markup.
`replay --write` saves the document with its link markup in place.";

fn settings(config: &Config) -> LinkerSettings {
    LinkerSettings {
        limits: SelectionLimits {
            min_chars: config.selection.min_chars,
            max_chars: config.selection.max_chars,
        },
        overlay: OverlaySettings {
            scrollbar_pad: config.overlay.scrollbar_pad,
            min_tab_height: config.overlay.min_tab_height,
            tab_alpha: config.overlay.tab_alpha,
        },
        read_only: config.read_only,
    }
}

fn registry(config: &Config) -> BTreeMap<ResourceId, Rgb> {
    config
        .resources
        .iter()
        .filter_map(|(id, color)| match color.parse::<Rgb>() {
            Ok(rgb) => Some((ResourceId::new(id.as_str()), rgb)),
            Err(e) => {
                log::warn!("Ignoring colour for resource {id}: {e}");
                None
            }
        })
        .collect()
}

/// A linker over `doc_path` with the links in `state_path` replayed onto it.
fn open(
    config: &Config,
    registry: &BTreeMap<ResourceId, Rgb>,
    doc_path: &Path,
    state_path: Option<&Path>,
) -> Result<(Linker, RestoreReport)> {
    let document: Document = io::read_document(doc_path)
        .with_context(|| format!("Failed to read document {}", doc_path.display()))?;
    let layout = StaticLayout::uniform(&document, ROW_HEIGHT, TRACK_HEIGHT);
    let mut linker = Linker::new(document, layout, settings(config));

    let state = match state_path {
        Some(path) => io::read_link_state(path)
            .with_context(|| format!("Failed to read link state {}", path.display()))?
            .unwrap_or_default(),
        None => LinkState::new(),
    };
    let report = linker.restore(&state, registry);
    for (group, err) in &report.failed {
        eprintln!("skipped link {group}: {err}");
    }
    Ok((linker, report))
}

/// Saving after a lossy restore would drop the skipped links from disk.
fn ensure_restored(report: &RestoreReport, state_path: &Path) -> Result<()> {
    if !report.is_clean() {
        bail!(
            "Refusing to rewrite {}: {} stored links could not be restored (see `check`)",
            state_path.display(),
            report.failed.len()
        );
    }
    Ok(())
}

/// Pull `--write <path>` out of the arguments.
fn take_write_flag(args: &mut Vec<String>) -> Result<Option<PathBuf>> {
    let Some(index) = args.iter().position(|a| a == "--write") else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        bail!("--write needs an output path");
    }
    let path = args.remove(index + 1);
    args.remove(index);
    Ok(Some(PathBuf::from(path)))
}

fn parse_boundary(arg: &str) -> Result<(ContainerId, usize)> {
    let Some((container, offset)) = arg.rsplit_once(':') else {
        bail!("Expected <container:offset>, got '{arg}'");
    };
    let offset = offset
        .parse()
        .with_context(|| format!("Invalid offset in '{arg}'"))?;
    Ok((ContainerId::new(container), offset))
}

fn replay(linker: &Linker) {
    for container in linker.document().containers() {
        println!("{}\t{}", container.id(), container.markup());
    }
    for tab in linker.tabs() {
        println!(
            "tab {} ({}) top={:.1} height={:.1}",
            tab.group, tab.resource, tab.top, tab.height
        );
    }
}

fn check(report: &RestoreReport) -> bool {
    for group in &report.restored {
        println!("ok\t{group}");
    }
    for (group, err) in &report.failed {
        println!("FAILED\t{group}\t{err}");
    }
    report.is_clean()
}

fn link(
    linker: &mut Linker,
    registry: &BTreeMap<ResourceId, Rgb>,
    start: &str,
    end: &str,
    resource: &str,
) -> Result<()> {
    let (start_container, start_offset) = parse_boundary(start)?;
    let (end_container, end_offset) = parse_boundary(end)?;
    let document = linker.document();
    let selection = RawSelection::new(
        Boundary::new(
            start_container.clone(),
            document.to_live(&start_container, start_offset),
        ),
        Boundary::new(
            end_container.clone(),
            document.to_live(&end_container, end_offset),
        ),
    );

    let resource = ResourceId::new(resource);
    let group = linker
        .begin_selection(&selection)
        .context("Failed to link selection")?;
    let link = linker.confirm(&resource, registry.color(&resource))?;
    println!("{group}");
    for anchor in &link.anchors {
        println!("  {}:{}..{}", anchor.container_id, anchor.begin, anchor.end);
    }
    Ok(())
}

fn state_arg(args: &[String], index: usize, config: &Config) -> Option<PathBuf> {
    args.get(index)
        .map(PathBuf::from)
        .or_else(|| config.state_path.clone())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args: Vec<String> = env::args().collect();
    let write_path = match take_write_flag(&mut args) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            process::exit(1);
        }
    };
    let config_path = Config::config_path();
    let config = Config::load()
        .with_context(|| format!("Failed to load config file {}", config_path.display()))?
        .unwrap_or_default();
    let registry = registry(&config);

    let (Some(command), Some(doc_path)) = (args.get(1), args.get(2)) else {
        eprintln!("{USAGE}");
        process::exit(1);
    };
    let doc_path = PathBuf::from(doc_path);

    match command.as_str() {
        "replay" => {
            let state_path = state_arg(&args, 3, &config);
            let (linker, _) = open(&config, &registry, &doc_path, state_path.as_deref())?;
            replay(&linker);
            if let Some(out) = write_path {
                io::write_document(&out, linker.document())
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                log::info!("Wrote linked document to {}", out.display());
            }
        }
        "check" => {
            let state_path = state_arg(&args, 3, &config);
            let (_, report) = open(&config, &registry, &doc_path, state_path.as_deref())?;
            if !check(&report) {
                process::exit(1);
            }
        }
        "link" if args.len() == 7 => {
            let state_path = PathBuf::from(&args[3]);
            let (mut linker, report) = open(&config, &registry, &doc_path, Some(&state_path))?;
            ensure_restored(&report, &state_path)?;
            link(&mut linker, &registry, &args[4], &args[5], &args[6])?;
            io::write_link_state(&state_path, &linker.serialize())
                .with_context(|| format!("Failed to write {}", state_path.display()))?;
        }
        "unlink" if args.len() == 5 => {
            let state_path = PathBuf::from(&args[3]);
            let (mut linker, report) = open(&config, &registry, &doc_path, Some(&state_path))?;
            ensure_restored(&report, &state_path)?;
            let group = GroupId::new(args[4].as_str());
            let removed = linker
                .remove_link(&group)
                .with_context(|| format!("Failed to remove link {group}"))?;
            log::info!("Removed {} anchors", removed.anchors.len());
            io::write_link_state(&state_path, &linker.serialize())
                .with_context(|| format!("Failed to write {}", state_path.display()))?;
        }
        _ => {
            eprintln!("{USAGE}");
            process::exit(1);
        }
    }

    Ok(())
}
