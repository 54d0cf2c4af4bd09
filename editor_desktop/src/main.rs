//! Paneview - Headless driver for editor views.
//!
//! Usage: paneview [--settings FILE] [--session FILE] [--watch] [FILE]...
//!
//! Opens every FILE and every entry of a saved session, prints the unsaved
//! state and uncommitted hunks of each editor, then prints the workspace
//! session as JSON. With `--watch` the editors follow changes on disk until
//! Ctrl-C.

use paneview_core::{
    Container, DiffOverlayManager, HeadlessSurfaceFactory, PaneItem, SessionRecord, Settings,
    View, WorkspaceRegistry,
};
use paneview_host::{pump, GitRevisions};
use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;
use std::time::{Duration, Instant};

const USAGE: &str = "usage: paneview [--settings FILE] [--session FILE] [--watch] [FILE]...";

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    session: Option<PathBuf>,
    watch: bool,
    files: Vec<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let value = args.next().ok_or("--settings needs a file")?;
                parsed.settings = Some(PathBuf::from(value));
            }
            "--session" => {
                let value = args.next().ok_or("--session needs a file")?;
                parsed.session = Some(PathBuf::from(value));
            }
            "--watch" => parsed.watch = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            _ => parsed.files.push(PathBuf::from(arg)),
        }
    }
    Ok(parsed)
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    let settings = match args.settings.as_deref().map(Settings::load).transpose() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            log::error!("Failed to load settings: {}", e);
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    if let Err(e) = local.block_on(&runtime, run(args, settings)) {
        log::error!("{}", e);
        process::exit(1);
    }
}

async fn run(args: Args, settings: Settings) -> Result<(), Box<dyn Error>> {
    let (ctx, events) = paneview_host::disk_context(Rc::new(HeadlessSurfaceFactory::new()), settings)?;
    let workspace = WorkspaceRegistry::new();
    let revisions = Rc::new(GitRevisions::new());
    let overlays = DiffOverlayManager::install(&workspace, revisions.clone(), Rc::clone(&ctx.config));

    if let Some(session) = &args.session {
        let json = tokio::fs::read_to_string(session).await?;
        let records: Vec<SessionRecord> = serde_json::from_str(&json)?;
        for record in records.iter().filter(|record| record.is_ours()) {
            match View::deserialize(&ctx, record).await {
                Ok(Some(view)) => workspace.did_add_item(&view, Container::Center),
                Ok(None) => log::info!("Skipping {:?}: file is gone", record.filepath),
                Err(e) => log::error!("Failed to restore {:?}: {}", record.filepath, e),
            }
        }
    }

    for path in &args.files {
        let path = absolute(path)?;
        log::info!("Opening file: {}", path.display());
        match View::open(&ctx, Some(path)).await {
            Ok(view) => workspace.did_add_item(&view, Container::Center),
            Err(e) => log::error!("{}", e),
        }
    }

    if let Some(view) = workspace.editors().last() {
        workspace.did_change_active_item(Some(view as &dyn PaneItem), Container::Center);
    }
    for view in workspace.editors() {
        if let Some(path) = view.path() {
            revisions.refresh(&path).await;
        }
    }
    overlays.refresh();
    report(&workspace, &overlays);

    if args.watch {
        log::info!("Watching {} editors, press Ctrl-C to stop", workspace.editors().len());
        let pump = tokio::task::spawn_local(pump::run(Rc::clone(&ctx.watchers), events));
        let mut ticks = tokio::time::interval(Duration::from_millis(100));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    result?;
                    break;
                }
                _ = ticks.tick() => {
                    let now = Instant::now();
                    for view in workspace.editors() {
                        if view.tick(now) {
                            log::info!("{} changed", view.long_title(&workspace));
                        }
                    }
                }
            }
        }
        pump.abort();
        report(&workspace, &overlays);
    }

    println!("{}", serde_json::to_string_pretty(&workspace.serialize())?);
    for view in workspace.editors() {
        view.destroy();
    }
    Ok(())
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

fn report(workspace: &WorkspaceRegistry, overlays: &DiffOverlayManager) {
    for view in workspace.editors() {
        let hunks = overlays
            .overlay(&view)
            .map(|overlay| overlay.hunks())
            .unwrap_or_default();
        println!(
            "{}{} ({}, {} hunks)",
            view.long_title(workspace),
            if view.is_modified() { " *" } else { "" },
            view.grammar().name,
            hunks.len()
        );
        for hunk in hunks {
            println!(
                "  {:?} +{},{} -{},{}",
                hunk.kind(),
                hunk.new_start,
                hunk.new_lines,
                hunk.old_start,
                hunk.old_lines
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["--watch", "a.rs", "--session", "s.json", "b.rs"]).unwrap();
        assert!(parsed.watch);
        assert_eq!(parsed.session, Some(PathBuf::from("s.json")));
        assert_eq!(parsed.files, vec![PathBuf::from("a.rs"), PathBuf::from("b.rs")]);
        assert!(parsed.settings.is_none());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["--settings"]).is_err());
        assert!(args(&["--bogus"]).is_err());
        assert!(args(&["--help"]).is_err());
    }
}
