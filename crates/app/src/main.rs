use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::Context as _;
use directories::ProjectDirs;
use log::info;
use picturebook_application::AppContext;
use picturebook_core::Catalog;
use picturebook_narration::{NarrationEngine, process};
use picturebook_storage::SettingsStore;
use picturebook_ui::Ui;

const LOG_FILE: &str = "picturebook.log";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dirs =
        ProjectDirs::from("dev", "picturebook", "picturebook").context("resolve project dirs")?;

    init_logging(project_dirs.data_dir())?;

    let store = SettingsStore::open(project_dirs.config_dir())?;
    let settings = store.load_settings()?;
    info!("settings from {}", store.path().display());

    let catalog = Catalog::builtin()?;
    let (speech, audio) = process::system_backends(&settings.narration);
    let engine = NarrationEngine::new(speech, audio, &settings.narration);

    let ctx = AppContext::new(catalog, settings);
    let mut ui = Ui::new(ctx, engine);
    let settings = ui.run()?;
    store.save_settings(&settings)?;
    info!("bye");
    Ok(())
}

/// Logs go to a file: the terminal belongs to the UI.
fn init_logging(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create data dir {}", dir.display()))?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("init logger")?;
    Ok(())
}
