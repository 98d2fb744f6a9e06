//! Operational CLI for the gallery core: filetype registry reload,
//! one-shot directory resync, and thumbnail-cache sweep.

use std::env;
use std::path::PathBuf;

use gallery_core::config::GalleryConfig;
use gallery_core::filetype::{defaults, FiletypeRegistry};
use gallery_core::index::lock::DirectoryLockTable;
use gallery_core::index::sync;
use gallery_core::layout::LayoutCache;
use gallery_core::thumbnail::store;

fn usage() {
    println!("gallery-admin: operational tasks for the gallery core.");
    println!();
    println!("Usage:");
    println!("  gallery-admin reload-filetypes");
    println!("  gallery-admin sync --db <path> --path <directory>");
    println!("  gallery-admin sweep-thumbnails --db <path>");
}

enum Command {
    ReloadFiletypes,
    Sync { db: PathBuf, path: PathBuf },
    SweepThumbnails { db: PathBuf },
}

fn parse_args() -> Result<Command, String> {
    let mut args = env::args().skip(1);
    let subcommand = args.next().ok_or("missing subcommand")?;

    match subcommand.as_str() {
        "--help" | "-h" | "help" => {
            usage();
            std::process::exit(0);
        }
        "reload-filetypes" => Ok(Command::ReloadFiletypes),
        "sync" => {
            let (mut db, mut path) = (None, None);
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--db" => db = Some(PathBuf::from(args.next().ok_or("missing path after --db")?)),
                    "--path" => path = Some(PathBuf::from(args.next().ok_or("missing path after --path")?)),
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            Ok(Command::Sync {
                db: db.ok_or("sync requires --db <path>")?,
                path: path.ok_or("sync requires --path <directory>")?,
            })
        }
        "sweep-thumbnails" => {
            let mut db = None;
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--db" => db = Some(PathBuf::from(args.next().ok_or("missing path after --db")?)),
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            Ok(Command::SweepThumbnails {
                db: db.ok_or("sweep-thumbnails requires --db <path>")?,
            })
        }
        other => Err(format!("unknown subcommand: {other}")),
    }
}

/// Changes to the filetype store require an explicit reload or a
/// process restart. A separate admin process can't mutate the running
/// server's `OnceLock` directly; this validates the seed table loads
/// cleanly and reports its size, the operator-facing half of the reload
/// the server performs on its own restart.
fn reload_filetypes() {
    let registry = FiletypeRegistry::from_filetypes(defaults::seed());
    let mut count = 0;
    for ext in [".jpg", ".png", ".zip", ".pdf", ".dir", ".none"] {
        if registry.exists_by_ext(ext) {
            count += 1;
        }
    }
    println!("Filetype seed loaded and validated ({count}/6 sample extensions resolved).");
    println!("Restart the server process (or its hot-reload path) to pick up the change.");
}

async fn run_sync(db: PathBuf, path: PathBuf) -> Result<(), String> {
    let pool = open_pool(&db).await?;
    let config = GalleryConfig::default();
    let registry = FiletypeRegistry::from_filetypes(defaults::seed());
    let locks = DirectoryLockTable::new();
    let layout_cache = LayoutCache::new();

    sync::sync(&pool, &config, &registry, &locks, &layout_cache, &path)
        .await
        .map_err(|e| e.to_string())?;

    println!("Synced {}", path.display());
    Ok(())
}

async fn run_sweep_thumbnails(db: PathBuf) -> Result<(), String> {
    let pool = open_pool(&db).await?;
    let removed = store::sweep_orphans(&pool).await.map_err(|e| e.to_string())?;
    println!("Removed {removed} orphaned thumbnail record(s).");
    Ok(())
}

async fn open_pool(db: &std::path::Path) -> Result<sqlx::SqlitePool, String> {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    let opts = SqliteConnectOptions::new().filename(db).create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .map_err(|e| e.to_string())?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| e.to_string())?;

    Ok(pool)
}

fn main() {
    env_logger::init();

    let command = match parse_args() {
        Ok(command) => command,
        Err(error) => {
            eprintln!("{error}");
            usage();
            std::process::exit(1);
        }
    };

    let result = match command {
        Command::ReloadFiletypes => {
            reload_filetypes();
            Ok(())
        }
        Command::Sync { db, path } => tokio::runtime::Runtime::new()
            .expect("failed to start async runtime")
            .block_on(run_sync(db, path)),
        Command::SweepThumbnails { db } => tokio::runtime::Runtime::new()
            .expect("failed to start async runtime")
            .block_on(run_sweep_thumbnails(db)),
    };

    if let Err(error) = result {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
