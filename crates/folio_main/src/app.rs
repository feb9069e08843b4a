//! Command implementations

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio_core::{
    CommitPreview, FolioConfig, GalleryState, OrderIndex, PhotoManifest, StoreBackend, UploadFile,
};
use folio_fs::{scan_photo_tree, ScanOptions};
use folio_store::{ContentStore, Credential, GithubStore, GithubTarget, LocalDirStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File in the config directory holding a saved token
const TOKEN_FILE: &str = "token";

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Photo portfolio manager")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a manifest from a photo folder tree
    Scan {
        photos_dir: PathBuf,
        #[arg(long, default_value = "photos.json")]
        out: PathBuf,
    },
    /// Print the ordering index derived from a manifest
    Order { manifest: PathBuf },
    /// Run a script of edits in one session and commit it
    Apply {
        script: PathBuf,
        /// Use a local directory instead of the configured store
        #[arg(long)]
        local: Option<PathBuf>,
        /// Print the artifacts instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
}

/// One scripted edit
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Reorder { album: String, from: usize, to: usize },
    Move { photo: String, album: String },
    CreateAlbum { name: String },
    RenameAlbum { album: String, name: String },
    DeleteAlbum { album: String },
    DeletePhoto { photo: String },
    /// Path relative to the script file
    Upload { file: PathBuf },
}

#[derive(Debug, Default, Deserialize)]
pub struct Script {
    #[serde(default, rename = "step")]
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

pub async fn run(cli: Cli, config: FolioConfig) -> Result<()> {
    match cli.command {
        Command::Scan { photos_dir, out } => scan(&photos_dir, &out, &config),
        Command::Order { manifest } => order(&manifest),
        Command::Apply {
            script,
            local,
            dry_run,
        } => {
            let (store, credential) = open_store(&config, local.as_deref())?;
            apply(&script, config, store.as_ref(), credential, dry_run).await
        }
    }
}

fn scan(photos_dir: &Path, out: &Path, config: &FolioConfig) -> Result<()> {
    let options = ScanOptions {
        extensions: config.upload.allowed_extensions.clone(),
        ..ScanOptions::default()
    };
    let albums = scan_photo_tree(photos_dir, &options)
        .with_context(|| format!("scanning {}", photos_dir.display()))?;

    let manifest = PhotoManifest::from_scan(albums);
    // Reject what the site would reject before writing anything
    let catalog = manifest.clone().into_catalog()?;
    std::fs::write(out, manifest.to_json()?).with_context(|| format!("writing {}", out.display()))?;

    println!(
        "Wrote {} ({} photos in {} albums)",
        out.display(),
        catalog.photo_count(),
        catalog.visible_albums().count()
    );
    Ok(())
}

fn order(manifest: &Path) -> Result<()> {
    let bytes = std::fs::read(manifest).with_context(|| format!("reading {}", manifest.display()))?;
    let manifest = PhotoManifest::from_json(&bytes)?;
    let order = OrderIndex::from_manifest(&manifest).to_json()?;
    print!("{}", String::from_utf8_lossy(&order));
    Ok(())
}

/// Pick the backend; a local directory needs no real credential
fn open_store(config: &FolioConfig, local: Option<&Path>) -> Result<(Box<dyn ContentStore>, Credential)> {
    let local_root = match (local, config.store.backend) {
        (Some(dir), _) => Some(dir.to_path_buf()),
        (None, StoreBackend::Local) => match &config.store.local_root {
            Some(root) => Some(root.clone()),
            None => bail!("store.local_root must be set for the local backend"),
        },
        (None, StoreBackend::Github) => None,
    };

    if let Some(root) = local_root {
        tracing::info!("Using local store at {:?}", root);
        let credential = Credential::new("local").context("placeholder credential")?;
        return Ok((Box::new(LocalDirStore::new(root)), credential));
    }

    let credential = load_credential(config)?;
    let target = GithubTarget {
        api_base: config.store.api_base.clone(),
        owner: config.store.owner.clone(),
        repo: config.store.repo.clone(),
        branch: config.store.branch.clone(),
    };
    if target.owner.is_empty() || target.repo.is_empty() {
        bail!("store.owner and store.repo must be set for the github backend");
    }
    tracing::info!("Using GitHub store {}/{}@{}", target.owner, target.repo, target.branch);
    Ok((Box::new(GithubStore::new(target, credential.clone())?), credential))
}

/// Token from the configured env var, else the saved token file
fn load_credential(config: &FolioConfig) -> Result<Credential> {
    if let Some(credential) = Credential::from_env(&config.store.token_env) {
        return Ok(credential);
    }

    let path = FolioConfig::config_dir().join(TOKEN_FILE);
    match std::fs::read_to_string(&path) {
        Ok(token) => Credential::new(token).with_context(|| format!("{} is empty", path.display())),
        Err(_) => bail!(
            "No credential: set {} or save a token to {}",
            config.store.token_env,
            path.display()
        ),
    }
}

pub async fn apply(
    script_path: &Path,
    config: FolioConfig,
    store: &dyn ContentStore,
    credential: Credential,
    dry_run: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(script_path)
        .with_context(|| format!("reading {}", script_path.display()))?;
    let script = Script::parse(&content)?;
    let base = script_path.parent().unwrap_or(Path::new("."));

    let mut state = GalleryState::load(config, store).await?;
    state.set_credential(Some(credential));
    state.begin_edit()?;

    for (i, step) in script.steps.iter().enumerate() {
        tracing::debug!("Step {}: {:?}", i + 1, step);
        apply_step(&mut state, store, step, base, dry_run)
            .await
            .with_context(|| format!("step {} ({:?})", i + 1, step))?;
    }

    if dry_run {
        print_preview(&state.preview_commit()?);
        state.cancel_edit()?;
        return Ok(());
    }

    let report = state.commit(store).await.map_err(|e| {
        tracing::error!("{}", e.user_message());
        e
    })?;
    println!(
        "Committed: {} ({} moves, {} files deleted)",
        report.artifacts_written.join(", "),
        report.moves_written,
        report.files_deleted
    );
    Ok(())
}

async fn apply_step(
    state: &mut GalleryState,
    store: &dyn ContentStore,
    step: &ScriptStep,
    base: &Path,
    dry_run: bool,
) -> Result<()> {
    match step {
        ScriptStep::Reorder { album, from, to } => state.reorder(album, *from, *to)?,
        ScriptStep::Move { photo, album } => state.move_to_album(photo, album)?,
        ScriptStep::CreateAlbum { name } => {
            state.create_album(name)?;
        }
        ScriptStep::RenameAlbum { album, name } => {
            state.rename_album(album, name)?;
        }
        ScriptStep::DeleteAlbum { album } => state.delete_album(album)?,
        ScriptStep::DeletePhoto { photo } => {
            state.stage_delete(photo)?;
        }
        ScriptStep::Upload { file } => {
            if dry_run {
                println!("Would upload {}", file.display());
                return Ok(());
            }
            let path = base.join(file);
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let photo = state.upload(store, UploadFile::new(name, bytes)).await?;
            println!("Uploaded {}", photo.source_path);
        }
    }
    Ok(())
}

fn print_preview(preview: &CommitPreview) {
    println!("--- photos.json\n{}", String::from_utf8_lossy(&preview.manifest));
    println!("--- order.json\n{}", String::from_utf8_lossy(&preview.order));
    if let Some(moves) = &preview.moves {
        println!("--- moves.json (local entries)\n{}", String::from_utf8_lossy(moves));
    }
    for path in &preview.deletes {
        println!("--- delete {}", path);
    }
}
