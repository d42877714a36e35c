use crate::util::output::OutputFormat;

use mc_core::{
	config::CONFIG_FILE_NAME, ArtifactStore, Catalog, FileRecord, MemoryCatalog, PipelineConfig,
	PreviewGenerator, ProfileId,
};

use std::{
	io,
	path::{Path, PathBuf},
	sync::Arc,
};

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use tokio::fs;
use tracing::{debug, info};

pub const CATALOG_FILE_NAME: &str = "catalog.json";

/// Everything a command needs: resolved config, the JSON-backed catalog and output settings
pub struct Context {
	pub config: PipelineConfig,
	pub catalog: Arc<MemoryCatalog>,
	pub catalog_path: PathBuf,
	pub profile_id: ProfileId,
	pub format: OutputFormat,
}

pub struct ContextArgs {
	pub data_dir: Option<PathBuf>,
	pub config: Option<PathBuf>,
	pub catalog: Option<PathBuf>,
	pub profile_id: ProfileId,
	pub format: OutputFormat,
}

impl Context {
	pub async fn load(args: ContextArgs) -> Result<Self> {
		let data_dir = match args.data_dir.clone() {
			Some(dir) => dir,
			None => default_data_dir(),
		};

		let config_path = args
			.config
			.unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));
		let mut config = PipelineConfig::load_from(&config_path).await?;

		// A config file that doesn't pin a data dir follows the resolved one
		if args.data_dir.is_some() || config.data_dir == Path::new(".") {
			config = config.with_data_dir(&data_dir);
		}

		let catalog_path = args
			.catalog
			.unwrap_or_else(|| config.data_dir.join(CATALOG_FILE_NAME));
		let catalog = Arc::new(load_catalog(&catalog_path).await?);

		debug!(
			data_dir = %config.data_dir.display(),
			catalog = %catalog_path.display(),
			profile_id = %args.profile_id,
			"Resolved CLI context;"
		);

		Ok(Self {
			config,
			catalog,
			catalog_path,
			profile_id: args.profile_id,
			format: args.format,
		})
	}

	pub fn dyn_catalog(&self) -> Arc<dyn Catalog> {
		Arc::clone(&self.catalog) as Arc<dyn Catalog>
	}

	pub fn store(&self) -> ArtifactStore {
		ArtifactStore::new(&self.config.data_dir)
	}

	pub fn generator(&self) -> PreviewGenerator {
		PreviewGenerator::new(self.store().profile_dir(self.profile_id), &self.config)
	}

	pub const fn is_human(&self) -> bool {
		matches!(self.format, OutputFormat::Human)
	}

	/// Replaces the catalog file through a temporary sibling
	pub async fn save_catalog(&self) -> Result<()> {
		let records = self.catalog.snapshot().await;

		if let Some(parent) = self
			.catalog_path
			.parent()
			.filter(|parent| !parent.as_os_str().is_empty())
		{
			fs::create_dir_all(parent)
				.await
				.with_context(|| format!("failed to create {}", parent.display()))?;
		}

		let tmp = self.catalog_path.with_extension("json.tmp");
		fs::write(&tmp, serde_json::to_vec_pretty(&records)?)
			.await
			.with_context(|| format!("failed to write {}", tmp.display()))?;
		fs::rename(&tmp, &self.catalog_path)
			.await
			.with_context(|| format!("failed to replace {}", self.catalog_path.display()))?;

		info!(records = records.len(), path = %self.catalog_path.display(), "Saved catalog;");

		Ok(())
	}
}

async fn load_catalog(path: &Path) -> Result<MemoryCatalog> {
	match fs::read(path).await {
		Ok(bytes) => {
			let records = serde_json::from_slice::<Vec<FileRecord>>(&bytes)
				.with_context(|| format!("invalid catalog file {}", path.display()))?;
			Ok(MemoryCatalog::from_records(records))
		}
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(MemoryCatalog::new()),
		Err(e) => Err(e).with_context(|| format!("failed to read catalog {}", path.display())),
	}
}

fn default_data_dir() -> PathBuf {
	ProjectDirs::from("", "", "mediacat").map_or_else(
		|| PathBuf::from(".mediacat"),
		|dirs| dirs.data_dir().to_path_buf(),
	)
}
