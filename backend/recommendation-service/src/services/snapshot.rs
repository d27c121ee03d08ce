//! On-disk model snapshot
//!
//! Layout of the snapshot directory:
//!   vectorizer.bin - bincode vectorizer state
//!   vectors.bin    - bincode product rows
//!   products.json  - product table, corpus order
//!
//! Every artifact carries the train generation. A snapshot loads only when all
//! three are present, decode, and agree on the generation; otherwise it is
//! corrupt and gets retrained. Saves go to a sibling temp directory that is
//! renamed into place, so readers never see artifacts from two trains.

use super::model::TrainedModel;
use super::tfidf::{SparseVector, TfidfVectorizer, VectorizerState};
use crate::error::EngineError;
use crate::models::CatalogEntry;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

const VECTORIZER_FILE: &str = "vectorizer.bin";
const VECTORS_FILE: &str = "vectors.bin";
const PRODUCTS_FILE: &str = "products.json";
const ARTIFACTS: [&str; 3] = [VECTORIZER_FILE, VECTORS_FILE, PRODUCTS_FILE];

#[derive(Serialize, Deserialize)]
struct VectorizerArtifact {
    generation: Uuid,
    trained_at: DateTime<Utc>,
    state: VectorizerState,
}

#[derive(Serialize, Deserialize)]
struct VectorsArtifact {
    generation: Uuid,
    vectors: Vec<SparseVector>,
}

#[derive(Serialize, Deserialize)]
struct ProductsArtifact {
    generation: Uuid,
    products: Vec<CatalogEntry>,
}

/// Blocking filesystem store; async callers go through `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `Ok(None)` when no snapshot exists at all.
    pub fn load(&self) -> Result<Option<TrainedModel>, EngineError> {
        let present: Vec<bool> = ARTIFACTS
            .iter()
            .map(|name| self.dir.join(name).is_file())
            .collect();

        if present.iter().all(|p| !p) {
            return Ok(None);
        }
        if !present.iter().all(|p| *p) {
            return Err(EngineError::CorruptSnapshot(format!(
                "incomplete snapshot in {}",
                self.dir.display()
            )));
        }

        let vectorizer: VectorizerArtifact = read_bincode(&self.dir.join(VECTORIZER_FILE))?;
        let vectors: VectorsArtifact = read_bincode(&self.dir.join(VECTORS_FILE))?;
        let products: ProductsArtifact = read_json(&self.dir.join(PRODUCTS_FILE))?;

        if vectors.generation != vectorizer.generation
            || products.generation != vectorizer.generation
        {
            return Err(EngineError::CorruptSnapshot(
                "artifacts come from different train runs".to_string(),
            ));
        }

        let fitted = TfidfVectorizer::from_state(vectorizer.state)
            .map_err(|e| EngineError::CorruptSnapshot(e.to_string()))?;

        let model = TrainedModel::from_parts(
            vectorizer.generation,
            vectorizer.trained_at,
            fitted,
            vectors.vectors,
            products.products,
        )?;

        info!(
            products = model.product_count(),
            generation = %model.generation(),
            "Model snapshot loaded"
        );
        Ok(Some(model))
    }

    pub fn save(&self, model: &TrainedModel) -> Result<(), EngineError> {
        let parent = self
            .dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)?;

        let name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "models".to_string());
        let suffix = Uuid::new_v4().simple().to_string();
        let staging = parent.join(format!(".{name}.tmp-{suffix}"));
        let retired = parent.join(format!(".{name}.old-{suffix}"));

        if let Err(e) = self.write_artifacts(&staging, model) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        let had_previous = self.dir.exists();
        if had_previous {
            fs::rename(&self.dir, &retired)?;
        }
        if let Err(e) = fs::rename(&staging, &self.dir) {
            if had_previous {
                let _ = fs::rename(&retired, &self.dir);
            }
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }
        if had_previous {
            if let Err(e) = fs::remove_dir_all(&retired) {
                warn!(path = %retired.display(), "Failed to remove retired snapshot: {}", e);
            }
        }

        info!(
            path = %self.dir.display(),
            generation = %model.generation(),
            "Model snapshot saved"
        );
        Ok(())
    }

    fn write_artifacts(&self, staging: &Path, model: &TrainedModel) -> Result<(), EngineError> {
        fs::create_dir_all(staging)?;

        write_bincode(
            &staging.join(VECTORIZER_FILE),
            &VectorizerArtifact {
                generation: model.generation(),
                trained_at: model.trained_at(),
                state: model.vectorizer().to_state(),
            },
        )?;
        write_bincode(
            &staging.join(VECTORS_FILE),
            &VectorsArtifact {
                generation: model.generation(),
                vectors: model.vectors().to_vec(),
            },
        )?;

        let file = File::create(staging.join(PRODUCTS_FILE))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(
            &mut writer,
            &ProductsArtifact {
                generation: model.generation(),
                products: model.catalog.clone(),
            },
        )
        .map_err(io::Error::from)?;
        finish(writer)?;

        Ok(())
    }
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let file = File::open(path)?;
    bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| EngineError::CorruptSnapshot(format!("{}: {}", path.display(), e)))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| EngineError::CorruptSnapshot(format!("{}: {}", path.display(), e)))
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<(), EngineError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, value)
        .map_err(|e| EngineError::Internal(format!("bincode: {e}")))?;
    finish(writer)
}

fn finish(mut writer: BufWriter<File>) -> Result<(), EngineError> {
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
