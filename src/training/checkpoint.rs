//! Checkpoint persistence and flow-field artifacts.
//!
//! Purpose
//! -------
//! Persist the evolution parameters when validation improves, and write
//! the 2-D flow-field artifacts produced on validation epochs.
//!
//! Key behaviors
//! -------------
//! - [`CheckpointSink`] is the seam the training loop writes through;
//!   [`JsonCheckpointSink`] writes `checkpoint-<step>.json` files holding a
//!   [`Checkpoint`].
//! - [`load_checkpoint`] reads one back for warm starts or inspection.
//! - [`write_flow_fields`] writes `flow-field-<epoch>.json` holding a
//!   [`FlowFieldArtifact`].
//!
//! Conventions
//! -----------
//! - `step` is the optimizer's global step count at save time.
//! - I/O failures map to `LatentError::Checkpoint`; (de)serialization
//!   failures to `LatentError::Config`.
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::latent::{core::params::EvolutionParams, errors::LatentResult, models::FlowField};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub step: u64,
    pub epoch: usize,
    pub valid_cost: f64,
    pub params: EvolutionParams,
}

pub trait CheckpointSink {
    /// Persist `checkpoint`, returning where it went (if anywhere).
    fn save(&mut self, checkpoint: &Checkpoint) -> LatentResult<Option<PathBuf>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonCheckpointSink {
    dir: PathBuf,
}

impl JsonCheckpointSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> LatentResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, step: u64) -> PathBuf {
        self.dir.join(format!("checkpoint-{step}.json"))
    }
}

impl CheckpointSink for JsonCheckpointSink {
    fn save(&mut self, checkpoint: &Checkpoint) -> LatentResult<Option<PathBuf>> {
        let path = self.path_for(checkpoint.step);
        write_json(&path, checkpoint)?;
        Ok(Some(path))
    }
}

pub fn load_checkpoint(path: impl AsRef<Path>) -> LatentResult<Checkpoint> {
    let reader = BufReader::new(File::open(path)?);
    let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
    checkpoint.params.validate()?;
    Ok(checkpoint)
}

/// Flow fields of every entity at one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowFieldArtifact {
    pub epoch: usize,
    pub fields: Vec<FlowField>,
}

pub fn write_flow_fields(dir: &Path, artifact: &FlowFieldArtifact) -> LatentResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("flow-field-{}.json", artifact.epoch));
    write_json(&path, artifact)?;
    Ok(path)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> LatentResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
