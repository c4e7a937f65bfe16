/// Model artifact directory: `config.json` plus the compact weight record.
use crate::network::{RatingNetwork, RatingNetworkConfig};
use crate::{ModelError, Result};
use burn::config::Config;
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use std::fs;
use std::path::Path;
use tracing::info;

pub const CONFIG_FILE: &str = "config.json";

/// Stem of the weight file; the recorder appends its own extension.
pub const WEIGHTS_FILE: &str = "model";

pub fn save_artifact<B: Backend>(
    network: &RatingNetwork<B>,
    config: &RatingNetworkConfig,
    dir: &Path,
) -> Result<()> {
    fs::create_dir_all(dir)?;
    config.save(dir.join(CONFIG_FILE))?;
    network
        .clone()
        .save_file(dir.join(WEIGHTS_FILE), &CompactRecorder::new())
        .map_err(|err| ModelError::Artifact(format!("failed to write weights: {:?}", err)))?;

    info!(path = %dir.display(), "Rating model artifact saved");
    Ok(())
}

pub fn load_artifact<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<(RatingNetworkConfig, RatingNetwork<B>)> {
    let config = RatingNetworkConfig::load(dir.join(CONFIG_FILE)).map_err(|err| {
        ModelError::Artifact(format!(
            "failed to read {}: {:?}",
            dir.join(CONFIG_FILE).display(),
            err
        ))
    })?;
    config.validate()?;

    let network = config
        .init::<B>(device)
        .load_file(dir.join(WEIGHTS_FILE), &CompactRecorder::new(), device)
        .map_err(|err| ModelError::Artifact(format!("failed to read weights: {:?}", err)))?;

    info!(path = %dir.display(), "Rating model artifact loaded");
    Ok((config, network))
}
