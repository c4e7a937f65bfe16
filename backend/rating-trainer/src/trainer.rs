/// Mini-batch training loop for the rating network
///
/// Adam on MSE, reshuffled every epoch. Validation loss is measured on the
/// inference copy of the network after each epoch and drives early stopping;
/// the weights from the best epoch are the ones returned.
use crate::early_stopping::{EarlyStopping, Progress};
use crate::metrics::{mse, RegressionMetrics};
use anyhow::{anyhow, bail, Context, Result};
use book_features::{FeatureBatch, RatingRecord};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rating_model::{batch_tensors, predict, RatingNetwork, RatingNetworkConfig};
use serde::Serialize;
use tracing::{debug, info};

pub type TrainingBackend = Autodiff<NdArray>;
pub type InferenceBackend = NdArray;

#[derive(Debug, Clone, Serialize)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub patience: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 128,
            patience: 3,
            learning_rate: 1e-3,
            seed: crate::split::DEFAULT_SEED,
        }
    }
}

/// Feature rows paired with their observed ratings.
#[derive(Debug, Clone)]
pub struct LabeledRows {
    pub features: FeatureBatch,
    pub targets: Vec<f32>,
}

impl LabeledRows {
    pub fn from_records(records: &[RatingRecord]) -> Result<Self> {
        let targets = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                record
                    .rating
                    .ok_or_else(|| anyhow!("row {} has no rating to train on", row))
            })
            .collect::<Result<Vec<f32>>>()?;

        Ok(Self {
            features: FeatureBatch::from_records(records),
            targets,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(indices),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_loss: f32,
    pub validation_loss: f32,
}

pub struct FitOutcome {
    pub network: RatingNetwork<InferenceBackend>,
    pub best_epoch: usize,
    pub best_validation_loss: f32,
    pub stopped_early: bool,
    pub history: Vec<EpochReport>,
}

pub fn fit(
    config: &RatingNetworkConfig,
    options: &TrainingOptions,
    train: &LabeledRows,
    validation: &LabeledRows,
) -> Result<FitOutcome> {
    if train.is_empty() {
        bail!("training split is empty");
    }
    if validation.is_empty() {
        bail!("validation split is empty");
    }
    config.validate()?;
    config.check_batch(&train.features)?;
    config.check_batch(&validation.features)?;

    let device = NdArrayDevice::default();
    let batch_size = options.batch_size.max(1);
    let mut network: RatingNetwork<TrainingBackend> = config.init(&device);
    let mut optimizer = AdamConfig::new().init();
    let mut stopper = EarlyStopping::new(options.patience);
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut history = Vec::new();
    let mut stopped_early = false;

    info!(
        train_rows = train.len(),
        validation_rows = validation.len(),
        epochs = options.epochs,
        batch_size,
        "Starting training"
    );

    for epoch in 1..=options.epochs {
        let mut order: Vec<usize> = (0..train.len()).collect();
        order.shuffle(&mut rng);

        let mut weighted_loss = 0.0f64;
        for indices in order.chunks(batch_size) {
            let batch = train.select(indices);
            let (categorical, numeric) = batch_tensors::<TrainingBackend>(&batch.features, &device);
            let targets = Tensor::<TrainingBackend, 2>::from_data(
                TensorData::new(batch.targets, [indices.len(), 1]),
                &device,
            );

            let predictions = network.forward(categorical, numeric);
            let loss = MseLoss::new().forward(predictions, targets, Reduction::Mean);
            weighted_loss += loss.clone().into_scalar().elem::<f64>() * indices.len() as f64;

            let grads = GradientsParams::from_grads(loss.backward(), &network);
            network = optimizer.step(options.learning_rate, network, grads);
        }

        let train_loss = (weighted_loss / train.len() as f64) as f32;
        let snapshot = network.valid();
        let validation_predictions = predict_rows(&snapshot, &validation.features, batch_size)?;
        let validation_loss = mse(&validation.targets, &validation_predictions);

        info!(epoch, train_loss, validation_loss, "Epoch finished");
        history.push(EpochReport {
            epoch,
            train_loss,
            validation_loss,
        });

        match stopper.observe(epoch, validation_loss, snapshot) {
            Progress::Improved => debug!(epoch, "Validation loss improved"),
            Progress::Stalled { remaining } => debug!(epoch, remaining, "Validation loss stalled"),
            Progress::Stop => {
                info!(epoch, "Early stopping");
                stopped_early = true;
                break;
            }
        }
    }

    let best = stopper
        .into_best()
        .context("training finished without a single epoch")?;
    info!(
        best_epoch = best.epoch,
        best_validation_loss = best.loss,
        "Restored best weights"
    );

    Ok(FitOutcome {
        network: best.snapshot,
        best_epoch: best.epoch,
        best_validation_loss: best.loss,
        stopped_early,
        history,
    })
}

/// Predict in chunks of `batch_size` rows.
pub fn predict_rows<B: Backend>(
    network: &RatingNetwork<B>,
    features: &FeatureBatch,
    batch_size: usize,
) -> Result<Vec<f32>> {
    let device = B::Device::default();
    let mut scores = Vec::with_capacity(features.len());
    for chunk in features.chunks(batch_size.max(1)) {
        scores.extend(predict(network, &chunk, &device)?);
    }
    Ok(scores)
}

pub fn evaluate<B: Backend>(
    network: &RatingNetwork<B>,
    rows: &LabeledRows,
    batch_size: usize,
) -> Result<RegressionMetrics> {
    let predictions = predict_rows(network, &rows.features, batch_size)?;
    Ok(RegressionMetrics::compute(&rows.targets, &predictions))
}
