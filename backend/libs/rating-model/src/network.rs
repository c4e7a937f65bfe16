use crate::ModelError;
use book_features::schema::{CATEGORICAL_WIDTH, NUMERIC_WIDTH};
use book_features::{embedding_dim, CategoricalField, Dataset, EncoderStore, FeatureBatch};
use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig, Relu};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

const HIDDEN_FIRST: usize = 128;
const HIDDEN_SECOND: usize = 64;
const HIDDEN_THIRD: usize = 32;

#[derive(Config, Debug)]
pub struct RatingNetworkConfig {
    /// Distinct values per categorical input, in schema order. Drives the
    /// embedding width.
    pub vocab_sizes: Vec<usize>,
    /// Rows per embedding table; at least `max code + 1`.
    pub input_sizes: Vec<usize>,
    #[config(default = 3)]
    pub numeric_width: usize,
    #[config(default = 0.3)]
    pub dropout_first: f64,
    #[config(default = 0.2)]
    pub dropout_second: f64,
}

impl RatingNetworkConfig {
    /// Size the network from the training data, widening the embedding
    /// tables to cover every code the encoder bundle can produce.
    pub fn from_dataset(dataset: &Dataset, encoders: Option<&EncoderStore>) -> Self {
        let vocab_sizes = CategoricalField::ALL
            .iter()
            .map(|&field| dataset.vocab_size(field))
            .collect::<Vec<_>>();

        let input_sizes = CategoricalField::ALL
            .iter()
            .zip(&vocab_sizes)
            .map(|(&field, &vocab)| {
                let max_code = dataset
                    .max_code(field)
                    .map(|code| (code.max(0) as usize) + 1)
                    .unwrap_or(0);
                let encoder_size = encoders
                    .and_then(|store| store.get(field.encoder_key()))
                    .map(|encoder| encoder.len())
                    .unwrap_or(0);
                vocab.max(max_code).max(encoder_size).max(1)
            })
            .collect();

        Self::new(vocab_sizes, input_sizes)
    }

    pub fn embedding_dims(&self) -> Vec<usize> {
        self.vocab_sizes.iter().map(|&vocab| embedding_dim(vocab)).collect()
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.vocab_sizes.len() != CATEGORICAL_WIDTH || self.input_sizes.len() != CATEGORICAL_WIDTH {
            return Err(ModelError::SchemaMismatch(format!(
                "expected {} categorical inputs, config has {} vocab sizes and {} input sizes",
                CATEGORICAL_WIDTH,
                self.vocab_sizes.len(),
                self.input_sizes.len()
            )));
        }
        if self.numeric_width != NUMERIC_WIDTH {
            return Err(ModelError::SchemaMismatch(format!(
                "expected {} numeric inputs, config has {}",
                NUMERIC_WIDTH, self.numeric_width
            )));
        }
        Ok(())
    }

    /// Every code must index into its embedding table.
    pub fn check_batch(&self, batch: &FeatureBatch) -> crate::Result<()> {
        for (&field, &size) in CategoricalField::ALL.iter().zip(&self.input_sizes) {
            let out_of_range = batch
                .column(field)
                .iter()
                .copied()
                .find(|&code| code < 0 || code as usize >= size);

            if let Some(code) = out_of_range {
                return Err(ModelError::CodeOutOfRange {
                    input: field.input_name(),
                    code,
                    size,
                });
            }
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RatingNetwork<B> {
        let embedding_dims = self.embedding_dims();
        let embeddings = self
            .input_sizes
            .iter()
            .zip(&embedding_dims)
            .map(|(&rows, &dim)| EmbeddingConfig::new(rows, dim).init(device))
            .collect();
        let concat_width = embedding_dims.iter().sum::<usize>() + self.numeric_width;

        RatingNetwork {
            embeddings,
            hidden_first: LinearConfig::new(concat_width, HIDDEN_FIRST).init(device),
            hidden_second: LinearConfig::new(HIDDEN_FIRST, HIDDEN_SECOND).init(device),
            hidden_third: LinearConfig::new(HIDDEN_SECOND, HIDDEN_THIRD).init(device),
            output: LinearConfig::new(HIDDEN_THIRD, 1).init(device),
            dropout_first: DropoutConfig::new(self.dropout_first).init(),
            dropout_second: DropoutConfig::new(self.dropout_second).init(),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct RatingNetwork<B: Backend> {
    embeddings: Vec<Embedding<B>>,
    hidden_first: Linear<B>,
    hidden_second: Linear<B>,
    hidden_third: Linear<B>,
    output: Linear<B>,
    dropout_first: Dropout,
    dropout_second: Dropout,
    activation: Relu,
}

impl<B: Backend> RatingNetwork<B> {
    /// `categorical`: `[batch, 10]` codes, `numeric`: `[batch, 3]`.
    /// Returns `[batch, 1]` predicted ratings.
    pub fn forward(&self, categorical: Tensor<B, 2, Int>, numeric: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = categorical.dims();

        let mut parts = Vec::with_capacity(self.embeddings.len() + 1);
        for (column, embedding) in self.embeddings.iter().enumerate() {
            let codes = categorical.clone().slice([0..batch, column..column + 1]);
            let embedded = embedding.forward(codes);
            let [_, _, dim] = embedded.dims();
            parts.push(embedded.reshape([batch, dim]));
        }
        parts.push(numeric);

        let x = Tensor::cat(parts, 1);
        let x = self.activation.forward(self.hidden_first.forward(x));
        let x = self.dropout_first.forward(x);
        let x = self.activation.forward(self.hidden_second.forward(x));
        let x = self.dropout_second.forward(x);
        let x = self.activation.forward(self.hidden_third.forward(x));
        self.output.forward(x)
    }
}

/// Convert a feature batch into backend tensors.
pub fn batch_tensors<B: Backend>(
    batch: &FeatureBatch,
    device: &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2>) {
    let rows = batch.len();
    let codes: Vec<i64> = batch.categorical().iter().copied().collect();
    let numbers: Vec<f32> = batch.numeric().iter().copied().collect();

    let categorical =
        Tensor::<B, 2, Int>::from_data(TensorData::new(codes, [rows, CATEGORICAL_WIDTH]), device);
    let numeric = Tensor::<B, 2>::from_data(TensorData::new(numbers, [rows, NUMERIC_WIDTH]), device);

    (categorical, numeric)
}

/// Predict one rating per batch row.
pub fn predict<B: Backend>(
    model: &RatingNetwork<B>,
    batch: &FeatureBatch,
    device: &B::Device,
) -> crate::Result<Vec<f32>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let (categorical, numeric) = batch_tensors::<B>(batch, device);
    model
        .forward(categorical, numeric)
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| ModelError::Inference(format!("{:?}", err)))
}
