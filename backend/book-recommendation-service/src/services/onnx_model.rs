/// ONNX rating model served with tract
///
/// The exported network takes one `[batch, 1]` input per categorical field
/// (`{field}_in`) plus `num_in` (`[batch, 3]`) and yields `rating`
/// (`[batch, 1]`). Inputs and the output are matched by name, so the graph's
/// ordering does not matter. The plan is optimised for a fixed batch size;
/// shorter chunks are zero-padded and the padding rows dropped from the output.
use super::scorer::RatingPredictor;
use crate::error::{AppError, Result};
use book_features::schema::{NUMERIC_INPUT, NUMERIC_WIDTH, RATING_OUTPUT};
use book_features::{CategoricalField, FeatureBatch};
use std::path::Path;
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::infer::Factoid;
use tracing::{debug, info};

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputSource {
    Categorical(CategoricalField),
    Numeric,
}

impl InputSource {
    fn from_name(name: &str) -> Option<Self> {
        if name == NUMERIC_INPUT {
            return Some(InputSource::Numeric);
        }
        CategoricalField::from_input_name(name).map(InputSource::Categorical)
    }
}

#[derive(Debug, Clone)]
struct InputSlot {
    source: InputSource,
    datum: DatumType,
}

pub struct OnnxRatingModel {
    plan: TractModel,
    inputs: Vec<InputSlot>,
    batch_size: usize,
}

impl OnnxRatingModel {
    pub fn load(path: &Path, batch_size: usize) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let (plan, inputs) = Self::load_tract_model(path, batch_size)
            .map_err(|e| AppError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            inputs = inputs.len(),
            batch_size,
            "ONNX rating model loaded"
        );

        Ok(Self {
            plan,
            inputs,
            batch_size,
        })
    }

    fn load_tract_model(path: &Path, batch_size: usize) -> anyhow::Result<(TractModel, Vec<InputSlot>)> {
        let mut model = tract_onnx::onnx().model_for_path(path)?;

        let names: Vec<String> = model
            .input_outlets()?
            .iter()
            .map(|outlet| model.node(outlet.node).name.clone())
            .collect();

        let mut inputs = Vec::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            let source = InputSource::from_name(name)
                .ok_or_else(|| anyhow::anyhow!("unexpected model input {:?}", name))?;
            let datum = model
                .input_fact(position)?
                .datum_type
                .concretize()
                .unwrap_or(DatumType::F32);

            let width = match source {
                InputSource::Categorical(_) => 1,
                InputSource::Numeric => NUMERIC_WIDTH,
            };
            let fact: InferenceFact = match datum {
                DatumType::I64 => i64::fact([batch_size, width]).into(),
                DatumType::I32 => i32::fact([batch_size, width]).into(),
                DatumType::F32 => f32::fact([batch_size, width]).into(),
                other => anyhow::bail!("input {:?} has unsupported type {:?}", name, other),
            };
            model = model.with_input_fact(position, fact)?;

            debug!(input = %name, ?datum, "Bound model input");
            inputs.push(InputSlot { source, datum });
        }

        for field in CategoricalField::ALL {
            if !inputs.iter().any(|slot| slot.source == InputSource::Categorical(field)) {
                anyhow::bail!("model has no input {}", field.input_name());
            }
        }
        if !inputs.iter().any(|slot| slot.source == InputSource::Numeric) {
            anyhow::bail!("model has no input {}", NUMERIC_INPUT);
        }

        // Keep only the rating head; any other graph output is ignored.
        model
            .set_output_names([RATING_OUTPUT])
            .map_err(|e| anyhow::anyhow!("model has no output {}: {}", RATING_OUTPUT, e))?;

        let plan = model.into_optimized()?.into_runnable()?;
        Ok((plan, inputs))
    }
}

/// Build one model input for `batch`, zero-padded to `padded` rows.
///
/// Padding rows carry code 0 and numeric 0.0; categorical codes are
/// converted to the input's element type.
fn padded_input(source: InputSource, datum: DatumType, batch: &FeatureBatch, padded: usize) -> Result<Tensor> {
    let rows = batch.len();

    let tensor: Tensor = match source {
        InputSource::Numeric => {
            let numeric = batch.numeric();
            tract_ndarray::Array2::from_shape_fn((padded, NUMERIC_WIDTH), |(r, c)| {
                if r < rows {
                    numeric[[r, c]]
                } else {
                    0.0
                }
            })
            .into()
        }
        InputSource::Categorical(field) => {
            let column = batch.column(field);
            let code = |r: usize| if r < rows { column[r] } else { 0 };
            match datum {
                DatumType::I64 => tract_ndarray::Array2::from_shape_fn((padded, 1), |(r, _)| code(r)).into(),
                DatumType::I32 => {
                    tract_ndarray::Array2::from_shape_fn((padded, 1), |(r, _)| code(r) as i32).into()
                }
                DatumType::F32 => {
                    tract_ndarray::Array2::from_shape_fn((padded, 1), |(r, _)| code(r) as f32).into()
                }
                other => {
                    return Err(AppError::Inference(format!(
                        "unsupported input type {:?}",
                        other
                    )))
                }
            }
        }
    };
    Ok(tensor)
}

/// First `rows` values of the rating output; the rest are padding.
fn take_ratings(output: &Tensor, rows: usize) -> Result<Vec<f32>> {
    let ratings = output
        .to_array_view::<f32>()
        .map_err(|e| AppError::Inference(format!("Output extraction failed: {}", e)))?;
    if ratings.len() < rows {
        return Err(AppError::Inference(format!(
            "model returned {} ratings for {} rows",
            ratings.len(),
            rows
        )));
    }
    Ok(ratings.iter().take(rows).copied().collect())
}

impl RatingPredictor for OnnxRatingModel {
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>> {
        if batch.len() > self.batch_size {
            return Err(AppError::Inference(format!(
                "chunk of {} rows exceeds the model batch size {}",
                batch.len(),
                self.batch_size
            )));
        }

        let mut inputs: TVec<TValue> = TVec::with_capacity(self.inputs.len());
        for slot in &self.inputs {
            inputs.push(padded_input(slot.source, slot.datum, batch, self.batch_size)?.into());
        }

        let outputs = self
            .plan
            .run(inputs)
            .map_err(|e| AppError::Inference(format!("ONNX inference failed: {}", e)))?;
        let output = outputs
            .first()
            .ok_or_else(|| AppError::Inference(format!("model produced no {} output", RATING_OUTPUT)))?;

        take_ratings(output, batch.len())
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }
}
