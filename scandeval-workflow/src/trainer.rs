use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use scandeval_core::{
    CoreError, Dataset, LabelMapping, LoadedModel, ModelOutput, ModelProvider, PretrainedModel,
    Result, RunResult, Split, Tokenizer, TrainingArgs,
};

use crate::align::{ConflictPolicy, ModelAligner};
use crate::preprocess::{Collator, EncodedExample};
use crate::schedule::LinearSchedule;
use crate::task::TaskKind;

/// Fine-tunes a fresh copy of a model once per repetition and scores every run.
pub struct RepeatedRunTrainer<'a> {
    provider: &'a dyn ModelProvider,
    task: TaskKind,
    labels: &'a LabelMapping,
    args: TrainingArgs,
    aligner: ModelAligner,
}

impl<'a> RepeatedRunTrainer<'a> {
    pub fn new(
        provider: &'a dyn ModelProvider,
        task: TaskKind,
        labels: &'a LabelMapping,
        args: TrainingArgs,
        policy: ConflictPolicy,
    ) -> Result<Self> {
        let aligner = ModelAligner::new(policy).with_token_types(task.head().requires_token_types());
        Ok(Self {
            provider,
            task,
            labels,
            args: args.validated()?,
            aligner,
        })
    }

    pub fn args(&self) -> &TrainingArgs {
        &self.args
    }

    /// Runs every repetition in order. The first failure aborts the whole run.
    pub fn run(&self, model_id: &str, train: &Dataset, test: &Dataset) -> Result<Vec<RunResult>> {
        if train.is_empty() {
            return Err(CoreError::Dataset("The training split is empty".to_string()));
        }

        let mut runs = Vec::with_capacity(self.args.num_repetitions);
        for repetition in 0..self.args.num_repetitions {
            let run = self.run_once(model_id, repetition, train, test)?;
            tracing::info!(
                model_id,
                repetition,
                seed = run.seed,
                train = ?run.split(Split::Train),
                test = ?run.split(Split::Test),
                "Finished repetition"
            );
            runs.push(run);
        }
        Ok(runs)
    }

    pub fn run_once(
        &self,
        model_id: &str,
        repetition: usize,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<RunResult> {
        let seed = self.args.seed_for(repetition);
        let mut rng = StdRng::seed_from_u64(seed);

        let (mut model, mut tokenizer) =
            match self.provider.load(model_id, self.task.head(), self.labels, seed)? {
                LoadedModel::Trainable { model, tokenizer } => (model, tokenizer),
                LoadedModel::RuleBased(_) => {
                    return Err(CoreError::invalid_benchmark(format!(
                        "Model '{}' is rule-based and cannot be fine-tuned",
                        model_id
                    )))
                }
            };

        let report = self.aligner.align(model.as_mut(), tokenizer.as_mut(), &mut rng)?;
        tracing::debug!(repetition, ?report, "Aligned model and tokenizer");

        let collator = collator_for(tokenizer.as_ref(), self.task)?;
        let train_examples = self
            .task
            .encode(train, tokenizer.as_ref(), self.labels, report.max_length)?;
        let test_examples = self
            .task
            .encode(test, tokenizer.as_ref(), self.labels, report.max_length)?;

        self.fine_tune(model.as_mut(), &train_examples, &collator, &mut rng)
            .map_err(|err| incompatible(repetition, err))?;

        let mut result = RunResult::new(repetition, seed);
        for (split, dataset, examples) in [
            (Split::Train, train, &train_examples),
            (Split::Test, test, &test_examples),
        ] {
            let outputs = self
                .predict(model.as_ref(), examples, &collator)
                .map_err(|err| incompatible(repetition, err))?;
            let metrics = self
                .task
                .compute_metrics(dataset, examples, outputs, self.labels)?;
            result = result.with_split(split, metrics);
        }

        Ok(result)
    }

    fn fine_tune(
        &self,
        model: &mut dyn PretrainedModel,
        examples: &[EncodedExample],
        collator: &Collator,
        rng: &mut StdRng,
    ) -> Result<()> {
        let steps_per_epoch = examples.len().div_ceil(self.args.batch_size);
        let schedule = LinearSchedule::new(
            self.args.learning_rate,
            self.args.warmup_steps,
            steps_per_epoch * self.args.epochs,
        );

        let mut order: Vec<usize> = (0..examples.len()).collect();
        let mut step = 0;
        for epoch in 0..self.args.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;
            for chunk in order.chunks(self.args.batch_size) {
                let batch_examples: Vec<&EncodedExample> =
                    chunk.iter().map(|&index| &examples[index]).collect();
                let batch = collator.collate(&batch_examples)?;
                let learning_rate = schedule.learning_rate(step);
                let loss = model.train_step(&batch, learning_rate)?;
                tracing::trace!(step, learning_rate, loss, "Training step");
                epoch_loss += loss;
                step += 1;
            }
            tracing::debug!(
                epoch,
                mean_loss = epoch_loss / steps_per_epoch.max(1) as f64,
                "Finished epoch"
            );
        }

        Ok(())
    }

    fn predict(
        &self,
        model: &dyn PretrainedModel,
        examples: &[EncodedExample],
        collator: &Collator,
    ) -> Result<Vec<ModelOutput>> {
        let mut outputs = Vec::with_capacity(examples.len());
        for chunk in examples.chunks(self.args.batch_size) {
            let batch_examples: Vec<&EncodedExample> = chunk.iter().collect();
            let batch = collator.collate(&batch_examples)?;
            let batch_outputs = model.predict(&batch)?;
            if batch_outputs.len() != chunk.len() {
                return Err(CoreError::Model(format!(
                    "Model returned {} outputs for a batch of {}",
                    batch_outputs.len(),
                    chunk.len()
                )));
            }
            let padded_length = batch.sequence_length();
            outputs.extend(
                batch_outputs
                    .into_iter()
                    .zip(chunk)
                    .map(|(output, example)| collator.unpad(output, example.len(), padded_length)),
            );
        }
        Ok(outputs)
    }
}

fn collator_for(tokenizer: &dyn Tokenizer, task: TaskKind) -> Result<Collator> {
    let config = tokenizer.config();
    let pad_token_id = config
        .pad_token_id()
        .ok_or_else(|| CoreError::invalid_benchmark("The aligned tokenizer has no padding token"))?;
    Ok(Collator::new(
        pad_token_id,
        config.padding_side,
        task.head().requires_token_types(),
    ))
}

/// Model failures during a repetition mean the model cannot run this benchmark.
fn incompatible(repetition: usize, err: CoreError) -> CoreError {
    match err {
        CoreError::Model(msg) => CoreError::invalid_benchmark(format!(
            "Repetition {} failed: {}",
            repetition, msg
        )),
        other => other,
    }
}
