//! k-fold cross-validation and the single train/test run.

use std::ops::Range;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::logistic_regression::LogisticRegression;
use crate::record::PatientRecord;

/// What happens to the coefficients when cross-validation moves to the next fold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldPolicy {
    /// Every fold starts from zeroed coefficients.
    #[default]
    Isolated,
    /// Each fold keeps training the coefficients left by the previous one.
    Cumulative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossValidationOptions {
    pub folds: usize,
    pub iterations: usize,
    pub policy: FoldPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationReport {
    pub fold_accuracies: Vec<f64>,
    pub fold_size: usize,
    pub mean_accuracy: f64,
}

/// Contiguous test ranges of `len / folds` rows each.
///
/// Rows past `folds * fold_size` never land in a test range.
pub fn fold_ranges(len: usize, folds: usize) -> Result<Vec<Range<usize>>, ModelError> {
    if folds < 2 || folds > len {
        return Err(ModelError::FoldCount { folds, rows: len });
    }

    let fold_size = len / folds;
    Ok((0..folds)
        .map(|fold| fold * fold_size..(fold + 1) * fold_size)
        .collect())
}

/// Splits `records` into the rows outside `test` and the rows inside it.
///
/// Returns `None` when `test` does not lie within `records`.
pub fn split_fold(
    records: &[PatientRecord],
    test: Range<usize>,
) -> Option<(Vec<PatientRecord>, Vec<PatientRecord>)> {
    let held_out = records.get(test.clone())?.to_vec();

    let mut train = Vec::with_capacity(records.len() - held_out.len());
    train.extend_from_slice(&records[..test.start]);
    train.extend_from_slice(&records[test.end..]);

    Some((train, held_out))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Shuffles a copy of `records` once, then trains and evaluates on each fold.
pub fn cross_validate<R: Rng + ?Sized>(
    model: &mut LogisticRegression,
    records: &[PatientRecord],
    options: &CrossValidationOptions,
    rng: &mut R,
) -> Result<CrossValidationReport, ModelError> {
    let ranges = fold_ranges(records.len(), options.folds)?;
    let fold_size = ranges.first().map_or(0, |range| range.len());

    let mut shuffled = records.to_vec();
    shuffled.shuffle(rng);

    let mut fold_accuracies = Vec::with_capacity(ranges.len());
    for (fold, range) in ranges.into_iter().enumerate() {
        let (train, test) = split_fold(&shuffled, range).ok_or(ModelError::FoldCount {
            folds: options.folds,
            rows: records.len(),
        })?;

        if options.policy == FoldPolicy::Isolated {
            model.reset();
        }
        model.fit(&train, options.iterations)?;
        let accuracy = model.accuracy(&test)?;

        tracing::info!(
            fold = fold + 1,
            accuracy,
            "Accuracy for fold {}: {accuracy}",
            fold + 1
        );
        fold_accuracies.push(accuracy);
    }

    let mean_accuracy = mean(&fold_accuracies).unwrap_or_default();
    tracing::info!(
        mean_accuracy,
        "Mean accuracy for validation: {mean_accuracy}"
    );

    Ok(CrossValidationReport {
        fold_accuracies,
        fold_size,
        mean_accuracy,
    })
}

/// Trains on `train` then reports accuracy on `test`.
///
/// Both sets are checked before training so a bad test set leaves the
/// coefficients untouched.
pub fn train_test(
    model: &mut LogisticRegression,
    train: &[PatientRecord],
    test: &[PatientRecord],
    iterations: usize,
) -> Result<f64, ModelError> {
    ensure_test_rows(test)?;
    model.fit(train, iterations)?;
    evaluate_holdout(model, test)
}

/// [`train_test`] that also returns the mean log-loss after every pass.
pub fn train_test_with_loss_history(
    model: &mut LogisticRegression,
    train: &[PatientRecord],
    test: &[PatientRecord],
    iterations: usize,
) -> Result<(f64, Vec<f64>), ModelError> {
    ensure_test_rows(test)?;
    let losses = model.fit_with_loss_history(train, iterations)?;
    let accuracy = evaluate_holdout(model, test)?;
    Ok((accuracy, losses))
}

fn ensure_test_rows(test: &[PatientRecord]) -> Result<(), ModelError> {
    if test.is_empty() {
        return Err(ModelError::EmptyDataset {
            operation: "evaluate",
        });
    }
    Ok(())
}

fn evaluate_holdout(model: &LogisticRegression, test: &[PatientRecord]) -> Result<f64, ModelError> {
    let accuracy = model.accuracy(test)?;
    tracing::info!(accuracy, "Model accuracy: {accuracy}");
    Ok(accuracy)
}
