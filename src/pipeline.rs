//! One full run: load both datasets, cross-validate, then train and test.

use std::fmt;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{DataSettings, Settings, SourceKind};
use crate::database::SqliteSource;
use crate::error::AppError;
use crate::journal::ErrorJournal;
use crate::logistic_regression::LogisticRegression;
use crate::parse::CsvSource;
use crate::plot::plot_loss_curve;
use crate::source::{load_dataset, RowSource, SourceError};
use crate::validation::{
    cross_validate, train_test, train_test_with_loss_history, CrossValidationOptions,
    CrossValidationReport,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub cross_validation: CrossValidationReport,
    pub holdout_accuracy: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.cross_validation;
        for (fold, accuracy) in report.fold_accuracies.iter().enumerate() {
            writeln!(f, "Accuracy for fold {}: {accuracy}", fold + 1)?;
        }
        writeln!(f, "Mean accuracy for validation: {}", report.mean_accuracy)?;
        write!(f, "Model accuracy: {}", self.holdout_accuracy)
    }
}

/// Opens the configured source at `path`, verifying table schemas up front.
pub fn open_source(data: &DataSettings, path: &Path) -> Result<Box<dyn RowSource>, SourceError> {
    match data.kind {
        SourceKind::Sqlite => {
            let source = SqliteSource::open(path, &data.table)?;
            source.verify_schema()?;
            tracing::debug!(path = %source.path().display(), "table schema verified");
            Ok(Box::new(source))
        }
        SourceKind::Csv => Ok(Box::new(CsvSource::open(path)?)),
    }
}

pub fn run(settings: &Settings) -> Result<RunSummary, AppError> {
    let training = &settings.training;

    let train_source = open_source(&settings.data, &settings.data.train)?;
    let test_source = open_source(&settings.data, &settings.data.test)?;
    tracing::info!("Database opened successfully.");

    let train_rows = load_dataset(train_source.as_ref())?;
    let test_rows = load_dataset(test_source.as_ref())?;
    tracing::info!(
        train_rows = train_rows.len(),
        test_rows = test_rows.len(),
        "datasets loaded"
    );

    let mut rng = match training.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut model = LogisticRegression::new(training.learning_rate, training.wiring)?;
    tracing::info!(
        learning_rate = model.learning_rate(),
        wiring = ?model.wiring(),
        iterations = training.iterations,
        folds = training.folds,
        "training logistic regression"
    );
    let options = CrossValidationOptions {
        folds: training.folds,
        iterations: training.iterations,
        policy: training.fold_policy,
    };
    let cross_validation = cross_validate(&mut model, &train_rows, &options, &mut rng)?;

    if training.reset_before_holdout {
        model.reset();
    }

    let holdout_accuracy = match &settings.report.loss_plot {
        Some(plot_path) => {
            let (accuracy, losses) = train_test_with_loss_history(
                &mut model,
                &train_rows,
                &test_rows,
                training.iterations,
            )?;
            if let Err(error) = plot_loss_curve(plot_path, &losses) {
                tracing::warn!(path = %plot_path.display(), "loss curve not written: {error}");
            }
            accuracy
        }
        None => train_test(&mut model, &train_rows, &test_rows, training.iterations)?,
    };

    Ok(RunSummary {
        cross_validation,
        holdout_accuracy,
    })
}

/// [`run`], recording any failure in `journal` before handing it back.
pub fn run_and_journal(
    settings: &Settings,
    journal: &ErrorJournal,
) -> Result<RunSummary, AppError> {
    run(settings).inspect_err(|error| journal.record(&error.to_string()))
}
