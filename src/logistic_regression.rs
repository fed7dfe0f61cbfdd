use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::record::{PatientRecord, FEATURE_COUNT, OLDPEAK_INDEX};

/// Probabilities are kept this far away from 0 and 1 before taking a logarithm.
const PROBABILITY_EPSILON: f64 = 1e-15;
const DECISION_THRESHOLD: f64 = 0.5;

/// Which record fields contribute to the linear score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureWiring {
    /// Bias plus all thirteen features.
    #[default]
    All,
    /// Bias plus every feature except `oldpeak`, which is never scored.
    SkipOldpeak,
}

impl FeatureWiring {
    /// Number of features multiplied into the score.
    pub fn width(self) -> usize {
        match self {
            Self::All => FEATURE_COUNT,
            Self::SkipOldpeak => FEATURE_COUNT - 1,
        }
    }

    /// Feature vector with a leading constant 1.0 for the bias coefficient.
    ///
    /// Slots past `width() + 1` stay zero.
    fn inputs(self, record: &PatientRecord) -> [f64; FEATURE_COUNT + 1] {
        let mut inputs = [0.0; FEATURE_COUNT + 1];
        inputs[0] = 1.0;

        let mut slot = 1;
        for (index, value) in record.features().into_iter().enumerate() {
            if self == Self::SkipOldpeak && index == OLDPEAK_INDEX {
                continue;
            }
            inputs[slot] = value;
            slot += 1;
        }

        inputs
    }

    /// The slots of `inputs` that line up with the coefficients.
    fn active(self, inputs: &[f64; FEATURE_COUNT + 1]) -> ArrayView1<'_, f64> {
        ArrayView1::from(&inputs[..=self.width()])
    }
}

/// Logistic function evaluated without overflowing for large `|z|`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

/// Binary logistic regression trained with per-sample gradient descent.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Array1<f64>,
    learning_rate: f64,
    wiring: FeatureWiring,
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, wiring: FeatureWiring) -> Result<Self, ModelError> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(ModelError::InvalidLearningRate(learning_rate));
        }

        Ok(Self {
            coefficients: Array1::zeros(wiring.width() + 1),
            learning_rate,
            wiring,
        })
    }

    /// Bias first, then one weight per wired feature in record order.
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn wiring(&self) -> FeatureWiring {
        self.wiring
    }

    /// Zeroes every coefficient, as if the model had just been constructed.
    pub fn reset(&mut self) {
        self.coefficients.fill(0.0);
    }

    pub fn score(&self, record: &PatientRecord) -> f64 {
        let inputs = self.wiring.inputs(record);
        self.wiring.active(&inputs).dot(&self.coefficients)
    }

    pub fn predict_proba(&self, record: &PatientRecord) -> f64 {
        sigmoid(self.score(record))
    }

    pub fn predict(&self, record: &PatientRecord) -> i32 {
        if self.predict_proba(record) >= DECISION_THRESHOLD {
            1
        } else {
            0
        }
    }

    /// Negative log-likelihood of a single record.
    pub fn log_loss(&self, record: &PatientRecord) -> f64 {
        let probability = self.predict_proba(record);
        let probability = probability.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
        let label = record.label();

        -label * probability.ln() - (1.0 - label) * (1.0 - probability).ln()
    }

    pub fn mean_log_loss(&self, records: &[PatientRecord]) -> Result<f64, ModelError> {
        ensure_not_empty(records, "compute log-loss")?;

        let total: f64 = records.iter().map(|record| self.log_loss(record)).sum();
        Ok(total / records.len() as f64)
    }

    /// Moves every coefficient against the error of one record.
    ///
    /// The error is computed once from the coefficients as they were before
    /// the call; the bias is updated with an implicit input of 1.0.
    pub fn gradient_step(&mut self, record: &PatientRecord) {
        let buffer = self.wiring.inputs(record);
        let inputs = self.wiring.active(&buffer);
        let error = sigmoid(inputs.dot(&self.coefficients)) - record.label();

        self.coefficients.scaled_add(-self.learning_rate * error, &inputs);
    }

    /// Runs `number_of_epochs` in-order passes over `records`.
    pub fn fit(
        &mut self,
        records: &[PatientRecord],
        number_of_epochs: usize,
    ) -> Result<(), ModelError> {
        ensure_not_empty(records, "train")?;

        for _ in 0..number_of_epochs {
            self.epoch(records);
        }

        Ok(())
    }

    /// Same as [`Self::fit`], returning the mean log-loss after each pass.
    pub fn fit_with_loss_history(
        &mut self,
        records: &[PatientRecord],
        number_of_epochs: usize,
    ) -> Result<Vec<f64>, ModelError> {
        ensure_not_empty(records, "train")?;

        let mut losses = Vec::with_capacity(number_of_epochs);
        for _ in 0..number_of_epochs {
            self.epoch(records);
            losses.push(self.mean_log_loss(records)?);
        }

        Ok(losses)
    }

    /// Fraction of records whose thresholded prediction matches the label.
    pub fn accuracy(&self, records: &[PatientRecord]) -> Result<f64, ModelError> {
        ensure_not_empty(records, "evaluate")?;

        let correct_predictions = records
            .iter()
            .filter(|record| self.predict(record) == record.target)
            .count();

        Ok(correct_predictions as f64 / records.len() as f64)
    }

    fn epoch(&mut self, records: &[PatientRecord]) {
        for record in records {
            self.gradient_step(record);
        }
    }
}

fn ensure_not_empty(records: &[PatientRecord], operation: &'static str) -> Result<(), ModelError> {
    if records.is_empty() {
        return Err(ModelError::EmptyDataset { operation });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;

    fn chest_pain(cp: f64, target: i32) -> PatientRecord {
        let mut values = [0.0; FEATURE_COUNT];
        values[2] = cp;
        record(values, target)
    }

    fn patient(target: i32) -> PatientRecord {
        let values = [
            45.0, 1.0, 3.0, 120.0, 240.0, 0.0, 1.0, 150.0, 0.0, 2.0, 1.0, 0.0, 2.0,
        ];
        record(values, target)
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
        for z in [-1e6, -745.0, -30.0, 30.0, 745.0, 1e6] {
            let probability = sigmoid(z);
            assert!(probability.is_finite());
            assert!((0.0..=1.0).contains(&probability));
        }
        assert!(sigmoid(-1e6) < 1e-300);
        assert!(sigmoid(1e6) > 1.0 - 1e-12);
    }

    #[test]
    fn inputs_lead_with_bias_then_wired_features() {
        let sample = patient(1);
        let features = sample.features();

        let all = FeatureWiring::All.inputs(&sample);
        assert_eq!(all[0], 1.0);
        assert_eq!(all[1..], features[..]);
        assert_eq!(FeatureWiring::All.active(&all).len(), FEATURE_COUNT + 1);

        let skipped = FeatureWiring::SkipOldpeak.inputs(&sample);
        assert_eq!(skipped[0], 1.0);
        assert_eq!(skipped[1..=OLDPEAK_INDEX], features[..OLDPEAK_INDEX]);
        let rest = OLDPEAK_INDEX + 1;
        assert_eq!(skipped[rest..FEATURE_COUNT], features[rest..]);
        assert_eq!(skipped[FEATURE_COUNT], 0.0);
        let active = FeatureWiring::SkipOldpeak.active(&skipped);
        assert_eq!(active.len(), FEATURE_COUNT);
    }

    #[test]
    fn score_matches_hand_computed_dot_product() {
        let mut model = LogisticRegression::new(0.01, FeatureWiring::SkipOldpeak).unwrap();
        model.fit(&[patient(1), patient(0)], 3).unwrap();
        let sample = patient(1);

        let coefficients = model.coefficients();
        let mut expected = coefficients[0];
        let mut slot = 1;
        for (index, value) in sample.features().into_iter().enumerate() {
            if index != OLDPEAK_INDEX {
                expected += coefficients[slot] * value;
                slot += 1;
            }
        }

        assert!((model.score(&sample) - expected).abs() < 1e-9);
    }

    #[test]
    fn score_is_deterministic() {
        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        model.gradient_step(&patient(1));
        model.gradient_step(&patient(0));

        let sample = patient(1);
        let first = model.score(&sample);
        for _ in 0..10 {
            assert_eq!(model.score(&sample).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn step_uses_single_pre_update_error() {
        let mut model = LogisticRegression::new(0.1, FeatureWiring::All).unwrap();
        let sample = patient(1);
        model.gradient_step(&sample);

        // zero coefficients predict 0.5, so the error is -0.5 for every slot
        let expected_bias = 0.1 * 0.5;
        assert!((model.coefficients()[0] - expected_bias).abs() < 1e-12);
        for (index, value) in sample.features().iter().enumerate() {
            let expected = 0.1 * 0.5 * value;
            assert!((model.coefficients()[index + 1] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn step_moves_against_error_sign() {
        let sample = patient(0);
        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        model.gradient_step(&sample);
        for (index, value) in sample.features().iter().enumerate() {
            let coefficient = model.coefficients()[index + 1];
            if *value > 0.0 {
                assert!(coefficient < 0.0, "slot {index} should decrease");
            } else {
                assert_eq!(coefficient, 0.0);
            }
        }

        let sample = patient(1);
        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        model.gradient_step(&sample);
        for (index, value) in sample.features().iter().enumerate() {
            if *value > 0.0 {
                assert!(
                    model.coefficients()[index + 1] > 0.0,
                    "slot {index} should increase"
                );
            }
        }
    }

    #[test]
    fn skip_oldpeak_never_scores_oldpeak() {
        let mut model = LogisticRegression::new(0.01, FeatureWiring::SkipOldpeak).unwrap();
        assert_eq!(model.coefficients().len(), FEATURE_COUNT);

        model.fit(&[patient(1), patient(0)], 5).unwrap();
        let mut changed = patient(1);
        changed.oldpeak = 100.0;
        let unchanged = model.score(&patient(1));
        assert_eq!(model.score(&changed).to_bits(), unchanged.to_bits());

        let full = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        assert_eq!(full.coefficients().len(), FEATURE_COUNT + 1);
    }

    #[test]
    fn log_loss_is_finite_when_probability_saturates() {
        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        model.coefficients.fill(10.0);

        let sample = patient(0);
        assert!((model.predict_proba(&sample) - 1.0).abs() < f64::EPSILON);
        let loss = model.log_loss(&sample);
        assert!(loss.is_finite());
        assert!(loss > 30.0);
    }

    #[test]
    fn empty_dataset_is_rejected_without_mutation() {
        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        model.gradient_step(&patient(1));
        let before = model.coefficients().clone();

        assert_eq!(
            model.fit(&[], 10),
            Err(ModelError::EmptyDataset { operation: "train" })
        );
        assert_eq!(
            model.accuracy(&[]),
            Err(ModelError::EmptyDataset {
                operation: "evaluate"
            })
        );
        assert!(model.fit_with_loss_history(&[], 3).is_err());
        assert_eq!(model.coefficients(), &before);
    }

    #[test]
    fn rejects_invalid_learning_rate() {
        for rate in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(LogisticRegression::new(rate, FeatureWiring::All).is_err());
        }
    }

    #[test]
    fn reset_restores_zero_coefficients() {
        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        model.fit(&[patient(1), patient(0)], 3).unwrap();
        assert!(model.coefficients().iter().any(|&c| c != 0.0));

        model.reset();
        assert!(model.coefficients().iter().all(|&c| c == 0.0));
        assert_eq!(model.coefficients().len(), FEATURE_COUNT + 1);
    }

    #[test]
    fn converges_on_separable_clusters() {
        let train = [
            chest_pain(0.0, 0),
            chest_pain(1.0, 0),
            chest_pain(0.0, 0),
            chest_pain(1.0, 0),
            chest_pain(3.0, 1),
            chest_pain(4.0, 1),
            chest_pain(3.0, 1),
            chest_pain(4.0, 1),
        ];
        let test = [
            chest_pain(0.0, 0),
            chest_pain(1.0, 0),
            chest_pain(4.0, 1),
            chest_pain(3.0, 1),
        ];

        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        model.fit(&train, 10_000).unwrap();

        assert!((model.accuracy(&test).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn loss_history_decreases_on_separable_data() {
        let train = [
            chest_pain(0.0, 0),
            chest_pain(1.0, 0),
            chest_pain(3.0, 1),
            chest_pain(4.0, 1),
        ];

        let mut model = LogisticRegression::new(0.01, FeatureWiring::All).unwrap();
        let losses = model.fit_with_loss_history(&train, 200).unwrap();

        assert_eq!(losses.len(), 200);
        assert!(losses.iter().all(|loss| loss.is_finite()));
        assert!(losses[199] < losses[0]);
    }
}
