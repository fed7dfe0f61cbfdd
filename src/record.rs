use serde::Deserialize;

pub const FEATURE_COUNT: usize = 13;

/// Column order shared by the SQLite table and CSV files, label last.
pub const COLUMN_NAMES: [&str; FEATURE_COUNT + 1] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal", "target",
];

/// Position of `oldpeak`, the only real-valued measurement, inside [`PatientRecord::features`].
pub const OLDPEAK_INDEX: usize = 9;

/// One row of the heart-disease table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PatientRecord {
    pub age: i32,
    pub sex: i32,
    /// chest pain type
    pub cp: i32,
    /// resting blood pressure
    pub trestbps: i32,
    /// serum cholesterol
    pub chol: i32,
    /// fasting blood sugar above 120 mg/dl
    pub fbs: i32,
    pub restecg: i32,
    /// maximum heart rate achieved
    pub thalach: i32,
    /// exercise induced angina
    pub exang: i32,
    /// ST depression induced by exercise relative to rest
    pub oldpeak: f64,
    pub slope: i32,
    /// number of major vessels colored by fluoroscopy
    pub ca: i32,
    pub thal: i32,
    /// 1 if heart disease is present, 0 otherwise
    pub target: i32,
}

impl PatientRecord {
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age as f64,
            self.sex as f64,
            self.cp as f64,
            self.trestbps as f64,
            self.chol as f64,
            self.fbs as f64,
            self.restecg as f64,
            self.thalach as f64,
            self.exang as f64,
            self.oldpeak,
            self.slope as f64,
            self.ca as f64,
            self.thal as f64,
        ]
    }

    pub fn label(&self) -> f64 {
        self.target as f64
    }
}

#[cfg(test)]
pub(crate) fn record(values: [f64; FEATURE_COUNT], target: i32) -> PatientRecord {
    #[allow(clippy::cast_possible_truncation)]
    let int = |index: usize| values[index] as i32;

    PatientRecord {
        age: int(0),
        sex: int(1),
        cp: int(2),
        trestbps: int(3),
        chol: int(4),
        fbs: int(5),
        restecg: int(6),
        thalach: int(7),
        exang: int(8),
        oldpeak: values[OLDPEAK_INDEX],
        slope: int(10),
        ca: int(11),
        thal: int(12),
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_follow_column_order() {
        let values = [
            45.0, 1.0, 3.0, 120.0, 240.0, 0.0, 1.0, 150.0, 0.0, 2.5, 1.0, 0.0, 2.0,
        ];
        let sample = record(values, 1);

        let features = sample.features();
        assert_eq!(features[0], 45.0);
        assert_eq!(features[4], 240.0);
        assert_eq!(features[OLDPEAK_INDEX], 2.5);
        assert_eq!(features[12], 2.0);
        assert_eq!(sample.label(), 1.0);
        assert_eq!(COLUMN_NAMES[OLDPEAK_INDEX], "oldpeak");
        assert_eq!(COLUMN_NAMES[FEATURE_COUNT], "target");
    }
}
