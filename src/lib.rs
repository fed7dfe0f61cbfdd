pub mod config;
pub mod database;
pub mod error;
pub mod journal;
pub mod logging;
pub mod logistic_regression;
pub mod parse;
pub mod pipeline;
pub mod plot;
pub mod record;
pub mod source;
pub mod validation;
