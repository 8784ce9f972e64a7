pub mod roberta;

pub use roberta::RobertaForSequenceClassification;
