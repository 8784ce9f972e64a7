//! Fixed sample sets for regression and drift checks.

use super::LabeledSample;
use crate::core::Sentiment;

/// Unambiguous sentences any acceptable model must get right.
pub const GOLDEN_SET: [(&str, Sentiment); 5] = [
    ("I absolutely love this product, it is amazing!", Sentiment::Positive),
    ("Worst experience ever, I hate it.", Sentiment::Negative),
    ("The package arrived on Tuesday.", Sentiment::Neutral),
    ("Excellent service and great quality.", Sentiment::Positive),
    ("Disgusting food and rude staff.", Sentiment::Negative),
];

/// Hard cases (sarcasm, double negation, understatement) seen in production.
pub const FLAGGED_SET: [(&str, Sentiment); 4] = [
    ("This new feature is kinda meh", Sentiment::Negative),
    ("I'm not NOT happy with this.", Sentiment::Positive),
    (
        "Wow, MachineInnovators is on another level! #sarcasm",
        Sentiment::Negative,
    ),
    (
        "Just love waiting 2 hours for customer support.",
        Sentiment::Negative,
    ),
];

pub fn golden_samples() -> Vec<LabeledSample> {
    GOLDEN_SET
        .iter()
        .map(|(text, label)| LabeledSample::new(*text, *label))
        .collect()
}

pub fn flagged_samples() -> Vec<LabeledSample> {
    FLAGGED_SET
        .iter()
        .map(|(text, label)| LabeledSample::new(*text, *label))
        .collect()
}
