// Integration tests for the sentiment analysis pipeline against the base model.
// These download the model from the Hugging Face Hub; run with `--ignored`.

use sentiment_loop::evaluation::golden::GOLDEN_SET;
use sentiment_loop::pipelines::sentiment_analysis_pipeline::*;
use sentiment_loop::Sentiment;

#[test]
#[ignore = "downloads the base model from the Hugging Face Hub"]
fn golden_set_regression() -> anyhow::Result<()> {
    let pipeline = SentimentAnalysisPipelineBuilder::base().cpu().build()?;
    for (text, expected) in GOLDEN_SET {
        let res = pipeline.predict(text)?;
        assert_eq!(res.label, expected, "{text:?} scored {:?}", res.scores);
    }
    Ok(())
}

#[test]
#[ignore = "downloads the base model from the Hugging Face Hub"]
fn edge_inputs_are_well_formed() -> anyhow::Result<()> {
    let pipeline = SentimentAnalysisPipelineBuilder::base().cpu().build()?;
    let long = "a".repeat(512);
    let inputs = ["", "   ", "1234567890", "😀🎉🔥", long.as_str()];

    let results = pipeline.predict_batch(&inputs)?;
    assert_eq!(results.len(), inputs.len());
    for res in results {
        assert!((0.0..=1.0).contains(&res.confidence));
        assert!(res.label.as_str().parse::<Sentiment>().is_ok());
    }
    Ok(())
}
