use rtiqa_answer::{Synthesizer, CITATION_TAG, UNPARSEABLE_CONTENT_MESSAGE};
use rtiqa_core::config::SynthesisConfig;

#[test]
fn blocklisted_sentences_are_excluded_from_the_answer() {
    let synth = Synthesizer::default();
    let chunks = [
        "Section 4 of the Act establishes the right to information for all citizens.",
        "Government of India Ministry modified up to 2010.",
    ];
    let answer = synth.synthesize(&chunks, "what is the right to information");
    assert_eq!(
        answer,
        "Based on the RTI Act:\n\nSection the Act establishes the right information for all citizens.\n\n[Source: RTI Act document sections]"
    );
    assert!(!answer.to_lowercase().contains("ministry"));
}

#[test]
fn overlapping_chunks_contribute_a_sentence_once() {
    let synth = Synthesizer::default();
    let chunks = [
        "The Act grants every citizen the right to information. Public authority must respond.",
        "Public authority must respond. Appeals go to section nineteen authority.",
    ];
    let answer = synth.synthesize(&chunks, "who must respond");
    assert_eq!(answer.matches("Public authority must respond").count(), 1);
    assert!(answer.contains("The Act grants every citizen the right information. Public authority must respond. Appeals section nineteen authority."));
    assert!(answer.ends_with(CITATION_TAG));
}

#[test]
fn empty_retrieval_yields_the_fallback() {
    let synth = Synthesizer::default();
    let none: [&str; 0] = [];
    let answer = synth.synthesize(&none, "anything");
    assert!(answer.starts_with(UNPARSEABLE_CONTENT_MESSAGE));
    assert!(answer.ends_with(CITATION_TAG));
}

#[test]
fn noise_only_text_yields_the_fallback() {
    let synth = Synthesizer::default();
    let answer = synth.synthesize(&["@@@ ### ~~~ 12 ab. cd ef."], "anything");
    assert!(answer.starts_with(UNPARSEABLE_CONTENT_MESSAGE));
}

#[test]
fn answers_hold_at_most_three_sentences() {
    let synth = Synthesizer::default();
    let text = "First section covers the right. Second section covers the right. Third section covers the right. Fourth section covers the right.";
    let answer = synth.synthesize(&[text], "sections");
    assert!(answer.contains("Third section covers the right."));
    assert!(!answer.contains("Fourth"));
}

#[test]
fn synthesis_is_deterministic() {
    let synth = Synthesizer::default();
    let chunks = vec![
        "Every public authority shall maintain records. The Central Information Commission hears appeals.".to_string(),
        "Information means any material in any form. The right extends to inspection of work.".to_string(),
    ];
    assert_eq!(synth.synthesize(&chunks, "q"), synth.synthesize(&chunks, "q"));
}

#[test]
fn vocabulary_is_configurable() {
    let config = SynthesisConfig {
        keywords: vec!["appeal".to_string()],
        blocklist: vec![],
        ..SynthesisConfig::default()
    };
    let synth = Synthesizer::new(&config);
    let answer = synth.synthesize(&["The right information exists here. First appeal lies with the officer."], "appeal");
    assert!(answer.contains("First appeal lies with the officer."));
    assert!(!answer.contains("exists here"));
}
