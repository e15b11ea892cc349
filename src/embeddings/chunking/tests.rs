use super::*;

const RESUME_TEXT: &str = "Led a team of five engineers building a payments platform. \
    Reduced checkout latency by forty percent! Migrated the monolith to services. \
    Mentored two interns through their first production launch?";

#[test]
fn empty_and_whitespace_input() {
    assert!(chunk_text("", 150).is_empty());
    assert!(chunk_text("   \n\t  ", 150).is_empty());
}

#[test]
fn short_text_is_single_chunk() {
    let chunks = chunk_text("Short note.", 150);
    assert_eq!(chunks, vec!["Short note.".to_string()]);
}

#[test]
fn split_sentences_on_terminal_punctuation() {
    let sentences = split_sentences("First sentence here. Second one! Third?");
    assert_eq!(
        sentences,
        vec![
            "First sentence here.".to_string(),
            "Second one!".to_string(),
            "Third?".to_string(),
        ]
    );
}

#[test]
fn split_sentences_handles_newlines_and_decimals() {
    let sentences = split_sentences("Version 2.5 shipped.\nIt was fast.");
    assert_eq!(
        sentences,
        vec!["Version 2.5 shipped.".to_string(), "It was fast.".to_string()]
    );
}

#[test]
fn split_sentences_after_closing_quote() {
    let sentences = split_sentences("She said \"stop.\" Then she left.");
    assert_eq!(
        sentences,
        vec!["She said \"stop.\"".to_string(), "Then she left.".to_string()]
    );
}

#[test]
fn abbreviations_do_not_end_sentences() {
    let sentences = split_sentences("Dr. Smith joined in 2020. He leads the team, e.g. hiring.");
    assert_eq!(
        sentences,
        vec![
            "Dr. Smith joined in 2020.".to_string(),
            "He leads the team, e.g. hiring.".to_string(),
        ]
    );
}

#[test]
fn dotted_initialisms_do_not_end_sentences() {
    let sentences =
        split_sentences("She moved to the U.S. in 2010. She earned a Ph.D. at MIT. Visit example.com. Done.");
    assert_eq!(
        sentences,
        vec![
            "She moved to the U.S. in 2010.".to_string(),
            "She earned a Ph.D. at MIT.".to_string(),
            "Visit example.com.".to_string(),
            "Done.".to_string(),
        ]
    );
}

#[test]
fn sentences_accumulate_up_to_max_words() {
    let chunks = chunk_text("First sentence here. Second one! Third?", 4);
    assert_eq!(
        chunks,
        vec![
            "First sentence here.".to_string(),
            "Second one! Third?".to_string(),
        ]
    );
}

#[test]
fn oversized_sentence_is_kept_whole() {
    let chunks = chunk_text("Hi. One two three four five six. Bye.", 3);
    assert_eq!(
        chunks,
        vec![
            "Hi.".to_string(),
            "One two three four five six.".to_string(),
            "Bye.".to_string(),
        ]
    );
}

#[test]
fn chunks_respect_word_budget_unless_single_sentence() {
    for max_words in [1, 5, 10, 20, 150] {
        for chunk in chunk_text(RESUME_TEXT, max_words) {
            let sentences = split_sentences(&chunk);
            assert!(
                count_words(&chunk) <= max_words || sentences.len() == 1,
                "chunk {:?} exceeds {} words with {} sentences",
                chunk,
                max_words,
                sentences.len()
            );
        }
    }
}

#[test]
fn rejoined_chunks_reproduce_sentence_sequence() {
    let expected = split_sentences(RESUME_TEXT).join(" ");
    for max_words in [1, 3, 8, 12, 50, 150] {
        let chunks = chunk_text(RESUME_TEXT, max_words);
        assert_eq!(chunks.join(" "), expected, "max_words = {}", max_words);
    }
}

#[test]
fn chunks_never_end_mid_sentence() {
    for chunk in chunk_text(RESUME_TEXT, 7) {
        let last = chunk.chars().last().expect("chunk should not be empty");
        assert!(matches!(last, '.' | '!' | '?'), "chunk {:?}", chunk);
    }
}

#[test]
fn text_without_terminal_punctuation_is_one_sentence() {
    let chunks = chunk_text("python, rust, kubernetes, postgres", 2);
    assert_eq!(chunks, vec!["python, rust, kubernetes, postgres".to_string()]);
}

#[test]
fn config_chunk_uses_max_words() {
    let config = ChunkingConfig { max_words: 4 };
    assert_eq!(config.chunk("First sentence here. Second one! Third?").len(), 2);
    assert_eq!(ChunkingConfig::default().max_words, DEFAULT_MAX_WORDS);
}

#[test]
fn count_words_splits_on_any_whitespace() {
    assert_eq!(count_words("hello world"), 2);
    assert_eq!(count_words("  a\tb\nc  "), 3);
    assert_eq!(count_words(""), 0);
}
