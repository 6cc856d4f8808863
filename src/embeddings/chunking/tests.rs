use super::*;

/// 50 sentences of exactly 100 characters each (including the trailing
/// space), giving a 4999-character text after trimming.
fn sample_text() -> String {
    let mut text = String::new();
    for i in 0..50 {
        let mut sentence = format!("Sentence {i:04} on the laws of motion ");
        while sentence.len() < 98 {
            sentence.push('x');
        }
        sentence.push('.');
        sentence.push(' ');
        text.push_str(&sentence);
    }
    text
}

#[test]
fn blank_input_is_rejected() {
    let config = ChunkingConfig::default();

    assert!(matches!(
        make_chunks("", &config),
        Err(crate::LessonError::EmptyInput(_))
    ));
    assert!(matches!(
        make_chunks("   \n\t  ", &config),
        Err(crate::LessonError::EmptyInput(_))
    ));
}

#[test]
fn short_text_yields_single_chunk() {
    let config = ChunkingConfig::default();
    let text = "A single short paragraph, well under the minimum chunk size.";

    let chunks = make_chunks(text, &config).expect("chunking should succeed");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].index, 0);
    assert_eq!(chunks[0].text, text);
}

#[test]
fn chunk_bounds_hold_for_long_text() {
    let config = ChunkingConfig::default();
    let chunks = make_chunks(&sample_text(), &config).expect("chunking should succeed");

    // 5000 characters at size 800 / overlap 160 should land in 7-8 windows
    assert!(
        (7..=8).contains(&chunks.len()),
        "expected 7-8 chunks, got {}",
        chunks.len()
    );

    for chunk in &chunks[..chunks.len() - 1] {
        assert!(
            (config.chunk_min..=config.chunk_max).contains(&chunk.text.len()),
            "chunk {} has out-of-bounds length {}",
            chunk.index,
            chunk.text.len()
        );
    }

    // Indexes are consecutive from zero
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
    }
}

#[test]
fn consecutive_chunks_overlap() {
    let config = ChunkingConfig::default();
    let chunks = make_chunks(&sample_text(), &config).expect("chunking should succeed");

    for pair in chunks.windows(2) {
        let tail = &pair[0].text[pair[0].text.len() - config.chunk_overlap..];
        let head = &pair[1].text[..config.chunk_overlap];
        assert_eq!(tail, head, "overlap mismatch between consecutive chunks");
    }
}

#[test]
fn overlap_removed_reconstructs_source() {
    let config = ChunkingConfig::default();
    let text = sample_text();
    let normalized = text.trim().to_string();

    let chunks = make_chunks(&text, &config).expect("chunking should succeed");

    let mut rebuilt = chunks[0].text.clone();
    for chunk in &chunks[1..] {
        rebuilt.push_str(&chunk.text[config.chunk_overlap..]);
    }

    assert_eq!(rebuilt, normalized);
}

#[test]
fn cuts_prefer_sentence_boundaries() {
    let config = ChunkingConfig::default();
    let chunks = make_chunks(&sample_text(), &config).expect("chunking should succeed");

    // Every non-final cut in the sample text has a sentence end in reach
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(
            chunk.text.ends_with('.'),
            "chunk {} did not snap to a sentence end: ...{:?}",
            chunk.index,
            &chunk.text[chunk.text.len() - 10..]
        );
    }
}

#[test]
fn multibyte_text_does_not_panic() {
    let config = ChunkingConfig::default();
    let sentence = "Électricité et magnétisme régis par les équations de Maxwell à étudier. ";
    let text = sentence.repeat(60);

    let chunks = make_chunks(&text, &config).expect("chunking should succeed");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(!chunk.text.is_empty());
        assert!(chunk.text.len() <= config.chunk_max);
    }
}

#[test]
fn crlf_input_is_normalized() {
    let config = ChunkingConfig::default();
    let chunks =
        make_chunks("First line.\r\nSecond line.\r\n", &config).expect("chunking should succeed");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "First line.\nSecond line.");
}
