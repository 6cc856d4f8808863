use super::*;

fn hit(id: &str, text: Option<&str>) -> RetrievalHit {
    RetrievalHit {
        id: id.to_string(),
        score: 0.5,
        text: text.map(str::to_string),
    }
}

#[test]
fn no_usable_hits_yields_header_only() {
    assert_eq!(pack_context(&[], 6000), "CONTEXT SNIPPETS:");

    let hits = vec![hit("a", None), hit("b", Some("   "))];
    assert_eq!(pack_context(&hits, 6000), "CONTEXT SNIPPETS:");
}

#[test]
fn first_snippet_survives_a_tiny_budget() {
    let hits = vec![
        hit("a", Some("a snippet much longer than one character")),
        hit("b", Some("never reached")),
    ];

    let context = pack_context(&hits, 1);

    assert!(context.contains("a snippet much longer than one character"));
    assert!(!context.contains("never reached"));
}

#[test]
fn budget_cuts_off_later_snippets() {
    let hits = vec![
        hit("a", Some("x".repeat(40).as_str())),
        hit("b", Some("y".repeat(40).as_str())),
        hit("c", Some("z".repeat(40).as_str())),
    ];

    let context = pack_context(&hits, 90);

    assert!(context.contains(&"x".repeat(40)));
    assert!(context.contains(&"y".repeat(40)));
    assert!(!context.contains(&"z".repeat(40)));
}

#[test]
fn snippets_keep_hit_order() {
    let hits = vec![
        hit("a", Some("first snippet")),
        hit("b", Some("second snippet")),
    ];

    let context = pack_context(&hits, 6000);

    let first = context.find("first snippet").expect("first present");
    let second = context.find("second snippet").expect("second present");
    assert!(first < second);
}

#[test]
fn chunk_ids_never_leak_into_the_block() {
    let hits = vec![hit("video:abc123:0", Some("content about gravity"))];

    let context = pack_context(&hits, 6000);

    assert!(context.contains("content about gravity"));
    assert!(!context.contains("video:abc123:0"));
}

#[test]
fn empty_texts_are_skipped_without_spending_budget() {
    let hits = vec![
        hit("a", None),
        hit("b", Some("")),
        hit("c", Some("the only real snippet")),
    ];

    let context = pack_context(&hits, 6000);

    assert!(context.contains("the only real snippet"));
}
