use super::*;

fn chunk(id: &str, vector: Vec<f32>) -> EmbeddedChunk {
    EmbeddedChunk {
        id: id.to_string(),
        text: format!("text for {id}"),
        vector,
    }
}

#[test]
fn schema_embeds_the_vector_dimension() {
    let schema = create_schema(4);

    let field = schema.field_with_name("vector").expect("vector field");
    match field.data_type() {
        DataType::FixedSizeList(_, size) => assert_eq!(*size, 4),
        other => panic!("unexpected vector type: {other:?}"),
    }

    assert!(schema.field_with_name("namespace").is_ok());
    assert!(schema.field_with_name("text").is_ok());
    assert!(schema.field_with_name("chunk_index").is_ok());
}

#[test]
fn record_batch_carries_namespace_and_offsets() {
    let chunks = vec![
        chunk("ns:0", vec![0.0, 0.1, 0.2]),
        chunk("ns:1", vec![1.0, 1.1, 1.2]),
    ];

    let batch =
        build_record_batch("video:abc", &chunks, 5, 3).expect("batch should build");

    assert_eq!(batch.num_rows(), 2);

    let namespaces = batch
        .column_by_name("namespace")
        .expect("namespace column")
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("string array");
    assert_eq!(namespaces.value(0), "video:abc");
    assert_eq!(namespaces.value(1), "video:abc");

    let indices = batch
        .column_by_name("chunk_index")
        .expect("chunk_index column")
        .as_any()
        .downcast_ref::<UInt32Array>()
        .expect("u32 array");
    assert_eq!(indices.value(0), 5);
    assert_eq!(indices.value(1), 6);
}

#[test]
fn record_batch_rejects_wrong_vector_length() {
    let chunks = vec![chunk("ns:0", vec![0.0, 0.1])];

    // FixedSizeListArray construction fails when values don't divide evenly
    let result = build_record_batch("ns", &chunks, 0, 3);
    assert!(result.is_err());
}

#[test]
fn literal_escaping_doubles_single_quotes() {
    assert_eq!(escape_literal("video:abc"), "video:abc");
    assert_eq!(escape_literal("it's"), "it''s");
    assert_eq!(escape_literal("a'b'c"), "a''b''c");
}
