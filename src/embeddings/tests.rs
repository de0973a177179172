use super::*;

#[test]
fn embedding_has_fixed_dimension_and_range() {
    let embedder = HashEmbedder;

    for text in ["hello world", "", "段落一。", "x"] {
        let vector = embedder.embed(text);
        assert_eq!(vector.len(), EMBEDDING_DIM);
        assert!(
            vector.iter().all(|v| (-1.0..1.0).contains(v)),
            "out-of-range element for input {:?}",
            text
        );
    }
}

#[test]
fn equal_text_embeds_identically() {
    let embedder = HashEmbedder;

    let a = embedder.embed("The Quick Brown Fox");
    let b = embedder.embed("the quick brown fox");

    // Lowercase normalization makes these the same input
    assert_eq!(a, b);

    // And repeated calls are bit-identical
    assert_eq!(a, embedder.embed("The Quick Brown Fox"));
}

#[test]
fn different_text_embeds_differently() {
    let embedder = HashEmbedder;

    let a = embedder.embed("first document");
    let b = embedder.embed("second document");

    assert_ne!(a, b);
}

#[test]
fn embeds_cjk_text() {
    let embedder = HashEmbedder;

    let vector = embedder.embed("测试查询");
    assert_eq!(vector.len(), EMBEDDING_DIM);
    assert_eq!(vector, embedder.embed("测试查询"));
}

#[test]
fn batch_matches_individual_embeds() {
    let embedder = HashEmbedder;
    let texts = ["alpha", "beta", "gamma"];

    let batch = embedder.embed_batch(&texts);

    assert_eq!(batch.len(), 3);
    for (text, vector) in texts.iter().zip(&batch) {
        assert_eq!(vector, &embedder.embed(text));
    }
}
