use super::*;

fn edges() -> Vec<GraphEdge> {
    vec![
        GraphEdge::new("a", "b"),
        GraphEdge::new("b", "c"),
        GraphEdge::new("x", "y"),
    ]
}

#[tokio::test]
async fn test_closure_around_seed() {
    let source = StaticGraphSource::new(edges());
    let graph = source
        .dependent_graph(&["a".to_string()])
        .await
        .unwrap();

    assert_eq!(graph.len(), 2);
    assert!(graph.iter().all(|e| e.from_field_id != "x"));
}

#[tokio::test]
async fn test_closure_reaches_upstream_from_downstream_seed() {
    let source = StaticGraphSource::new(edges());
    let graph = source
        .dependent_graph(&["c".to_string()])
        .await
        .unwrap();

    assert_eq!(graph.len(), 2);
}

#[tokio::test]
async fn test_unknown_seed_yields_no_edges() {
    let source = StaticGraphSource::new(edges());
    let graph = source
        .dependent_graph(&["zzz".to_string()])
        .await
        .unwrap();

    assert!(graph.is_empty());
}
