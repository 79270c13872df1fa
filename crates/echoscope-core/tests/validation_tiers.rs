//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Input Integrity
//! - T1: Deterministic Partitioning
//! - T2: Metric Correctness
//! - T3: Incremental Simulation

use echoscope_core::{
    CommunityId, EchoError, Edge, EdgeOp, EdgeOutcome, Graph, GraphStore, Ingestor, MetricsEngine,
    NodeLabel, Partitioner, SimulationController,
};

const TWO_TRIANGLES: [(&str, &str); 6] = [
    ("A", "B"),
    ("B", "C"),
    ("C", "A"),
    ("D", "E"),
    ("E", "F"),
    ("F", "D"),
];

const EPS: f64 = 1e-12;

fn two_triangles() -> Graph {
    Graph::load(TWO_TRIANGLES).expect("load")
}

// =============================================================================
// TIER T0: INPUT INTEGRITY
// =============================================================================

mod t0_input_integrity {
    use super::*;

    /// T0.1: Duplicate edges in either orientation collapse to one.
    #[test]
    fn duplicate_edges_collapse() {
        let graph = Graph::load([("A", "B"), ("B", "A"), ("A", "B")]).expect("load");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    /// T0.2: A self-loop in the edge list rejects the whole load.
    #[test]
    fn self_loop_rejected_at_load() {
        let result = Graph::load([("A", "B"), ("C", "C")]);
        assert!(matches!(
            result,
            Err(EchoError::MalformedInput { line: 2, .. })
        ));
    }

    /// T0.3: An empty edge list is not a graph.
    #[test]
    fn empty_edge_list_rejected() {
        let empty: [(&str, &str); 0] = [];
        assert_eq!(Graph::load(empty), Err(EchoError::EmptyGraph));
        assert_eq!(Ingestor::ingest("\n# only a comment\n"), Err(EchoError::EmptyGraph));
    }

    /// T0.4: Text ingestion reports the offending source line.
    #[test]
    fn malformed_line_reported() {
        let err = Ingestor::ingest("A B\n\nB C D\n").expect_err("malformed");
        assert_eq!(
            err,
            EchoError::MalformedInput {
                line: 3,
                content: "B C D".to_string(),
            }
        );
    }

    /// T0.5: Node ids follow first appearance.
    #[test]
    fn node_ids_follow_first_appearance() {
        let graph = Ingestor::ingest("zeta alpha\nalpha mid\n").expect("ingest");
        let labels: Vec<&str> = graph.labels().map(NodeLabel::as_str).collect();
        assert_eq!(labels, vec!["zeta", "alpha", "mid"]);
    }

    /// T0.6: Degree counts every incident edge once.
    #[test]
    fn degrees_consistent_with_edges() {
        let graph = two_triangles();
        let degree_total: usize = graph
            .node_ids()
            .map(|n| graph.degree(n).expect("degree"))
            .sum();
        assert_eq!(degree_total, 2 * graph.edge_count());
    }
}

// =============================================================================
// TIER T1: DETERMINISTIC PARTITIONING
// =============================================================================

mod t1_partitioning {
    use super::*;

    /// T1.1: Two disjoint triangles form two communities.
    #[test]
    fn two_triangles_two_communities() {
        let graph = two_triangles();
        let partition = Partitioner::default().detect(&graph);

        assert_eq!(partition.community_count(), 2);
        let community = |label: &str| {
            partition
                .community_of(graph.node_id(label).expect("node"))
                .expect("assigned")
        };
        assert_eq!(community("A"), community("B"));
        assert_eq!(community("B"), community("C"));
        assert_eq!(community("D"), community("E"));
        assert_eq!(community("E"), community("F"));
        assert_ne!(community("A"), community("D"));
    }

    /// T1.2: Identical input yields identical partitions.
    #[test]
    fn detection_is_deterministic() {
        let text = "1 2\n2 3\n3 1\n3 4\n4 5\n5 6\n6 4\n6 7\n7 8\n8 9\n9 7\n";
        let first = Partitioner::default().detect(&Ingestor::ingest(text).expect("ingest"));
        for _ in 0..5 {
            let again = Partitioner::default().detect(&Ingestor::ingest(text).expect("ingest"));
            assert_eq!(first, again);
        }
    }

    /// T1.3: Every node receives exactly one community.
    #[test]
    fn partition_is_total() {
        let graph = Ingestor::ingest("a b\nc d\ne f\nb c\n").expect("ingest");
        let partition = Partitioner::default().detect(&graph);
        assert_eq!(partition.len(), graph.node_count());
        for node in graph.node_ids() {
            assert!(partition.community_of(node).is_some());
        }
    }

    /// T1.4: Community ids are dense.
    #[test]
    fn community_ids_dense() {
        let graph = Ingestor::ingest("a b\nc d\ne f\n").expect("ingest");
        let partition = Partitioner::default().detect(&graph);
        let count = partition.community_count();
        for (_, community) in partition.iter() {
            assert!(community.index() < count);
        }
        assert!(partition.sizes().iter().all(|&size| size > 0));
    }
}

// =============================================================================
// TIER T2: METRIC CORRECTNESS
// =============================================================================

mod t2_metrics {
    use super::*;

    /// T2.1: Two disjoint triangles are perfectly polarized.
    #[test]
    fn two_triangles_baseline() {
        let graph = two_triangles();
        let partition = Partitioner::default().detect(&graph);
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        assert!((snapshot.modularity - 0.5).abs() < EPS);
        assert!((snapshot.polarization - 1.0).abs() < EPS);
        assert!(snapshot.bridge_edges.is_empty());
    }

    /// T2.2: Modularity of any partition stays within [-0.5, 1].
    #[test]
    fn modularity_bounded() {
        let graph = Ingestor::ingest("a b\nb c\nc d\nd a\na c\nc e\ne f\n").expect("ingest");
        let partition = Partitioner::default().detect(&graph);
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        assert!(snapshot.modularity >= -0.5 - EPS);
        assert!(snapshot.modularity <= 1.0 + EPS);
        assert!(snapshot.polarization <= 1.0 + EPS);
    }

    /// T2.3: Bridge edges are exactly the cross-community edges.
    #[test]
    fn bridges_are_cross_edges() {
        let graph = Ingestor::ingest("A B\nB C\nC A\nD E\nE F\nF D\nC D\n").expect("ingest");
        let partition = Partitioner::default().detect(&graph);
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        for edge in graph.edges() {
            let crosses = partition.community_of(edge.lo()) != partition.community_of(edge.hi());
            assert_eq!(snapshot.bridge_edges.contains(&edge), crosses);
        }
    }

    /// T2.4: A single community has degenerate assortativity 0.
    #[test]
    fn single_community_degenerate() {
        let graph = Ingestor::ingest("a b\nb c\nc a\n").expect("ingest");
        let partition = Partitioner::default().detect(&graph);
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        assert_eq!(partition.community_count(), 1);
        assert_eq!(snapshot.polarization, 0.0);
        assert!(snapshot.modularity.abs() < EPS);
    }
}

// =============================================================================
// TIER T3: INCREMENTAL SIMULATION
// =============================================================================

mod t3_simulation {
    use super::*;

    fn loaded() -> SimulationController {
        let mut controller = SimulationController::new();
        controller.load(TWO_TRIANGLES).expect("load");
        controller
    }

    /// T3.1: Adding one bridge lowers both metrics by the expected amount.
    #[test]
    fn add_bridge_matches_closed_form() {
        let mut controller = loaded();
        let update = controller.add_edge("A", "D").expect("add");

        let expected_q = 2.0 * (3.0 / 7.0 - 0.25);
        assert_eq!(update.outcome, EdgeOutcome::Applied);
        assert!((update.metrics.modularity - expected_q).abs() < EPS);
        assert!((update.metrics.polarization - 2.0 * expected_q).abs() < EPS);
        assert_eq!(update.metrics.bridge_count, 1);
    }

    /// T3.2: Incremental metrics equal a full recompute after every step.
    #[test]
    fn incremental_matches_full_recompute() {
        let mut controller = loaded();
        let steps: [(&str, &str, bool); 6] = [
            ("A", "D", true),
            ("B", "E", true),
            ("A", "B", false),
            ("C", "F", true),
            ("A", "D", false),
            ("A", "B", true),
        ];

        for (u, v, add) in steps {
            if add {
                controller.add_edge(u, v).expect("add");
            } else {
                controller.remove_edge(u, v).expect("remove");
            }

            let state = controller.loaded().expect("loaded");
            let full = MetricsEngine::full_compute(state.graph(), state.partition()).expect("full");
            assert_eq!(&full, state.snapshot());
        }
    }

    /// T3.3: Add followed by remove restores the original snapshot.
    #[test]
    fn add_then_remove_restores() {
        let mut controller = loaded();
        let baseline = controller.snapshot().cloned().expect("snapshot");

        controller.add_edge("B", "F").expect("add");
        let update = controller.remove_edge("B", "F").expect("remove");
        assert_eq!(update.metrics, baseline.summary());
        assert_eq!(controller.snapshot(), Some(&baseline));
    }

    /// T3.4: The partition never changes between loads.
    #[test]
    fn partition_is_sticky() {
        let mut controller = loaded();
        let before = controller.current_partition().expect("partition");

        for (u, v) in [("A", "D"), ("A", "E"), ("A", "F"), ("B", "D"), ("B", "E"), ("C", "F")] {
            controller.add_edge(u, v).expect("add");
        }

        assert_eq!(controller.current_partition().expect("partition"), before);
        assert_eq!(
            before.get(&NodeLabel::new("A")),
            before.get(&NodeLabel::new("C"))
        );
        assert_eq!(controller.verify(), Ok(true));
    }

    /// T3.5: Rejected requests leave the session untouched.
    #[test]
    fn rejected_requests_are_atomic() {
        let mut controller = loaded();
        let before = controller.snapshot().cloned();

        assert_eq!(
            controller.add_edge("A", "Z"),
            Err(EchoError::InvalidNode("Z".to_string()))
        );
        assert_eq!(
            controller.add_edge("A", "A"),
            Err(EchoError::SelfLoop("A".to_string()))
        );
        assert_eq!(controller.snapshot().cloned(), before);
        assert_eq!(controller.graph().map(|g| g.edge_count()), Some(6));
    }

    /// T3.6: Removing every edge drives the metrics to zero.
    #[test]
    fn removing_everything_zeroes_metrics() {
        let mut controller = loaded();
        let mut last = None;
        for (u, v) in TWO_TRIANGLES {
            last = Some(controller.remove_edge(u, v).expect("remove"));
        }

        let metrics = last.expect("update").metrics;
        assert_eq!(metrics.modularity, 0.0);
        assert_eq!(metrics.polarization, 0.0);
        assert_eq!(metrics.bridge_count, 0);
        assert_eq!(metrics.edge_count, 0);
    }

    /// T3.7: Engine-level incremental update rejects ops the graph does not reflect.
    #[test]
    fn incremental_update_rejects_unapplied_op() {
        let graph = two_triangles();
        let partition = Partitioner::default().detect(&graph);
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        let a = graph.node_id("A").expect("A");
        let d = graph.node_id("D").expect("D");
        let result = MetricsEngine::incremental_update(&graph, &partition, &snapshot, EdgeOp::Add(a, d));
        assert!(matches!(result, Err(EchoError::InvalidOperation(_))));
    }

    /// T3.8: Bridge labels report the smaller node id first.
    #[test]
    fn bridge_labels_canonical() {
        let mut controller = loaded();
        controller.add_edge("E", "B").expect("add");

        let graph = controller.graph().expect("graph");
        let edge = Edge::new(
            graph.node_id("E").expect("E"),
            graph.node_id("B").expect("B"),
        );
        assert!(controller.snapshot().expect("snapshot").bridge_edges.contains(&edge));

        let report = controller.report().expect("report");
        assert_eq!(report.bridges[0].source, NodeLabel::new("B"));
        assert_eq!(report.bridges[0].source_community, CommunityId(0));
        assert_eq!(report.bridges[0].target_community, CommunityId(1));
    }
}
