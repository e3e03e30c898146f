use proptest::prelude::*;
use scope_similarity::{MetricKind, SimilarityScorer};

fn scorers() -> Vec<SimilarityScorer> {
    vec![
        SimilarityScorer::from_shared(MetricKind::SequenceRatio.build()),
        SimilarityScorer::from_shared(MetricKind::TermCosine.build()),
    ]
}

proptest! {
    #[test]
    fn prop_similarity_is_reflexive(a in "[a-zA-Z0-9 .,]{1,120}") {
        for scorer in scorers() {
            prop_assert_eq!(scorer.similarity(&a, &a), 1.0);
        }
    }

    #[test]
    fn prop_similarity_is_symmetric(a in "\\PC{0,80}", b in "\\PC{0,80}") {
        for scorer in scorers() {
            prop_assert_eq!(scorer.similarity(&a, &b), scorer.similarity(&b, &a));
        }
    }

    #[test]
    fn prop_similarity_is_normalized(a in "\\PC{0,80}", b in "\\PC{0,80}") {
        for scorer in scorers() {
            let s = scorer.similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn prop_within_stats_ordering(samples in prop::collection::vec("[a-z ]{0,40}", 0..6)) {
        let scorer = SimilarityScorer::default();
        let stats = scorer.aggregate(&samples);
        prop_assert!(0.0 <= stats.min);
        prop_assert!(stats.min <= stats.mean);
        prop_assert!(stats.mean <= 1.0);
    }

    #[test]
    fn prop_cross_is_normalized(
        a in prop::collection::vec("[a-z ]{0,30}", 0..4),
        b in prop::collection::vec("[a-z ]{0,30}", 0..4),
    ) {
        let scorer = SimilarityScorer::default();
        let pair = scorer.cross_aggregate(&[&a, &b]);
        let best = scorer.cross_best_match(&[&a, &b]);
        prop_assert!((0.0..=1.0).contains(&pair));
        prop_assert!((0.0..=1.0).contains(&best));
        // Best matches can never average below the plain pair mean
        prop_assert!(best + 1e-12 >= pair);
    }

    #[test]
    fn prop_single_group_cross_is_one(a in prop::collection::vec("[a-z]{1,20}", 1..5)) {
        let scorer = SimilarityScorer::default();
        prop_assert_eq!(scorer.cross_aggregate(&[&a]), 1.0);
    }
}

#[test]
fn cross_order_of_groups_does_not_matter() {
    let scorer = SimilarityScorer::default();
    let a: Vec<String> = vec!["drift in outputs".into(), "output drift".into()];
    let b: Vec<String> = vec!["stable outputs".into()];
    let ab = scorer.cross_aggregate(&[&a, &b]);
    let ba = scorer.cross_aggregate(&[&b, &a]);
    assert!((ab - ba).abs() < 1e-12);
}
