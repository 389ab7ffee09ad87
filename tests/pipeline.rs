use community_graph_analyzer::cluster::detection::{detect_communities, LouvainConfig};
use community_graph_analyzer::cluster::metrics::{ranked_members, CommunityTies, DegreeDirection};
use community_graph_analyzer::cluster::Partition;
use community_graph_analyzer::config::Config;
use community_graph_analyzer::data::{extract_edges, read_records, ExtractMode, InteractionKind};
use community_graph_analyzer::graph::{build_graph, BuildOptions};
use community_graph_analyzer::pipeline::analyze;
use community_graph_analyzer::temporal::{compare_slices, jaccard, SimilarityMode};
use community_graph_analyzer::{storage, viz, AnalysisError};
use std::collections::{BTreeSet, HashSet};

const SAMPLE: &str = r#"dgaff,"Twitter is pretty fun, isn't it, @dfreelon?"
dfreelon,Yes indeed @dgaff - @some_other_user weigh in?
some_other_user,Of course twitter is grand. Mostly because of @dril.
dril,Some weird tweet no one understands but everyone favorites @some_other_user
cnnbrk,Looks like @dril just tweeted
"#;

/// Two mention cliques joined by a single tie from a1 to b1
fn two_camps() -> String {
    let camp = |prefix: &str, tag: &str, url: &str| {
        let members: Vec<String> = (1..=4).map(|i| format!("{}{}", prefix, i)).collect();
        members
            .iter()
            .map(|author| {
                let mentions: Vec<String> = members
                    .iter()
                    .filter(|m| *m != author)
                    .map(|m| format!("@{}", m))
                    .collect();
                format!("{},{} #{} {}\n", author, mentions.join(" "), tag, url)
            })
            .collect::<String>()
    };

    let mut text = camp("a", "alpha", "https://news.bbc.co.uk/story");
    text.push_str(&camp("b", "beta", "http://www.example.com/page"));
    text.push_str("a1,just saying hi to @b1\n");
    text.push_str("b2,RT @b1: big news today\n");
    text.push_str("b3,RT @b1: big news today\n");
    text
}

fn config() -> Config {
    Config {
        min_retweets: 1,
        ..Config::default()
    }
}

#[test]
fn sample_yields_expected_mentions() {
    let batch = read_records(SAMPLE.as_bytes()).unwrap();
    assert_eq!(batch.records.len(), 5);
    assert!(batch.skipped.is_empty());

    let extraction = extract_edges(&batch.records, ExtractMode::All);
    let edges: Vec<(&str, &str)> = extraction
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();

    assert_eq!(
        edges,
        vec![
            ("dgaff", "dfreelon"),
            ("dfreelon", "dgaff"),
            ("dfreelon", "some_other_user"),
            ("some_other_user", "dril"),
            ("dril", "some_other_user"),
            ("cnnbrk", "dril"),
        ]
    );
    assert!(extraction
        .edges
        .iter()
        .all(|e| e.kind == InteractionKind::Mention));

    let retweets = extract_edges(&batch.records, ExtractMode::RtsOnly);
    assert!(retweets.edges.is_empty());
}

#[test]
fn partition_is_total_and_disjoint() {
    let batch = read_records(SAMPLE.as_bytes()).unwrap();
    let graph = build_graph(
        &extract_edges(&batch.records, ExtractMode::All),
        BuildOptions::default(),
    );
    let detection = detect_communities(&graph, &LouvainConfig::default()).unwrap();
    let partition = &detection.partition;

    assert!(partition.covers(&graph));
    assert_eq!(partition.len(), graph.node_count());

    let mut seen = BTreeSet::new();
    for members in partition.communities().values() {
        for member in members {
            assert!(seen.insert(member.to_string()), "{} assigned twice", member);
        }
    }
    let nodes: BTreeSet<String> = graph.nodes().map(str::to_string).collect();
    assert_eq!(seen, nodes);
}

#[test]
fn same_seed_gives_same_partition() {
    let batch = read_records(two_camps().as_bytes()).unwrap();
    let graph = build_graph(
        &extract_edges(&batch.records, ExtractMode::All),
        BuildOptions::default(),
    );
    let louvain = LouvainConfig {
        seed: Some(7),
        ..LouvainConfig::default()
    };

    let first = detect_communities(&graph, &louvain).unwrap();
    let second = detect_communities(&graph, &louvain).unwrap();
    assert_eq!(first.partition, second.partition);
    assert_eq!(first.modularity, second.modularity);
}

#[test]
fn truncation_beyond_community_count_keeps_everything() {
    let batch = read_records(two_camps().as_bytes()).unwrap();
    let graph = build_graph(
        &extract_edges(&batch.records, ExtractMode::All),
        BuildOptions::default(),
    );
    let detection = detect_communities(&graph, &LouvainConfig::default()).unwrap();

    let kept = detection.partition.truncate(100).unwrap();
    assert_eq!(kept, detection.partition);
}

#[test]
fn analysis_separates_the_camps() {
    let batch = read_records(two_camps().as_bytes()).unwrap();
    let analysis = analyze(batch, "week-1", &config()).unwrap();
    let partition = &analysis.slice.partition;
    let report = &analysis.report;

    assert_eq!(report.summary.community_count, 2);
    assert_eq!(report.summary.retained_communities, 2);
    assert_eq!(report.summary.components, 1);

    let a = partition.community_of("a1").unwrap();
    let b = partition.community_of("b1").unwrap();
    assert_ne!(a, b);
    for i in 2..=4 {
        assert_eq!(partition.community_of(&format!("a{}", i)), Some(a));
        assert_eq!(partition.community_of(&format!("b{}", i)), Some(b));
    }

    for index in report.ei.indices.values() {
        let ei = index.unwrap();
        assert!((-1.0..=1.0).contains(&ei));
        assert!(ei < 0.0);
    }

    let bridges: Vec<&str> = report.bridging_nodes.iter().map(|b| b.node.as_str()).collect();
    assert_eq!(bridges, vec!["a1", "b1"]);

    let hashtags: Vec<&str> = report.top_hashtags.global.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(hashtags, vec!["alpha", "beta"]);

    let domains: Vec<&str> = report.top_domains.global.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(domains, vec!["bbc.co.uk", "example.com"]);

    assert_eq!(report.top_retweets.global.len(), 1);
    assert_eq!(report.top_retweets.global[0].count, 2);
    assert_eq!(report.top_retweets.global[0].community, Some(b));
}

#[test]
fn community_compared_with_itself_scores_one() {
    let batch = read_records(two_camps().as_bytes()).unwrap();
    let analysis = analyze(batch, "week-1", &config()).unwrap();
    let slice = &analysis.slice;

    for mode in [
        SimilarityMode::Unweighted,
        SimilarityMode::Weighted,
        SimilarityMode::InDegree { proportion: 0.5 },
    ] {
        let matrix = compare_slices(slice, slice, mode).unwrap();
        for (i, _) in matrix.earlier.iter().enumerate() {
            assert_eq!(matrix.scores[[i, i]], 1.0);
        }
    }

    let matrix = compare_slices(slice, slice, SimilarityMode::Unweighted).unwrap();
    assert_eq!(matrix.scores[[0, 1]], 0.0);

    let matches = matrix.best_matches(slice, slice, 0.3).unwrap();
    assert!(matches.iter().all(|m| m.accepted && m.later == Some(m.earlier)));
}

#[test]
fn disjoint_sets_have_zero_jaccard() {
    let a: HashSet<&str> = ["x", "y"].into_iter().collect();
    let b: HashSet<&str> = ["z"].into_iter().collect();
    assert_eq!(jaccard(&a, &b), 0.0);
}

#[test]
fn community_without_edges_has_undefined_ei() {
    let batch = read_records(SAMPLE.as_bytes()).unwrap();
    let graph = build_graph(
        &extract_edges(&batch.records, ExtractMode::All),
        BuildOptions::default(),
    );
    // cnnbrk alone, and with its only neighbour outside the partition
    let partition = Partition::from_assignments([("dgaff", 0), ("dfreelon", 0), ("cnnbrk", 1)]);
    let ties = CommunityTies::compute(&graph, &partition);

    assert!(matches!(
        ties.ei_index(1),
        Err(AnalysisError::DegenerateCommunity { community: 1 })
    ));
    assert_eq!(ties.ei_index(0).unwrap(), -1.0);
    assert_eq!(ties.ei_report().undefined, vec![1]);
}

#[test]
fn outputs_are_written_and_reloaded() {
    let batch = read_records(two_camps().as_bytes()).unwrap();
    let analysis = analyze(batch, "week-1", &config()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let ranked = ranked_members(
        &analysis.slice.graph,
        &analysis.slice.partition,
        DegreeDirection::In,
    );
    storage::save_results(&analysis.report, &ranked, dir.path()).unwrap();
    storage::save_slice(&analysis.slice, &dir.path().join("slice.bin")).unwrap();
    viz::write_graphml(
        &analysis.slice.graph,
        &analysis.slice.partition,
        &dir.path().join("graph.graphml"),
    )
    .unwrap();

    let communities = std::fs::read_to_string(dir.path().join("communities.csv")).unwrap();
    assert!(communities.starts_with("name,community,degree\n"));
    assert_eq!(communities.lines().count(), 9);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["period"], "week-1");

    let reloaded = storage::load_slice(&dir.path().join("slice.bin")).unwrap();
    let matrix = compare_slices(
        &analysis.slice,
        &reloaded,
        SimilarityMode::InDegree { proportion: 0.01 },
    )
    .unwrap();
    assert_eq!(matrix.scores.shape(), &[2, 2]);
}
