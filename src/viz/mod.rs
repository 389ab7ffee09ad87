//! GraphML export for external visualization tools

use crate::cluster::Partition;
use crate::graph::InteractionGraph;
use anyhow::Result;
use petgraph::visit::EdgeRef;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write the graph as GraphML with each node's community as an attribute.
///
/// Nodes outside the partition get community -1 so the whole graph can be
/// laid out while only retained communities are coloured.
pub fn write_graphml(graph: &InteractionGraph, partition: &Partition, path: &Path) -> Result<()> {
    log::info!("Writing GraphML to {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(file, "  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>")?;
    writeln!(file, "  <key id=\"community\" for=\"node\" attr.name=\"community\" attr.type=\"long\"/>")?;
    writeln!(file, "  <key id=\"kind\" for=\"edge\" attr.name=\"kind\" attr.type=\"string\"/>")?;
    writeln!(file, "  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"long\"/>")?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"directed\">")?;

    let inner = graph.inner();
    for idx in inner.node_indices() {
        let label = graph.node_id(idx);
        let community = partition.community_of(label).map_or(-1, i64::from);
        writeln!(
            file,
            "    <node id=\"n{}\">\n      <data key=\"label\">{}</data>\n      <data key=\"community\">{}</data>\n    </node>",
            idx.index(),
            escape(label),
            community
        )?;
    }

    for edge in inner.edge_references() {
        let kind = match edge.weight().kind {
            crate::data::InteractionKind::Retweet => "retweet",
            crate::data::InteractionKind::Mention => "mention",
        };
        writeln!(
            file,
            "    <edge id=\"e{}\" source=\"n{}\" target=\"n{}\">\n      <data key=\"kind\">{}</data>\n      <data key=\"weight\">{}</data>\n    </edge>",
            edge.id().index(),
            edge.source().index(),
            edge.target().index(),
            kind,
            edge.weight().weight
        )?;
    }

    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;
    file.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Edge, Extraction, InteractionKind};
    use crate::graph::{build_graph, BuildOptions};

    #[test]
    fn graphml_carries_communities() {
        let extraction = Extraction {
            edges: vec![Edge {
                source: "a&b".into(),
                target: "c".into(),
                kind: InteractionKind::Mention,
                weight: 3,
                timestamp: None,
            }],
            isolates: Vec::new(),
        };
        let graph = build_graph(&extraction, BuildOptions::default());
        let partition = Partition::from_assignments([("a&b", 4)]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viz").join("graph.graphml");
        write_graphml(&graph, &partition, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<data key=\"label\">a&amp;b</data>"));
        assert!(text.contains("<data key=\"community\">4</data>"));
        assert!(text.contains("<data key=\"community\">-1</data>"));
        assert!(text.contains("<data key=\"weight\">3</data>"));
    }
}
