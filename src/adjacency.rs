//! Municipality neighbor graph derived from polygon geometries.
//!
//! Two municipalities are neighbors when their geometries touch: they share
//! boundary but no interior. Each unordered pair is tested once and the edge
//! is recorded on both endpoints.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use geo::{BoundingRect, Geometry, Rect, Relate};
use serde::Serialize;
use tracing::info;

use crate::geometry::GeoFeatureCollection;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdjacencyGraph {
    neighbors: BTreeMap<String, BTreeSet<String>>,
}

impl AdjacencyGraph {
    pub fn neighbors(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.neighbors.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.neighbors.contains_key(key)
    }

    pub fn are_neighbors(&self, a: &str, b: &str) -> bool {
        self.neighbors.get(a).is_some_and(|set| set.contains(b))
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.neighbors.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.neighbors.iter()
    }

    fn insert_edge(&mut self, a: &str, b: &str) {
        if let Some(set) = self.neighbors.get_mut(a) {
            set.insert(b.to_string());
        }
        if let Some(set) = self.neighbors.get_mut(b) {
            set.insert(a.to_string());
        }
    }
}

/// Build the neighbor graph of every feature that carries a geometry.
///
/// This is a one-off preprocessing step: it runs the touch predicate over
/// every pair, so callers should build it once and keep the result.
pub fn build_adjacency(features: &GeoFeatureCollection) -> AdjacencyGraph {
    build_from_geometries(features.keyed_geometries())
}

/// Same as [`build_adjacency`] over already parsed geometries. A key that
/// appears twice keeps its first position and its last geometry.
pub fn build_from_geometries(entries: Vec<(String, Geometry<f64>)>) -> AdjacencyGraph {
    let mut slots: Vec<(String, Geometry<f64>, Option<Rect<f64>>)> = Vec::with_capacity(entries.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for (key, geometry) in entries {
        let rect = geometry.bounding_rect();
        match index.get(&key) {
            Some(&i) => {
                slots[i].1 = geometry;
                slots[i].2 = rect;
            }
            None => {
                index.insert(key.clone(), slots.len());
                slots.push((key, geometry, rect));
            }
        }
    }

    let mut graph = AdjacencyGraph {
        neighbors: slots
            .iter()
            .map(|(key, _, _)| (key.clone(), BTreeSet::new()))
            .collect(),
    };

    let mut tested = 0usize;
    for i in 0..slots.len() {
        let (key_i, geom_i, rect_i) = &slots[i];
        for (key_j, geom_j, rect_j) in &slots[i + 1..] {
            if !rects_meet(rect_i, rect_j) {
                continue;
            }
            tested += 1;
            if geom_i.relate(geom_j).is_touches() {
                graph.insert_edge(key_i, key_j);
            }
        }
    }

    info!(
        municipalities = graph.len(),
        edges = graph.edge_count(),
        predicate_evaluations = tested,
        "adjacency graph built"
    );
    graph
}

/// Closed bounding boxes overlap or share an edge. Geometries whose boxes
/// are apart cannot touch.
fn rects_meet(a: &Option<Rect<f64>>, b: &Option<Rect<f64>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.min().x <= b.max().x
                && b.min().x <= a.max().x
                && a.min().y <= b.max().y
                && b.min().y <= a.max().y
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
            (x: x, y: y),
        ])
    }

    #[test]
    fn shared_edge_is_recorded_both_ways() {
        let graph = build_from_geometries(vec![
            ("A".to_string(), square(0.0, 0.0)),
            ("B".to_string(), square(1.0, 0.0)),
            ("C".to_string(), square(5.0, 5.0)),
        ]);
        assert!(graph.are_neighbors("A", "B"));
        assert!(graph.are_neighbors("B", "A"));
        assert!(graph.neighbors("C").unwrap().is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn corner_contact_touches_but_overlap_does_not() {
        let overlapping = Geometry::Polygon(polygon![
            (x: 0.5, y: 0.5),
            (x: 1.5, y: 0.5),
            (x: 1.5, y: 1.5),
            (x: 0.5, y: 1.5),
            (x: 0.5, y: 0.5),
        ]);
        let graph = build_from_geometries(vec![
            ("A".to_string(), square(0.0, 0.0)),
            ("CORNER".to_string(), square(1.0, 1.0)),
            ("OVER".to_string(), overlapping),
        ]);
        assert!(graph.are_neighbors("A", "CORNER"));
        assert!(!graph.are_neighbors("A", "OVER"));
        assert!(!graph.are_neighbors("OVER", "A"));
    }

    #[test]
    fn grid_graph_is_symmetric() {
        let mut entries = Vec::new();
        for row in 0..3 {
            for col in 0..3 {
                entries.push((format!("M{row}{col}"), square(col as f64, row as f64)));
            }
        }
        let graph = build_from_geometries(entries);
        for (key, set) in graph.iter() {
            for other in set {
                assert!(graph.are_neighbors(other, key), "{key} -> {other} not mirrored");
            }
        }
        // centre cell touches all eight others (edges and corners)
        assert_eq!(graph.neighbors("M11").unwrap().len(), 8);
        assert_eq!(graph.neighbors("M00").unwrap().len(), 3);
    }

    #[test]
    fn duplicate_keys_keep_last_geometry() {
        let graph = build_from_geometries(vec![
            ("A".to_string(), square(10.0, 10.0)),
            ("B".to_string(), square(1.0, 0.0)),
            ("A".to_string(), square(0.0, 0.0)),
        ]);
        assert_eq!(graph.len(), 2);
        assert!(graph.are_neighbors("A", "B"));
    }
}
