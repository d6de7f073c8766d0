//! Core data types for the citation graph.
//!
//! `Paper` doubles as the wire shape for the Semantic Scholar batch endpoint
//! (camelCase fields, everything optional except `paperId`) and as the live
//! simulation node: position and fixed-position fields are session state and
//! never serialized.

use serde::{Deserialize, Serialize};

/// 3D position used by the layout generator and the simulation bridge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z).length()
    }

    /// Linear interpolation from `self` to `target` at parameter `t` in [0, 1].
    pub fn lerp(&self, target: &Vec3, t: f32) -> Vec3 {
        Vec3::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Missing for some records (collaborations, unresolved names).
    pub author_id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Reference entry as returned by the batch details endpoint.
/// `paper_id` is null for references Semantic Scholar could not resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRef {
    pub paper_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub paper_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub references: Vec<PaperRef>,
    #[serde(default)]
    pub citation_count: Option<u32>,
    #[serde(default)]
    pub reference_count: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    /// Ids this paper was a recommendation source for. Always defined before
    /// the paper reaches the simulation (defaults to empty on the wire).
    #[serde(default)]
    pub recommends: Vec<String>,

    // Session state, owned by the simulation side. Never on the wire.
    #[serde(skip)]
    pub position: Vec3,
    /// Some = pinned: the solver must not move this node.
    #[serde(skip)]
    pub fixed: Option<Vec3>,
    #[serde(skip)]
    pub color: Option<String>,
    #[serde(skip)]
    pub cluster_name: Option<String>,
}

impl Paper {
    /// Minimal record used when the seed fetch fails and we still want a node.
    pub fn bare(paper_id: &str) -> Self {
        Paper {
            paper_id: paper_id.to_string(),
            title: String::new(),
            abstract_text: None,
            authors: Vec::new(),
            references: Vec::new(),
            citation_count: None,
            reference_count: None,
            year: None,
            venue: None,
            recommends: Vec::new(),
            position: Vec3::ZERO,
            fixed: None,
            color: None,
            cluster_name: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.fixed.is_some()
    }

    pub fn has_author(&self, author_id: &str) -> bool {
        self.authors
            .iter()
            .any(|a| a.author_id.as_deref() == Some(author_id))
    }
}

/// Manual user-made connection between two papers. Undirected: `(a, b)` and
/// `(b, a)` are the same connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConnection {
    pub a: String,
    pub b: String,
}

impl UserConnection {
    pub fn new(a: &str, b: &str) -> Self {
        UserConnection { a: a.to_string(), b: b.to_string() }
    }

    pub fn connects(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }
}

/// Lightweight view of a paper handed to the voice/LLM layer for prompting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSummary {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_vec3_lerp_endpoints() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-1.0, 0.0, 7.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_user_connection_is_undirected() {
        let c = UserConnection::new("p1", "p2");
        assert!(c.connects("p1", "p2"));
        assert!(c.connects("p2", "p1"));
        assert!(!c.connects("p1", "p3"));
    }

    #[test]
    fn test_paper_deserializes_wire_shape() {
        let json = r#"{
            "paperId": "abc",
            "title": "A Paper",
            "abstract": "Text",
            "authors": [{"authorId": "a1", "name": "Jo Doe"}],
            "references": [{"paperId": "def"}, {"paperId": null}],
            "citationCount": 12,
            "referenceCount": 2
        }"#;
        let p: Paper = serde_json::from_str(json).unwrap();
        assert_eq!(p.paper_id, "abc");
        assert_eq!(p.abstract_text.as_deref(), Some("Text"));
        assert_eq!(p.references.len(), 2);
        assert!(p.recommends.is_empty());
        assert!(p.has_author("a1"));
        assert!(!p.is_pinned());
    }
}
