//! Link classification - derives typed edge sets from the paper set.
//!
//! Link sets are regenerated wholesale from the papers and the user
//! connection list, never patched in place (except the custom fast path in
//! `connect`, which appends the one new edge). `recompute` is pure: papers
//! and connections in, `LinkSets` out, no I/O.

use serde::{Deserialize, Serialize};

use crate::model::{Paper, UserConnection};

/// The edge category currently shown by the render host. Citation covers
/// both directions of the citation relation: edges derived from a paper's
/// reference list land in the same set as edges from a citation fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Recommendation,
    Citation,
    Author,
    Custom,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Recommendation => "recommendation",
            LinkType::Citation => "citation",
            LinkType::Author => "author",
            LinkType::Custom => "custom",
        }
    }

    /// Parse a host-supplied type name. Unknown names yield `None`; callers
    /// log and keep the active type unchanged.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recommendation" => Some(LinkType::Recommendation),
            "citation" => Some(LinkType::Citation),
            "author" => Some(LinkType::Author),
            "custom" => Some(LinkType::Custom),
            _ => None,
        }
    }

    /// Next state in the display cycle:
    /// recommendation -> citation -> author -> custom -> recommendation.
    pub fn next(&self) -> Self {
        match self {
            LinkType::Recommendation => LinkType::Citation,
            LinkType::Citation => LinkType::Author,
            LinkType::Author => LinkType::Custom,
            LinkType::Custom => LinkType::Recommendation,
        }
    }
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::Recommendation
    }
}

/// Directed edge between two papers, by id. Both endpoints are guaranteed to
/// exist in the repository at the time the set was generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: &str, target: &str) -> Self {
        Link { source: source.to_string(), target: target.to_string() }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// All four derived edge sets, regenerated together.
#[derive(Debug, Clone, Default)]
pub struct LinkSets {
    pub citation: Vec<Link>,
    pub recommendation: Vec<Link>,
    pub author: Vec<Link>,
    pub custom: Vec<Link>,
}

impl LinkSets {
    pub fn of_type(&self, link_type: LinkType) -> &[Link] {
        match link_type {
            LinkType::Recommendation => &self.recommendation,
            LinkType::Citation => &self.citation,
            LinkType::Author => &self.author,
            LinkType::Custom => &self.custom,
        }
    }

    /// True if no set references `id`. Used by the removal-completeness test.
    pub fn references_nothing_of(&self, id: &str) -> bool {
        !self.citation.iter().any(|l| l.touches(id))
            && !self.recommendation.iter().any(|l| l.touches(id))
            && !self.author.iter().any(|l| l.touches(id))
            && !self.custom.iter().any(|l| l.touches(id))
    }
}

/// Rebuild every edge set from the current papers and user connections.
///
/// Citation and recommendation links come from ordered pairs (d1 cites d2,
/// d1 recommends d2); author and custom links are undirected and emitted
/// once per unordered pair. Stale user connections whose endpoints are no
/// longer present are skipped, not an error.
pub fn recompute(papers: &[Paper], user_connections: &[UserConnection]) -> LinkSets {
    let mut sets = LinkSets::default();

    for (i, d1) in papers.iter().enumerate() {
        for (j, d2) in papers.iter().enumerate() {
            if d1.paper_id != d2.paper_id {
                if d1
                    .references
                    .iter()
                    .any(|r| r.paper_id.as_deref() == Some(d2.paper_id.as_str()))
                {
                    sets.citation.push(Link::new(&d1.paper_id, &d2.paper_id));
                }
                if d1.recommends.iter().any(|rec| rec == &d2.paper_id) {
                    sets.recommendation.push(Link::new(&d1.paper_id, &d2.paper_id));
                }
            }
            if i < j {
                let shared_author = d1.authors.iter().any(|a1| {
                    a1.author_id.is_some()
                        && d2.authors.iter().any(|a2| a2.author_id == a1.author_id)
                });
                if shared_author {
                    sets.author.push(Link::new(&d1.paper_id, &d2.paper_id));
                }
                if user_connections
                    .iter()
                    .any(|c| c.connects(&d1.paper_id, &d2.paper_id))
                {
                    sets.custom.push(Link::new(&d1.paper_id, &d2.paper_id));
                }
            }
        }
    }

    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, PaperRef};

    fn paper(id: &str) -> Paper {
        Paper::bare(id)
    }

    fn paper_with_refs(id: &str, refs: &[&str]) -> Paper {
        let mut p = paper(id);
        p.references = refs
            .iter()
            .map(|r| PaperRef { paper_id: Some(r.to_string()) })
            .collect();
        p
    }

    fn paper_with_author(id: &str, author_id: &str) -> Paper {
        let mut p = paper(id);
        p.authors.push(Author {
            author_id: Some(author_id.to_string()),
            name: "A. Uthor".to_string(),
        });
        p
    }

    #[test]
    fn test_citation_links_from_references() {
        let papers = vec![paper_with_refs("p1", &["p2", "p9"]), paper("p2")];
        let sets = recompute(&papers, &[]);
        assert_eq!(sets.citation, vec![Link::new("p1", "p2")]);
        assert!(sets.recommendation.is_empty());
    }

    #[test]
    fn test_recommendation_links() {
        let mut p1 = paper("p1");
        p1.recommends = vec!["p2".to_string(), "p3".to_string()];
        let papers = vec![p1, paper("p2"), paper("p3")];
        let sets = recompute(&papers, &[]);
        assert_eq!(
            sets.recommendation,
            vec![Link::new("p1", "p2"), Link::new("p1", "p3")]
        );
    }

    #[test]
    fn test_author_links_emitted_once_per_pair() {
        let papers = vec![
            paper_with_author("p1", "a1"),
            paper_with_author("p2", "a1"),
            paper_with_author("p3", "a2"),
        ];
        let sets = recompute(&papers, &[]);
        assert_eq!(sets.author, vec![Link::new("p1", "p2")]);
    }

    #[test]
    fn test_unresolved_authors_never_match() {
        let mut p1 = paper("p1");
        p1.authors.push(Author { author_id: None, name: "X".into() });
        let mut p2 = paper("p2");
        p2.authors.push(Author { author_id: None, name: "Y".into() });
        let sets = recompute(&[p1, p2], &[]);
        assert!(sets.author.is_empty());
    }

    #[test]
    fn test_custom_links_order_insensitive() {
        let papers = vec![paper("p1"), paper("p2")];
        let conns = vec![UserConnection::new("p2", "p1")];
        let sets = recompute(&papers, &conns);
        assert_eq!(sets.custom.len(), 1);
    }

    #[test]
    fn test_dangling_user_connection_is_pruned_not_fatal() {
        let papers = vec![paper("p1")];
        let conns = vec![UserConnection::new("p1", "gone")];
        let sets = recompute(&papers, &conns);
        assert!(sets.custom.is_empty());
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let papers = vec![
            paper_with_refs("p1", &["p2"]),
            paper_with_author("p2", "a1"),
            paper_with_author("p3", "a1"),
        ];
        let conns = vec![UserConnection::new("p1", "p3")];
        let a = recompute(&papers, &conns);
        let b = recompute(&papers, &conns);
        assert_eq!(a.citation, b.citation);
        assert_eq!(a.recommendation, b.recommendation);
        assert_eq!(a.author, b.author);
        assert_eq!(a.custom, b.custom);
    }

    #[test]
    fn test_link_type_cycle() {
        let mut t = LinkType::default();
        assert_eq!(t, LinkType::Recommendation);
        t = t.next();
        assert_eq!(t, LinkType::Citation);
        t = t.next();
        assert_eq!(t, LinkType::Author);
        t = t.next();
        assert_eq!(t, LinkType::Custom);
        t = t.next();
        assert_eq!(t, LinkType::Recommendation);
    }

    #[test]
    fn test_link_type_parse_rejects_unknown() {
        assert_eq!(LinkType::parse("author"), Some(LinkType::Author));
        assert_eq!(LinkType::parse("banana"), None);
    }
}
