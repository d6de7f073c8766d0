//! The graph store - single owner of all live graph state.
//!
//! Everything the original viewer kept in module-level arrays (papers, id
//! sets, link data, selection, pins, removals, user connections) lives here
//! as fields behind accessor methods, so the invariants hold in one place:
//! at most one paper per id, links only between present papers, and the
//! pinned/selected/removed sets always cleaned on removal.
//!
//! The store is pure state + synchronous mutation. Async enrichment sits in
//! `enrich`, the solver coupling in `sim`; both go through the methods here.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GraphConfig;
use crate::layout::{self, NodeAnimation};
use crate::links::{self, Link, LinkSets, LinkType};
use crate::model::{Paper, PaperSummary, UserConnection, Vec3};

/// Highlight pulse on a newly added node. Expires on its own unless the node
/// is selected at expiry time, in which case it stays until deselected.
#[derive(Debug, Clone)]
struct Highlight {
    paper_id: String,
    expires: Instant,
}

pub struct GraphStore {
    config: GraphConfig,
    rng: StdRng,

    papers: Vec<Paper>,
    ids: HashSet<String>,
    removed: Vec<String>,
    user_connections: Vec<UserConnection>,

    links: LinkSets,
    link_type: LinkType,

    selected: Vec<String>,
    pinned: HashSet<String>,
    pub(crate) dragging: HashSet<String>,
    pub(crate) connect_exclusions: HashSet<String>,

    animations: Vec<NodeAnimation>,
    highlights: Vec<Highlight>,

    // Simulation coupling: bumped on every structural change so the bridge
    // knows to reseed the solver. `settle` asks for one all-pinned reseed.
    generation: u64,
    settle: bool,
    alpha_nudge: f32,
}

impl GraphStore {
    pub fn new(config: GraphConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic construction for tests.
    pub fn with_rng(config: GraphConfig, rng: StdRng) -> Self {
        GraphStore {
            config,
            rng,
            papers: Vec::new(),
            ids: HashSet::new(),
            removed: Vec::new(),
            user_connections: Vec::new(),
            links: LinkSets::default(),
            link_type: LinkType::default(),
            selected: Vec::new(),
            pinned: HashSet::new(),
            dragging: HashSet::new(),
            connect_exclusions: HashSet::new(),
            animations: Vec::new(),
            highlights: Vec::new(),
            generation: 0,
            settle: false,
            alpha_nudge: 0.0,
        }
    }

    // ==================== Repository ====================

    pub fn all(&self) -> &[Paper] {
        &self.papers
    }

    pub fn find(&self, id: &str) -> Option<&Paper> {
        self.papers.iter().find(|p| p.paper_id == id)
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut Paper> {
        self.papers.iter_mut().find(|p| p.paper_id == id)
    }

    pub(crate) fn papers_mut(&mut self) -> &mut [Paper] {
        &mut self.papers
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Insert papers whose id is not already present; duplicates are dropped
    /// silently (this is also the merge-time re-check that makes interleaved
    /// mutation during a pending fetch safe). The whole batch shares one
    /// random color and is placed on a lattice sphere of `radius`.
    /// Returns the ids actually inserted, in insertion order.
    pub fn upsert_many(&mut self, papers: Vec<Paper>, radius: f32, highlight: bool) -> Vec<String> {
        let color = random_color(&mut self.rng);
        let mut new_ids = Vec::new();
        for mut p in papers {
            if self.ids.contains(&p.paper_id) {
                continue;
            }
            p.color = Some(color.clone());
            self.ids.insert(p.paper_id.clone());
            new_ids.push(p.paper_id.clone());
            self.papers.push(p);
        }
        if new_ids.is_empty() {
            return new_ids;
        }

        let positions = layout::lattice_positions(new_ids.len(), Vec3::ZERO, radius, &mut self.rng);
        let first_new = self.papers.len() - new_ids.len();
        for (offset, pos) in positions.into_iter().enumerate() {
            self.papers[first_new + offset].position = pos;
        }

        if highlight {
            let expires = Instant::now() + Duration::from_millis(self.config.highlight_ms);
            for id in &new_ids {
                self.highlights.push(Highlight { paper_id: id.clone(), expires });
            }
        }

        println!("[Store] Added {} papers ({} total)", new_ids.len(), self.papers.len());
        self.regenerate_links();
        self.settle = true;
        self.mark_structure_changed();
        new_ids
    }

    /// Remove papers by id: prunes every link set and cleans the pinned,
    /// selected, and dragging sets. Link regeneration reads the fully
    /// updated repository, so no set can reference a removed id afterwards.
    pub fn remove(&mut self, ids_to_remove: &[String]) {
        if ids_to_remove.is_empty() {
            return;
        }
        let drop: HashSet<&str> = ids_to_remove.iter().map(|s| s.as_str()).collect();
        self.papers.retain(|p| !drop.contains(p.paper_id.as_str()));
        self.ids.retain(|id| !drop.contains(id.as_str()));
        self.selected.retain(|id| !drop.contains(id.as_str()));
        self.pinned.retain(|id| !drop.contains(id.as_str()));
        self.dragging.retain(|id| !drop.contains(id.as_str()));
        self.animations.retain(|a| !drop.contains(a.paper_id.as_str()));
        self.highlights.retain(|h| !drop.contains(h.paper_id.as_str()));

        println!("[Store] Removed {} papers ({} remain)", ids_to_remove.len(), self.papers.len());
        self.regenerate_links();
        self.mark_structure_changed();
    }

    /// Remove the current selection and remember it for restore.
    pub fn remove_selected(&mut self) {
        let ids = self.selected.clone();
        self.removed.extend(ids.iter().cloned());
        self.remove(&ids);
        self.selected.clear();
    }

    pub fn removed_ids(&self) -> &[String] {
        &self.removed
    }

    /// Drain the removed set (restore path, after a successful fetch).
    pub(crate) fn take_removed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.removed)
    }

    // ==================== Links ====================

    pub fn regenerate_links(&mut self) {
        self.links = links::recompute(&self.papers, &self.user_connections);
    }

    pub fn link_sets(&self) -> &LinkSets {
        &self.links
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn active_links(&self) -> &[Link] {
        self.links.of_type(self.link_type)
    }

    pub fn set_link_type(&mut self, link_type: LinkType) {
        if self.link_type != link_type {
            println!("[Store] Link type {} -> {}", self.link_type.as_str(), link_type.as_str());
            self.link_type = link_type;
            self.mark_structure_changed();
        }
    }

    /// Host-boundary variant taking the raw type name. Unknown names are
    /// rejected with a logged error; the active type stays unchanged.
    pub fn set_link_type_str(&mut self, name: &str) -> Result<(), String> {
        match LinkType::parse(name) {
            Some(t) => {
                self.set_link_type(t);
                Ok(())
            }
            None => {
                eprintln!("[Store] Invalid link type: {}", name);
                Err(format!("Invalid link type: {}", name))
            }
        }
    }

    pub fn cycle_link_type(&mut self) -> LinkType {
        let next = self.link_type.next();
        self.set_link_type(next);
        next
    }

    pub fn user_connections(&self) -> &[UserConnection] {
        &self.user_connections
    }

    pub(crate) fn user_connections_mut(&mut self) -> &mut Vec<UserConnection> {
        &mut self.user_connections
    }

    pub(crate) fn push_custom_link(&mut self, link: Link) {
        self.links.custom.push(link);
    }

    // ==================== Selection / pins (state accessors) ====================

    pub fn selected_ids(&self) -> &[String] {
        &self.selected
    }

    pub(crate) fn selected_mut(&mut self) -> &mut Vec<String> {
        &mut self.selected
    }

    pub fn pinned_ids(&self) -> &HashSet<String> {
        &self.pinned
    }

    pub(crate) fn pinned_mut(&mut self) -> &mut HashSet<String> {
        &mut self.pinned
    }

    // ==================== Animations / highlights ====================

    pub(crate) fn push_animation(&mut self, anim: NodeAnimation) {
        // one animation per node; a new target replaces the old path
        self.animations.retain(|a| a.paper_id != anim.paper_id);
        self.animations.push(anim);
    }

    /// Advance running animations: each writes its interpolated point into
    /// the paper's fixed position so the solver holds the node on the path.
    pub fn advance_animations(&mut self, now: Instant) {
        if self.animations.is_empty() {
            return;
        }
        let mut finished = Vec::new();
        for (i, anim) in self.animations.iter().enumerate() {
            let (pos, done) = anim.sample(now);
            if let Some(p) = self.papers.iter_mut().find(|p| p.paper_id == anim.paper_id) {
                p.fixed = Some(pos);
                p.position = pos;
            }
            if done {
                finished.push(i);
            }
        }
        for i in finished.into_iter().rev() {
            self.animations.remove(i);
        }
    }

    pub fn animations_running(&self) -> bool {
        !self.animations.is_empty()
    }

    /// Drop expired highlight pulses. A pulse on a currently selected node
    /// is kept until the node is deselected.
    pub fn expire_highlights(&mut self, now: Instant) {
        let selected = &self.selected;
        self.highlights
            .retain(|h| h.expires > now || selected.contains(&h.paper_id));
    }

    pub fn active_highlights(&self) -> Vec<String> {
        self.highlights.iter().map(|h| h.paper_id.clone()).collect()
    }

    // ==================== Simulation coupling ====================

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn mark_structure_changed(&mut self) {
        self.generation += 1;
        self.alpha_nudge = self.alpha_nudge.max(self.config.insert_alpha);
    }

    /// One-shot: true if the next reseed should momentarily pin every node
    /// (fresh insertion, avoids jitter while the solver re-registers nodes).
    pub fn take_settle(&mut self) -> bool {
        std::mem::take(&mut self.settle)
    }

    pub(crate) fn nudge_alpha(&mut self, alpha: f32) {
        self.alpha_nudge = self.alpha_nudge.max(alpha);
    }

    pub fn take_alpha_nudge(&mut self) -> f32 {
        std::mem::take(&mut self.alpha_nudge)
    }

    /// Write a solver-produced position back onto the paper.
    pub(crate) fn apply_position(&mut self, id: &str, pos: Vec3) {
        if let Some(p) = self.find_mut(id) {
            // pinned nodes stay where their fixed position says
            p.position = p.fixed.unwrap_or(pos);
        }
    }

    // ==================== Voice/LLM layer ====================

    /// id/title/abstract view of the whole repository, for prompting.
    pub fn snapshot(&self) -> Vec<PaperSummary> {
        self.papers
            .iter()
            .map(|p| PaperSummary {
                paper_id: p.paper_id.clone(),
                title: p.title.clone(),
                abstract_text: p.abstract_text.clone(),
            })
            .collect()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

fn random_color<R: Rng>(rng: &mut R) -> String {
    format!(
        "#{:02x}{:02x}{:02x}",
        rng.gen_range(0..=255u8),
        rng.gen_range(0..=255u8),
        rng.gen_range(0..=255u8)
    )
}
