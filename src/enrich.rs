//! Enrichment orchestrator - grows the graph from the external data source.
//!
//! One fetch may be in flight at a time (process-wide busy flag); concurrent
//! requests are logged no-ops, never queued. Locks on the store are held only
//! across synchronous mutation, never across an await, so drag/pin/selection
//! events keep flowing while a fetch is pending. The merge step re-checks
//! "already present" against the live store, which makes that interleaving
//! safe.
//!
//! Every operation follows the same pipeline: busy guard, precondition,
//! id fetch, filter against present/removed ids, cap, detail fetch, merge,
//! activate the matching link type. Failures clear the busy flag, raise a
//! transient notice, and leave the repository in its last consistent state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Deserialize;

use crate::api::PaperSource;
use crate::config::GraphConfig;
use crate::layout;
use crate::links::LinkType;
use crate::model::{Paper, UserConnection, Vec3};
use crate::store::GraphStore;

const NO_PAPERS_NOTICE: &str = "No available papers to add";

/// One thematic cluster from the clustering assistant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    pub name: String,
    pub paper_ids: Vec<String>,
}

/// Owns the graph store, the data source, and the single-flight flag.
pub struct GraphCore<S: PaperSource> {
    source: S,
    config: GraphConfig,
    store: RwLock<GraphStore>,
    busy: AtomicBool,
    notices: Mutex<Vec<String>>,
}

impl<S: PaperSource> GraphCore<S> {
    pub fn new(source: S, config: GraphConfig) -> Self {
        let store = GraphStore::new(config.clone());
        Self::with_store(source, store)
    }

    /// Build around an existing store (tests use this with a seeded rng).
    pub fn with_store(source: S, store: GraphStore) -> Self {
        GraphCore {
            config: store.config().clone(),
            source,
            store: RwLock::new(store),
            busy: AtomicBool::new(false),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.store.read().unwrap()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.store.write().unwrap()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Try to claim the single-flight slot. Logs and returns false if an
    /// operation is already in flight.
    fn begin(&self, op: &str) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            true
        } else {
            println!("[Enrich] {} skipped, another fetch is in flight", op);
            false
        }
    }

    fn finish(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    /// Queue a transient user-facing message for the render host.
    pub fn notify(&self, text: &str) {
        println!("[Enrich] Notice: {}", text);
        self.notices.lock().unwrap().push(text.to_string());
    }

    pub fn take_notices(&self) -> Vec<String> {
        std::mem::take(&mut *self.notices.lock().unwrap())
    }

    // ==================== Seeding ====================

    /// Fetch and place the initial papers. Falls back to bare records when
    /// the seed fetch fails so the session still starts. A single seed is
    /// centered at the origin, larger sets go on the seed lattice.
    pub async fn seed(&self, seed_ids: &[String]) -> Result<Vec<String>, String> {
        if !self.begin("seed") {
            return Ok(Vec::new());
        }
        let papers = match self.source.paper_details(seed_ids).await {
            Ok(papers) => papers,
            Err(e) => {
                eprintln!("[Enrich] Seed fetch failed, using bare records: {}", e);
                seed_ids.iter().map(|id| Paper::bare(id)).collect()
            }
        };

        let new_ids = {
            let mut store = self.write();
            let radius = self.config.seed_radius;
            let new_ids = store.upsert_many(papers, radius, false);
            if new_ids.len() == 1 {
                if let Some(p) = store.find_mut(&new_ids[0]) {
                    p.position = Vec3::ZERO;
                }
            }
            new_ids
        };
        self.finish();
        println!("[Enrich] Seeded {} papers", new_ids.len());
        Ok(new_ids)
    }

    // ==================== Enrichment operations ====================

    /// Fetch recommendations for the current selection and merge the best
    /// unseen results. Records the recommended ids on each selected paper so
    /// the recommendation edges can be derived.
    pub async fn add_recommendations_from_selected(&self) -> Result<Vec<String>, String> {
        if !self.begin("addRecommendationsFromSelected") {
            return Ok(Vec::new());
        }
        let selected = self.read().selected_ids().to_vec();
        if selected.is_empty() {
            self.finish();
            eprintln!("[Enrich] Recommendation fetch requires a non-empty selection");
            return Err("Recommendation fetch requires a non-empty selection".to_string());
        }

        let rec_ids = match self
            .source
            .recommendations(&selected, &[], self.config.recommendation_limit)
            .await
        {
            Ok(ids) => ids,
            Err(e) => return Ok(self.abort(&format!("recommendation fetch failed: {}", e))),
        };

        let candidates = {
            let mut store = self.write();
            for id in &selected {
                if let Some(p) = store.find_mut(id) {
                    for rec in &rec_ids {
                        if !p.recommends.contains(rec) {
                            p.recommends.push(rec.clone());
                        }
                    }
                }
            }
            store.regenerate_links();
            filter_candidates(&store, &rec_ids, self.config.max_new_papers)
        };
        if candidates.is_empty() {
            return Ok(self.abort("no unseen recommendations"));
        }

        let new_papers = match self.source.paper_details(&candidates).await {
            Ok(papers) => papers,
            Err(e) => return Ok(self.abort(&format!("detail fetch failed: {}", e))),
        };

        let new_ids = self.merge(new_papers, LinkType::Recommendation);
        self.finish();
        Ok(new_ids)
    }

    /// Fetch papers citing the single selected paper.
    pub async fn add_citations_from_selected(&self) -> Result<Vec<String>, String> {
        if !self.begin("addCitationsFromSelected") {
            return Ok(Vec::new());
        }
        let paper_id = match self.single_selected("citations") {
            Ok(id) => id,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };

        let citing = match self.source.citations(&paper_id, self.config.fetch_limit).await {
            Ok(ids) => ids,
            Err(e) => return Ok(self.abort(&format!("citation fetch failed: {}", e))),
        };
        self.fetch_and_merge(&citing, LinkType::Citation).await
    }

    /// Fetch papers cited by the single selected paper. Reference-derived
    /// edges land in the citation set, so this activates the citation type.
    pub async fn add_references_from_selected(&self) -> Result<Vec<String>, String> {
        if !self.begin("addReferencesFromSelected") {
            return Ok(Vec::new());
        }
        let paper_id = match self.single_selected("references") {
            Ok(id) => id,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };

        let cited = match self.source.references(&paper_id, self.config.fetch_limit).await {
            Ok(ids) => ids,
            Err(e) => return Ok(self.abort(&format!("reference fetch failed: {}", e))),
        };
        self.fetch_and_merge(&cited, LinkType::Citation).await
    }

    /// Fetch more papers by the given author.
    pub async fn add_papers_from_author(&self, author_id: &str) -> Result<Vec<String>, String> {
        if !self.begin("addPapersFromAuthor") {
            return Ok(Vec::new());
        }
        if author_id.is_empty() {
            self.finish();
            eprintln!("[Enrich] Author id must be non-empty");
            return Err("Author id must be non-empty".to_string());
        }

        let author_papers = match self.source.author_papers(author_id, self.config.fetch_limit).await
        {
            Ok(ids) => ids,
            Err(e) => return Ok(self.abort(&format!("author fetch failed: {}", e))),
        };
        self.fetch_and_merge(&author_papers, LinkType::Author).await
    }

    /// Bring every user-deleted paper back. All-or-nothing over the whole
    /// removed set: it is cleared only once the fetch has succeeded.
    pub async fn restore_deleted(&self) -> Result<Vec<String>, String> {
        if !self.begin("restoreDeleted") {
            return Ok(Vec::new());
        }
        let removed = self.read().removed_ids().to_vec();
        if removed.is_empty() {
            self.finish();
            println!("[Enrich] Nothing to restore");
            return Ok(Vec::new());
        }

        let papers = match self.source.paper_details(&removed).await {
            Ok(papers) => papers,
            Err(e) => return Ok(self.abort(&format!("restore fetch failed: {}", e))),
        };

        let new_ids = {
            let mut store = self.write();
            store.take_removed();
            store.upsert_many(papers, self.config.spawn_radius, true)
        };
        self.finish();
        println!("[Enrich] Restored {} papers", new_ids.len());
        Ok(new_ids)
    }

    // ==================== Clustering ====================

    /// Rearrange the graph into the assistant's thematic clusters: cluster
    /// centers on the major sphere, members animated onto minor spheres and
    /// pinned there, user connections rebuilt as one star per cluster.
    pub fn create_clusters_from_assignment(&self, clusters: &[ClusterAssignment]) {
        println!("[Enrich] Applying {} clusters", clusters.len());
        let mut store = self.write();

        let sizes: Vec<usize> = clusters.iter().map(|c| c.paper_ids.len()).collect();
        let major = self.config.major_cluster_radius;
        let minor = self.config.minor_cluster_radius;
        let (_, member_positions) = {
            let rng = store.rng_mut();
            layout::cluster_layout(&sizes, major, minor, rng)
        };

        let duration = Duration::from_millis(self.config.animation_ms);
        for (ci, cluster) in clusters.iter().enumerate() {
            for (mi, id) in cluster.paper_ids.iter().enumerate() {
                if !store.contains(id) {
                    eprintln!("[Enrich] Cluster '{}' names unknown paper {}", cluster.name, id);
                    continue;
                }
                store.animate_to(id, member_positions[ci][mi], duration);
                if let Some(p) = store.find_mut(id) {
                    p.cluster_name = Some(cluster.name.clone());
                }
            }
        }

        // star topology per cluster replaces all prior user connections
        store.user_connections_mut().clear();
        for cluster in clusters {
            if let Some((hub, rest)) = cluster.paper_ids.split_first() {
                for id in rest {
                    let conns = store.user_connections_mut();
                    if !conns.iter().any(|c| c.connects(hub, id)) {
                        conns.push(UserConnection::new(hub, id));
                    }
                }
            }
        }

        store.set_link_type(LinkType::Custom);
        store.regenerate_links();
        store.mark_structure_changed();
    }

    // ==================== Shared pipeline ====================

    fn single_selected(&self, what: &str) -> Result<String, String> {
        let store = self.read();
        if store.selected_ids().len() != 1 {
            let msg = format!("Must select exactly one paper to fetch {} for", what);
            eprintln!("[Enrich] {}", msg);
            return Err(msg);
        }
        Ok(store.selected_ids()[0].clone())
    }

    /// Filter, cap, detail-fetch, and merge a candidate id list. Assumes the
    /// busy flag is held; releases it on every path.
    async fn fetch_and_merge(
        &self,
        candidate_ids: &[String],
        activate: LinkType,
    ) -> Result<Vec<String>, String> {
        let candidates = {
            let store = self.read();
            filter_candidates(&store, candidate_ids, self.config.max_new_papers)
        };
        if candidates.is_empty() {
            return Ok(self.abort("no unseen candidates"));
        }

        let new_papers = match self.source.paper_details(&candidates).await {
            Ok(papers) => papers,
            Err(e) => return Ok(self.abort(&format!("detail fetch failed: {}", e))),
        };

        let new_ids = self.merge(new_papers, activate);
        self.finish();
        Ok(new_ids)
    }

    /// Merge fetched papers under one write lock: upsert (re-checking
    /// presence at merge time), regenerate links, activate the operation's
    /// link type, clear the selection for the next gesture.
    fn merge(&self, papers: Vec<Paper>, activate: LinkType) -> Vec<String> {
        let mut store = self.write();
        let new_ids = store.upsert_many(papers, self.config.spawn_radius, true);
        store.set_link_type(activate);
        store.clear_selection();
        println!("[Enrich] Merged {} new papers", new_ids.len());
        new_ids
    }

    /// Failure path shared by every operation: log, notice, release busy.
    fn abort(&self, reason: &str) -> Vec<String> {
        eprintln!("[Enrich] Aborted: {}", reason);
        self.notify(NO_PAPERS_NOTICE);
        self.finish();
        Vec::new()
    }
}

/// Candidate ids not already in the graph and not deleted by the user,
/// deduplicated, capped to `max` to bound growth per operation.
fn filter_candidates(store: &GraphStore, ids: &[String], max: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| {
            !store.contains(id)
                && !store.removed_ids().iter().any(|r| r == *id)
                && seen.insert(id.as_str())
        })
        .take(max)
        .cloned()
        .collect()
}
