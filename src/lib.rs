//! Core state and synchronization engine for an interactive 3D citation
//! graph. Owns the paper repository, derives the four link sets (citation,
//! recommendation, author, custom), talks to the Semantic Scholar API to
//! grow the graph, and drives the force-directed solver through the
//! `ForceSolver` seam. The render host supplies the solver and the scene;
//! this crate supplies everything that has to stay consistent underneath.

mod api;
mod config;
mod enrich;
mod layout;
mod links;
mod model;
mod select;
mod sim;
mod store;

pub use api::{ApiError, PaperSource, SemanticScholarClient};
pub use config::GraphConfig;
pub use enrich::{ClusterAssignment, GraphCore};
pub use layout::{ease_out, lattice_positions, NodeAnimation, GOLDEN_ANGLE};
pub use links::{Link, LinkSets, LinkType};
pub use model::{Author, Paper, PaperRef, PaperSummary, UserConnection, Vec3};
pub use sim::{ForceSolver, SimLink, SimNode, SimulationBridge, TickFrame};
pub use store::GraphStore;
