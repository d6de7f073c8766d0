//! Selection, pinning, manual connections, and the drag protocol.
//!
//! The render host translates pick/hover/drag gestures into these calls; the
//! core never sees mesh events. Dragging a node pins it. Two nodes dragged
//! within the proximity threshold auto-connect once, then both are excluded
//! from further auto-connection until the drag ends.

use crate::layout::NodeAnimation;
use crate::links::{Link, LinkType};
use crate::model::{UserConnection, Vec3};
use crate::store::GraphStore;

impl GraphStore {
    // ==================== Selection ====================

    /// Add `id` to the selection. No-op if unknown or already selected.
    pub fn select(&mut self, id: &str) {
        if !self.contains(id) {
            eprintln!("[Select] Cannot select unknown paper: {}", id);
            return;
        }
        if !self.selected_ids().iter().any(|s| s == id) {
            self.selected_mut().push(id.to_string());
        }
    }

    pub fn deselect(&mut self, id: &str) {
        self.selected_mut().retain(|s| s != id);
    }

    /// Pick-gesture toggle. Returns whether the node is selected afterwards.
    pub fn toggle_select(&mut self, id: &str) -> bool {
        if self.selected_ids().iter().any(|s| s == id) {
            self.deselect(id);
            false
        } else {
            self.select(id);
            self.selected_ids().iter().any(|s| s == id)
        }
    }

    /// Empty the selection. Repository untouched.
    pub fn clear_selection(&mut self) {
        self.selected_mut().clear();
    }

    // ==================== Pins ====================

    /// Fix a node at its current position.
    pub fn pin(&mut self, id: &str) {
        if let Some(p) = self.find_mut(id) {
            p.fixed = Some(p.position);
            self.pinned_mut().insert(id.to_string());
        }
    }

    /// Release every node: clears the pinned set and all fixed positions so
    /// the solver can move everything again.
    pub fn unpin_all(&mut self) {
        println!("[Select] Unpinning {} nodes", self.pinned_ids().len());
        self.pinned_mut().clear();
        for p in self.papers_mut() {
            p.fixed = None;
        }
    }

    // ==================== Manual connections ====================

    /// Connect two papers with a user-defined link.
    ///
    /// Already connected + custom type active: toggles the connection off.
    /// Already connected + other type active: just switches to custom so the
    /// existing connections surface first. Not connected: appends the
    /// connection, fast-path appends the one custom link (no full recompute),
    /// and activates the custom type.
    pub fn connect(&mut self, id_a: &str, id_b: &str) {
        if self.connect_exclusions.contains(id_a) || self.connect_exclusions.contains(id_b) {
            println!("[Select] Connection suppressed for excluded pair {} / {}", id_a, id_b);
            return;
        }

        let existing = self
            .user_connections()
            .iter()
            .position(|c| c.connects(id_a, id_b));

        match existing {
            Some(i) => {
                if self.link_type() == LinkType::Custom {
                    println!("[Select] Removing connection {} <-> {}", id_a, id_b);
                    self.user_connections_mut().remove(i);
                    self.regenerate_links();
                    self.mark_structure_changed();
                } else {
                    self.set_link_type(LinkType::Custom);
                }
            }
            None => {
                println!("[Select] Connecting {} <-> {}", id_a, id_b);
                self.user_connections_mut().push(UserConnection::new(id_a, id_b));
                if self.contains(id_a) && self.contains(id_b) {
                    self.push_custom_link(Link::new(id_a, id_b));
                }
                if self.link_type() == LinkType::Custom {
                    self.mark_structure_changed();
                } else {
                    self.set_link_type(LinkType::Custom);
                }
            }
        }
    }

    /// Connect the two currently selected papers.
    pub fn connect_selected(&mut self) -> Result<(), String> {
        if self.selected_ids().len() != 2 {
            eprintln!("[Select] Must select exactly two papers to connect");
            return Err("Must select exactly two papers to connect".to_string());
        }
        let a = self.selected_ids()[0].clone();
        let b = self.selected_ids()[1].clone();
        self.connect(&a, &b);
        Ok(())
    }

    // ==================== Drag protocol ====================

    pub fn drag_started(&mut self, id: &str) {
        if self.contains(id) {
            self.dragging.insert(id.to_string());
        }
    }

    /// Host reports a new drag position. Moves and pins the node, heats the
    /// solver, and auto-connects against other currently dragged nodes.
    pub fn drag_position_changed(&mut self, id: &str, pos: Vec3) {
        let drag_alpha = self.config().drag_alpha;
        match self.find_mut(id) {
            Some(p) => {
                p.position = pos;
                p.fixed = Some(pos);
            }
            None => return,
        }
        self.pinned_mut().insert(id.to_string());
        self.nudge_alpha(drag_alpha);

        for other in self.check_proximity_connections(id, pos) {
            self.connect(id, &other);
            self.connect_exclusions.insert(id.to_string());
            self.connect_exclusions.insert(other);
        }
    }

    pub fn drag_ended(&mut self, id: &str) {
        self.dragging.remove(id);
        // both halves of any auto-connected pair become connectable again
        self.connect_exclusions.clear();
    }

    /// Other currently dragged nodes within the proximity threshold of
    /// `pos`, excluding ids already auto-connected during this drag.
    pub fn check_proximity_connections(&self, id: &str, pos: Vec3) -> Vec<String> {
        let threshold = self.config().proximity_threshold;
        self.all()
            .iter()
            .filter(|p| {
                p.paper_id != id
                    && self.dragging.contains(&p.paper_id)
                    && !self.connect_exclusions.contains(&p.paper_id)
                    && p.position.distance(&pos) < threshold
            })
            .map(|p| p.paper_id.clone())
            .collect()
    }

    /// Start an ease-out animation of the node's pinned position. The node is
    /// pinned for the duration and stays pinned afterwards.
    pub(crate) fn animate_to(&mut self, id: &str, target: Vec3, duration: std::time::Duration) {
        let start = match self.find(id) {
            Some(p) => p.position,
            None => return,
        };
        self.pinned_mut().insert(id.to_string());
        self.push_animation(NodeAnimation::new(id, start, target, duration));
    }
}
