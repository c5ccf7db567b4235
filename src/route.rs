//! Route entities and the in-memory route registry.
//!
//! A route is this engine's unit of a user-intended audio path, backed by
//! one or more server modules. The registry is the source of truth for
//! "what has this engine created"; it is rebuilt at startup by
//! reconciliation and mutated only by creation and removal.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use uuid::Uuid;

/// Name prefix carried by every server object this engine creates.
pub const ENGINE_PREFIX: &str = "lichen_";
/// Combined-output sinks: `lichen_output_<n>`.
pub const OUTPUT_PREFIX: &str = "lichen_output_";
/// Mixed-input routes anchor on `lichen_input_<n>`; the internal mixer sink
/// is `<base>_null` and the exposed virtual microphone is `<base>_mic`.
pub const INPUT_PREFIX: &str = "lichen_input_";
pub const NULL_SINK_SUFFIX: &str = "_null";
pub const MIC_SUFFIX: &str = "_mic";
pub const MONITOR_SUFFIX: &str = ".monitor";
pub const NULL_MONITOR_SUFFIX: &str = "_null.monitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// A combined sink fanning out to multiple member sinks.
    Output,
    /// A null-mixer pipeline mixing microphones into one virtual source.
    Input,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output => write!(f, "output"),
            Self::Input => write!(f, "input"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    /// Locally generated, never reused.
    pub id: String,
    pub kind: RouteKind,
    /// The sink name for OUTPUT routes, the base name for INPUT routes.
    pub anchor_name: String,
    /// INPUT only: the remapped virtual-microphone name applications should
    /// select. Absent when the remap stage failed or its module is gone.
    pub exposed_source_name: Option<String>,
    pub description: String,
    /// Every module that must be unloaded to fully tear this route down.
    pub module_ids: BTreeSet<u32>,
    /// Human labels of the member devices; empty for routes recovered from
    /// a previous session, where provenance is lost.
    pub member_descriptions: Vec<String>,
    /// Set by reconciliation for pipeline fragments whose counterpart is
    /// gone; surfaced for manual cleanup instead of silently leaking.
    pub is_orphan: bool,
}

impl Route {
    /// The internal null-mixer sink name of an INPUT route.
    pub fn null_sink_name(&self) -> String {
        format!("{}{}", self.anchor_name, NULL_SINK_SUFFIX)
    }

    /// The exposed virtual-microphone name an INPUT route publishes.
    pub fn mic_name(&self) -> String {
        format!("{}{}", self.anchor_name, MIC_SUFFIX)
    }
}

/// In-memory collection of routes, in insertion order.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
    next_id: u64,
}

impl RouteRegistry {
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn get(&self, route_id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == route_id)
    }

    pub fn remove(&mut self, route_id: &str) -> Option<Route> {
        let pos = self.routes.iter().position(|r| r.id == route_id)?;
        Some(self.routes.remove(pos))
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Whether any route is anchored on `name`. Reconciliation uses this as
    /// its first-match-wins claim check.
    pub fn tracks_anchor(&self, name: &str) -> bool {
        self.routes.iter().any(|r| r.anchor_name == name)
    }

    /// The first route of a kind in registry order. Hearback binds to this
    /// one when several exist.
    pub fn first_of(&self, kind: RouteKind) -> Option<&Route> {
        self.routes.iter().find(|r| r.kind == kind)
    }

    /// Order-independent exact-membership match against non-orphan routes
    /// of the same kind, compared by member device description.
    pub fn find_matching(&self, kind: RouteKind, member_descriptions: &[String]) -> Option<&Route> {
        let wanted: HashSet<&str> = member_descriptions.iter().map(String::as_str).collect();
        if wanted.is_empty() {
            return None;
        }
        self.routes.iter().find(|r| {
            if r.is_orphan || r.kind != kind {
                return false;
            }
            let have: HashSet<&str> = r.member_descriptions.iter().map(String::as_str).collect();
            have == wanted
        })
    }

    /// A fresh id for an explicitly created route.
    pub fn next_route_id(&mut self, kind: RouteKind) -> String {
        self.next_id += 1;
        format!("{}_{}", kind, self.next_id)
    }

    /// An id for a route synthesized by reconciliation.
    pub fn recovered_route_id(kind: RouteKind) -> String {
        format!("{}_restored_{}", kind, Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, kind: RouteKind, anchor: &str, members: &[&str]) -> Route {
        Route {
            id: id.to_string(),
            kind,
            anchor_name: anchor.to_string(),
            exposed_source_name: None,
            description: String::new(),
            module_ids: BTreeSet::new(),
            member_descriptions: members.iter().map(|m| m.to_string()).collect(),
            is_orphan: false,
        }
    }

    #[test]
    fn test_find_matching_is_order_independent() {
        let mut registry = RouteRegistry::default();
        registry.add(route("output_1", RouteKind::Output, "lichen_output_1", &["Speakers", "Headphones"]));

        let reversed = vec!["Headphones".to_string(), "Speakers".to_string()];
        assert!(registry.find_matching(RouteKind::Output, &reversed).is_some());
        // Exact membership: no subset or superset match
        let subset = vec!["Speakers".to_string()];
        assert!(registry.find_matching(RouteKind::Output, &subset).is_none());
        let superset = vec![
            "Speakers".to_string(),
            "Headphones".to_string(),
            "HDMI".to_string(),
        ];
        assert!(registry.find_matching(RouteKind::Output, &superset).is_none());
    }

    #[test]
    fn test_find_matching_ignores_orphans_and_other_kinds() {
        let mut registry = RouteRegistry::default();
        let mut orphan = route("input_1", RouteKind::Input, "lichen_input_1", &["Mic A", "Mic B"]);
        orphan.is_orphan = true;
        registry.add(orphan);

        let members = vec!["Mic A".to_string(), "Mic B".to_string()];
        assert!(registry.find_matching(RouteKind::Input, &members).is_none());
        assert!(registry.find_matching(RouteKind::Output, &members).is_none());
    }

    #[test]
    fn test_route_ids_are_unique_and_monotonic() {
        let mut registry = RouteRegistry::default();
        let a = registry.next_route_id(RouteKind::Output);
        let b = registry.next_route_id(RouteKind::Input);
        assert_eq!(a, "output_1");
        assert_eq!(b, "input_2");
        assert_ne!(
            RouteRegistry::recovered_route_id(RouteKind::Input),
            RouteRegistry::recovered_route_id(RouteKind::Input)
        );
    }

    #[test]
    fn test_first_of_uses_registry_order() {
        let mut registry = RouteRegistry::default();
        registry.add(route("output_1", RouteKind::Output, "lichen_output_1", &[]));
        registry.add(route("output_2", RouteKind::Output, "lichen_output_2", &[]));
        assert_eq!(
            registry.first_of(RouteKind::Output).map(|r| r.id.as_str()),
            Some("output_1")
        );
        assert!(registry.first_of(RouteKind::Input).is_none());
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut registry = RouteRegistry::default();
        registry.add(route("output_1", RouteKind::Output, "lichen_output_1", &[]));
        assert!(registry.remove("nope").is_none());
        assert_eq!(registry.routes().len(), 1);
    }
}
