//! Process names and the declared subscription graph between them.

use domain::{Aggregate, Negotiation, Shipping, User};

/// The process applications making up the box system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessName {
    Users,
    Shippings,
    Negotiations,
}

impl ProcessName {
    /// Every process, in the order the runner sweeps them.
    pub const ALL: [ProcessName; 3] = [
        ProcessName::Users,
        ProcessName::Shippings,
        ProcessName::Negotiations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessName::Users => "users",
            ProcessName::Shippings => "shippings",
            ProcessName::Negotiations => "negotiations",
        }
    }

    /// The process that persists aggregates of `aggregate_type`.
    pub fn owning(aggregate_type: &str) -> Option<Self> {
        match aggregate_type {
            t if t == User::aggregate_type() => Some(ProcessName::Users),
            t if t == Shipping::aggregate_type() => Some(ProcessName::Shippings),
            t if t == Negotiation::aggregate_type() => Some(ProcessName::Negotiations),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One edge of the graph: `downstream` reacts to `event_type` events
/// persisted by `upstream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub downstream: ProcessName,
    pub upstream: ProcessName,
    pub event_type: &'static str,
}

/// Which process reacts to which events of which other process.
///
/// Built once at startup. Events with no matching edge are not handed to a
/// process's policy at all; they only advance its tracking position.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionGraph {
    edges: Vec<Subscription>,
}

impl SubscriptionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge.
    pub fn subscribe(
        mut self,
        downstream: ProcessName,
        upstream: ProcessName,
        event_type: &'static str,
    ) -> Self {
        let edge = Subscription {
            downstream,
            upstream,
            event_type,
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        self
    }

    /// The box system's graph.
    ///
    /// ```text
    /// users      ← users:     ShippingStarted
    /// users      ← shippings: Created
    /// shippings  ← users:     ShippingStarted
    /// negotiations (no upstream)
    /// ```
    pub fn box_system() -> Self {
        Self::new()
            .subscribe(ProcessName::Users, ProcessName::Users, "ShippingStarted")
            .subscribe(ProcessName::Users, ProcessName::Shippings, "Created")
            .subscribe(ProcessName::Shippings, ProcessName::Users, "ShippingStarted")
    }

    pub fn is_subscribed(
        &self,
        downstream: ProcessName,
        upstream: ProcessName,
        event_type: &str,
    ) -> bool {
        self.edges.iter().any(|e| {
            e.downstream == downstream && e.upstream == upstream && e.event_type == event_type
        })
    }

    /// Processes that react to `event_type` from `upstream`.
    pub fn subscribers(&self, upstream: ProcessName, event_type: &str) -> Vec<ProcessName> {
        self.edges
            .iter()
            .filter(|e| e.upstream == upstream && e.event_type == event_type)
            .map(|e| e.downstream)
            .collect()
    }

    /// Returns true if `process` has any upstream at all.
    pub fn has_upstream(&self, process: ProcessName) -> bool {
        self.edges.iter().any(|e| e.downstream == process)
    }

    pub fn edges(&self) -> &[Subscription] {
        &self.edges
    }
}
