//! Planning cluster and trait sets
//!
//! A [`Cluster`] groups the plan nodes built for one query and carries the
//! type factory of the planning session.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::table_catalog::TypeFactory;

/// Global counter for cluster ids, used only to tell clusters apart in plans
static CLUSTER_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Calling convention of a plan node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Convention {
    None,
    /// Generic logical operators, not yet executable
    Logical,
    /// The subtree can be evaluated directly, without further relational
    /// transformation
    Bindable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TraitSet {
    convention: Convention,
}

impl TraitSet {
    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub fn replace(&self, convention: Convention) -> TraitSet {
        TraitSet { convention }
    }
}

pub struct Cluster {
    id: u32,
    type_factory: Arc<dyn TypeFactory>,
}

impl Cluster {
    pub fn new(type_factory: Arc<dyn TypeFactory>) -> Arc<Self> {
        Arc::new(Cluster {
            id: CLUSTER_COUNTER.fetch_add(1, Ordering::SeqCst),
            type_factory,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn type_factory(&self) -> &dyn TypeFactory {
        self.type_factory.as_ref()
    }

    pub fn trait_set(&self) -> TraitSet {
        TraitSet {
            convention: Convention::None,
        }
    }

    pub fn trait_set_of(&self, convention: Convention) -> TraitSet {
        self.trait_set().replace(convention)
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster").field("id", &self.id).finish()
    }
}

/// Context handed to a table when it is converted to a plan node
#[derive(Debug, Clone)]
pub struct PlanningContext {
    cluster: Arc<Cluster>,
}

impl PlanningContext {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        PlanningContext { cluster }
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }
}
