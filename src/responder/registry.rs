//! Responder registry keyed by declared failure type.
//!
//! # Responsibilities
//! - Store one responder per failure type
//! - Look responders up by the exact declared type of a failure
//!
//! # Design Decisions
//! - Keys are `TypeId`s; there is no supertype or `AnyFailure` fallback
//! - Last registration for a type wins
//! - Copy-on-write map behind `ArcSwap`: lookups never lock, and
//!   registration while serving is race-free (registering everything before
//!   serving is still the expected usage)

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::response::{IntoResponse, Response};

use crate::effect::Call;
use crate::responder::failure::Failure;

/// A responder for failures of type `F`.
pub type Responder<F> = Arc<dyn Fn(&Call, F) -> Response + Send + Sync>;

#[derive(Clone)]
struct Entry {
    type_name: &'static str,
    /// Holds a `Responder<F>` for the `F` this entry is keyed by.
    responder: Arc<dyn Any + Send + Sync>,
}

/// Maps failure types to the responders that render them.
#[derive(Default)]
pub struct ResponderRegistry {
    entries: ArcSwap<HashMap<TypeId, Entry>>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `responder` for failures of type `F`.
    ///
    /// Returns true if a previous responder for `F` was replaced.
    pub fn register<F, R, O>(&self, responder: R) -> bool
    where
        F: Failure,
        R: Fn(&Call, F) -> O + Send + Sync + 'static,
        O: IntoResponse,
    {
        let typed: Responder<F> = Arc::new(move |call: &Call, failure: F| {
            responder(call, failure).into_response()
        });
        let entry = Entry {
            type_name: type_name::<F>(),
            responder: Arc::new(typed),
        };

        let previous = self.entries.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(TypeId::of::<F>(), entry.clone());
            next
        });

        let replaced = previous.contains_key(&TypeId::of::<F>());
        if replaced {
            tracing::debug!(failure = entry.type_name, "Responder replaced");
        } else {
            tracing::debug!(failure = entry.type_name, "Responder registered");
        }
        replaced
    }

    /// Responder registered for exactly `F`, if any.
    pub fn lookup<F: Failure>(&self) -> Option<Responder<F>> {
        self.entries
            .load()
            .get(&TypeId::of::<F>())
            .and_then(|entry| entry.responder.downcast_ref::<Responder<F>>())
            .cloned()
    }

    pub fn contains<F: Failure>(&self) -> bool {
        self.entries.load().contains_key(&TypeId::of::<F>())
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// Type names of every registered failure type, sorted.
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.load().values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ResponderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}
