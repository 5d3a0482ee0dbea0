use std::cell::{Cell, RefCell};
use std::rc::Rc;
use zoon::Mutable;

use super::lazy_loader::{LazyLoader, WeakLoader};
use super::methods::PendingInput;
use super::{Environment, RuntimeConfig};
use crate::diagnostics::Diagnostics;
use crate::protocol::{Coalescer, FormValue, StateDelta, Store};

/// Everything hosts share for the lifetime of the page: the store, the ports,
/// the coalescer and the portal registry. Passed explicitly, never global.
#[derive(Clone)]
pub struct RuntimeContext {
    inner: Rc<ContextInner>,
}

struct ContextInner {
    config: RuntimeConfig,
    store: Store,
    environment: Environment,
    diagnostics: Diagnostics,
    coalescer: RefCell<Coalescer<PendingInput>>,
    portals: RefCell<Vec<(String, WeakLoader)>>,
    state_revision: Mutable<u64>,
    next_host_id: Cell<u64>,
}

impl RuntimeContext {
    pub fn new(
        config: RuntimeConfig,
        store: Store,
        environment: Environment,
        diagnostics: Diagnostics,
    ) -> Self {
        let coalescer = RefCell::new(Coalescer::new(config.debounce_scope));
        Self {
            inner: Rc::new(ContextInner {
                config,
                store,
                environment,
                diagnostics,
                coalescer,
                portals: RefCell::new(Vec::new()),
                state_revision: Mutable::new(0),
                next_host_id: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    pub fn coalescer(&self) -> &RefCell<Coalescer<PendingInput>> {
        &self.inner.coalescer
    }

    /// Bumped after every write through the context; views re-read the store
    /// when it changes.
    pub fn state_revision(&self) -> &Mutable<u64> {
        &self.inner.state_revision
    }

    pub fn set_state(&self, key: impl Into<String>, value: impl Into<FormValue>) {
        self.inner.store.set(key, value);
        self.touch_state();
    }

    pub fn merge_states(&self, partial: &StateDelta) {
        self.inner.store.merge(partial);
        self.touch_state();
    }

    fn touch_state(&self) {
        *self.inner.state_revision.lock_mut() += 1;
    }

    pub(crate) fn next_host_id(&self) -> u64 {
        let id = self.inner.next_host_id.get() + 1;
        self.inner.next_host_id.set(id);
        id
    }

    /// Latest registration wins; dropped loaders are pruned on the way.
    pub(crate) fn register_portal(&self, name: &str, loader: &LazyLoader) {
        let mut portals = self.inner.portals.borrow_mut();
        portals.retain(|(existing, weak)| existing != name && weak.upgrade().is_some());
        portals.push((name.to_owned(), loader.downgrade()));
    }

    pub fn portal(&self, name: &str) -> Option<LazyLoader> {
        self.inner
            .portals
            .borrow()
            .iter()
            .rev()
            .find(|(existing, _)| existing == name)
            .and_then(|(_, weak)| weak.upgrade())
    }
}
