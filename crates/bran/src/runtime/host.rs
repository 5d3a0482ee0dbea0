use std::cell::RefCell;
use std::rc::{Rc, Weak};
use zoon::Mutable;

use super::lazy_loader::LazyLoader;
use super::methods::MethodTable;
use super::RuntimeContext;
use crate::diagnostics::LOG_EVENTS;
use crate::protocol::MountError;
use crate::template::{Component, LazyRegion, synthesize};

/// Runs once, after a component synthesized successfully.
pub type AfterLoaded = Box<dyn FnOnce()>;

/// Owns exactly one authoritative markup and the component synthesized from
/// it. Every install replaces both wholesale; there is no diffing.
#[derive(Clone)]
pub struct TemplateHost {
    inner: Rc<HostInner>,
}

#[derive(Clone)]
pub struct WeakHost(Weak<HostInner>);

impl WeakHost {
    pub fn upgrade(&self) -> Option<TemplateHost> {
        self.0.upgrade().map(|inner| TemplateHost { inner })
    }
}

struct HostInner {
    id: u64,
    context: RuntimeContext,
    current: RefCell<Option<Rc<Component>>>,
    /// Bumped on every install, identical markup included.
    revision: Mutable<u64>,
}

impl TemplateHost {
    pub fn new(context: RuntimeContext) -> Self {
        Self {
            inner: Rc::new(HostInner {
                id: context.next_host_id(),
                context,
                current: RefCell::new(None),
                revision: Mutable::new(0),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.inner.context
    }

    pub fn downgrade(&self) -> WeakHost {
        WeakHost(Rc::downgrade(&self.inner))
    }

    pub fn methods(&self) -> MethodTable {
        MethodTable::new(self)
    }

    pub fn mount(&self, markup: &str) -> Result<(), MountError> {
        self.reload(markup)?;
        if LOG_EVENTS {
            self.context()
                .diagnostics()
                .info(format!("host {} mounted", self.id()));
        }
        Ok(())
    }

    /// Replaces the current markup and forces a re-render. On failure the
    /// previous component stays installed.
    pub fn reload(&self, markup: &str) -> Result<(), MountError> {
        match synthesize(markup) {
            Ok(component) => {
                self.change_current(component);
                Ok(())
            }
            Err(error) => {
                self.context().diagnostics().error(&error);
                Err(error)
            }
        }
    }

    pub fn component_by_template(
        &self,
        markup: &str,
        after_loaded: Option<AfterLoaded>,
    ) -> Result<Component, MountError> {
        let component = synthesize(markup)?;
        if let Some(after_loaded) = after_loaded {
            after_loaded();
        }
        Ok(component)
    }

    pub fn change_current(&self, component: Component) {
        self.inner.current.replace(Some(Rc::new(component)));
        *self.inner.revision.lock_mut() += 1;
    }

    pub fn current(&self) -> Option<Rc<Component>> {
        self.inner.current.borrow().clone()
    }

    pub fn markup(&self) -> Option<String> {
        self.current().map(|component| component.markup().to_owned())
    }

    pub fn revision(&self) -> &Mutable<u64> {
        &self.inner.revision
    }

    pub fn render_html(&self) -> String {
        match self.current() {
            Some(component) => self
                .context()
                .store()
                .with(|state| component.render_html(state)),
            None => String::new(),
        }
    }

    /// A loader for a lazy region declared by this host's component.
    pub fn lazy_loader(&self, region: LazyRegion) -> LazyLoader {
        LazyLoader::new(self, region)
    }
}
