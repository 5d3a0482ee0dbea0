use std::cell::Cell;
use std::rc::{Rc, Weak};
use zoon::Mutable;

use super::dispatcher::dispatch;
use super::host::{AfterLoaded, TemplateHost, WeakHost};
use super::RevisibilityPolicy;
use crate::protocol::{EventResponse, MountError, NormalizedEvent, RuntimeError};
use crate::template::{Component, LazyRegion, MethodCall};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderPhase {
    Unmounted,
    Loading,
    Loaded,
    /// The last fetch failed; showing the region again retries.
    Failed,
}

impl LoaderPhase {
    /// Value of the region's `data-loader-phase` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unmounted => "unmounted",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        }
    }
}

/// A host whose content is fetched on demand: nothing is requested until the
/// region is both mounted and visible.
#[derive(Clone)]
pub struct LazyLoader {
    inner: Rc<LoaderInner>,
}

#[derive(Clone)]
pub struct WeakLoader(Weak<LoaderInner>);

impl WeakLoader {
    pub fn upgrade(&self) -> Option<LazyLoader> {
        self.0.upgrade().map(|inner| LazyLoader { inner })
    }
}

struct LoaderInner {
    region: LazyRegion,
    content: TemplateHost,
    root: WeakHost,
    phase: Mutable<LoaderPhase>,
    mounted: Cell<bool>,
    visible: Cell<bool>,
    hidden_after_load: Cell<bool>,
    /// Fetches started; a finished fetch that is not the latest is dropped.
    fetches: Cell<u64>,
}

impl LazyLoader {
    pub fn new(root: &TemplateHost, region: LazyRegion) -> Self {
        let loader = Self {
            inner: Rc::new(LoaderInner {
                content: TemplateHost::new(root.context().clone()),
                root: root.downgrade(),
                phase: Mutable::new(LoaderPhase::Unmounted),
                mounted: Cell::new(false),
                visible: Cell::new(false),
                hidden_after_load: Cell::new(false),
                fetches: Cell::new(0),
                region,
            }),
        };
        if let Some(name) = &loader.inner.region.name {
            root.context().register_portal(name, &loader);
        }
        loader
    }

    pub fn downgrade(&self) -> WeakLoader {
        WeakLoader(Rc::downgrade(&self.inner))
    }

    pub fn region(&self) -> &LazyRegion {
        &self.inner.region
    }

    /// Host of the loaded content. Events fired inside it target it.
    pub fn host(&self) -> &TemplateHost {
        &self.inner.content
    }

    pub fn phase(&self) -> LoaderPhase {
        self.inner.phase.get()
    }

    pub fn phase_signal(&self) -> impl zoon::Signal<Item = LoaderPhase> + use<> {
        self.inner.phase.signal()
    }

    pub fn mount(&self) {
        self.inner.mounted.set(true);
        self.fetch_if_due();
    }

    pub fn unmount(&self) {
        self.inner.mounted.set(false);
    }

    pub fn set_visible(&self, visible: bool) {
        let was_visible = self.inner.visible.replace(visible);
        if was_visible && !visible && self.phase() == LoaderPhase::Loaded {
            self.inner.hidden_after_load.set(true);
        }
        self.fetch_if_due();
    }

    /// Runs the loader event again regardless of phase.
    pub fn refetch(&self) {
        self.fetch();
    }

    pub fn change_current(&self, component: Component) {
        self.host().change_current(component);
    }

    /// Installs `schema` as the region's content. `on_loaded` runs against the
    /// declaring host once it synthesized.
    pub fn install(&self, schema: &str, on_loaded: Option<MethodCall>) -> Result<(), MountError> {
        let component = self
            .host()
            .component_by_template(schema, self.after_loaded(on_loaded))?;
        self.change_current(component);
        Ok(())
    }

    /// Installs `component` in the host this region was declared in.
    pub fn replace_root(&self, component: Component) {
        if let Some(root) = self.inner.root.upgrade() {
            root.change_current(component);
        }
    }

    fn fetch_if_due(&self) {
        if !self.inner.mounted.get() || !self.inner.visible.get() {
            return;
        }
        match self.phase() {
            LoaderPhase::Unmounted | LoaderPhase::Failed => self.fetch(),
            LoaderPhase::Loading => {}
            LoaderPhase::Loaded => {
                let policy = self.host().context().config().revisibility;
                if self.inner.hidden_after_load.replace(false)
                    && policy == RevisibilityPolicy::Refetch
                {
                    self.fetch();
                }
            }
        }
    }

    fn fetch(&self) {
        let fetch = self.inner.fetches.get() + 1;
        self.inner.fetches.set(fetch);
        self.inner.phase.set(LoaderPhase::Loading);
        let loader = self.clone();
        self.host()
            .context()
            .environment()
            .scheduler
            .spawn(Box::pin(async move {
                let result = loader.load(fetch).await;
                if loader.inner.fetches.get() != fetch {
                    return;
                }
                match result {
                    Ok(()) => loader.inner.phase.set(LoaderPhase::Loaded),
                    Err(error) => {
                        loader.inner.phase.set(LoaderPhase::Failed);
                        loader.host().context().diagnostics().error(format!(
                            "lazy region `{}` failed to load: {error}",
                            loader.region().loader.id
                        ));
                    }
                }
            }));
    }

    async fn load(&self, fetch: u64) -> Result<(), RuntimeError> {
        let context = self.host().context();
        let raw = dispatch(context, &self.region().loader, &NormalizedEvent::default()).await?;
        if self.inner.fetches.get() != fetch {
            return Ok(());
        }
        let response = EventResponse::parse(&raw.into_body()?)?;
        if let Some(states) = &response.states {
            context.merge_states(states);
        }
        let Some(schema) = response.schema() else {
            return Ok(());
        };
        self.install(schema, self.region().on_loaded.clone())?;
        Ok(())
    }

    fn after_loaded(&self, call: Option<MethodCall>) -> Option<AfterLoaded> {
        let call = call?;
        let root = self.inner.root.clone();
        Some(Box::new(move || {
            if let Some(root) = root.upgrade() {
                root.methods().call(&call, None);
            }
        }))
    }
}
