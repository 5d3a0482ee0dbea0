//! Browser ports and the zoon renderer.

use std::rc::Rc;

use crate::diagnostics::Diagnostics;
use crate::runtime::Environment;

mod bootstrap;
pub use bootstrap::{
    COMPONENT_REGISTERS_KEY, SERVER_SIDE_DATA_KEY, boot, read_server_side_data, run_component_registers,
};

mod head;
pub use head::DocumentHead;

mod navigator;
pub use navigator::WindowNavigator;

mod render;
pub use render::{WidgetRegistry, WidgetRender, classify_event, host_view};

mod scheduler;
pub use scheduler::TaskScheduler;

mod transport;
pub use transport::FetchTransport;

pub fn environment(diagnostics: &Diagnostics) -> Environment {
    Environment {
        transport: Rc::new(FetchTransport),
        navigator: Rc::new(WindowNavigator::new(diagnostics.clone())),
        scheduler: Rc::new(TaskScheduler),
        head: Rc::new(DocumentHead::new(diagnostics.clone())),
    }
}
