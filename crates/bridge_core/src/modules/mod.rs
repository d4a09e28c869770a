//! Built-in native modules

mod networking;
mod source_code;
mod timing;
mod ui_manager;
mod view_managers;

pub use networking::Networking;
pub use source_code::SourceCode;
pub use timing::Timing;
pub use ui_manager::{ShadowView, Tag, UiManager, ViewManagerConfig};
pub use view_managers::{
    ViewManager, ViewManagerModule, image_view_manager, raw_text_manager, text_manager,
    view_manager,
};

use crate::module::{ModuleFactory, factory};

/// The fixed internal module set, in registration order
pub fn internal_modules() -> Vec<Box<dyn ModuleFactory>> {
    vec![
        factory(Timing::new),
        factory(Networking::new),
        factory(view_manager),
        factory(raw_text_manager),
        factory(text_manager),
        factory(image_view_manager),
    ]
}
