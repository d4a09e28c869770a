//! Plugin view managers that a config can opt into by name

use bridge_core::ModuleFactory;
use bridge_core::factory;
use bridge_core::modules::ViewManagerModule;
use log::{debug, warn};

const SCROLL_VIEW_PROPS: &[(&str, &str)] = &[
    ("contentInset", "UIEdgeInsets"),
    ("contentOffset", "CGPoint"),
    ("horizontal", "bool"),
    ("pagingEnabled", "bool"),
    ("scrollEnabled", "bool"),
    ("showsHorizontalScrollIndicator", "bool"),
    ("showsVerticalScrollIndicator", "bool"),
];

const NAVIGATOR_PROPS: &[(&str, &str)] = &[("requestedTopOfStack", "number")];

const PAGE_PROPS: &[(&str, &str)] = &[("title", "string"), ("visible", "bool")];

/// Name, module name, view name, native props
type Entry = (
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str)],
);

pub const CATALOG: &[Entry] = &[
    ("ScrollView", "RCTScrollViewManager", "RCTScrollView", SCROLL_VIEW_PROPS),
    ("Navigator", "RCTNavigatorManager", "RCTNavigator", NAVIGATOR_PROPS),
    ("Page", "RCTPageManager", "RCTPage", PAGE_PROPS),
];

/// Names a config may list under `plugins`
pub fn available() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, ..)| *name)
}

/// Factories for the named plugins, in the order given
///
/// Unknown names are skipped with a warning.
pub fn factories(names: &[String]) -> Vec<Box<dyn ModuleFactory>> {
    names
        .iter()
        .filter_map(|name| {
            let Some(&(_, module_name, view_name, props)) =
                CATALOG.iter().find(|(entry, ..)| *entry == name.as_str())
            else {
                warn!(
                    "Unknown plugin {name}, expected one of: {}",
                    available().collect::<Vec<_>>().join(", ")
                );
                return None;
            };
            debug!("Enabling plugin {name} ({module_name})");
            Some(factory(move || {
                ViewManagerModule::new(module_name, view_name, props)
            }))
        })
        .collect()
}
