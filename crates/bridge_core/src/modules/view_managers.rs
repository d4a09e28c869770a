use serde_json::{Map, Value};

use crate::error::InvocationError;
use crate::handle::BridgeHandle;
use crate::module::{Args, NativeModule};

/// A module that backs one native view class
pub trait ViewManager {
    /// Class name the script side uses in `createView`
    fn view_name(&self) -> &str;

    /// Prop name -> prop type, exported through the UI manager's constants
    fn native_props(&self) -> Map<String, Value>;
}

/// A view manager described entirely by static tables
#[derive(Debug, Clone, Copy)]
pub struct ViewManagerModule {
    module_name: &'static str,
    view_name: &'static str,
    props: &'static [(&'static str, &'static str)],
}

impl ViewManagerModule {
    pub const fn new(
        module_name: &'static str,
        view_name: &'static str,
        props: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            module_name,
            view_name,
            props,
        }
    }
}

impl ViewManager for ViewManagerModule {
    fn view_name(&self) -> &str {
        self.view_name
    }

    fn native_props(&self) -> Map<String, Value> {
        self.props
            .iter()
            .map(|(name, kind)| ((*name).to_string(), Value::String((*kind).to_string())))
            .collect()
    }
}

impl NativeModule for ViewManagerModule {
    fn name(&self) -> &str {
        self.module_name
    }

    fn methods(&self) -> &[&'static str] {
        &[]
    }

    fn invoke(
        &self,
        _bridge: &BridgeHandle,
        method: &str,
        args: &Args<'_>,
    ) -> Result<(), InvocationError> {
        Err(args.reject(format!("unknown method {method}")))
    }

    fn as_view_manager(&self) -> Option<&dyn ViewManager> {
        Some(self)
    }
}

const VIEW_PROPS: &[(&str, &str)] = &[
    ("accessible", "bool"),
    ("accessibilityLabel", "string"),
    ("backgroundColor", "Color"),
    ("borderColor", "Color"),
    ("borderRadius", "number"),
    ("borderWidth", "number"),
    ("opacity", "number"),
    ("overflow", "string"),
    ("pointerEvents", "string"),
    ("testID", "string"),
    ("transform", "array"),
];

pub fn view_manager() -> ViewManagerModule {
    ViewManagerModule::new("RCTViewManager", "RCTView", VIEW_PROPS)
}

pub fn raw_text_manager() -> ViewManagerModule {
    ViewManagerModule::new("RCTRawTextManager", "RCTRawText", &[("text", "string")])
}

pub fn text_manager() -> ViewManagerModule {
    ViewManagerModule::new(
        "RCTTextManager",
        "RCTText",
        &[
            ("color", "Color"),
            ("fontFamily", "string"),
            ("fontSize", "number"),
            ("fontStyle", "string"),
            ("fontWeight", "string"),
            ("lineHeight", "number"),
            ("numberOfLines", "number"),
            ("textAlign", "string"),
        ],
    )
}

pub fn image_view_manager() -> ViewManagerModule {
    ViewManagerModule::new(
        "RCTImageViewManager",
        "RCTImageView",
        &[
            ("resizeMode", "string"),
            ("source", "Image"),
            ("tintColor", "Color"),
        ],
    )
}
