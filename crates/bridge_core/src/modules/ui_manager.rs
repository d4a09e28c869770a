//! Headless UI manager
//!
//! Keeps the shadow view tree the script side builds through `createView`,
//! `setChildren`, `manageChildren` and friends. Nothing is rendered; the tree can be
//! inspected with [`UiManager::snapshot`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::{BridgeError, InvocationError};
use crate::handle::BridgeHandle;
use crate::module::{Args, NativeModule};
use crate::registry::ModuleRegistry;

const METHODS: &[&str] = &[
    "removeRootView",
    "createView",
    "updateView",
    "manageChildren",
    "setChildren",
];

const ROOT_VIEW_CLASS: &str = "RCTRootView";

/// Root tags are spaced so script-allocated tags never collide with them
const ROOT_TAG_STEP: i64 = 10;

pub type Tag = i64;

/// Per-view-class entry in the UI manager's constants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewManagerConfig {
    #[serde(rename = "Manager")]
    pub manager: String,
    #[serde(rename = "NativeProps")]
    pub native_props: Map<String, Value>,
}

/// One node of the shadow tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowView {
    pub tag: Tag,
    pub class_name: String,
    pub root_tag: Tag,
    pub props: Map<String, Value>,
    pub children: Vec<Tag>,
    #[serde(skip)]
    pub parent: Option<Tag>,
}

/// `UIManager`
#[derive(Debug)]
pub struct UiManager {
    bridge: RefCell<Option<BridgeHandle>>,
    view_managers: RefCell<IndexMap<String, ViewManagerConfig>>,
    views: RefCell<BTreeMap<Tag, ShadowView>>,
    roots: RefCell<Vec<Tag>>,
    next_root_tag: Cell<Tag>,
}

impl Default for UiManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UiManager {
    pub fn new() -> Self {
        Self {
            bridge: RefCell::new(None),
            view_managers: RefCell::new(IndexMap::new()),
            views: RefCell::new(BTreeMap::new()),
            roots: RefCell::new(Vec::new()),
            next_root_tag: Cell::new(1),
        }
    }

    /// Record every view manager registered so far, in id order
    pub fn collect_view_managers(&self, registry: &ModuleRegistry) {
        let mut view_managers = self.view_managers.borrow_mut();
        for module in registry.modules() {
            if let Some(manager) = module.module().as_view_manager() {
                debug!(
                    "View manager {} handles {}",
                    module.name(),
                    manager.view_name()
                );
                view_managers.insert(
                    manager.view_name().to_string(),
                    ViewManagerConfig {
                        manager: module.name().to_string(),
                        native_props: manager.native_props(),
                    },
                );
            }
        }
    }

    pub fn view_names(&self) -> Vec<String> {
        self.view_managers.borrow().keys().cloned().collect()
    }

    /// Allocate a root view and return its tag
    pub fn add_root_view(&self) -> Tag {
        let tag = self.next_root_tag.get();
        self.next_root_tag.set(tag + ROOT_TAG_STEP);
        self.views.borrow_mut().insert(
            tag,
            ShadowView {
                tag,
                class_name: ROOT_VIEW_CLASS.to_string(),
                root_tag: tag,
                props: Map::new(),
                children: Vec::new(),
                parent: None,
            },
        );
        self.roots.borrow_mut().push(tag);
        tag
    }

    /// Ask the script side to render `app_key` into `root_tag`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] before the module has been registered with
    /// an engine
    pub fn run_application(
        &self,
        app_key: &str,
        root_tag: Tag,
        initial_props: Value,
    ) -> Result<(), BridgeError> {
        let bridge = self.bridge.borrow();
        let bridge = bridge.as_ref().ok_or_else(|| {
            BridgeError::Configuration("UIManager is not attached to a bridge".to_string())
        })?;
        bridge.enqueue_js_call(
            "AppRegistry",
            "runApplication",
            vec![
                json!(app_key),
                json!({ "rootTag": root_tag, "initialProps": initial_props }),
            ],
        );
        Ok(())
    }

    pub fn view(&self, tag: Tag) -> Option<ShadowView> {
        self.views.borrow().get(&tag).cloned()
    }

    pub fn view_count(&self) -> usize {
        self.views.borrow().len()
    }

    /// The tree under every root view, as nested JSON
    pub fn snapshot(&self) -> Value {
        let views = self.views.borrow();
        let roots = self.roots.borrow();
        Value::Array(roots.iter().map(|tag| render(&views, *tag)).collect())
    }

    fn create_view(&self, args: &Args<'_>) -> Result<(), InvocationError> {
        let tag: Tag = args.get(0)?;
        let class_name: String = args.get(1)?;
        let root_tag: Tag = args.get(2)?;
        let props = args.optional::<Map<String, Value>>(3)?.unwrap_or_default();

        if !self.view_managers.borrow().contains_key(&class_name) {
            return Err(args.reject(format!("no view manager for {class_name}")));
        }

        let mut views = self.views.borrow_mut();
        if views.contains_key(&tag) {
            return Err(args.reject(format!("view {tag} already exists")));
        }
        views.insert(
            tag,
            ShadowView {
                tag,
                class_name,
                root_tag,
                props: strip_nulls(props),
                children: Vec::new(),
                parent: None,
            },
        );
        Ok(())
    }

    fn update_view(&self, args: &Args<'_>) -> Result<(), InvocationError> {
        let tag: Tag = args.get(0)?;
        let props = args.optional::<Map<String, Value>>(2)?.unwrap_or_default();

        let mut views = self.views.borrow_mut();
        let view = views
            .get_mut(&tag)
            .ok_or_else(|| args.reject(format!("no view with tag {tag}")))?;
        for (key, value) in props {
            if value.is_null() {
                view.props.remove(&key);
            } else {
                view.props.insert(key, value);
            }
        }
        Ok(())
    }

    fn set_children(&self, args: &Args<'_>) -> Result<(), InvocationError> {
        let container: Tag = args.get(0)?;
        let children: Vec<Tag> = args.get(1)?;

        let mut views = self.views.borrow_mut();
        if !views.contains_key(&container) {
            return Err(args.reject(format!("no view with tag {container}")));
        }
        self.check_attachable(&views, container, &children, args)?;

        let previous = views
            .get(&container)
            .map(|view| view.children.clone())
            .unwrap_or_default();
        for orphan in previous.iter().filter(|tag| !children.contains(tag)) {
            if let Some(view) = views.get_mut(orphan) {
                view.parent = None;
            }
        }
        attach(&mut views, container, &children);
        if let Some(view) = views.get_mut(&container) {
            view.children = children;
        }
        Ok(())
    }

    /// Rejects unknown, duplicate and root tags, and any tag that is `container` or one
    /// of its ancestors
    fn check_attachable(
        &self,
        views: &BTreeMap<Tag, ShadowView>,
        container: Tag,
        tags: &[Tag],
        args: &Args<'_>,
    ) -> Result<(), InvocationError> {
        let mut seen = HashSet::new();
        let ancestors = ancestors(views, container);
        let roots = self.roots.borrow();
        for tag in tags {
            if !views.contains_key(tag) {
                return Err(args.reject(format!("no view with tag {tag}")));
            }
            if !seen.insert(*tag) {
                return Err(args.reject(format!("view {tag} is listed twice")));
            }
            if roots.contains(tag) {
                return Err(args.reject(format!("root view {tag} cannot be a child")));
            }
            if ancestors.contains(tag) {
                return Err(args.reject(format!(
                    "view {tag} cannot be a child of its own descendant {container}"
                )));
            }
        }
        Ok(())
    }

    /// Moves, removals and insertions are computed against the current children and
    /// applied together; any invalid index rejects the whole call.
    fn manage_children(&self, args: &Args<'_>) -> Result<(), InvocationError> {
        let container: Tag = args.get(0)?;
        let move_from: Vec<usize> = args.optional(1)?.unwrap_or_default();
        let move_to: Vec<usize> = args.optional(2)?.unwrap_or_default();
        let add_tags: Vec<Tag> = args.optional(3)?.unwrap_or_default();
        let add_at: Vec<usize> = args.optional(4)?.unwrap_or_default();
        let remove_from: Vec<usize> = args.optional(5)?.unwrap_or_default();

        if move_from.len() != move_to.len() {
            return Err(args.reject("moveFrom and moveTo differ in length"));
        }
        if add_tags.len() != add_at.len() {
            return Err(args.reject("addChildTags and addAtIndices differ in length"));
        }

        let mut views = self.views.borrow_mut();
        let current = views
            .get(&container)
            .ok_or_else(|| args.reject(format!("no view with tag {container}")))?
            .children
            .clone();

        let mut taken = HashSet::new();
        for index in move_from.iter().chain(&remove_from) {
            if *index >= current.len() {
                return Err(args.reject(format!(
                    "index {index} out of range for {container} ({} children)",
                    current.len()
                )));
            }
            if !taken.insert(*index) {
                return Err(args.reject(format!(
                    "index {index} is moved or removed more than once"
                )));
            }
        }
        self.check_attachable(&views, container, &add_tags, args)?;
        if let Some(tag) = add_tags.iter().find(|tag| current.contains(tag)) {
            return Err(args.reject(format!("view {tag} is already a child of {container}")));
        }

        let mut children: Vec<Tag> = current
            .iter()
            .enumerate()
            .filter(|(index, _)| !taken.contains(index))
            .map(|(_, tag)| *tag)
            .collect();

        let mut inserts: Vec<(usize, Tag)> = move_to
            .iter()
            .zip(&move_from)
            .map(|(to, from)| (*to, current[*from]))
            .chain(add_at.iter().copied().zip(add_tags.iter().copied()))
            .collect();
        inserts.sort_by_key(|(index, _)| *index);

        for (index, tag) in inserts {
            if index > children.len() {
                return Err(args.reject(format!(
                    "insert index {index} out of range for {container}"
                )));
            }
            children.insert(index, tag);
        }

        let removed: Vec<Tag> = remove_from.iter().map(|index| current[*index]).collect();
        attach(&mut views, container, &add_tags);
        if let Some(view) = views.get_mut(&container) {
            view.children = children;
        }
        for tag in removed {
            drop_subtree(&mut views, tag);
        }
        Ok(())
    }

    fn remove_root_view(&self, args: &Args<'_>) -> Result<(), InvocationError> {
        let root_tag: Tag = args.get(0)?;

        let mut roots = self.roots.borrow_mut();
        let Some(position) = roots.iter().position(|tag| *tag == root_tag) else {
            return Err(args.reject(format!("no root view with tag {root_tag}")));
        };
        roots.remove(position);
        drop_subtree(&mut self.views.borrow_mut(), root_tag);
        Ok(())
    }
}

fn strip_nulls(props: Map<String, Value>) -> Map<String, Value> {
    props.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

/// `tag` and every view above it
fn ancestors(views: &BTreeMap<Tag, ShadowView>, tag: Tag) -> HashSet<Tag> {
    let mut chain = HashSet::new();
    let mut next = Some(tag);
    while let Some(tag) = next {
        if !chain.insert(tag) {
            break;
        }
        next = views.get(&tag).and_then(|view| view.parent);
    }
    chain
}

/// Point `tags` at `container`, detaching them from any other parent
fn attach(views: &mut BTreeMap<Tag, ShadowView>, container: Tag, tags: &[Tag]) {
    for tag in tags {
        let previous = views
            .get_mut(tag)
            .and_then(|view| view.parent.replace(container));
        if let Some(parent) = previous.filter(|parent| *parent != container)
            && let Some(view) = views.get_mut(&parent)
        {
            view.children.retain(|child| child != tag);
        }
    }
}

fn drop_subtree(views: &mut BTreeMap<Tag, ShadowView>, tag: Tag) {
    let mut stack = vec![tag];
    while let Some(tag) = stack.pop() {
        if let Some(view) = views.remove(&tag) {
            stack.extend(view.children);
        }
    }
}

fn render(views: &BTreeMap<Tag, ShadowView>, tag: Tag) -> Value {
    let Some(view) = views.get(&tag) else {
        return Value::Null;
    };
    json!({
        "tag": view.tag,
        "className": view.class_name,
        "props": view.props,
        "children": view
            .children
            .iter()
            .map(|child| render(views, *child))
            .collect::<Vec<_>>(),
    })
}

impl NativeModule for UiManager {
    fn name(&self) -> &str {
        "UIManager"
    }

    fn methods(&self) -> &[&'static str] {
        METHODS
    }

    fn constants(&self) -> Map<String, Value> {
        self.view_managers
            .borrow()
            .iter()
            .map(|(view, config)| {
                (
                    view.clone(),
                    serde_json::to_value(config).unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    fn set_bridge(&self, bridge: BridgeHandle) {
        *self.bridge.borrow_mut() = Some(bridge);
    }

    fn invoke(
        &self,
        _bridge: &BridgeHandle,
        method: &str,
        args: &Args<'_>,
    ) -> Result<(), InvocationError> {
        match method {
            "removeRootView" => self.remove_root_view(args),
            "createView" => self.create_view(args),
            "updateView" => self.update_view(args),
            "manageChildren" => self.manage_children(args),
            "setChildren" => self.set_children(args),
            other => Err(args.reject(format!("unknown method {other}"))),
        }
    }
}
