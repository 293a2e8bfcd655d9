//! The ordered, append-only middleware registry.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::condition::Conditions;
use crate::handler::{HandlerKind, Middleware};
use crate::input::Input;
use crate::mount::MountPath;

/// One registered middleware together with its match rules.
///
/// Entries are immutable once registered. Several handlers registered in
/// one call share the same conditions and mount path.
pub struct Entry<O> {
    pub(crate) conditions: Arc<Conditions>,
    pub(crate) mount: Option<Arc<MountPath>>,
    pub(crate) middleware: Middleware<O>,
    pub(crate) stop_on_match: bool,
}

impl<O> Entry<O> {
    /// Returns the handler kind.
    pub fn kind(&self) -> HandlerKind {
        self.middleware.kind()
    }

    /// Returns whether completing this entry ends the run.
    pub fn stops_on_match(&self) -> bool {
        self.stop_on_match
    }

    /// Returns the compiled mount path, if path mounting applies.
    pub fn mount(&self) -> Option<&MountPath> {
        self.mount.as_deref()
    }

    /// Returns the field conditions.
    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Returns whether this entry applies to `input`.
    ///
    /// The mount path is checked first, then every field condition.
    pub fn matches(&self, input: &Input, path_property: Option<&str>) -> bool {
        if let (Some(mount), Some(property)) = (&self.mount, path_property) {
            if !mount.matches(input, property) {
                return false;
            }
        }
        self.conditions.matches(input)
    }

    /// Returns the input this entry's handler receives.
    pub(crate) fn bind_input(&self, input: &Input, path_property: Option<&str>) -> Input {
        match (&self.mount, path_property) {
            (Some(mount), Some(property)) => mount.bind(input, property),
            _ => input.clone(),
        }
    }
}

impl<O> std::fmt::Debug for Entry<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("kind", &self.middleware.kind())
            .field("conditions", &self.conditions.len())
            .field("mount", &self.mount.as_ref().map(|m| m.pattern().as_str()))
            .field("stop_on_match", &self.stop_on_match)
            .finish()
    }
}

/// The rules shared by the handlers of one registration call.
pub(crate) struct EntryTemplate {
    pub(crate) conditions: Arc<Conditions>,
    pub(crate) mount: Option<Arc<MountPath>>,
    pub(crate) stop_on_match: bool,
}

impl EntryTemplate {
    fn instantiate<O>(&self, middleware: Middleware<O>) -> Entry<O> {
        let stop_on_match = self.stop_on_match || middleware.kind() == HandlerKind::Basic;
        Entry {
            conditions: Arc::clone(&self.conditions),
            mount: self.mount.clone(),
            middleware,
            stop_on_match,
        }
    }
}

/// Registered entries in registration order.
pub(crate) struct Registry<O> {
    entries: RwLock<Vec<Arc<Entry<O>>>>,
}

impl<O> Registry<O> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends one entry per handler, all built from `template`.
    pub(crate) fn extend(&self, template: &EntryTemplate, handlers: Vec<Middleware<O>>) {
        let mut entries = self.entries.write();
        for middleware in handlers {
            let entry = template.instantiate(middleware);
            trace!(index = entries.len(), entry = ?entry, "Registered middleware");
            entries.push(Arc::new(entry));
        }
    }

    /// Returns the entries applying to `input`, in registration order.
    pub(crate) fn matching(&self, input: &Input, path_property: Option<&str>) -> Vec<Arc<Entry<O>>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.matches(input, path_property))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
