//! Rendered-surface capability
//!
//! Components decide *what* the page should look like through small pure
//! descriptions (`ControlState`, `TabView`, `LoaderPlan`) and hand them to a
//! [`Surface`] which performs the actual mutation. `MemorySurface` is the
//! in-process adapter used by the binary and the tests.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

/// Element holding the organization address the deposit is sent to
pub const RECIPIENT_ELEMENT: &str = "#erc360-address";
/// Button that triggers a structure refresh
pub const RELOAD_CONTROL: &str = "#reload-structure";
/// Container replaced with freshly fetched structure markup
pub const STRUCTURE_PANEL: &str = "#structure-modal";
/// Deposit amount text field
pub const AMOUNT_INPUT: &str = "#deposit-amount-input";
/// Full-page loader shown until the session bootstrap runs
pub const LOADER_ELEMENT: &str = "#loader";
/// Page body revealed once the loader goes away
pub const PAGE_ELEMENT: &str = "#page";

pub const ACTIVE_CLASS: &str = "is-active";
pub const LOADING_CLASS: &str = "is-loading";
pub const HIDDEN_CLASS: &str = "vanish";

/// Mutation primitives the page exposes to the interaction layer
pub trait Surface: Send + Sync {
    /// Text content of an element, if it exists
    fn text_of(&self, element: &str) -> Option<String>;

    /// Overwrite the value of an input element
    fn set_value(&self, element: &str, value: &str);

    fn set_disabled(&self, element: &str, disabled: bool);

    /// Add (`on = true`) or remove a CSS class
    fn set_class(&self, element: &str, class: &str, on: bool);

    /// Replace an element, markup included, with server-supplied markup
    fn replace_markup(&self, element: &str, markup: &str);

    /// Drop keyboard focus from an element
    fn blur(&self, element: &str);
}

/// Disabled/loading state of a trigger control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub disabled: bool,
    pub loading: bool,
}

impl ControlState {
    /// Enabled and idle
    pub const READY: ControlState = ControlState {
        disabled: false,
        loading: false,
    };

    /// Disabled with the spinner shown
    pub const BUSY: ControlState = ControlState {
        disabled: true,
        loading: true,
    };

    pub fn apply(&self, surface: &dyn Surface, element: &str) {
        surface.set_disabled(element, self.disabled);
        surface.set_class(element, LOADING_CLASS, self.loading);
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    texts: HashMap<String, String>,
    values: HashMap<String, String>,
    disabled: BTreeSet<String>,
    classes: HashMap<String, BTreeSet<String>>,
    markup: HashMap<String, String>,
    blurs: HashMap<String, usize>,
}

/// In-memory surface that records every mutation
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the text content of an element
    pub fn with_text(self, element: &str, text: &str) -> Self {
        self.state
            .lock()
            .texts
            .insert(element.to_string(), text.to_string());
        self
    }

    /// Seed a CSS class on an element
    pub fn with_class(self, element: &str, class: &str) -> Self {
        self.set_class(element, class, true);
        self
    }

    pub fn value(&self, element: &str) -> Option<String> {
        self.state.lock().values.get(element).cloned()
    }

    pub fn is_disabled(&self, element: &str) -> bool {
        self.state.lock().disabled.contains(element)
    }

    pub fn has_class(&self, element: &str, class: &str) -> bool {
        self.state
            .lock()
            .classes
            .get(element)
            .map(|set| set.contains(class))
            .unwrap_or(false)
    }

    /// Current control state as the page would render it
    pub fn control_state(&self, element: &str) -> ControlState {
        ControlState {
            disabled: self.is_disabled(element),
            loading: self.has_class(element, LOADING_CLASS),
        }
    }

    /// Markup last swapped into an element
    pub fn markup(&self, element: &str) -> Option<String> {
        self.state.lock().markup.get(element).cloned()
    }

    pub fn blur_count(&self, element: &str) -> usize {
        self.state.lock().blurs.get(element).copied().unwrap_or(0)
    }
}

impl Surface for MemorySurface {
    fn text_of(&self, element: &str) -> Option<String> {
        self.state.lock().texts.get(element).cloned()
    }

    fn set_value(&self, element: &str, value: &str) {
        self.state
            .lock()
            .values
            .insert(element.to_string(), value.to_string());
    }

    fn set_disabled(&self, element: &str, disabled: bool) {
        let mut state = self.state.lock();
        if disabled {
            state.disabled.insert(element.to_string());
        } else {
            state.disabled.remove(element);
        }
    }

    fn set_class(&self, element: &str, class: &str, on: bool) {
        let mut state = self.state.lock();
        let set = state.classes.entry(element.to_string()).or_default();
        if on {
            set.insert(class.to_string());
        } else {
            set.remove(class);
        }
    }

    fn replace_markup(&self, element: &str, markup: &str) {
        self.state
            .lock()
            .markup
            .insert(element.to_string(), markup.to_string());
    }

    fn blur(&self, element: &str) {
        *self
            .state
            .lock()
            .blurs
            .entry(element.to_string())
            .or_insert(0) += 1;
    }
}
