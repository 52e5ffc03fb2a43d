//! # Synthetic events
//!
//! Host elements register handlers through `on<Event>` props (`onClick`,
//! `onInput`, ...). The reconciler stores each handler on its host node and
//! records the event type as *delegated*: conceptually a single listener per
//! type sits on the document root. [`Runtime::dispatch_event`] plays the role
//! of that root listener. It walks from the target up to the root, invoking
//! handlers in bubbling order, and runs the whole walk inside
//! [`Runtime::batched_updates`] so every state change caused by one native
//! event is flushed exactly once.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use sprig_core::*;
//!
//! let rt = Runtime::new();
//! let root = rt.create_container("div");
//! let clicks = Rc::new(Cell::new(0));
//! let c = clicks.clone();
//! rt.render(element!("button", { "id" => "b", "onClick" => on(move |_| c.set(c.get() + 1)) }), root)
//!     .unwrap();
//!
//! let button = rt.document().get_element_by_id(root, "b").unwrap();
//! rt.dispatch_event(NativeEvent::new("click", button));
//! assert_eq!(clicks.get(), 1);
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use web_time::Duration;

use crate::dom::HostId;
use crate::runtime::Runtime;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventFlags: u8 {
        const PROPAGATION_STOPPED = 1 << 0;
        const DEFAULT_PREVENTED = 1 << 1;
    }
}

#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&mut SyntheticEvent)>);

impl EventHandler {
    pub fn new(f: impl Fn(&mut SyntheticEvent) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &mut SyntheticEvent) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &EventHandler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler")
    }
}

/// Shorthand for building an `on<Event>` prop value.
pub fn on(f: impl Fn(&mut SyntheticEvent) + 'static) -> EventHandler {
    EventHandler::new(f)
}

/// `onClick` -> `click`. Anything not shaped like `on` + capitalised name is
/// not an event prop.
pub fn event_name(prop: &str) -> Option<String> {
    let rest = prop.strip_prefix("on")?;
    let first = rest.chars().next()?;
    first.is_ascii_uppercase().then(|| rest.to_ascii_lowercase())
}

#[derive(Clone, Default)]
pub enum EventData {
    #[default]
    None,
    Mouse {
        x: f64,
        y: f64,
        button: u8,
    },
    Keyboard {
        key: String,
    },
    Input {
        value: String,
    },
    Custom(Rc<dyn Any>),
}

impl fmt::Debug for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventData::None => f.write_str("None"),
            EventData::Mouse { x, y, button } => f
                .debug_struct("Mouse")
                .field("x", x)
                .field("y", y)
                .field("button", button)
                .finish(),
            EventData::Keyboard { key } => f.debug_struct("Keyboard").field("key", key).finish(),
            EventData::Input { value } => f.debug_struct("Input").field("value", value).finish(),
            EventData::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// What the host reports before the runtime wraps it.
#[derive(Clone, Debug)]
pub struct NativeEvent {
    kind: Rc<str>,
    target: HostId,
    data: EventData,
}

impl NativeEvent {
    pub fn new(kind: &str, target: HostId) -> Self {
        Self {
            kind: Rc::from(kind.to_ascii_lowercase()),
            target,
            data: EventData::None,
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    pub fn click(target: HostId) -> Self {
        Self::new("click", target).with_data(EventData::Mouse {
            x: 0.0,
            y: 0.0,
            button: 0,
        })
    }

    pub fn input(target: HostId, value: impl Into<String>) -> Self {
        Self::new("input", target).with_data(EventData::Input {
            value: value.into(),
        })
    }

    pub fn key_down(target: HostId, key: impl Into<String>) -> Self {
        Self::new("keydown", target).with_data(EventData::Keyboard { key: key.into() })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn target(&self) -> HostId {
        self.target
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }
}

pub struct SyntheticEvent {
    kind: Rc<str>,
    target: HostId,
    current_target: HostId,
    data: EventData,
    flags: EventFlags,
    timestamp: Duration,
}

impl SyntheticEvent {
    fn new(native: &NativeEvent, timestamp: Duration) -> Self {
        Self {
            kind: native.kind.clone(),
            target: native.target,
            current_target: native.target,
            data: native.data.clone(),
            flags: EventFlags::empty(),
            timestamp,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn target(&self) -> HostId {
        self.target
    }

    /// The node whose handler is running.
    pub fn current_target(&self) -> HostId {
        self.current_target
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Value carried by an input event.
    pub fn value(&self) -> Option<&str> {
        match &self.data {
            EventData::Input { value } => Some(value),
            _ => None,
        }
    }

    pub fn prevent_default(&mut self) {
        self.flags.insert(EventFlags::DEFAULT_PREVENTED);
    }

    pub fn stop_propagation(&mut self) {
        self.flags.insert(EventFlags::PROPAGATION_STOPPED);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.flags.contains(EventFlags::DEFAULT_PREVENTED)
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.flags.contains(EventFlags::PROPAGATION_STOPPED)
    }

    pub fn flags(&self) -> EventFlags {
        self.flags
    }
}

impl fmt::Debug for SyntheticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticEvent")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Flags mirrored back onto the native event once dispatch finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    /// At least one handler ran.
    pub handled: bool,
}

impl Runtime {
    /// Delivers a native event through the root listener for its type.
    ///
    /// Events of a type no rendered element listens for, or whose target is
    /// not connected to the document root, are not observed at all.
    pub fn dispatch_event(&self, native: NativeEvent) -> DispatchOutcome {
        let inner = &self.inner;
        if !inner.delegated.borrow().contains(native.kind()) {
            log::trace!("no root listener for '{}'", native.kind());
            return DispatchOutcome::default();
        }

        let path: SmallVec<[HostId; 16]> = {
            let doc = inner.document.borrow();
            let mut path = SmallVec::new();
            let mut cur = Some(native.target());
            while let Some(id) = cur {
                path.push(id);
                cur = doc.parent(id);
            }
            if path.last() != Some(&doc.body()) {
                log::debug!("'{}' target {:?} is detached", native.kind(), native.target());
                return DispatchOutcome::default();
            }
            path
        };

        let timestamp = inner.scheduler.borrow().now();
        self.batched_updates(|| {
            let mut event = SyntheticEvent::new(&native, timestamp);
            let mut handled = false;
            for node in path {
                let handler = inner.document.borrow().listener(node, native.kind()).cloned();
                let Some(handler) = handler else {
                    continue;
                };
                event.current_target = node;
                handled = true;
                handler.call(&mut event);
                if event.is_propagation_stopped() {
                    break;
                }
            }
            DispatchOutcome {
                default_prevented: event.is_default_prevented(),
                propagation_stopped: event.is_propagation_stopped(),
                handled,
            }
        })
    }
}
