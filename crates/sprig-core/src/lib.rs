//! # Sprig core
//!
//! A declarative UI runtime: you describe what the tree should look like as
//! [`Element`]s, and the runtime keeps a host tree (the [`Document`]) in sync
//! with that description, touching only what changed.
//!
//! There are four moving parts:
//!
//! - **Elements**: immutable descriptions built with [`create_element`] or the
//!   [`element!`] macro. An element's type is a host tag, a class component,
//!   a function component, a forwarded-ref component or text.
//! - **Class components**: types implementing [`Component`], with state,
//!   lifecycle methods and batched `set_state`.
//! - **Hooks**: [`use_state`], [`use_reducer`], [`use_effect`],
//!   [`use_layout_effect`], [`use_ref`] and [`use_imperative_handle`] give
//!   function components state and effects.
//! - **Events**: `on<Event>` props on host elements, delivered by
//!   [`Runtime::dispatch_event`] with bubbling and batching.
//!
//! ## Rendering
//!
//! ```rust
//! use sprig_core::*;
//!
//! fn greeting(props: &Props) -> Option<Element> {
//!     let name = props.get_str("name").unwrap_or("world");
//!     Some(element!("p", { "className" => "greeting" }, format!("Hello, {name}!")))
//! }
//!
//! let rt = Runtime::new();
//! let root = rt.create_container("div");
//! rt.render(element!(function(greeting), { "name" => "sprig" }), root).unwrap();
//!
//! let doc = rt.document();
//! assert_eq!(doc.text_content(root), "Hello, sprig!");
//! let p = doc.get_elements_by_tag_name(root, "p")[0];
//! assert_eq!(doc.attribute(p, "class"), Some("greeting"));
//! ```
//!
//! ## Keys
//!
//! Children are matched by `key` when their parent re-renders. Keyed children
//! keep their host node and component state when the list is reordered; only
//! new keys are created and only vanished keys are removed. Unkeyed children
//! are matched by position.
//!
//! ## Scheduling
//!
//! `set_state` and hook setters called from an event handler (or inside
//! [`Runtime::batched_updates`]) are queued and flushed once when the handler
//! returns. Elsewhere they apply synchronously. Layout effects run right
//! after the work that scheduled them; effects and timers run when the
//! embedder drives the scheduler with [`Runtime::run_until_idle`] or
//! [`Runtime::advance_timers_by`].

pub mod batch;
pub mod classify;
pub mod component;
pub mod config;
pub mod dom;
pub mod effects;
pub mod element;
pub mod error;
pub mod events;
pub mod hooks;
pub mod prelude;
pub mod reconcile;
pub mod runtime;
pub mod scheduler;
pub mod value;

mod tests;

pub use batch::*;
pub use classify::*;
pub use component::*;
pub use config::*;
pub use dom::*;
pub use effects::*;
pub use element::*;
pub use error::*;
pub use events::*;
pub use hooks::*;
pub use reconcile::VNodeId;
pub use runtime::{RenderStats, Runtime};
pub use scheduler::TimerId;
pub use value::*;
