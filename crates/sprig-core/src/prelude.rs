pub use crate::classify::{NodeKind, classify, to_vnode};
pub use crate::component::{
    Component, ComponentHandle, Pure, State, StatePatch, This, class,
};
pub use crate::config::RuntimeConfig;
pub use crate::dom::{Document, HostId};
pub use crate::effects::{Dispose, on_unmount};
pub use crate::element::{
    Child, Children, Element, ElementType, Props, RawProps, Ref, RefProp, RefTarget,
    create_element, create_ref, forward_ref, function,
};
pub use crate::error::{Error, Result};
pub use crate::events::{
    DispatchOutcome, EventData, EventHandler, NativeEvent, SyntheticEvent, on,
};
pub use crate::hooks::{
    Dispatch, StateSetter, use_effect, use_imperative_handle, use_layout_effect, use_reducer,
    use_ref, use_state,
};
pub use crate::runtime::{RenderStats, Runtime};
pub use crate::value::{Record, Value, shallow_equal};
pub use crate::{element, record};
