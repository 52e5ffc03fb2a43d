use crate::dom::HostId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("host node {0:?} no longer exists")]
    HostNodeMissing(HostId),
    #[error("host node {0:?} is not an element")]
    NotAnElement(HostId),
    #[error("cannot insert {child:?} under {parent:?}: it would create a cycle")]
    HierarchyRequest { parent: HostId, child: HostId },
    #[error("could not locate anchor: {0}")]
    MissingAnchor(String),
    #[error("update depth exceeded {0}; a lifecycle hook is probably calling set_state unconditionally")]
    UpdateDepthExceeded(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
