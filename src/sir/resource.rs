use super::{ExprId, ResourceId};

/// Ownership verdict stamped onto a resource when its scope exits, for the
/// codegen pass to consult when emitting deinit calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Moved,
    MovedCond,
    InitCond,
}

/// Move-tracking node mirroring part of a type. A struct, tuple, or
/// closure contributes a resource when it has `__deinit__` or any
/// sub-field that does; sub-resources carry the field index they mirror.
#[derive(Debug, Clone)]
pub struct Resource {
    pub ty: ExprId,
    pub has_deinit: bool,
    pub ownership: Ownership,
    pub field_index: Option<u32>,
    pub sub_resources: Vec<ResourceId>,
}
