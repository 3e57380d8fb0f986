//! Marshalling Strategy Resolver
//!
//! Codec choice is a pure function of direction, decided while
//! transforming: parameters flow to native code and get Codec A, return
//! values flow back and get Codec B. No per-call or runtime lookup is
//! involved; the emitter bakes the chosen codec into each shim.

use rebind_ir::model::{Codec, FunctionSig, MarshalDirection, Slot, SlotDirection};

use crate::registry::MarshalSlot;
use crate::typemap::{is_char_pointer, is_string_like};

/// The codec for a data-flow direction.
pub const fn resolve(direction: MarshalDirection) -> Codec {
    match direction {
        MarshalDirection::ToNative => Codec::Utf8ToNative,
        MarshalDirection::FromNative => Codec::Utf8FromNative,
    }
}

/// The direction a value in `slot` crosses the boundary.
pub const fn flow_of(slot: SlotDirection) -> MarshalDirection {
    match slot {
        SlotDirection::In | SlotDirection::Out => MarshalDirection::ToNative,
        SlotDirection::Return => MarshalDirection::FromNative,
    }
}

/// Attach the default codec to every string-like slot.
pub fn assign_defaults(sig: &mut FunctionSig) {
    for slot in sig.params.iter_mut().chain(Some(&mut sig.ret)) {
        slot.codec = is_string_like(&slot.ty).then(|| resolve(flow_of(slot.direction)));
    }
}

/// Why an override could not be applied.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum OverrideConflict {
    NoSuchSlot,
    NotAString,
    /// The direction contradicts the slot's data flow.
    Direction {
        requested: MarshalDirection,
        actual: MarshalDirection,
    },
}

/// Force `direction`'s codec onto one slot.
///
/// Overrides may extend marshalling to non-`const` `char*` slots, but can
/// never reverse data flow.
pub fn apply_override(
    sig: &mut FunctionSig,
    target: &MarshalSlot,
    direction: MarshalDirection,
) -> Result<(), OverrideConflict> {
    let slot: &mut Slot = match target {
        MarshalSlot::Return => &mut sig.ret,
        MarshalSlot::Param(name) => sig
            .params
            .iter_mut()
            .find(|p| p.name == *name)
            .ok_or(OverrideConflict::NoSuchSlot)?,
    };
    if !is_char_pointer(&slot.ty) {
        return Err(OverrideConflict::NotAString);
    }
    let actual = flow_of(slot.direction);
    if actual != direction {
        return Err(OverrideConflict::Direction {
            requested: direction,
            actual,
        });
    }
    slot.codec = Some(resolve(direction));
    Ok(())
}
