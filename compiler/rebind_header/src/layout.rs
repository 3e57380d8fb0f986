//! Data layout of C types on LP64 (x86-64 System V) targets.
//!
//! Only needed to lower bit-fields: a run of bit-fields becomes a byte
//! array covering exactly the bytes the C compiler allocates for it, so
//! every other member keeps its C offset. Sizes of tagged types and
//! typedefs are learned as their definitions are parsed.

use rebind_ir::ast::{Aggregate, Field};
use rebind_ir::{CType, IntKind};
use rustc_hash::FxHashMap;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Layout {
    pub(crate) size: u64,
    pub(crate) align: u64,
}

impl Layout {
    fn scalar(size: u64) -> Self {
        Layout { size, align: size }
    }
}

/// A member as declared, before bit-fields are lowered.
#[derive(Clone, Debug)]
pub(crate) struct Member {
    /// `None` only for unnamed bit-fields.
    pub(crate) name: Option<String>,
    pub(crate) ty: CType,
    pub(crate) bits: Option<u64>,
}

/// Layouts of the tagged types and typedefs defined so far.
#[derive(Clone, Debug, Default)]
pub(crate) struct Layouts {
    known: FxHashMap<CType, Layout>,
}

fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align.max(1)) * align.max(1)
}

fn int_size(kind: IntKind) -> u64 {
    match kind {
        IntKind::Char | IntKind::SChar | IntKind::UChar | IntKind::I8 | IntKind::U8 => 1,
        IntKind::Short | IntKind::UShort | IntKind::I16 | IntKind::U16 => 2,
        IntKind::Int | IntKind::UInt | IntKind::I32 | IntKind::U32 => 4,
        IntKind::Long
        | IntKind::ULong
        | IntKind::LongLong
        | IntKind::ULongLong
        | IntKind::I64
        | IntKind::U64
        | IntKind::Size
        | IntKind::SSize
        | IntKind::IntPtr
        | IntKind::UIntPtr => 8,
    }
}

/// Unsigned integer whose alignment is `align`.
fn align_marker(align: u64) -> CType {
    let kind = match align {
        1 => IntKind::UChar,
        2 => IntKind::UShort,
        4 => IntKind::UInt,
        _ => IntKind::ULongLong,
    };
    CType::Array {
        elem: Box::new(CType::Int(kind)),
        len: Some(0),
    }
}

fn byte_storage(len: u64) -> CType {
    CType::Array {
        elem: Box::new(CType::Int(IntKind::UChar)),
        len: Some(len),
    }
}

impl Layouts {
    pub(crate) fn of(&self, ty: &CType) -> Option<Layout> {
        match ty {
            CType::Void => None,
            CType::Bool => Some(Layout::scalar(1)),
            CType::Int(kind) => Some(Layout::scalar(int_size(*kind))),
            CType::Float => Some(Layout::scalar(4)),
            CType::Double | CType::Pointer { .. } | CType::FunctionPointer { .. } => {
                Some(Layout::scalar(8))
            }
            CType::LongDouble => Some(Layout::scalar(16)),
            CType::Array { elem, len } => {
                let elem = self.of(elem)?;
                Some(Layout {
                    size: elem.size.checked_mul(len.unwrap_or(0))?,
                    align: elem.align,
                })
            }
            CType::Named(_) | CType::Struct(_) | CType::Union(_) | CType::Enum(_) => {
                self.known.get(ty).copied()
            }
        }
    }

    pub(crate) fn record(&mut self, ty: CType, layout: Layout) {
        self.known.insert(ty, layout);
    }

    /// An enum is `int` sized unless an enumerator needs more.
    pub(crate) fn record_enum(&mut self, name: &str, values: impl IntoIterator<Item = i64>) {
        let fits = |v: i64| i32::try_from(v).is_ok() || u32::try_from(v).is_ok();
        let size = if values.into_iter().all(fits) { 4 } else { 8 };
        self.record(CType::Enum(name.to_string()), Layout::scalar(size));
    }

    /// Layout of a struct or union whose fields are all known.
    pub(crate) fn aggregate(&self, aggregate: Aggregate, fields: &[Field]) -> Option<Layout> {
        let mut end = 0u64;
        let mut align = 1u64;
        for field in fields {
            let layout = self.of(&field.ty)?;
            align = align.max(layout.align);
            end = match aggregate {
                Aggregate::Struct => align_up(end, layout.align) + layout.size,
                Aggregate::Union => end.max(layout.size),
            };
        }
        Some(Layout {
            size: align_up(end, align),
            align,
        })
    }

    /// Replace bit-fields with byte arrays that occupy the same bytes.
    ///
    /// Consecutive bit-fields share one `_bitfield_N` array; a leading
    /// zero-length `_bitfield_align` array carries the alignment named
    /// bit-fields give the aggregate. `None` when some member's layout is
    /// unknown or a width does not fit its type.
    pub(crate) fn lower_bitfields(
        &self,
        aggregate: Aggregate,
        members: Vec<Member>,
    ) -> Option<Vec<Field>> {
        let mut fields = Vec::new();
        let mut bit = 0u64;
        let mut run_start: Option<u64> = None;
        let mut storage = 0usize;
        let mut field_align = 1u64;
        let mut bitfield_align = 1u64;

        let mut close_run = |fields: &mut Vec<Field>, start: Option<u64>, bit: u64| {
            let Some(start) = start else { return };
            let len = bit.div_ceil(8).saturating_sub(start);
            if len > 0 {
                storage += 1;
                fields.push(Field {
                    name: format!("_bitfield_{storage}"),
                    ty: byte_storage(len),
                });
            }
        };

        for member in members {
            let layout = self.of(&member.ty)?;
            match member.bits {
                Some(width) => {
                    let unit = layout.size * 8;
                    if width > unit {
                        return None;
                    }
                    if aggregate == Aggregate::Union {
                        bit = 0;
                        run_start = Some(0);
                    } else if run_start.is_none() {
                        run_start = Some(bit.div_ceil(8));
                    }
                    if width == 0 {
                        bit = align_up(bit, unit);
                    } else {
                        if bit / unit != (bit + width - 1) / unit {
                            bit = align_up(bit, unit);
                        }
                        bit += width;
                    }
                    if member.name.is_some() && width > 0 {
                        bitfield_align = bitfield_align.max(layout.align);
                    }
                    if aggregate == Aggregate::Union {
                        close_run(&mut fields, run_start.take(), bit);
                    }
                }
                None => {
                    close_run(&mut fields, run_start.take(), bit);
                    let name = member.name?;
                    field_align = field_align.max(layout.align);
                    let offset = match aggregate {
                        Aggregate::Struct => align_up(bit.div_ceil(8), layout.align),
                        Aggregate::Union => 0,
                    };
                    bit = (offset + layout.size) * 8;
                    fields.push(Field {
                        name,
                        ty: member.ty,
                    });
                }
            }
        }
        close_run(&mut fields, run_start.take(), bit);

        if bitfield_align > field_align {
            fields.insert(
                0,
                Field {
                    name: "_bitfield_align".to_string(),
                    ty: align_marker(bitfield_align),
                },
            );
        }
        Some(fields)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
