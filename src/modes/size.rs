//! Storage sizes and pack offsets.
//!
//! Sizes are computed once all mode equivalences are settled; pack element
//! offsets are assigned by a single left-to-right sweep honouring the
//! 8-byte-word target model.

use super::mode::{ModeId, ModeKind, Standard};
use super::registry::ModeRegistry;

const WORD: u32 = 8;
const POINTER: u32 = 8;
const PROC_DESCRIPTOR: u32 = 16;
const ROW_DESCRIPTOR: u32 = 24;

fn standard_size(s: Standard) -> u32 {
    match s {
        Standard::Void => 0,
        Standard::Bool | Standard::Char => 1,
        Standard::Int | Standard::Real | Standard::Bits | Standard::Format => 8,
        Standard::LongInt | Standard::LongReal | Standard::LongBits | Standard::Complex => 16,
        Standard::LongLongInt | Standard::LongLongReal | Standard::LongLongBits => 24,
        Standard::LongComplex => 32,
        Standard::LongLongComplex => 48,
        Standard::Bytes => 32,
        Standard::LongBytes => 64,
    }
}

fn align_up(offset: u32, size: u32) -> u32 {
    let align = size.clamp(1, WORD);
    offset.div_ceil(align) * align
}

/// Fix sizes for every registered mode and assign pack offsets.
pub fn compute_sizes(reg: &mut ModeRegistry) {
    let ids: Vec<ModeId> = reg.iter_ids().collect();
    for id in ids {
        let mut visiting = Vec::new();
        size_of(reg, id, &mut visiting);
    }
}

fn size_of(reg: &mut ModeRegistry, m: ModeId, visiting: &mut Vec<ModeId>) -> u32 {
    if reg[m].size != 0 {
        return reg[m].size;
    }
    // A cycle that reaches here is unguarded and was already flagged
    // ill-formed; report zero width rather than recursing.
    if visiting.contains(&m) {
        return 0;
    }
    visiting.push(m);
    let size = match reg[m].kind {
        ModeKind::Standard(s) => standard_size(s),
        ModeKind::Ref => POINTER,
        ModeKind::Proc => PROC_DESCRIPTOR,
        ModeKind::Row | ModeKind::Flex => ROW_DESCRIPTOR,
        ModeKind::Indicant => match reg[m].equivalent {
            Some(e) => size_of(reg, e, visiting),
            None => 0,
        },
        ModeKind::Struct => {
            let mut offset = 0u32;
            for i in 0..reg[m].pack.len() {
                let field = reg[m].pack[i].mode;
                let fs = size_of(reg, field, visiting);
                offset = align_up(offset, fs);
                let e = &mut reg[m].pack[i];
                e.size = fs;
                e.offset = offset;
                offset += fs;
            }
            align_up(offset, WORD)
        }
        ModeKind::Union => {
            // One tag word plus the widest alternative
            let mut widest = 0u32;
            for i in 0..reg[m].pack.len() {
                let alt = reg[m].pack[i].mode;
                let s = size_of(reg, alt, visiting);
                reg[m].pack[i].size = s;
                reg[m].pack[i].offset = WORD;
                widest = widest.max(s);
            }
            WORD + align_up(widest, WORD)
        }
        ModeKind::Series | ModeKind::Stowed => {
            let mut total = 0u32;
            for i in 0..reg[m].pack.len() {
                let member = reg[m].pack[i].mode;
                let s = size_of(reg, member, visiting);
                let aligned = align_up(total, s);
                reg[m].pack[i].size = s;
                reg[m].pack[i].offset = aligned;
                total = aligned + s;
            }
            align_up(total, WORD)
        }
        ModeKind::Rows => ROW_DESCRIPTOR,
        ModeKind::Hip | ModeKind::Error | ModeKind::Undefined | ModeKind::Vacuum => 0,
    };
    visiting.pop();
    reg[m].size = size;
    size
}
