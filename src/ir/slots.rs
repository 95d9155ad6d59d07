//! Local slot allocation
//!
//! One [`SlotAllocator`] is built per routine and dropped when the routine
//! is finished. Slots are handed out in declaration order:
//!
//! - slot 0 is the receiver (`this`) in instance routines
//! - parameters, then locals, take the next free slot
//! - `float` values take two consecutive slots, everything else one
//!
//! Block scopes shadow by name, but a slot is never handed out twice, so no
//! two variables of one routine share storage. Slot indices are 16 bits
//! wide; a routine that needs more gets [`SlotsExhausted`].

use crate::semantic::Type;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Every slot index of a routine is taken
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no slot left for local '{name}' ({next} slots in use)")]
pub struct SlotsExhausted {
    pub name: String,
    pub next: u16,
}

/// One row of a routine's slot table
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    pub name: String,
    pub slot: u16,
    pub ty: Type,
}

#[derive(Debug, Clone, Default)]
struct ScopeData {
    shadowed: Vec<(String, u16)>,
    declared: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SlotAllocator {
    visible: FxHashMap<String, u16>,
    table: Vec<LocalSlot>,
    scope_stack: Vec<ScopeData>,
    next: u16,
}

impl SlotAllocator {
    /// Allocator for a routine; instance routines get `this` in slot 0
    pub fn new(receiver: Option<&str>) -> Self {
        let mut allocator = SlotAllocator {
            visible: FxHashMap::default(),
            table: Vec::new(),
            scope_stack: Vec::new(),
            next: 0,
        };
        if let Some(class) = receiver {
            allocator.visible.insert("this".to_string(), 0);
            allocator.table.push(LocalSlot {
                name: "this".to_string(),
                slot: 0,
                ty: Type::Class(class.to_string()),
            });
            allocator.next = 1;
        }
        allocator
    }

    /// Enter a nested block
    pub fn enter_block(&mut self) {
        self.scope_stack.push(ScopeData::default());
    }

    /// Leave a block; its names stop resolving and shadowed ones come back
    pub fn exit_block(&mut self) {
        if let Some(scope) = self.scope_stack.pop() {
            for name in scope.declared {
                self.visible.remove(&name);
            }
            for (name, slot) in scope.shadowed {
                self.visible.insert(name, slot);
            }
        }
    }

    /// Give `name` the next free slot
    pub fn allocate(&mut self, name: &str, ty: Type) -> Result<u16, SlotsExhausted> {
        let slot = self.next;
        self.next = slot.checked_add(ty.slot_width()).ok_or_else(|| SlotsExhausted {
            name: name.to_string(),
            next: slot,
        })?;

        let previous = self.visible.insert(name.to_string(), slot);
        if let Some(scope) = self.scope_stack.last_mut() {
            match previous {
                Some(old) if !scope.declared.iter().any(|n| n == name) => {
                    scope.shadowed.push((name.to_string(), old));
                }
                Some(_) => {}
                None => scope.declared.push(name.to_string()),
            }
        }

        self.table.push(LocalSlot {
            name: name.to_string(),
            slot,
            ty,
        });
        Ok(slot)
    }

    pub fn resolve(&self, name: &str) -> Option<u16> {
        self.visible.get(name).copied()
    }

    /// Number of blocks entered and not yet left
    pub fn depth(&self) -> usize {
        self.scope_stack.len()
    }

    /// First slot not yet handed out
    pub fn next_free(&self) -> u16 {
        self.next
    }

    /// Every slot handed out, in allocation order
    pub fn into_table(self) -> Vec<LocalSlot> {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_takes_slot_zero() {
        let mut slots = SlotAllocator::new(Some("Person"));
        assert_eq!(slots.resolve("this"), Some(0));
        assert_eq!(slots.allocate("age", Type::Int), Ok(1));

        let mut static_slots = SlotAllocator::new(None);
        assert_eq!(static_slots.allocate("age", Type::Int), Ok(0));
    }

    #[test]
    fn test_floats_take_two_slots() {
        let mut slots = SlotAllocator::new(None);
        assert_eq!(slots.allocate("a", Type::Int), Ok(0));
        assert_eq!(slots.allocate("b", Type::Float), Ok(1));
        assert_eq!(slots.allocate("c", Type::Bool), Ok(3));
        assert_eq!(slots.next_free(), 4);
    }

    #[test]
    fn test_shadowing_never_reuses_slots() {
        let mut slots = SlotAllocator::new(None);
        slots.allocate("x", Type::Int).unwrap();

        slots.enter_block();
        assert_eq!(slots.allocate("x", Type::Float), Ok(1));
        assert_eq!(slots.allocate("y", Type::Int), Ok(3));
        assert_eq!(slots.resolve("x"), Some(1));
        slots.exit_block();

        assert_eq!(slots.resolve("x"), Some(0));
        assert_eq!(slots.resolve("y"), None);
        assert_eq!(slots.allocate("z", Type::Int), Ok(4));

        let table = slots.into_table();
        let names: Vec<_> = table.iter().map(|l| (l.name.as_str(), l.slot)).collect();
        assert_eq!(names, vec![("x", 0), ("x", 1), ("y", 3), ("z", 4)]);
    }

    #[test]
    fn test_exhausted_slots_reported() {
        let mut slots = SlotAllocator::new(None);
        for i in 0..u16::MAX / 2 {
            slots.allocate(&format!("f{}", i), Type::Float).unwrap();
        }
        assert_eq!(slots.next_free(), u16::MAX - 1);
        assert_eq!(slots.allocate("last", Type::Int), Ok(u16::MAX - 1));

        let err = slots.allocate("extra", Type::Float).unwrap_err();
        assert_eq!(err.name, "extra");
        assert_eq!(slots.next_free(), u16::MAX);
        assert_eq!(slots.resolve("extra"), None);
    }
}
