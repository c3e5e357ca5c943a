//! Stack frame layout.
//!
//! Locals live below the frame pointer at negative offsets, parameters above
//! it at positive ones. Each block records what it declared; leaving the block
//! unbinds those names (re-exposing any outer binding they shadowed) and
//! reports how many bytes to give back to the stack.

use kestrel_core::ShadowMap;

/// Bytes per stack slot.
pub const WORD: u32 = 4;

/// What a frame slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Scalar,
    /// The elements of an array, in place.
    Array,
    /// The address of an array owned by a caller.
    Reference,
}

/// Where a variable lives relative to `$fp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Offset of the lowest word. Array element `i` is at `offset + 4*i`.
    pub offset: i32,
    pub words: u32,
    pub kind: SlotKind,
}

impl Slot {
    pub fn bytes(&self) -> u32 {
        self.words * WORD
    }
}

#[derive(Debug, Default)]
struct BlockFrame {
    names: Vec<String>,
    bytes: u32,
}

#[derive(Debug, Default)]
pub struct FrameLayout {
    slots: ShadowMap<String, Slot>,
    blocks: Vec<BlockFrame>,
    /// Bytes currently allocated below `$fp`. Never exceeds `i32::MAX`.
    depth: u32,
}

impl FrameLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a one-word parameter at a positive offset. Parameters outlive
    /// every block.
    pub fn bind_param(&mut self, name: &str, kind: SlotKind, offset: i32) {
        self.slots.push(name.to_string(), Slot { offset, words: 1, kind });
    }

    pub fn push_block(&mut self) {
        self.blocks.push(BlockFrame::default());
    }

    /// Reserve `words` slots in the innermost block and bind `name` to them.
    /// The caller emits the matching stack pointer adjustment. Returns `None`
    /// if the frame would outgrow a signed 32-bit offset.
    pub fn declare(&mut self, name: &str, kind: SlotKind, words: u32) -> Option<Slot> {
        let bytes = words.checked_mul(WORD)?;
        let depth = self.depth.checked_add(bytes)?;
        let offset = i32::try_from(depth).ok()?;
        self.depth = depth;
        let slot = Slot { offset: -offset, words, kind };
        self.slots.push(name.to_string(), slot);
        if let Some(block) = self.blocks.last_mut() {
            block.names.push(name.to_string());
            block.bytes += bytes;
        }
        Some(slot)
    }

    /// Close the innermost block, returning the bytes it allocated.
    pub fn pop_block(&mut self) -> u32 {
        let Some(block) = self.blocks.pop() else {
            return 0;
        };
        for name in &block.names {
            self.slots.pop(name);
        }
        self.depth -= block.bytes;
        block.bytes
    }

    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.slots.get(name).copied()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}
