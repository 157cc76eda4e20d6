//! Operand stack and call frames
//!
//! Values live in one contiguous vector. A call frame owns the window
//! `[base_pointer, base_pointer + local_count)` holding its locals; operands
//! pushed during the call sit above it. The number of live frames is the call
//! depth a protected region records, and [`Stack::unwind`] cuts the stack
//! back to a recorded depth and top.

use crate::value::Value;
use crate::{VmError, VmResult};

/// Default operand stack limit, in values
pub const DEFAULT_MAX_STACK_SIZE: usize = 64 * 1024;

/// One active call
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Callable running in this frame (kept alive by the collector)
    pub callee: Value,

    /// Caller's instruction pointer
    pub return_ip: usize,

    /// Index of local 0
    pub base_pointer: usize,

    /// Locals reserved for the call
    pub local_count: usize,

    /// Arguments passed by the caller
    pub arg_count: usize,
}

/// Operand stack with its call frames
pub struct Stack {
    values: Vec<Value>,
    frames: Vec<CallFrame>,
    top: usize,
    limit: usize,
}

impl Stack {
    /// Create a stack with the default limit
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_STACK_SIZE)
    }

    /// Create a stack holding at most `limit` values
    pub fn with_capacity(limit: usize) -> Self {
        Self {
            values: Vec::with_capacity(limit.min(256)),
            frames: Vec::new(),
            top: 0,
            limit,
        }
    }

    /// Push a value; fails with `StackOverflow` at the limit
    #[inline]
    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.top >= self.limit {
            return Err(VmError::StackOverflow);
        }

        match self.values.get_mut(self.top) {
            Some(slot) => *slot = value,
            None => self.values.push(value),
        }
        self.top += 1;
        Ok(())
    }

    /// Pop the top value
    #[inline]
    pub fn pop(&mut self) -> VmResult<Value> {
        let value = self.peek()?;
        self.top -= 1;
        Ok(value)
    }

    /// Top value
    #[inline]
    pub fn peek(&self) -> VmResult<Value> {
        match self.top {
            0 => Err(VmError::StackUnderflow),
            top => Ok(self.values[top - 1]),
        }
    }

    /// Value at absolute position `index` (0 is the bottom)
    #[inline]
    pub fn peek_at(&self, index: usize) -> VmResult<Value> {
        if index < self.top {
            Ok(self.values[index])
        } else {
            Err(VmError::StackUnderflow)
        }
    }

    /// Number of values on the stack
    #[inline]
    pub fn depth(&self) -> usize {
        self.top
    }

    /// Check if the stack holds no values
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.top == 0
    }

    /// Open a frame for `callee` with `local_count` nil locals
    pub fn push_frame(
        &mut self,
        callee: Value,
        return_ip: usize,
        local_count: usize,
        arg_count: usize,
    ) -> VmResult<()> {
        if self.limit.saturating_sub(self.top) < local_count {
            return Err(VmError::StackOverflow);
        }

        self.frames.push(CallFrame {
            callee,
            return_ip,
            base_pointer: self.top,
            local_count,
            arg_count,
        });
        for _ in 0..local_count {
            self.push(Value::Nil)?;
        }
        Ok(())
    }

    /// Close the current frame, dropping its locals and operands
    pub fn pop_frame(&mut self) -> VmResult<CallFrame> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| VmError::RuntimeError("pop_frame with no active frame".to_string()))?;
        self.top = frame.base_pointer;
        Ok(frame)
    }

    /// Drop every frame above `frame_count` and cut the stack to `depth`
    pub fn unwind(&mut self, frame_count: usize, depth: usize) {
        self.frames.truncate(frame_count);
        self.top = depth.min(self.values.len());
    }

    /// Drop operands above `depth` without touching the frames
    pub fn truncate(&mut self, depth: usize) {
        self.top = self.top.min(depth);
    }

    /// Innermost frame
    #[inline]
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Call depth
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn local_slot(&self, index: usize) -> VmResult<usize> {
        let frame = self
            .current_frame()
            .ok_or_else(|| VmError::RuntimeError("local access outside a call".to_string()))?;
        if index < frame.local_count {
            Ok(frame.base_pointer + index)
        } else {
            Err(VmError::RuntimeError(format!(
                "local {} out of range (frame has {})",
                index, frame.local_count
            )))
        }
    }

    /// Read local `index` of the current frame
    #[inline]
    pub fn load_local(&self, index: usize) -> VmResult<Value> {
        Ok(self.values[self.local_slot(index)?])
    }

    /// Write local `index` of the current frame
    #[inline]
    pub fn store_local(&mut self, index: usize, value: Value) -> VmResult<()> {
        let slot = self.local_slot(index)?;
        self.values[slot] = value;
        Ok(())
    }

    /// Read a value an upvalue captures from the enclosing scope
    ///
    /// Inside a call this is local `index` of the current frame; at top level
    /// it is the operand stack slot `index` counted from the base.
    pub fn capture(&self, index: usize) -> VmResult<Value> {
        if self.current_frame().is_some() {
            self.load_local(index)
        } else {
            self.peek_at(index)
        }
    }

    /// Live values and frame callees, for the collector
    pub fn iter_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.values[..self.top]
            .iter()
            .copied()
            .chain(self.frames.iter().map(|frame| frame.callee))
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
