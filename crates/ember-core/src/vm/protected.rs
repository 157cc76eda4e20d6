//! Protected execution regions
//!
//! A protected region records enough VM state at entry to recover from an
//! error thrown anywhere inside it: the call frame count, the operand stack
//! top, the root set depth and the instruction pointer. Errors travel back to
//! the region as `Err(VmError)` through `?`; the region owner then restores
//! the recorded state.
//!
//! Regions nest without limit. Frames form a singly linked LIFO list; the
//! innermost frame is always the one that receives a thrown error.

use super::Vm;
use crate::object::Proto;
use crate::value::Value;
use crate::{Status, VmError, VmResult};
use std::rc::Rc;

/// State recorded when a protected region is entered
#[derive(Debug)]
pub struct ExceptFrame {
    /// Call frame count at entry
    pub call_depth: usize,

    /// Operand stack top at entry
    pub stack_top: usize,

    /// Root set depth at entry
    pub root_depth: usize,

    /// Instruction pointer at entry
    pub ip: usize,

    prev: Option<Box<ExceptFrame>>,
}

impl ExceptFrame {
    /// Create an unlinked frame
    pub fn new(call_depth: usize, stack_top: usize, root_depth: usize, ip: usize) -> Self {
        Self {
            call_depth,
            stack_top,
            root_depth,
            ip,
            prev: None,
        }
    }

    /// Enclosing frame
    pub fn prev(&self) -> Option<&ExceptFrame> {
        self.prev.as_deref()
    }
}

/// LIFO list of protected region frames
#[derive(Debug, Default)]
pub struct HandlerStack {
    top: Option<Box<ExceptFrame>>,
    len: usize,
}

impl HandlerStack {
    /// Create an empty handler stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame; returns the nesting level (1 for the outermost region)
    pub fn push(&mut self, mut frame: ExceptFrame) -> usize {
        frame.prev = self.top.take();
        self.top = Some(Box::new(frame));
        self.len += 1;
        self.len
    }

    /// Pop the innermost frame
    pub fn pop(&mut self) -> Option<ExceptFrame> {
        let mut frame = self.top.take()?;
        self.top = frame.prev.take();
        self.len -= 1;
        Some(*frame)
    }

    /// Pop `count` frames (fewer if the stack runs out)
    pub fn close(&mut self, count: usize) {
        for _ in 0..count {
            if self.pop().is_none() {
                break;
            }
        }
    }

    /// Pop frames until at most `level` remain
    pub fn truncate(&mut self, level: usize) {
        let excess = self.len.saturating_sub(level);
        self.close(excess);
    }

    /// Innermost frame
    pub fn top(&self) -> Option<&ExceptFrame> {
        self.top.as_deref()
    }

    /// Number of installed frames
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no region is installed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for HandlerStack {
    // Unlink iteratively; deep nesting would overflow a recursive drop.
    fn drop(&mut self) {
        self.close(self.len);
    }
}

impl Vm {
    /// Installed protected regions
    pub fn handlers(&self) -> &HandlerStack {
        &self.handlers
    }

    /// Enter a protected region; returns its nesting level
    pub fn enter_protected_region(&mut self) -> usize {
        let frame = ExceptFrame::new(
            self.stack.frame_count(),
            self.stack.depth(),
            self.gc.roots().depth(),
            self.ip,
        );
        let level = self.handlers.push(frame);
        tracing::trace!(level, "enter protected region");
        level
    }

    /// Build the error that carries `status` to the innermost region
    ///
    /// With no region installed the error is [`VmError::Fatal`]; the host is
    /// expected to abort the script.
    pub fn throw(&mut self, status: Status) -> VmError {
        if self.handlers.is_empty() {
            tracing::error!(%status, "uncaught error with no protected region");
            VmError::Fatal(status)
        } else {
            tracing::trace!(%status, level = self.handlers.len(), "throw");
            VmError::Thrown(status)
        }
    }

    /// Pass an error along toward the innermost region
    ///
    /// Errors escaping every region become [`VmError::Fatal`].
    pub fn propagate(&mut self, error: VmError) -> VmError {
        if self.handlers.is_empty() && !error.is_fatal() {
            tracing::error!(%error, "uncaught error with no protected region");
            VmError::Fatal(error.status())
        } else {
            error
        }
    }

    /// Receive an error at the innermost region
    ///
    /// The innermost frame is popped. A [`Status::Exception`] is caught: the
    /// state recorded at entry is restored and the status is returned so the
    /// caller can run its except block. Any other status is rethrown toward
    /// the enclosing region.
    pub fn resume_protected_region(&mut self, error: VmError) -> VmResult<Status> {
        let frame = match self.handlers.pop() {
            Some(frame) => frame,
            None => return Err(self.propagate(error)),
        };

        let status = error.status();
        if status == Status::Exception {
            self.restore(&frame);
            tracing::trace!(level = self.handlers.len() + 1, "exception caught");
            Ok(status)
        } else {
            Err(self.propagate(error))
        }
    }

    /// Leave `count` protected regions after normal completion
    pub fn close_protected_region(&mut self, count: usize) {
        self.handlers.close(count);
        tracing::trace!(count, level = self.handlers.len(), "close protected region");
    }

    fn restore(&mut self, frame: &ExceptFrame) {
        self.stack.unwind(frame.call_depth, frame.stack_top);
        self.gc.roots_mut().truncate(frame.root_depth);
        self.ip = frame.ip;
    }

    /// Run `f` inside its own protected region
    ///
    /// Whatever `f` throws, every region it entered is discarded and the call
    /// depth, stack top, root depth and instruction pointer are restored to
    /// their values at entry. Returns the status of the failure, or
    /// [`Status::Ok`].
    pub fn exec_protected<F>(&mut self, f: F) -> Status
    where
        F: FnOnce(&mut Vm) -> VmResult<()>,
    {
        match self.run_protected(f) {
            Ok(()) => Status::Ok,
            Err(error) => error.status(),
        }
    }

    /// Like [`Vm::exec_protected`], but hands back the error itself
    pub(super) fn run_protected<F>(&mut self, f: F) -> VmResult<()>
    where
        F: FnOnce(&mut Vm) -> VmResult<()>,
    {
        let level = self.enter_protected_region();
        let result = f(self);

        match result {
            Ok(()) => {
                self.handlers.truncate(level - 1);
                Ok(())
            }
            Err(error) => {
                self.handlers.truncate(level);
                if let Some(frame) = self.handlers.pop() {
                    self.restore(&frame);
                }
                tracing::debug!(
                    %error,
                    status = %error.status(),
                    level,
                    "protected region recovered"
                );
                Err(error)
            }
        }
    }

    /// Call `callee` inside a protected region
    pub fn protected_call(&mut self, callee: Value, args: &[Value]) -> Result<Value, Status> {
        let mut result = Value::Nil;
        let status = self.exec_protected(|vm| {
            result = vm.call(callee, args)?;
            Ok(())
        });

        if status.is_ok() {
            Ok(result)
        } else {
            Err(status)
        }
    }

    /// Run `parser` over `source` inside a protected region
    ///
    /// On success the compiled top-level closure is pushed on the operand
    /// stack. On failure the stack is restored and a syntax error is left as
    /// the pending exception.
    pub fn protected_parse<F>(&mut self, source: &str, parser: F) -> Status
    where
        F: FnOnce(&mut Vm, &str) -> VmResult<Proto>,
    {
        self.exec_protected(|vm| {
            let proto = parser(vm, source).map_err(|error| vm.record_parse_error(error))?;
            let closure = vm.new_closure(Rc::new(proto))?;
            vm.stack.push(Value::Closure(closure))?;
            Ok(())
        })
    }

    pub(super) fn record_parse_error(&mut self, error: VmError) -> VmError {
        if let VmError::Syntax {
            source_name,
            line,
            message,
        } = &error
        {
            let text = format!("{}:{}: {}", source_name, line, message);
            let kind = self.str_value("syntax_error");
            let message = self.str_value(&text);
            self.exception = Some(super::Exception { kind, message });
        }
        error
    }
}
