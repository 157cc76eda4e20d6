//! Integration tests for protected execution regions
//!
//! Tests cover:
//! - Nested regions and exception recovery
//! - Bulk close after normal completion
//! - Rethrow of non-exception statuses
//! - Constructor failures unwinding cleanly
//! - Protected parsing

use ember_core::{
    ClosureExecutor, GcRef, NativeFn, Proto, Status, Value, Vm, VmError, VmResult,
};
use std::rc::Rc;

fn raise_value_error(vm: &mut Vm, _args: &[Value]) -> VmResult<Value> {
    Err(vm.raise("value_error", "invalid argument"))
}

fn exit(vm: &mut Vm, _args: &[Value]) -> VmResult<Value> {
    Err(vm.throw(Status::Exit))
}

/// Executor whose closures all raise after pushing scratch values and a
/// nested call frame
struct FailingExecutor;

impl ClosureExecutor for FailingExecutor {
    fn execute(&self, vm: &mut Vm, _closure: GcRef, _args: &[Value]) -> VmResult<Value> {
        vm.stack_mut().push(Value::Int(1))?;
        vm.stack_mut().push_frame(Value::Nil, 0, 3, 0)?;
        vm.set_ip(1234);
        Err(vm.raise("construct_error", "init failed"))
    }
}

#[test]
fn test_nested_regions_inner_catches() {
    let mut vm = Vm::new();

    vm.set_ip(1);
    let a = vm.enter_protected_region();
    vm.stack_mut().push(Value::Int(10)).unwrap();
    vm.set_ip(2);
    let b = vm.enter_protected_region();
    assert_eq!((a, b), (1, 2));

    vm.stack_mut().push(Value::Int(20)).unwrap();
    vm.stack_mut().push_frame(Value::Nil, 2, 1, 0).unwrap();
    vm.set_ip(3);
    let error = vm.raise("value_error", "inner");
    assert!(matches!(error, VmError::Thrown(Status::Exception)));

    assert_eq!(vm.resume_protected_region(error).unwrap(), Status::Exception);
    assert_eq!(vm.ip(), 2);
    assert_eq!(vm.stack().depth(), 1);
    assert_eq!(vm.stack().frame_count(), 0);
    assert_eq!(vm.handlers().len(), 1);
    assert_eq!(vm.handlers().top().map(|frame| frame.ip), Some(1));

    // A is still installed and resumable
    let error = vm.raise("value_error", "outer");
    assert_eq!(vm.resume_protected_region(error).unwrap(), Status::Exception);
    assert_eq!(vm.ip(), 1);
    assert_eq!(vm.stack().depth(), 0);
    assert!(vm.handlers().is_empty());
}

#[test]
fn test_closing_inner_region_keeps_outer() {
    let mut vm = Vm::new();
    vm.set_ip(5);
    vm.enter_protected_region();
    vm.set_ip(6);
    vm.enter_protected_region();

    vm.close_protected_region(1);
    assert_eq!(vm.handlers().len(), 1);
    assert_eq!(vm.handlers().top().map(|frame| frame.ip), Some(5));

    let error = vm.raise("value_error", "after close");
    assert!(matches!(error, VmError::Thrown(_)));
    assert_eq!(vm.resume_protected_region(error).unwrap(), Status::Exception);
    assert_eq!(vm.ip(), 5);
}

#[test]
fn test_bulk_close() {
    let mut vm = Vm::new();
    for _ in 0..4 {
        vm.enter_protected_region();
    }

    vm.close_protected_region(3);
    assert_eq!(vm.handlers().len(), 1);
    vm.close_protected_region(1);
    assert!(vm.handlers().is_empty());
    assert!(matches!(vm.throw(Status::Exception), VmError::Fatal(_)));
}

#[test]
fn test_non_exception_status_is_rethrown() {
    let mut vm = Vm::new();
    vm.enter_protected_region();
    vm.enter_protected_region();

    let error = vm.call(Value::Native(NativeFn(exit)), &[]).unwrap_err();
    let error = vm.resume_protected_region(error).unwrap_err();
    assert_eq!(error.status(), Status::Exit);
    assert_eq!(vm.handlers().len(), 1);

    let error = vm.resume_protected_region(error).unwrap_err();
    assert!(matches!(error, VmError::Fatal(Status::Exit)));
}

#[test]
fn test_uncaught_throw_is_fatal() {
    let mut vm = Vm::new();
    let error = vm
        .call(Value::Native(NativeFn(raise_value_error)), &[])
        .unwrap_err();

    assert!(error.is_fatal());
    assert_eq!(error.status(), Status::Exception);
    assert!(vm.exception().is_some());
}

#[test]
fn test_protected_call_recovers_call_depth() {
    let mut vm = Vm::new();
    vm.stack_mut().push(Value::Int(1)).unwrap();

    let result = vm.protected_call(Value::Native(NativeFn(raise_value_error)), &[Value::Int(2)]);
    assert_eq!(result, Err(Status::Exception));
    assert_eq!(vm.stack().depth(), 1);
    assert_eq!(vm.stack().frame_count(), 0);

    let exception = vm.take_exception().unwrap();
    assert_eq!(exception.kind, vm.str_value("value_error"));
    assert_eq!(exception.message, vm.str_value("invalid argument"));
}

#[test]
fn test_failing_constructor_unwinds() {
    let mut vm = Vm::new();
    vm.set_executor(Rc::new(FailingExecutor));

    let name = vm.intern("Widget");
    let class = vm.new_class(name, None).unwrap();
    vm.set_global("Widget", Value::Class(class));
    let init = vm.intern("init");
    vm.bind_method(class, init, Rc::new(Proto::new(init, 1)))
        .unwrap();

    vm.stack_mut().push(Value::Int(0)).unwrap();
    vm.stack_mut().push_frame(Value::Nil, 0, 2, 0).unwrap();
    vm.set_ip(77);
    let level = vm.enter_protected_region();
    let root_depth = vm.gc().roots().depth();
    let (depth, frames) = (vm.stack().depth(), vm.stack().frame_count());

    let error = vm.construct(class, &[Value::Int(9)]).unwrap_err();
    assert!(matches!(error, VmError::Thrown(Status::Exception)));
    assert_eq!(vm.stack().depth(), depth);
    assert_eq!(vm.stack().frame_count(), frames);
    assert_eq!(vm.gc().roots().depth(), root_depth);
    assert_eq!(vm.ip(), 77);
    assert_eq!(vm.handlers().len(), level);

    assert_eq!(vm.resume_protected_region(error).unwrap(), Status::Exception);
    assert_eq!(
        vm.take_exception().map(|exception| exception.kind),
        Some(vm.str_value("construct_error"))
    );
}

#[test]
fn test_protected_parse_success_and_failure() {
    let mut vm = Vm::new();

    let status = vm.protected_parse("print(1)", |vm, source| {
        assert_eq!(source, "print(1)");
        let name = vm.intern("main");
        Ok(Proto::new(name, 0))
    });
    assert_eq!(status, Status::Ok);
    assert_eq!(vm.stack().depth(), 1);

    let status = vm.protected_parse("print(", |vm, _source| {
        vm.stack_mut().push(Value::Nil)?;
        Err(vm.syntax_error("script.em", 1, "expected ')'"))
    });
    assert_eq!(status, Status::SyntaxError);
    assert_eq!(vm.stack().depth(), 1);
    assert!(vm.handlers().is_empty());

    let exception = vm.take_exception().unwrap();
    assert_eq!(exception.kind, vm.str_value("syntax_error"));
    assert_eq!(exception.message, vm.str_value("script.em:1: expected ')'"));
}
