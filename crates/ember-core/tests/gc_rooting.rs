//! Integration tests for allocation rooting and collection
//!
//! Tests cover:
//! - Instance chains built under GC stress
//! - Constructor arguments surviving instantiation
//! - Reclaiming unreachable objects
//! - Heap limit failures

use ember_core::{
    Class, GcRef, HeapObject, Lookup, NativeFn, Proto, Status, UpvalDesc, Value, Vm, VmError,
    VmOptions, VmResult,
};
use std::rc::Rc;

fn define_hierarchy(vm: &mut Vm) -> GcRef {
    let base_name = vm.intern("Shape");
    let base = vm.new_class(base_name, None).unwrap();
    vm.set_global("Shape", Value::Class(base));
    let area = vm.intern("area");
    let id = vm.intern("id");
    vm.bind_data_member(base, id).unwrap();
    vm.bind_method(base, area, Rc::new(Proto::new(area, 1)))
        .unwrap();

    let derived_name = vm.intern("Circle");
    let derived = vm.new_class(derived_name, Some(base)).unwrap();
    vm.set_global("Circle", Value::Class(derived));
    let radius = vm.intern("radius");
    let scale = vm.intern("scale");
    vm.bind_data_member(derived, radius).unwrap();
    let proto = Proto::with_upvals(scale, 1, vec![UpvalDesc::local(0)]);
    vm.bind_method(derived, scale, Rc::new(proto)).unwrap();
    derived
}

fn assert_chain_alive(vm: &Vm, instance: GcRef) {
    let head = vm.heap().instance(instance).unwrap();
    let closure = head.slot(1).unwrap().as_closure().unwrap();
    assert!(vm.heap().contains(closure));
    let base = head.superinstance().unwrap();
    assert!(vm.heap().contains(base));
}

#[test]
fn test_instantiate_under_gc_stress() {
    let mut vm = Vm::with_options(VmOptions::default().with_gc_stress());
    vm.stack_mut().push(Value::Int(2)).unwrap();
    let circle = define_hierarchy(&mut vm);

    let (first, _) = vm.instantiate(circle).unwrap();
    assert_chain_alive(&vm, first);

    {
        let mut rooted = vm.root(Value::Instance(first));
        let (second, _) = rooted.instantiate(circle).unwrap();
        assert_chain_alive(&rooted, first);
        assert_chain_alive(&rooted, second);
    }

    assert!(vm.gc().stats().collections > 0);
    assert!(vm.gc().roots().is_empty());
}

fn store_item(vm: &mut Vm, args: &[Value]) -> VmResult<Value> {
    let holder = args[0]
        .as_instance()
        .ok_or_else(|| VmError::TypeError("expected receiver".to_string()))?;
    let item = vm.intern("item");
    vm.write(holder, item, args[1])?;
    Ok(Value::Nil)
}

#[test]
fn test_constructor_argument_survives_instantiation() {
    let mut vm = Vm::with_options(VmOptions::default().with_gc_stress());
    vm.stack_mut().push(Value::Int(0)).unwrap();

    let empty_name = vm.intern("Empty");
    let empty = vm.new_class(empty_name, None).unwrap();
    vm.set_global("Empty", Value::Class(empty));

    let holder_name = vm.intern("Holder");
    let holder = vm.new_class(holder_name, None).unwrap();
    vm.set_global("Holder", Value::Class(holder));
    let item = vm.intern("item");
    let init = vm.intern("init");
    let tick = vm.intern("tick");
    vm.bind_data_member(holder, item).unwrap();
    vm.bind_primitive_method(holder, init, NativeFn(store_item))
        .unwrap();
    let proto = Proto::with_upvals(tick, 1, vec![UpvalDesc::local(0)]);
    vm.bind_method(holder, tick, Rc::new(proto)).unwrap();

    let payload = vm.call(Value::Class(empty), &[]).unwrap();
    let result = vm.call(Value::Class(holder), &[payload]).unwrap();
    let instance = result.as_instance().unwrap();

    assert_eq!(vm.read(instance, item).unwrap(), Lookup::Data(payload));
    assert!(vm.heap().contains(payload.as_instance().unwrap()));
    assert_eq!(vm.stack().frame_count(), 0);
    assert_eq!(vm.stack().depth(), 1);
}

#[test]
fn test_unrooted_instance_is_reclaimed() {
    let mut vm = Vm::new();
    vm.stack_mut().push(Value::Nil).unwrap();
    let circle = define_hierarchy(&mut vm);
    let live = vm.heap().live_count();

    let (instance, _) = vm.instantiate(circle).unwrap();
    assert_eq!(vm.heap().live_count(), live + 3);

    let freed = vm.collect_garbage();
    assert_eq!(freed, 3);
    assert!(!vm.heap().contains(instance));
    assert_eq!(vm.heap().live_count(), live);
}

#[test]
fn test_reachable_instance_survives() {
    let mut vm = Vm::new();
    vm.stack_mut().push(Value::Nil).unwrap();
    let circle = define_hierarchy(&mut vm);

    let (instance, _) = vm.instantiate(circle).unwrap();
    vm.set_global("unit", Value::Instance(instance));
    vm.collect_garbage();

    assert_chain_alive(&vm, instance);
}

#[test]
fn test_heap_limit_reports_malloc_fail() {
    let mut vm = Vm::with_options(VmOptions::default().with_heap_limit(2));
    let name = vm.intern("A");
    for global in ["a", "b"] {
        let class = vm
            .alloc(HeapObject::Class(Class::new(name, None)))
            .unwrap();
        vm.set_global(global, Value::Class(class));
    }

    let status = vm.exec_protected(|vm| {
        vm.new_class(name, None)?;
        Ok(())
    });
    assert_eq!(status, Status::MallocFail);

    let result = vm.new_class(name, None);
    assert!(matches!(result, Err(VmError::Fatal(Status::MallocFail))));
}

#[test]
fn test_heap_limit_recovers_after_collection() {
    let mut vm = Vm::with_options(VmOptions::default().with_heap_limit(1));
    let name = vm.intern("A");
    let garbage = vm.new_class(name, None).unwrap();

    let class = vm.new_class(name, None).unwrap();
    assert!(!vm.heap().contains(garbage));
    assert!(vm.heap().contains(class));
}
