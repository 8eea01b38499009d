mod common;

use common::setup;
use pretty_assertions::assert_eq;
use shutterbug::agent::breakpoint::{Breakpoint, Reference};
use shutterbug::agent::messages;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_side_effecting_conditions_are_rejected_at_set_time() {
    let rejected = [
        "*",
        "j+",
        "x = 1",
        "var x = 1;",
        "console.log(1)",
        "while(true);",
        "return 3",
        "throw new Error()",
        "new Error()",
        "try { 1 }",
        "let me_pass = 1",
        "debugger",
        "x++",
        "() => { 1 }",
    ];

    for condition in rejected {
        let t = setup();
        let bp = Breakpoint::at(1, "foo.js", 4);
        bp.borrow_mut().condition = Some(condition.to_string());

        t.agent.set(&bp, |r| assert!(r.is_err(), "condition {condition:?} must fail set"));

        let b = bp.borrow();
        let status = b.status.as_ref().expect("rejected condition carries status");
        assert!(status.is_error);
        assert_eq!(status.refers_to, Reference::BreakpointCondition);
        assert_eq!(status.description.format, messages::ERROR_COMPILING_CONDITION);
        assert!(!status.description.format.is_empty());
        drop(b);

        assert_eq!(t.agent.num_breakpoints(), 0, "condition {condition:?}");
        assert_eq!(t.agent.num_listeners(), 0);
    }
}

#[test]
fn test_read_only_conditions_are_accepted() {
    let accepted = ["null", "", ";", "x==1", "this+1", "1,2,3,{f:2},4"];

    for condition in accepted {
        let t = setup();
        let bp = Breakpoint::at(1, "foo.js", 4);
        bp.borrow_mut().condition = Some(condition.to_string());

        t.agent.set(&bp, |r| {
            assert!(r.is_ok(), "condition {condition:?} must be accepted")
        });
        assert_eq!(t.agent.num_breakpoints(), 1);
        t.agent.clear(&bp);
    }
}

#[test]
fn test_empty_condition_is_always_true() {
    let t = setup();
    let bp = Breakpoint::at(1, "foo.js", 4);
    bp.borrow_mut().condition = Some(String::new());

    t.agent.set(&bp, |r| r.unwrap());

    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    t.agent.wait(&bp, move |r| {
        r.unwrap();
        flag.set(true);
    })
    .unwrap();

    t.runtime.run_foo(&t.root, 1);
    assert!(fired.get());
}

#[test]
fn test_condition_runtime_error_fires_once_with_error_status() {
    let t = setup();
    let bp = Breakpoint::at(1, "foo.js", 4);
    // `missing` is not defined anywhere in the fixture scope.
    bp.borrow_mut().condition = Some("missing === 1".to_string());

    t.agent.set(&bp, |r| r.unwrap());

    let outcomes = Rc::new(Cell::new(0));
    let errors = Rc::new(Cell::new(0));
    let o = Rc::clone(&outcomes);
    let e = Rc::clone(&errors);
    t.agent.wait(&bp, move |r| {
        o.set(o.get() + 1);
        if r.is_err() {
            e.set(e.get() + 1);
        }
    })
    .unwrap();

    t.runtime.run_foo(&t.root, 1);
    t.runtime.run_foo(&t.root, 2);

    assert_eq!(outcomes.get(), 1, "one-shot even when the condition throws");
    assert_eq!(errors.get(), 1);

    let b = bp.borrow();
    let status = b.status.as_ref().unwrap();
    assert!(status.is_error);
    assert_eq!(status.refers_to, Reference::BreakpointCondition);
    assert!(b.stack_frames.is_empty(), "no capture on a condition error");
}

#[test]
fn test_condition_evaluation_cannot_mutate_state() {
    let t = setup();
    // Object literals evaluate into agent-owned allocations; reads of frame
    // values clone. There is no grammar path that writes, so a capture after
    // a condition fired must still see pristine values.
    let bp = Breakpoint::at(1, "foo.js", 4);
    bp.borrow_mut().condition = Some("B.a === 5 && A[0] === 1".to_string());

    t.agent.set(&bp, |r| r.unwrap());

    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    t.agent.wait(&bp, move |r| {
        r.unwrap();
        flag.set(true);
    })
    .unwrap();

    t.runtime.run_foo(&t.root, 3);
    assert!(fired.get());

    let b = bp.borrow();
    let locals = &b.stack_frames[0].locals;
    let a_index = locals[0].var_table_index.unwrap() as usize;
    let a_entry = &b.variable_table[a_index];
    assert_eq!(a_entry.members[0].value.as_deref(), Some("1"));
    let b_index = locals[1].var_table_index.unwrap() as usize;
    let b_entry = &b.variable_table[b_index];
    assert_eq!(b_entry.members[0].value.as_deref(), Some("5"));
}
