#![forbid(unsafe_code)]

//! Rules about bindings and data shape: loop-captured state, destructive
//! element removal, unsound type checks.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::determinism::Sources;
use crate::error::{InvocationError, InvocationResult};
use crate::input::InputRecord;
use crate::registry::{Expectation, RuleFixture};
use crate::render::{RenderTree, el, number};

/// Closures created per loop iteration.
const LOOP_CALLBACKS: usize = 13;

pub(super) fn function_inside_loop() -> RuleFixture {
    RuleFixture::new("function-inside-loop", loop_before, loop_after)
        .describe("callbacks bind a per-iteration snapshot instead of the shared index")
        .expecting(Expectation::Diverged)
}

fn loop_before(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let index = Rc::new(Cell::new(0_usize));
    let mut funs: Vec<Box<dyn Fn() -> usize>> = Vec::with_capacity(LOOP_CALLBACKS);
    while index.get() < LOOP_CALLBACKS {
        let shared = Rc::clone(&index);
        funs.push(Box::new(move || shared.get()));
        index.set(index.get() + 1);
    }
    Ok(el("p").child(join_calls(&funs)).into())
}

fn loop_after(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let mut funs: Vec<Box<dyn Fn() -> usize>> = Vec::with_capacity(LOOP_CALLBACKS);
    for i in 0..LOOP_CALLBACKS {
        let scoped = i;
        funs.push(Box::new(move || scoped));
    }
    Ok(el("p").child(join_calls(&funs)).into())
}

fn join_calls(funs: &[Box<dyn Fn() -> usize>]) -> String {
    funs.iter()
        .map(|f| f().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub(super) fn array_delete() -> RuleFixture {
    RuleFixture::new("no-array-delete", array_delete_before, array_delete_after)
        .describe("element removed with remove() instead of leaving a hole")
        .expecting(Expectation::BeforeErrors)
}

fn array_delete_before(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let mut my_array = vec![Some(1.0_f64), Some(2.0), Some(3.0)];
    // Clears the slot but keeps the length, like `delete arr[i]`.
    let _ = my_array[1].take();
    let undef = my_array[1].unwrap_or(f64::NAN);
    let my_array_len = my_array.len() as f64;
    Ok(el("p").child(number(undef / my_array_len)).into())
}

fn array_delete_after(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let mut my_array = vec![1.0_f64, 2.0, 3.0];
    my_array.remove(1);
    let second = my_array
        .get(1)
        .copied()
        .ok_or_else(|| InvocationError::failed("array shorter than two elements"))?;
    Ok(el("p")
        .child(number(second / my_array.len() as f64))
        .into())
}

pub(super) fn type_guard() -> RuleFixture {
    let domain = ["Shergar", "Nemo"].into_iter().flat_map(|name| {
        [false, true]
            .into_iter()
            .map(move |swims| InputRecord::empty().with("name", name).with("swims", swims))
    });
    RuleFixture::new("prefer-type-guard", type_guard_before, type_guard_after)
        .describe("field-presence probe replaced by a typed variant")
        .with_domain(domain)
}

fn type_guard_before(input: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    // Loosely shaped animal: any map that happens to carry a "swim" entry
    // passes for a fish.
    let mut animal: BTreeMap<&str, String> = BTreeMap::new();
    animal.insert("name", input.text("name")?.to_string());
    if input.bool("swims")? {
        animal.insert("swim", "ok".to_string());
    }
    let is_fish = animal.contains_key("swim");
    Ok(el("p").child(is_fish.to_string()).into())
}

enum Pet {
    Fish { name: String },
    Other { name: String },
}

impl Pet {
    fn from_input(input: &InputRecord) -> InvocationResult<Self> {
        let name = input.text("name")?.to_string();
        Ok(if input.bool("swims")? {
            Self::Fish { name }
        } else {
            Self::Other { name }
        })
    }

    fn name(&self) -> &str {
        match self {
            Self::Fish { name } | Self::Other { name } => name,
        }
    }
}

fn type_guard_after(input: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let pet = Pet::from_input(input)?;
    tracing::trace!(name = pet.name(), "type guard");
    let is_fish = matches!(pet, Pet::Fish { .. });
    Ok(el("p").child(is_fish.to_string()).into())
}
