#![forbid(unsafe_code)]

//! Rules about expression hygiene: redundant grouping, repeated literals,
//! temporaries that are returned immediately.

use crate::determinism::Sources;
use crate::error::{InvocationError, InvocationResult};
use crate::input::InputRecord;
use crate::registry::RuleFixture;
use crate::render::{RenderNode, RenderTree, el, fragment};

pub(super) fn redundant_parentheses() -> RuleFixture {
    RuleFixture::new(
        "no-redundant-parentheses",
        parentheses_before,
        parentheses_after,
    )
    .describe("double grouping around a sum dropped")
}

fn parentheses_before(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let (a, b): (i64, i64);
    b = 2;
    a = b;
    #[allow(unused_parens)]
    let sum = ((a + b));
    Ok(el("p").child(sum).into())
}

fn parentheses_after(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let b = 2_i64;
    let a = b;
    Ok(el("p").child(a + b).into())
}

const MONTH_PREFIX: &str = "the month of";

pub(super) fn duplicate_string() -> RuleFixture {
    RuleFixture::new(
        "no-duplicate-string",
        duplicate_string_before,
        duplicate_string_after,
    )
    .describe("repeated literal hoisted into one constant")
}

fn duplicate_string_before(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let june = concat!("the month of", " ", "june");
    let july = concat!("the month of", " ", "july");
    Ok(RenderTree::new(fragment([
        el("span")
            .child("In ")
            .child("the month of")
            .child(" ")
            .child("may")
            .child(" we like gardening.\n")
            .into(),
        el("span")
            .child("In ")
            .child(june)
            .child(" we like swimming.\n")
            .into(),
        el("span")
            .child("In ")
            .child(july)
            .child(" we like hiking.\n")
            .into(),
        el("span")
            .child("In ")
            .child("the month of")
            .child(" august we like reading.\n")
            .into(),
    ])))
}

fn duplicate_string_after(_: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let [may, june, july] = ["may", "june", "july"].map(|month| format!("{MONTH_PREFIX} {month}"));
    let sentence = |key: &str, month: String, activity: &str| -> RenderNode {
        el("span")
            .key(key)
            .child("In ")
            .child(month)
            .child(format!(" we like {activity}.\n"))
            .into()
    };
    Ok(RenderTree::new(fragment([
        sentence("may", may, "gardening"),
        sentence("june", june, "swimming"),
        sentence("july", july, "hiking"),
        sentence("august", format!("{MONTH_PREFIX} august"), "reading"),
    ])))
}

pub(super) fn immediate_return() -> RuleFixture {
    let domain = [0, 1, 2].into_iter().flat_map(|hours| {
        [0, 30, 59].into_iter().flat_map(move |minutes| {
            [0, 45, 59].into_iter().map(move |seconds| {
                InputRecord::empty()
                    .with("hours", hours)
                    .with("minutes", minutes)
                    .with("seconds", seconds)
            })
        })
    });
    RuleFixture::new(
        "prefer-immediate-return",
        immediate_return_before,
        immediate_return_after,
    )
    .describe("temporary returned on the next line inlined")
    .with_domain(domain)
}

struct Time {
    hours: i64,
    minutes: i64,
    seconds: i64,
}

impl Time {
    fn from_input(input: &InputRecord) -> InvocationResult<Self> {
        Ok(Self {
            hours: input.int("hours")?,
            minutes: input.int("minutes")?,
            seconds: input.int("seconds")?,
        })
    }

    /// `((hours * 60 + minutes) * 60 + seconds) * 1000`, failing on overflow.
    fn millis(&self) -> InvocationResult<i64> {
        self.hours
            .checked_mul(60)
            .and_then(|m| m.checked_add(self.minutes))
            .and_then(|m| m.checked_mul(60))
            .and_then(|s| s.checked_add(self.seconds))
            .and_then(|s| s.checked_mul(1000))
            .ok_or_else(|| InvocationError::failed("duration overflows i64 milliseconds"))
    }
}

#[allow(clippy::let_and_return)]
fn immediate_return_before(input: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    let time = Time::from_input(input)?;
    let duration: RenderTree = el("p")
        .child(time.millis()?)
        .child(" milliseconds")
        .into();
    Ok(duration)
}

fn immediate_return_after(input: &InputRecord, _: &mut Sources) -> InvocationResult<RenderTree> {
    Ok(el("p")
        .child(Time::from_input(input)?.millis()?)
        .child(" milliseconds")
        .into())
}
