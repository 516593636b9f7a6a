#![forbid(unsafe_code)]

//! Rules about branching shape: complexity, missing `else`, duplicated
//! conditions, deep nesting. All of these draw from the random source and
//! declare their full draw space.

use crate::determinism::{DrawSpace, Sources, percent_draw};
use crate::error::InvocationResult;
use crate::input::InputRecord;
use crate::registry::RuleFixture;
use crate::render::{RenderNode, RenderTree, el};

pub(super) fn cyclomatic_complexity() -> RuleFixture {
    RuleFixture::new(
        "cyclomatic-complexity",
        cyclomatic_before,
        cyclomatic_after,
    )
    .describe("chain of equality tests collapsed into a range check")
    .with_draw_space(DrawSpace::percent())
}

fn cyclomatic_before(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let random = sources.percent();
    let cyclomatic = (random == 1)
        || (random == 2)
        || (random == 3)
        || (random == 4)
        || (random == 5)
        || (random == 6)
        || (random == 7)
        || (random == 8)
        || (random == 9)
        || (random == 10);
    Ok(el("p").child(cyclomatic.to_string()).into())
}

fn cyclomatic_after(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let in_range = (1..=10).contains(&sources.percent());
    Ok(el("p").child(in_range.to_string()).into())
}

pub(super) fn elseif_without_else() -> RuleFixture {
    RuleFixture::new("elseif-without-else", elseif_before, elseif_after)
        .describe("else-if chain closed with an explicit else")
        .with_draw_space(DrawSpace::percent())
}

fn elseif_before(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let random = sources.percent();
    let rendered: Option<RenderNode> = if random > 75 {
        Some(el("p").child("75").into())
    } else if random > 50 {
        Some(el("p").child("50").into())
    } else {
        None
    };
    Ok(RenderTree::new(rendered))
}

fn elseif_after(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let random = sources.percent();
    if random > 75 {
        Ok(el("p").child("75").into())
    } else if random > 50 {
        Ok(el("p").child("50").into())
    } else {
        Ok(RenderTree::empty())
    }
}

pub(super) fn identical_conditions() -> RuleFixture {
    RuleFixture::new(
        "no-identical-conditions",
        identical_conditions_before,
        identical_conditions_after,
    )
    .describe("unreachable duplicate condition removed")
    .with_draw_space(DrawSpace::percent())
}

#[allow(clippy::if_same_then_else, clippy::manual_range_contains)]
fn identical_conditions_before(
    _: &InputRecord,
    sources: &mut Sources,
) -> InvocationResult<RenderTree> {
    let random = sources.percent();
    let label = if random == 50 {
        "50"
    } else if random > 49 && random < 51 {
        "50"
    } else {
        "Not 50"
    };
    Ok(el("p").child(label).into())
}

fn identical_conditions_after(
    _: &InputRecord,
    sources: &mut Sources,
) -> InvocationResult<RenderTree> {
    let label = if sources.percent() == 50 { "50" } else { "Not 50" };
    Ok(el("p").child(label).into())
}

pub(super) fn cognitive_complexity() -> RuleFixture {
    RuleFixture::new(
        "cognitive-complexity",
        cognitive_before,
        cognitive_after,
    )
    .describe("ten-way if chain replaced by one formatted branch")
    .with_draw_space(DrawSpace::percent())
}

fn cognitive_before(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let random = sources.percent();
    let get_text = || {
        if random == 1 {
            "I am 1"
        } else if random == 2 {
            "I am 2"
        } else if random == 3 {
            "I am 3"
        } else if random == 4 {
            "I am 4"
        } else if random == 5 {
            "I am 5"
        } else if random == 6 {
            "I am 6"
        } else if random == 7 {
            "I am 7"
        } else if random == 8 {
            "I am 8"
        } else if random == 9 {
            "I am 9"
        } else if random == 10 {
            "I am 10"
        } else {
            "I am greater than 10"
        }
    };
    Ok(el("p").child(get_text()).into())
}

fn cognitive_after(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let random = sources.percent();
    let label = if (1..=10).contains(&random) {
        format!("I am {random}")
    } else {
        "I am greater than 10".to_string()
    };
    Ok(el("p").child(label).into())
}

pub(super) fn cognitive_complexity_nesting() -> RuleFixture {
    RuleFixture::new(
        "cognitive-complexity-nesting",
        nesting_before,
        nesting_after,
    )
    .describe("nested boolean ladder flattened; dead clock branch dropped")
    .with_draw_space(coin_flips(3))
}

/// Each draw only matters as `percent() > 50`; both sides of the threshold.
fn coin_flips(draws: usize) -> DrawSpace {
    let coin = [percent_draw(50), percent_draw(51)];
    DrawSpace::product(&vec![coin.as_slice(); draws])
}

#[allow(clippy::if_same_then_else)]
fn nesting_before(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let random_thing1 = sources.percent() > 50;
    let random_thing2 = sources.percent() > 50;
    let random_thing3 = sources.percent() > 50;
    if random_thing1 {
        Ok(el("div").into())
    } else if random_thing2 && random_thing3 {
        Ok(el("div").child(el("p")).into())
    } else if !random_thing2 && random_thing3 {
        Ok(el("div").child(el("p")).into())
    } else if random_thing2 && !random_thing3 {
        Ok(el("div").child(el("p")).into())
    } else {
        // Both parities render the same empty paragraph.
        let now = sources.now_ms().to_string();
        let last_digit = now
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0);
        if last_digit % 2 == 0 {
            Ok(el("p").into())
        } else {
            Ok(el("p").into())
        }
    }
}

fn nesting_after(_: &InputRecord, sources: &mut Sources) -> InvocationResult<RenderTree> {
    let first = sources.percent() > 50;
    let second = sources.percent() > 50;
    let third = sources.percent() > 50;
    let tree = match (first, second || third) {
        (true, _) => el("div"),
        (false, true) => el("div").child(el("p")),
        (false, false) => el("p"),
    };
    Ok(tree.into())
}
