//! Behavioural tests for page planning using rstest-bdd.

use std::cell::{Cell, RefCell};

use racefeed_core::{PagePlan, PageSize};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Debug, Default)]
struct PlanWorld {
    page_size: Cell<Option<PageSize>>,
    plan: RefCell<Option<PagePlan>>,
    stored: Cell<u64>,
}

impl PlanWorld {
    fn plan(&self) -> PagePlan {
        self.plan.borrow().expect("plan should be computed")
    }
}

#[fixture]
fn world() -> PlanWorld {
    PlanWorld::default()
}

#[given("a page size of {size}")]
fn given_page_size(world: &PlanWorld, size: u32) {
    world
        .page_size
        .set(Some(PageSize::new(size).expect("non-zero page size")));
}

#[when("the remote reports {rows} rows")]
fn when_remote_reports(world: &PlanWorld, rows: u64) {
    let size = world.page_size.get().expect("page size should be set");
    world.plan.replace(Some(PagePlan::new(rows, size)));
}

#[when("the store holds {stored} records")]
fn when_store_holds(world: &PlanWorld, stored: u64) {
    world.stored.set(stored);
}

#[then("the plan has {pages} pages")]
fn then_plan_has_pages(world: &PlanWorld, pages: u64) {
    assert_eq!(world.plan().total_pages, pages);
}

#[then("the resume range starts at page {start} and ends at page {end}")]
fn then_resume_range(world: &PlanWorld, start: u64, end: u64) {
    let range = world.plan().resume_range(world.stored.get());
    assert_eq!((range.start(), range.end()), (start, end));
}

#[then("no pages are scheduled")]
fn then_no_pages(world: &PlanWorld) {
    let range = world.plan().resume_range(world.stored.get());
    assert!(range.is_empty(), "expected an empty range, got {range}");
}

#[scenario(path = "tests/features/pagination.feature", index = 0)]
fn non_multiple_total(world: PlanWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/pagination.feature", index = 1)]
fn exact_multiple_total(world: PlanWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/pagination.feature", index = 2)]
fn resume_after_full_page(world: PlanWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/pagination.feature", index = 3)]
fn store_in_sync(world: PlanWorld) {
    let _ = world;
}
