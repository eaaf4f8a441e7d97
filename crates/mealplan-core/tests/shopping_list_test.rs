//! Shopping-list building through the service, including optimizer
//! degradation and fallback ordering.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use mealplan_core::external::ShoppingOptimizer;
use mealplan_core::history::InMemoryHistory;
use mealplan_core::recipe::InMemoryCorpus;
use mealplan_core::shopping::{Category, ShoppingList};
use mealplan_core::{PlanError, PlanService};
use mealplan_test_utils::{fixture_id, ingredient, recipe, sample_corpus};

fn service() -> PlanService {
    PlanService::new(
        Arc::new(InMemoryCorpus::new(sample_corpus())),
        Arc::new(InMemoryHistory::new()),
    )
}

#[tokio::test]
async fn merges_chicken_across_recipes() {
    // Teriyaki Chicken (400 g) + Chicken Curry (500 g), both written for 2
    // servings, requested for 2: one 900 g chicken thigh line.
    let svc = service();
    let list = svc
        .build_shopping_list(&[fixture_id(1), fixture_id(5)], 2)
        .await
        .unwrap();

    let chicken: Vec<_> = list
        .lines
        .iter()
        .filter(|l| l.name == "chicken thigh")
        .collect();
    assert_eq!(chicken.len(), 1);
    assert_eq!(chicken[0].precise_quantity, Some(900.0));
    assert_eq!(chicken[0].unit.as_deref(), Some("g"));
    assert_eq!(chicken[0].sources.len(), 2);
}

#[tokio::test]
async fn merges_grams_and_kilograms() {
    let corpus = vec![
        recipe(
            10,
            "Grilled Chicken",
            &["chicken"],
            vec![ingredient("chicken", Some(200.0), Some("g"), Some("protein"))],
        ),
        recipe(
            11,
            "Roast Chicken",
            &["chicken"],
            vec![ingredient("chicken", Some(0.3), Some("kg"), Some("protein"))],
        ),
    ];
    let svc = PlanService::new(
        Arc::new(InMemoryCorpus::new(corpus)),
        Arc::new(InMemoryHistory::new()),
    );

    let list = svc
        .build_shopping_list(&[fixture_id(10), fixture_id(11)], 2)
        .await
        .unwrap();

    assert_eq!(list.len(), 1);
    let line = &list.lines[0];
    assert_eq!(line.precise_quantity, Some(500.0));
    assert_eq!(line.display_quantity, Some(500.0));
    assert_eq!(line.unit.as_deref(), Some("g"));
}

#[tokio::test]
async fn unknown_recipe_id_is_an_invalid_parameter() {
    let svc = service();
    let err = svc
        .build_shopping_list(&[uuid::Uuid::new_v4()], 2)
        .await;
    assert!(matches!(
        err,
        Err(PlanError::InvalidParameter {
            name: "recipe_ids",
            ..
        })
    ));
}

#[tokio::test]
async fn zero_servings_is_an_invalid_parameter() {
    let svc = service();
    let err = svc.build_shopping_list(&[fixture_id(1)], 0).await;
    assert!(matches!(
        err,
        Err(PlanError::InvalidParameter { name: "servings", .. })
    ));
}

// ---------------------------------------------------------------------------
// Optimizer degradation
// ---------------------------------------------------------------------------

struct BrokenOptimizer;

#[async_trait]
impl ShoppingOptimizer for BrokenOptimizer {
    async fn reorder(&self, _list: &ShoppingList) -> Result<ShoppingList> {
        Err(anyhow!("optimizer offline"))
    }
}

struct ReversingOptimizer;

#[async_trait]
impl ShoppingOptimizer for ReversingOptimizer {
    async fn reorder(&self, list: &ShoppingList) -> Result<ShoppingList> {
        let mut reordered = list.clone();
        reordered.lines.reverse();
        Ok(reordered)
    }
}

struct LossyOptimizer;

#[async_trait]
impl ShoppingOptimizer for LossyOptimizer {
    async fn reorder(&self, list: &ShoppingList) -> Result<ShoppingList> {
        let mut truncated = list.clone();
        truncated.lines.pop();
        Ok(truncated)
    }
}

#[tokio::test]
async fn failing_optimizer_falls_back_to_deterministic_order() {
    let svc = service().with_optimizer(Arc::new(BrokenOptimizer));
    let list = svc
        .build_shopping_list(&[fixture_id(1), fixture_id(4)], 2)
        .await
        .unwrap();

    assert!(!list.is_empty());

    // Category-grouped: categories appear in declaration order.
    let categories: Vec<Category> = list.lines.iter().map(|l| l.category).collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted, "lines grouped by category");

    // Alphabetical within each category.
    for category in [Category::Produce, Category::Protein, Category::Pantry] {
        let names: Vec<&str> = list.lines_in(category).map(|l| l.name.as_str()).collect();
        let mut expected = names.clone();
        expected.sort();
        assert_eq!(names, expected, "alphabetical within {category:?}");
    }
}

#[tokio::test]
async fn content_preserving_reorder_is_accepted() {
    let plain = service();
    let baseline = plain
        .build_shopping_list(&[fixture_id(1), fixture_id(4)], 2)
        .await
        .unwrap();

    let svc = service().with_optimizer(Arc::new(ReversingOptimizer));
    let list = svc
        .build_shopping_list(&[fixture_id(1), fixture_id(4)], 2)
        .await
        .unwrap();

    assert_eq!(list.fingerprint(), baseline.fingerprint());
    let reversed: Vec<_> = baseline.lines.iter().rev().cloned().collect();
    assert_eq!(list.lines, reversed);
}

#[tokio::test]
async fn content_altering_reorder_is_rejected() {
    let plain = service();
    let baseline = plain
        .build_shopping_list(&[fixture_id(1), fixture_id(4)], 2)
        .await
        .unwrap();

    let svc = service().with_optimizer(Arc::new(LossyOptimizer));
    let list = svc
        .build_shopping_list(&[fixture_id(1), fixture_id(4)], 2)
        .await
        .unwrap();

    // The lossy result is discarded; the deterministic list is returned.
    assert_eq!(list, baseline);
}

#[tokio::test]
async fn servings_scaling_applies_to_the_whole_list() {
    let svc = service();
    let double = svc.build_shopping_list(&[fixture_id(1)], 4).await.unwrap();
    let single = svc.build_shopping_list(&[fixture_id(1)], 2).await.unwrap();

    for (d, s) in double.lines.iter().zip(single.lines.iter()) {
        assert_eq!(d.name, s.name);
        match (d.precise_quantity, s.precise_quantity) {
            (Some(dq), Some(sq)) => assert!((dq - 2.0 * sq).abs() < 1e-9),
            (None, None) => {}
            other => panic!("mismatched quantities: {other:?}"),
        }
    }
}
