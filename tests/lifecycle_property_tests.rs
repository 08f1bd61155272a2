//! Property-based tests for listing validation and the settlement lifecycle
//!
//! This module uses the proptest crate to verify that draft validation,
//! listing patches, search filters and the transition policy behave
//! correctly across a wide range of randomly generated inputs, not just
//! the specific rows exercised by the unit tests.

use eco_market::error::ValidationError;
use eco_market::impact::ImpactModel;
use eco_market::product::{
    Category, Condition, Product, ProductDraft, ProductPatch, ProductStatus, SearchFilter,
};
use eco_market::time::TimeStamp;
use eco_market::transaction::{TransactionStatus, TransitionPolicy};
use eco_market::utils::new_uuid_to_bech32;
use proptest::prelude::*;

// PROPERTY TEST STRATEGIES

/// Strategy to generate random Category values
fn category_strategy() -> impl Strategy<Value = Category> {
    (0u8..=8).prop_map(|i| match i {
        0 => Category::Electronics,
        1 => Category::Clothing,
        2 => Category::Fashion,
        3 => Category::Furniture,
        4 => Category::Books,
        5 => Category::Sports,
        6 => Category::HomeGarden,
        7 => Category::Toys,
        _ => Category::Other,
    })
}

/// Strategy to generate random Condition values
fn condition_strategy() -> impl Strategy<Value = Condition> {
    (0u8..=4).prop_map(|i| match i {
        0 => Condition::New,
        1 => Condition::LikeNew,
        2 => Condition::Good,
        3 => Condition::Fair,
        _ => Condition::Poor,
    })
}

/// Strategy to generate random TransactionStatus values
fn status_strategy() -> impl Strategy<Value = TransactionStatus> {
    (0u8..=4).prop_map(|i| match i {
        0 => TransactionStatus::Purchased,
        1 => TransactionStatus::Shipped,
        2 => TransactionStatus::Delivered,
        3 => TransactionStatus::Completed,
        _ => TransactionStatus::Canceled,
    })
}

/// Strategy to generate positive listing prices (1 to 100_000_000)
fn price_strategy() -> impl Strategy<Value = u64> {
    1u64..=100_000_000u64
}

/// Helper to assemble a stored product from generated listing fields.
/// The generated strings have no edge whitespace, so they match what the
/// draft path would have persisted.
fn stored_product(
    title: &str,
    description: &str,
    price: u64,
    category: Category,
    condition: Condition,
    location: &str,
) -> Product {
    Product {
        id: new_uuid_to_bech32("prod_").unwrap(),
        title: title.to_owned(),
        description: description.to_owned(),
        price,
        original_price: None,
        category,
        condition,
        location: location.to_owned(),
        images: Vec::new(),
        seller: new_uuid_to_bech32("user_").unwrap(),
        status: ProductStatus::Listed,
        eco_impact: ImpactModel::builtin().estimate(category, price),
        views: 0,
        likes: 0,
        liked_by: Vec::new(),
        created_at: TimeStamp::new(),
        updated_at: TimeStamp::new(),
    }
}

// PROPERTY TESTS
proptest! {
    /// Property: Any fully populated draft with in-range fields validates
    ///
    /// This is the core listing invariant, a draft carrying every required
    /// field within the length and price limits must pass validation, and
    /// validation must hand the fields through unchanged.
    #[test]
    fn prop_complete_drafts_always_validate(
        title in "[a-zA-Z0-9]{1,100}",
        description in "[a-zA-Z0-9 ]{1,2000}",
        price in price_strategy(),
        category in category_strategy(),
        condition in condition_strategy(),
        location in "[a-zA-Z]{1,40}"
    ) {
        let draft = ProductDraft::new()
            .set_title(&title)
            .set_description(&description)
            .set_price(price)
            .set_category(category)
            .set_condition(condition)
            .set_location(&location);

        let result = draft.validate();
        prop_assert!(
            result.is_ok(),
            "Complete draft with in-range fields should validate: {:?}",
            result.err()
        );

        let valid = result.unwrap();
        prop_assert_eq!(valid.title, title);
        prop_assert_eq!(valid.description, description);
        prop_assert_eq!(valid.price, price);
        prop_assert_eq!(valid.category, category);
        prop_assert_eq!(valid.condition, condition);
        prop_assert_eq!(valid.location, location);
    }

    /// Property: Titles over the limit never validate
    ///
    /// Whatever the rest of the draft looks like, a title longer than 100
    /// characters must be rejected with the title length error.
    #[test]
    fn prop_overlong_titles_never_validate(
        title in "[a-zA-Z0-9]{101,150}",
        description in "[a-zA-Z0-9 ]{1,2000}",
        price in price_strategy(),
        category in category_strategy(),
        condition in condition_strategy(),
        location in "[a-zA-Z]{1,40}"
    ) {
        let draft = ProductDraft::new()
            .set_title(&title)
            .set_description(&description)
            .set_price(price)
            .set_category(category)
            .set_condition(condition)
            .set_location(&location);

        prop_assert_eq!(draft.validate().unwrap_err(), ValidationError::TitleTooLong);
    }

    /// Property: A patch with in-range fields keeps the record valid
    ///
    /// Applying a patch built from in-range values must succeed, move only
    /// the patched fields, and leave everything else exactly as stored.
    #[test]
    fn prop_patch_keeps_the_record_valid(
        title in "[a-zA-Z0-9]{1,100}",
        description in "[a-zA-Z0-9 ]{1,2000}",
        price in price_strategy(),
        category in category_strategy(),
        condition in condition_strategy(),
        location in "[a-zA-Z]{1,40}",
        new_title in "[a-zA-Z0-9]{1,100}",
        new_price in price_strategy()
    ) {
        let mut product = stored_product(&title, &description, price, category, condition, &location);
        let patch = ProductPatch::new().set_title(&new_title).set_price(new_price);

        prop_assert!(patch.apply(&mut product).is_ok());
        prop_assert_eq!(product.title, new_title);
        prop_assert_eq!(product.price, new_price);
        prop_assert_eq!(product.description, description);
        prop_assert_eq!(product.location, location);
        prop_assert_eq!(product.category, category);
    }

    /// Property: A product matches a filter built from its own fields
    ///
    /// Searching with the product's own category, condition, exact price as
    /// both bounds, and full title as the text needle must find it. This
    /// pins the inclusive bounds and the case-insensitive text match.
    #[test]
    fn prop_filter_from_a_products_own_fields_matches_it(
        title in "[a-zA-Z0-9]{1,100}",
        description in "[a-zA-Z0-9 ]{1,2000}",
        price in price_strategy(),
        category in category_strategy(),
        condition in condition_strategy(),
        location in "[a-zA-Z]{1,40}"
    ) {
        let product = stored_product(&title, &description, price, category, condition, &location);
        let filter = SearchFilter::new()
            .set_category(category)
            .set_condition(condition)
            .set_min_price(price)
            .set_max_price(price)
            .set_text(&title);

        prop_assert!(
            filter.matches(&product),
            "A product should match a filter built from its own fields"
        );
    }

    /// Property: The forward-only policy is a strict order over statuses
    ///
    /// No status may move to itself, no permitted move may be permitted in
    /// reverse, and permitted moves chain. Together these rule out cycles,
    /// so under this policy every settlement history terminates.
    #[test]
    fn prop_forward_only_is_a_strict_order(
        a in status_strategy(),
        b in status_strategy(),
        c in status_strategy()
    ) {
        let policy = TransitionPolicy::ForwardOnly;

        prop_assert!(!policy.permits(a, a), "no status may move to itself: {:?}", a);
        prop_assert!(
            !(policy.permits(a, b) && policy.permits(b, a)),
            "a permitted move must not be permitted in reverse: {:?} and {:?}",
            a, b
        );
        if policy.permits(a, b) && policy.permits(b, c) {
            prop_assert!(
                policy.permits(a, c),
                "permitted moves should chain: {:?} -> {:?} -> {:?}",
                a, b, c
            );
        }
    }
}

// ADDITIONAL PROPTEST EXAMPLES WITH EXPLICIT CONFIGURATION

/// Property test with custom configuration for more extensive testing
///
/// Configure proptest for deeper exploration:
/// - More test cases (1000 instead of default 256)
/// - Useful for critical invariants that need higher confidence
#[cfg(test)]
mod extensive_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// Property: Validation never lets a bad field through
        ///
        /// Drafts are fed entirely arbitrary strings and prices, including
        /// empty strings, pure whitespace, control characters and zero. The
        /// draft may fail or pass, but whenever it passes every invariant
        /// the store relies on must hold on the output.
        #[test]
        fn prop_validation_never_lets_a_bad_field_through(
            title in ".*",
            description in ".*",
            location in ".*",
            price in any::<u64>(),
            category in category_strategy(),
            condition in condition_strategy()
        ) {
            let draft = ProductDraft::new()
                .set_title(&title)
                .set_description(&description)
                .set_price(price)
                .set_category(category)
                .set_condition(condition)
                .set_location(&location);

            if let Ok(valid) = draft.validate() {
                prop_assert!(!valid.title.is_empty());
                prop_assert!(valid.title.chars().count() <= 100);
                prop_assert_eq!(valid.title.trim(), valid.title.as_str());
                prop_assert!(!valid.description.is_empty());
                prop_assert!(valid.description.chars().count() <= 2000);
                prop_assert!(valid.price > 0);
                prop_assert!(!valid.location.is_empty());
            }
        }
    }
}
