use super::*;
use crate::localization::ResourceLocalizer;
use crate::size::SizeCategory;

fn assessment(size: SizeCategory, tested: Option<bool>) -> SizeAssessment {
    SizeAssessment {
        size,
        is_small: size <= SizeCategory::S,
        is_sufficiently_tested: tested,
    }
}

#[test]
fn test_title_prefix_indicators() {
    assert_eq!(title_prefix(&assessment(SizeCategory::XS, Some(true))), "XS✔ ◾ ");
    assert_eq!(title_prefix(&assessment(SizeCategory::M, Some(false))), "M⚠️ ◾ ");
    assert_eq!(title_prefix(&assessment(SizeCategory::XL(1), None)), "XL ◾ ");
}

#[test]
fn test_title_with_size_adds_prefix() {
    let title = title_with_size("Add caching", &assessment(SizeCategory::L, Some(true)));

    assert_eq!(title, "L✔ ◾ Add caching");
}

#[test]
fn test_title_with_size_replaces_existing_prefix() {
    let current = assessment(SizeCategory::S, Some(true));

    assert_eq!(title_with_size("XL⚠️ ◾ Add caching", &current), "S✔ ◾ Add caching");
    assert_eq!(title_with_size("12XL ◾ Add caching", &current), "S✔ ◾ Add caching");
    assert_eq!(title_with_size("M✔ ◾ Add caching", &current), "S✔ ◾ Add caching");
}

#[test]
fn test_title_with_size_keeps_lookalike_text() {
    let title = title_with_size("Small ◾ fix", &assessment(SizeCategory::XS, None));

    assert_eq!(title, "XS ◾ Small ◾ fix");
}

#[test]
fn test_plan_title_update_for_unchanged_pull_request() {
    let localizer = ResourceLocalizer::english();

    let update = plan_title_update(
        &localizer,
        "M✔ ◾ Add caching",
        Some("Adds a cache."),
        &assessment(SizeCategory::M, Some(true)),
    );

    assert!(update.is_empty());
}

#[test]
fn test_plan_title_update_fills_missing_description() {
    let localizer = ResourceLocalizer::english();

    let missing = plan_title_update(
        &localizer,
        "Add caching",
        None,
        &assessment(SizeCategory::M, None),
    );
    let blank = plan_title_update(
        &localizer,
        "M ◾ Add caching",
        Some("  \n"),
        &assessment(SizeCategory::M, None),
    );

    assert_eq!(
        missing,
        TitleUpdate {
            title: Some("M ◾ Add caching".to_string()),
            description: Some("❌ **Add a description.**".to_string()),
        }
    );
    assert_eq!(blank.title, None);
    assert_eq!(blank.description, Some("❌ **Add a description.**".to_string()));
}
