//! Cross-type contracts exercised through the public API, the way the
//! server crate uses them.

use savory_core::{Coordinates, Email, Rating, Slug, haversine_meters};

/// Creating the same store name repeatedly walks base, base-2, base-3, ...
/// exactly as the repository drives it: each round feeds the previously
/// persisted slugs back in.
#[test]
fn slug_sequence_under_repeated_collisions() {
    let mut persisted: Vec<String> = Vec::new();
    let mut seen = Vec::new();

    for _ in 0..4 {
        let slug = Slug::next_unique("Beer Bar", &persisted).unwrap();
        persisted.push(slug.as_str().to_owned());
        seen.push(slug.into_inner());
    }

    assert_eq!(seen, ["beer-bar", "beer-bar-2", "beer-bar-3", "beer-bar-4"]);
}

#[test]
fn rating_bounds_match_review_form_values() {
    for v in 1..=5 {
        assert!(Rating::new(v).is_ok());
    }
    assert!(Rating::new(0).is_err());
    assert!(Rating::new(6).is_err());
}

#[test]
fn proximity_radius_contract() {
    // The proximity query keeps stores within 10 km of the origin. The SQL
    // evaluates the same Haversine formula as this function.
    let origin = Coordinates::new(-79.3832, 43.6535).unwrap();
    let near = Coordinates::new(-79.3871, 43.6426).unwrap();
    let far = Coordinates::new(-79.3832, 43.8000).unwrap();

    assert!(origin.distance_m(&near) <= 10_000.0);
    assert!(origin.distance_m(&far) > 10_000.0);

    // Symmetry: the filter does not depend on argument order.
    let a = haversine_meters(origin.lng(), origin.lat(), far.lng(), far.lat());
    let b = haversine_meters(far.lng(), far.lat(), origin.lng(), origin.lat());
    assert!((a - b).abs() < 1e-6);
}

#[test]
fn email_normalization_collides_on_case_and_whitespace() {
    let a = Email::parse("Jane@Example.COM").unwrap();
    let b = Email::parse("  jane@example.com ").unwrap();
    assert_eq!(a, b);
}
