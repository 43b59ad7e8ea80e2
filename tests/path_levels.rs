use catalogd::taxonomy::{
    actual_level, build_path, matches_large, parse_path, sort_labels, CANONICAL_LARGE,
};

#[test]
fn parse_path_splits_into_four_levels() {
    let levels = parse_path("패션의류 > 여성의류 > 원피스");
    assert_eq!(levels.large, "패션의류");
    assert_eq!(levels.medium, "여성의류");
    assert_eq!(levels.small, "원피스");
    assert_eq!(levels.smallest, "");
}

#[test]
fn trailing_empty_segments_are_absent_not_placeholders() {
    let levels = parse_path("A > B >  > ");
    assert_eq!(levels.large, "A");
    assert_eq!(levels.medium, "B");
    assert_eq!(levels.small, "");
    assert_eq!(levels.smallest, "");
    assert_eq!(actual_level("A > B >  > "), 2);
}

#[test]
fn parse_path_never_fails_on_malformed_input() {
    assert_eq!(parse_path(""), Default::default());
    assert_eq!(actual_level(""), 0);
    assert_eq!(actual_level("   "), 0);
    // No separator at all: one big segment.
    assert_eq!(actual_level("패션의류>여성의류"), 1);
}

#[test]
fn actual_level_counts_non_empty_trimmed_segments() {
    assert_eq!(actual_level("패션의류"), 1);
    assert_eq!(actual_level("패션의류 > 여성의류"), 2);
    assert_eq!(actual_level("패션의류 > 여성의류 > 원피스"), 3);
    assert_eq!(actual_level("A > B > C > D"), 4);
}

#[test]
fn build_path_drops_empty_segments_and_trims() {
    assert_eq!(
        build_path([" 패션의류 ", "", "원피스", " "]),
        "패션의류 > 원피스"
    );
    assert_eq!(build_path(["", "", "", ""]), "");
}

#[test]
fn large_matching_is_whitespace_and_case_insensitive() {
    assert!(matches_large("패션의류", "패션 의류"));
    assert!(matches_large("Fashion Goods", "fashiongoods"));
    assert!(!matches_large("패션의류", "패션잡화"));
}

#[test]
fn canonical_taxonomy_has_eleven_roots() {
    assert_eq!(CANONICAL_LARGE.len(), 11);
    assert!(CANONICAL_LARGE.contains(&"패션의류"));
    assert!(CANONICAL_LARGE.contains(&"면세점"));
}

#[test]
fn sort_labels_orders_hangul_alphabetically() {
    let mut labels = vec![
        "원피스".to_string(),
        "남성의류".to_string(),
        "스커트".to_string(),
    ];
    sort_labels(&mut labels, false);
    assert_eq!(labels, vec!["남성의류", "스커트", "원피스"]);
    sort_labels(&mut labels, true);
    assert_eq!(labels, vec!["원피스", "스커트", "남성의류"]);
}
