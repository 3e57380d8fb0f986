use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_merge_covers_both() {
    let decl = Span::new(10, 20).merge(Span::new(15, 30));
    assert_eq!(decl, Span::new(10, 30));
    assert_eq!(Span::new(15, 30).merge(Span::new(10, 20)), decl);
}

#[test]
fn test_point() {
    let span = Span::point(7);
    assert!(span.is_empty());
    assert_eq!(span.to_range(), 7..7);
    assert_eq!(format!("{span:?}"), "7..7");
}

#[test]
fn test_from_range_saturates() {
    let past = u32::MAX as usize + 1;
    assert_eq!(Span::from_range(3..past), Span::new(3, u32::MAX));
    assert_eq!(Span::from_range(past..past), Span::new(u32::MAX, u32::MAX));
}

#[test]
fn test_file_id() {
    assert_eq!(FileId(3).index(), 3);
    assert!(FileId(1) < FileId(2));
}
