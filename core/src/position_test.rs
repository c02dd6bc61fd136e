#[cfg(test)]
mod tests {
    use crate::position::{Position, Range, offset_to_position, relative_to};

    #[test]
    fn test_range_orders_endpoints() {
        let a = Position::new(3, 1);
        let b = Position::new(1, 7);
        let range = Range::new(a, b);
        assert_eq!(range.start, b);
        assert_eq!(range.end, a);
        assert!(range.contains(Position::new(2, 0)));
        assert!(!range.contains(a));
    }

    #[test]
    fn test_touches_lines() {
        let range = Range::new(Position::new(4, 2), Position::new(6, 0));
        assert!(range.touches_lines(6, 9));
        assert!(range.touches_lines(0, 4));
        assert!(!range.touches_lines(7, 9));
        assert!(Range::point(Position::new(5, 5)).is_empty());
    }

    #[test]
    fn test_offset_to_position() {
        let text = "ab\ncd\n\nxyz";
        assert_eq!(offset_to_position(text, 0), Position::new(0, 0));
        assert_eq!(offset_to_position(text, 4), Position::new(1, 1));
        assert_eq!(offset_to_position(text, 6), Position::new(2, 0));
        assert_eq!(offset_to_position(text, 100), Position::new(3, 3));
        // inside a multi-byte char snaps back to its start
        assert_eq!(offset_to_position("é", 1), Position::new(0, 0));
    }

    #[test]
    fn test_relative_positions() {
        let base = Position::new(10, 4);
        assert_eq!(relative_to(base, Position::new(0, 3)), Position::new(10, 7));
        assert_eq!(relative_to(base, Position::new(2, 3)), Position::new(12, 3));
    }

    #[test]
    fn test_shift_clamps_at_zero() {
        let range = Range::new(Position::new(1, 2), Position::new(3, 0));
        assert_eq!(range.shifted(2).start, Position::new(3, 2));
        assert_eq!(range.shifted(-5).start, Position::new(0, 2));
    }

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(Range::on_line(0, 4, 3).to_string(), "1:5-8");
        assert_eq!(Range::new(Position::new(0, 0), Position::new(2, 1)).to_string(), "1:1-3:2");
    }
}
