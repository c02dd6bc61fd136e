#[cfg(test)]
mod tests {
    use crate::bracket::*;
    use crate::position::{Position, Range};

    fn partition_size(table: &BracketTable) -> usize {
        table.pairs.len() * 2 + table.unmatched_open.len() + table.unmatched_close.len()
    }

    #[test]
    fn test_balanced_multiline_construct() {
        let tracker = BracketTracker::from_text("exists(\n  Person(age > 18)\n)");
        let table = tracker.table();
        assert_eq!(table.pairs.len(), 2);
        assert!(table.unmatched_open.is_empty());
        assert!(table.unmatched_close.is_empty());
        assert!(table.is_balanced());
        assert_eq!(partition_size(table), table.len());
    }

    #[test]
    fn test_unclosed_outer_group_invents_no_partial_pairs() {
        let tracker = BracketTracker::from_text("exists(\n  Person(age > 18)");
        let table = tracker.table();
        assert_eq!(table.pairs.len(), 0);
        assert_eq!(table.unmatched_open.len(), 2);
        assert_eq!(table.unmatched_close.len(), 1);
        assert_eq!(partition_size(table), table.len());

        // only the outer bracket is reported
        assert_eq!(table.issues.len(), 1);
        assert_eq!(table.issues[0].kind, BracketIssueKind::Unclosed);
        assert_eq!(table.issues[0].bracket.position, Position::new(0, 6));
    }

    #[test]
    fn test_brackets_inside_strings_and_comments_are_ignored() {
        let text = "Person(name == \"(\\\")\") // stray )\nCat('[') /* ( */";
        let table = BracketTracker::from_text(text).into_table();
        assert_eq!(table.pairs.len(), 2);
        assert!(table.is_balanced());
    }

    #[test]
    fn test_stray_close_and_kind_mismatch() {
        let table = BracketTracker::from_text(") ( ]\n)").into_table();
        assert_eq!(table.pairs.len(), 1);
        assert_eq!(table.unmatched_close.len(), 2);
        let unexpected: Vec<_> = table
            .issues
            .iter()
            .filter(|i| i.kind == BracketIssueKind::Unexpected)
            .collect();
        assert_eq!(unexpected.len(), 2);
        assert_eq!(unexpected[0].message(), "Unmatched ')'");
        assert_eq!(unexpected[1].message(), "Unmatched ']'");
    }

    #[test]
    fn test_pair_lookup_and_range() {
        let table = BracketTracker::from_text("a(b)").into_table();
        let pair = table.pair_at(Position::new(0, 3)).expect("pair");
        assert_eq!(pair.open, Position::new(0, 1));
        assert_eq!(pair.range(), Range::new(Position::new(0, 1), Position::new(0, 4)));
    }

    #[test]
    fn test_splice_only_rescans_edited_lines() {
        let before = "rule \"a\"\nwhen\n  Person(\nthen\nend";
        let mut tracker = BracketTracker::from_text(before);
        assert!(!tracker.table().is_balanced());

        // replace line 2 with two lines that close the paren
        let after = "rule \"a\"\nwhen\n  Person(\n  )\nthen\nend";
        let lines: Vec<&str> = after.split('\n').collect();
        tracker.splice_lines(&lines, 2, 3, 4);
        assert_eq!(tracker, BracketTracker::from_text(after));
        assert!(tracker.table().is_balanced());
        assert_eq!(tracker.line_count(), 6);
    }

    #[test]
    fn test_splice_shifts_following_lines() {
        let mut tracker = BracketTracker::from_text("x\ny\nfoo(bar)");
        tracker.splice_lines(&["foo(bar)"], 0, 2, 0);
        let pair = tracker.table().pairs[0];
        assert_eq!(pair.open, Position::new(0, 3));
        assert_eq!(pair.close, Position::new(0, 7));
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let text = "/*\n  legacy rule (disabled\n*/\nrule \"a\"\nwhen\n    Person()\nthen\nend\n";
        let table = BracketTracker::from_text(text).into_table();
        assert_eq!(table.pairs.len(), 1);
        assert_eq!(table.pairs[0].open, Position::new(5, 10));
        assert!(table.issues.is_empty());

        // code after the closing marker counts again
        let table = BracketTracker::from_text("a /* ( \n ) */ f(x)").into_table();
        assert_eq!(table.pairs.len(), 1);
        assert_eq!(table.pairs[0].open, Position::new(1, 7));
    }

    #[test]
    fn test_splice_that_opens_a_comment_rescans_following_lines() {
        let before = "f(\nx\ng(y)\n)";
        let mut tracker = BracketTracker::from_text(before);
        assert_eq!(tracker.table().pairs.len(), 2);

        // turning line 1 into an unterminated comment hides everything below it
        let after = "f(\n/* x\ng(y)\n)";
        let lines: Vec<&str> = after.split('\n').collect();
        tracker.splice_lines(&lines, 1, 2, 2);
        assert_eq!(tracker, BracketTracker::from_text(after));
        assert_eq!(tracker.table().unmatched_open.len(), 1);

        // closing it again restores the pairs
        let restored = "f(\n/* x */\ng(y)\n)";
        let lines: Vec<&str> = restored.split('\n').collect();
        tracker.splice_lines(&lines, 1, 2, 2);
        assert_eq!(tracker, BracketTracker::from_text(restored));
        assert_eq!(tracker.table().pairs.len(), 2);
    }
}
