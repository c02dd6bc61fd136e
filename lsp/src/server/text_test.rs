#[cfg(test)]
mod tests {
    use drl_core::{Position as CorePosition, Range as CoreRange, TextEdit};
    use ropey::Rope;
    use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent};

    use crate::server::state::Document;
    use crate::server::text::{apply_change, position_to_char_idx, to_core_position, to_lsp_position};

    fn change(range: Option<Range>, text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range,
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_ascii_positions_round_trip() {
        let rope = Rope::from_str("rule x\nend\n");
        assert_eq!(position_to_char_idx(&rope, Position::new(1, 2)), 9);
        assert_eq!(to_core_position(&rope, Position::new(1, 2)), CorePosition::new(1, 2));
        assert_eq!(to_lsp_position(&rope, CorePosition::new(1, 2)), Position::new(1, 2));
    }

    #[test]
    fn test_multibyte_columns() {
        let rope = Rope::from_str("  log(\"é😀x\");");
        assert_eq!(to_core_position(&rope, Position::new(0, 10)), CorePosition::new(0, 13));
        assert_eq!(to_lsp_position(&rope, CorePosition::new(0, 13)), Position::new(0, 10));
        // byte column inside the emoji snaps to its start
        assert_eq!(to_lsp_position(&rope, CorePosition::new(0, 10)), Position::new(0, 8));
    }

    #[test]
    fn test_positions_clamp() {
        let rope = Rope::from_str("abc\ndef");
        assert_eq!(to_core_position(&rope, Position::new(0, 100)), CorePosition::new(0, 3));
        assert_eq!(to_lsp_position(&rope, CorePosition::new(0, 100)), Position::new(0, 3));
        assert_eq!(to_lsp_position(&rope, CorePosition::new(5, 0)), Position::new(1, 3));
    }

    #[test]
    fn test_ranged_change_becomes_edit() {
        let mut rope = Rope::from_str("rule x\nwhen\nend");
        let edit = apply_change(
            &mut rope,
            &change(Some(Range::new(Position::new(1, 0), Position::new(1, 4))), "then"),
        );
        assert_eq!(
            edit,
            Some(TextEdit::new(
                CoreRange::new(CorePosition::new(1, 0), CorePosition::new(1, 4)),
                "then"
            ))
        );
        assert_eq!(rope.to_string(), "rule x\nthen\nend");

        let mut rope = Rope::from_str("a😀b\n");
        let edit = apply_change(
            &mut rope,
            &change(Some(Range::new(Position::new(0, 3), Position::new(0, 4))), "c"),
        );
        assert_eq!(edit.map(|e| e.range), Some(CoreRange::new(CorePosition::new(0, 5), CorePosition::new(0, 6))));
        assert_eq!(rope.to_string(), "a😀c\n");
    }

    #[test]
    fn test_full_change_replaces_text() {
        let mut rope = Rope::from_str("old");
        assert!(apply_change(&mut rope, &change(None, "new text")).is_none());
        assert_eq!(rope.to_string(), "new text");
    }

    #[test]
    fn test_snapshot_claims_pending_edits() {
        let mut doc = Document::new("rule x\nend", 1);
        let first = doc.take_snapshot();
        assert!(first.base.is_none());
        assert_eq!(doc.analyzed_version, Some(1));

        let edit = TextEdit::new(CoreRange::point(CorePosition::new(0, 6)), "y");
        doc.pending_edits.push(edit.clone());
        doc.version = 2;
        let second = doc.take_snapshot();
        assert_eq!(second.version, 2);
        assert_eq!(second.base, Some((1, vec![edit])));
        assert!(doc.pending_edits.is_empty());
    }
}
