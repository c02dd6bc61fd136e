use drl_core::{Position as CorePosition, Range as CoreRange, TextEdit};
use ropey::Rope;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent};

// Convert LSP UTF-16 position to Rope char index (scalar values), clamped to the end of the line.
pub(crate) fn position_to_char_idx(text: &Rope, pos: Position) -> usize {
    let line_idx = pos.line as usize;
    if line_idx >= text.len_lines() {
        return text.len_chars();
    }
    let line_start_char = text.line_to_char(line_idx);
    let line_slice = text.line(line_idx);
    let target_utf16 = pos.character as usize;

    if let Some(s) = line_slice.as_str()
        && s.is_ascii()
    {
        let visible = s.strip_suffix('\n').unwrap_or(s).len();
        return line_start_char + target_utf16.min(visible);
    }

    let mut seen_utf16 = 0usize;
    let mut chars_in_line = 0usize;
    for ch in line_slice.chars() {
        let u16_len = ch.len_utf16();
        if ch == '\n' || seen_utf16 + u16_len > target_utf16 {
            break;
        }
        seen_utf16 += u16_len;
        chars_in_line += 1;
        if seen_utf16 == target_utf16 {
            break;
        }
    }
    line_start_char + chars_in_line
}

/// LSP position (UTF-16 column) to an analysis position (byte column).
pub(crate) fn to_core_position(text: &Rope, pos: Position) -> CorePosition {
    let char_idx = position_to_char_idx(text, pos);
    let line = text.char_to_line(char_idx);
    let column = text.char_to_byte(char_idx) - text.line_to_byte(line);
    CorePosition::new(line as u32, column as u32)
}

/// Analysis position (byte column) to LSP position (UTF-16 column). Columns
/// inside a multi-byte character snap to its start; past the end of the
/// line they clamp to it.
pub(crate) fn to_lsp_position(text: &Rope, pos: CorePosition) -> Position {
    let line = pos.line as usize;
    if line >= text.len_lines() {
        let last = text.len_lines().saturating_sub(1);
        let line_start = text.line_to_char(last);
        let width = text.char_to_utf16_cu(text.len_chars()) - text.char_to_utf16_cu(line_start);
        return Position::new(last as u32, width as u32);
    }
    let line_start_byte = text.line_to_byte(line);
    let slice = text.line(line);
    let visible = slice.len_bytes() - usize::from(slice.chars().last() == Some('\n'));
    let byte = line_start_byte + (pos.column as usize).min(visible);
    let char_idx = text.byte_to_char(byte);
    let line_start_char = text.line_to_char(line);
    let column = text.char_to_utf16_cu(char_idx) - text.char_to_utf16_cu(line_start_char);
    Position::new(line as u32, column as u32)
}

pub(crate) fn to_lsp_range(text: &Rope, range: CoreRange) -> tower_lsp::lsp_types::Range {
    tower_lsp::lsp_types::Range::new(to_lsp_position(text, range.start), to_lsp_position(text, range.end))
}

/// Apply one LSP change to the buffer. A ranged change comes back as the
/// equivalent analysis edit, expressed against the text before it; a whole
/// document replacement returns `None`.
pub(crate) fn apply_change(text: &mut Rope, change: &TextDocumentContentChangeEvent) -> Option<TextEdit> {
    let Some(range) = &change.range else {
        *text = Rope::from_str(&change.text);
        return None;
    };
    let start_char = position_to_char_idx(text, range.start);
    let end_char = position_to_char_idx(text, range.end);
    let (s, e) = if start_char <= end_char {
        (start_char, end_char)
    } else {
        (end_char, start_char)
    };
    let edit = TextEdit::new(
        CoreRange::new(to_core_position(text, range.start), to_core_position(text, range.end)),
        change.text.clone(),
    );

    if s != e {
        text.remove(s..e);
    }
    if !change.text.is_empty() {
        text.insert(s, &change.text);
    }
    Some(edit)
}
