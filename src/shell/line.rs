//! The line being composed and its cursor.
//!
//! The cursor is stored as an offset from the END of the text: 0 means "after the
//! last character", `len` means "before the first character". Every edit keeps
//! `cursor_offset_from_end <= len`.

/// Input buffer of the shell. Holds ASCII-class characters only, so byte
/// offsets and character offsets coincide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    text: String,
    cursor_offset_from_end: usize,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cursor_offset_from_end(&self) -> usize {
        self.cursor_offset_from_end
    }

    /// Byte index of the cursor counted from the start.
    fn cursor_index(&self) -> usize {
        self.text.len() - self.cursor_offset_from_end
    }

    /// Insert `ch` at the cursor; the offset from the end is unchanged.
    pub fn insert(&mut self, ch: char) {
        let index = self.cursor_index();
        self.text.insert(index, ch);
        self.check();
    }

    /// Remove the character immediately before the cursor. Returns false when the
    /// cursor is already at the start (or the line is empty).
    pub fn remove_before_cursor(&mut self) -> bool {
        if self.text.is_empty() || self.cursor_offset_from_end >= self.text.len() {
            return false;
        }
        let index = self.cursor_index() - 1;
        self.text.remove(index);
        self.check();
        true
    }

    /// Remove the character under the cursor; the cursor keeps its column.
    pub fn remove_at_cursor(&mut self) -> bool {
        if self.cursor_offset_from_end == 0 {
            return false;
        }
        let index = self.cursor_index();
        self.text.remove(index);
        self.cursor_offset_from_end -= 1;
        self.check();
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor_offset_from_end >= self.text.len() {
            return false;
        }
        self.cursor_offset_from_end += 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor_offset_from_end == 0 {
            return false;
        }
        self.cursor_offset_from_end -= 1;
        true
    }

    pub fn move_home(&mut self) {
        self.cursor_offset_from_end = self.text.len();
    }

    pub fn move_end(&mut self) {
        self.cursor_offset_from_end = 0;
    }

    /// Replace the text (history recall); cursor goes to the end.
    pub fn set(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.cursor_offset_from_end = 0;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor_offset_from_end = 0;
    }

    fn check(&self) {
        debug_assert!(
            self.cursor_offset_from_end <= self.text.len(),
            "cursor offset {} exceeds line length {}",
            self.cursor_offset_from_end,
            self.text.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::InputLine;

    fn typed(text: &str) -> InputLine {
        let mut line = InputLine::new();
        for ch in text.chars() {
            line.insert(ch);
        }
        line
    }

    #[test]
    fn backspace_inside_the_line_keeps_offset() {
        let mut line = typed("hello");
        assert!(line.move_left());
        assert!(line.move_left());
        assert_eq!(line.cursor_offset_from_end(), 2);

        assert!(line.remove_before_cursor());
        assert_eq!(line.text(), "helo");
        assert_eq!(line.cursor_offset_from_end(), 2);
    }

    #[test]
    fn backspace_at_start_is_refused() {
        let mut line = typed("ab");
        line.move_home();
        assert!(!line.remove_before_cursor());
        assert_eq!(line.text(), "ab");
        assert!(!InputLine::new().remove_before_cursor());
    }

    #[test]
    fn delete_removes_under_cursor_and_decrements_offset() {
        let mut line = typed("abc");
        line.move_home();
        assert!(line.remove_at_cursor());
        assert_eq!(line.text(), "bc");
        assert_eq!(line.cursor_offset_from_end(), 2);

        line.move_end();
        assert!(!line.remove_at_cursor());
    }

    #[test]
    fn insert_in_the_middle_uses_offset_from_end() {
        let mut line = typed("ac");
        line.move_left();
        line.insert('b');
        assert_eq!(line.text(), "abc");
        assert_eq!(line.cursor_offset_from_end(), 1);
    }

    #[test]
    fn moves_stop_at_both_ends() {
        let mut line = typed("x");
        assert!(!line.move_right());
        assert!(line.move_left());
        assert!(!line.move_left());
        line.set("longer");
        assert_eq!(line.cursor_offset_from_end(), 0);
        line.clear();
        assert!(line.is_empty());
    }
}
