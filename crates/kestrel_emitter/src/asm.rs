//! Assembly text buffers and label allocation.

use std::fmt::{self, Write as _};

/// A jump target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    /// A fixed, non-numbered label such as a function entry point.
    pub fn named(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out `L<n>` labels from one monotonic counter. A purpose suffix
/// (`L7_divzero`) aids reading; uniqueness comes from the counter alone.
#[derive(Debug, Clone, Default)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, purpose: &str) -> Label {
        let n = self.next;
        self.next += 1;
        if purpose.is_empty() {
            Label(format!("L{}", n))
        } else {
            Label(format!("L{}_{}", n, purpose))
        }
    }

    /// Labels allocated so far.
    pub fn count(&self) -> u32 {
        self.next
    }
}

/// Line-oriented assembly output.
#[derive(Debug, Clone)]
pub struct AsmBuffer {
    out: String,
    emit_comments: bool,
}

impl AsmBuffer {
    pub fn new(emit_comments: bool) -> Self {
        Self {
            out: String::with_capacity(4096),
            emit_comments,
        }
    }

    /// An indented instruction.
    pub fn instr(&mut self, args: fmt::Arguments<'_>) {
        self.out.push_str("    ");
        let _ = self.out.write_fmt(args);
        self.out.push('\n');
    }

    /// A line at column zero: section directives and data definitions.
    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        self.out.push('\n');
    }

    pub fn label(&mut self, label: &Label) {
        self.out.push_str(label.as_str());
        self.out.push_str(":\n");
    }

    /// A `#` comment, dropped when comments are disabled.
    pub fn comment(&mut self, text: &str) {
        if self.emit_comments {
            self.out.push_str("    # ");
            self.out.push_str(text);
            self.out.push('\n');
        }
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// `instr!(buf, "li {}, {}", reg, 5)` writes one indented instruction.
macro_rules! instr {
    ($buf:expr, $($arg:tt)*) => {
        $buf.instr(format_args!($($arg)*))
    };
}

pub(crate) use instr;

/// Escape text for an `.asciiz` directive.
pub fn escape_asciiz(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\0' => escaped.push_str("\\0"),
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_share_one_counter() {
        let mut labels = LabelAllocator::new();
        assert_eq!(labels.fresh("").to_string(), "L0");
        assert_eq!(labels.fresh("divzero").to_string(), "L1_divzero");
        assert_eq!(labels.fresh("").to_string(), "L2");
        assert_eq!(labels.count(), 3);
    }

    #[test]
    fn test_buffer_layout() {
        let mut buf = AsmBuffer::new(true);
        buf.line(format_args!(".text"));
        buf.label(&Label::named("main"));
        buf.comment("entry");
        instr!(buf, "li {}, {}", "$t0", 5);
        assert_eq!(buf.finish(), ".text\nmain:\n    # entry\n    li $t0, 5\n");
    }

    #[test]
    fn test_comments_can_be_disabled() {
        let mut buf = AsmBuffer::new(false);
        buf.comment("hidden");
        assert!(buf.as_str().is_empty());
    }

    #[test]
    fn test_escape_asciiz() {
        assert_eq!(escape_asciiz("a\"b\n"), "a\\\"b\\n");
    }
}
