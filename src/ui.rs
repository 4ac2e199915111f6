//! Terminal tables for CLI output.
//!
//! Columns size themselves to their content and shrink, widest first, when the
//! terminal is too narrow. Cells may carry ANSI colors.
//!
//! ```rust
//! let mut table = objlist::ui::Table::new(&["Object list", "Stamp"]);
//! table.add_row(vec!["core".to_string(), "1f00".to_string()]);
//! table.print();
//! ```

use colored::*;
use std::cmp;

const MIN_COLUMN: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        let (_height, width) = console::Term::stdout().size();
        print!("{}", self.render(width as usize));
    }

    /// Lay the table out for a terminal `max_width` columns wide.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(max_width);

        let sep = |left: &str, mid: &str, right: &str| -> String {
            let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, inner.join(mid), right)
        };

        let mut out = sep("┌", "┬", "┐");
        out.push_str("  │");
        for (header, &width) in self.headers.iter().zip(&widths) {
            let cell = truncate(header, width);
            let padding = width.saturating_sub(cell.chars().count());
            out.push_str(&format!(" {} {}│", cell.bold(), " ".repeat(padding)));
        }
        out.push('\n');
        out.push_str(&sep("├", "┼", "┤"));

        for row in &self.rows {
            out.push_str("  │");
            for (cell, &width) in row.iter().zip(&widths) {
                let clean = sanitize_content(cell);
                let cell = console::truncate_str(&clean, width, "...");
                let padding = width.saturating_sub(strip_ansi(&cell).chars().count());
                out.push_str(&format!(" {} {}│", cell, " ".repeat(padding)));
            }
            out.push('\n');
        }
        out.push_str(&sep("└", "┴", "┘"));
        out
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = strip_ansi(&sanitize_content(cell)).chars().count();
                widths[i] = cmp::max(widths[i], len);
            }
        }

        let overhead = 3 + 3 * widths.len();
        let available = max_width.saturating_sub(overhead);
        let mut total: usize = widths.iter().sum();
        while total > available {
            let Some((widest, &w)) = widths.iter().enumerate().max_by_key(|&(_, w)| *w) else {
                break;
            };
            if w <= MIN_COLUMN {
                break;
            }
            widths[widest] -= 1;
            total -= 1;
        }
        widths
    }
}

fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let mut result: String = s.chars().take(max_width.saturating_sub(3)).collect();
        result.push_str("...");
        result
    } else {
        s.to_string()
    }
}

fn sanitize_content(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}

fn strip_ansi(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(&'[') = chars.peek() {
                chars.next();
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_cells() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Object list", "Stamp"]);
        table.add_row(vec!["core".to_string(), "00000000000000ff".to_string()]);
        table.add_row(vec!["dropped".to_string()]);
        let out = table.render(120);
        assert!(out.contains("core"));
        assert!(out.contains("00000000000000ff"));
        assert!(!out.contains("dropped"));
        assert_eq!(out.lines().count(), 5);
    }

    #[test]
    fn test_columns_shrink_to_fit() {
        let mut table = Table::new(&["A", "B"]);
        table.add_row(vec!["x".repeat(60), "y".repeat(10)]);
        let widths = table.column_widths(40);
        assert!(widths.iter().sum::<usize>() + 9 <= 40);
        assert!(widths.iter().all(|&w| w >= MIN_COLUMN));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[32mok\x1b[0m"), "ok");
        assert_eq!(sanitize_content("a\tb\nc"), "a b c");
    }
}
