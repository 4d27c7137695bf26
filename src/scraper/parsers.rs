//! Positional parser for the rendered report text.
//!
//! The embedded report renders each table row as a run of lines that starts
//! with a "Select Row" accessibility label. After trimming and dropping blank
//! lines, the nine cells of that row follow at fixed offsets 1..=9. There is
//! no markup to lean on, so a layout change upstream shows up here as rows
//! with garbage cells or as no rows at all.

use crate::models::WeeklyRow;
use tracing::debug;

use super::cleaner::block_to_row;

/// Marker line that opens every block.
pub const ROW_MARKER: &str = "Select Row";

/// Lines per block, marker included.
pub const BLOCK_LEN: usize = 11;

/// Trimmed, non-empty lines in rendered order.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// One slice per marker occurrence, `BLOCK_LEN` lines long or shorter when
/// the text runs out.
pub fn find_blocks<'a>(lines: &'a [&'a str]) -> Vec<&'a [&'a str]> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == ROW_MARKER)
        .map(|(i, _)| &lines[i..(i + BLOCK_LEN).min(lines.len())])
        .collect()
}

/// Parse every block in `text` into a row, top to bottom.
pub fn parse_rows(text: &str) -> Vec<WeeklyRow> {
    let lines = split_lines(text);
    let blocks = find_blocks(&lines);
    debug!("{} lines, {} blocks", lines.len(), blocks.len());

    blocks
        .into_iter()
        .map(|block| {
            if block.len() < BLOCK_LEN {
                debug!("Block truncated at {} lines", block.len());
            }
            block_to_row(block)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(week: &str, head: &str) -> String {
        format!(
            "Select Row\n{week}\n{head} head\n85%\n$1,200\n110.5\n+2.1\n-3\n1.5\n0.8\nDetails\n"
        )
    }

    #[test]
    fn test_split_lines_trims_and_drops_blanks() {
        let lines = split_lines("  a \n\n\t\n b\r\nc  ");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_four_blocks_in_order() {
        let text = format!(
            "Sheep Index\nWeek\n{}{}{}{}Footer",
            block("W2024-10", "1500"),
            block("W2024-09", "1400"),
            block("W2024-08", "1300"),
            block("W2024-07", "1200"),
        );
        let rows = parse_rows(&text);

        assert_eq!(rows.len(), 4);
        let weeks: Vec<_> = rows.iter().map(|r| r.sheep_index.as_str()).collect();
        assert_eq!(weeks, ["W2024-10", "W2024-09", "W2024-08", "W2024-07"]);
        assert_eq!(rows[0].total_head_inc_reoffers, "1500");
        assert_eq!(rows[3].total_head_inc_reoffers, "1200");
        assert_eq!(rows[0].arli_ckg_dw, "1105");
    }

    #[test]
    fn test_no_marker_no_rows() {
        assert!(parse_rows("Loading...\nPlease wait\n").is_empty());
        assert!(parse_rows("").is_empty());
    }

    #[test]
    fn test_marker_must_match_whole_line() {
        assert!(parse_rows("Select Rows\nselect row\nSelect Row please\n").is_empty());
        assert_eq!(parse_rows("   Select Row   \nW1\n").len(), 1);
    }

    #[test]
    fn test_extra_blocks_are_all_returned() {
        let text: String = (0..6).map(|i| block(&format!("W{i}"), "10")).collect();
        assert_eq!(parse_rows(&text).len(), 6);
    }

    #[test]
    fn test_trailing_block_truncated() {
        let text = format!("{}Select Row\nW2024-01\n900 head\n", block("W2024-02", "1000"));
        let rows = parse_rows(&text);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].sheep_index, "W2024-01");
        assert_eq!(rows[1].total_head_inc_reoffers, "900");
        assert_eq!(rows[1].clearance_rate_mm, "");
    }

    #[test]
    fn test_find_blocks_window_length() {
        let text: String = block("W1", "1");
        let lines = split_lines(&text);
        let blocks = find_blocks(&lines);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), BLOCK_LEN);
        assert_eq!(blocks[0][0], ROW_MARKER);
    }
}
