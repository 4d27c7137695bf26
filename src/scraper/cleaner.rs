use crate::models::WeeklyRow;

// ── Cell cleaning ─────────────────────────────────────────────────────────────

/// Keep only ASCII digits and minus signs.
/// "1,234 head" → "1234" | "-5%" → "-5" | "110.5" → "1105"
///
/// The decimal point is dropped on purpose: stored values match what the
/// report has always produced, and consumers divide where they need to.
pub fn strip_non_numeric(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect()
}

// ── Block → WeeklyRow ─────────────────────────────────────────────────────────

/// Build a row from one block. `block[0]` is the marker line.
///
/// A block cut short by the end of the text yields empty strings for the
/// missing offsets.
pub fn block_to_row(block: &[&str]) -> WeeklyRow {
    let cell = |i: usize| block.get(i).copied().unwrap_or_default();
    let num = |i: usize| strip_non_numeric(cell(i));

    WeeklyRow {
        sheep_index: cell(1).to_string(),
        total_head_inc_reoffers: num(2),
        clearance_rate_mm: num(3),
        amount_over_reserve: num(4),
        arli_ckg_dw: num(5),
        arl_change_sheep_index: num(6),
        total_head_change_sheep_index: num(7),
        clearance_rate_change_sheep_index: num(8),
        vor_change_sheep_index: num(9),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_non_numeric() {
        assert_eq!(strip_non_numeric("1,234 head"), "1234");
        assert_eq!(strip_non_numeric("-5%"), "-5");
        assert_eq!(strip_non_numeric("$1,200"), "1200");
        assert_eq!(strip_non_numeric("110.5"), "1105");
        assert_eq!(strip_non_numeric("+2.1"), "21");
        assert_eq!(strip_non_numeric("n/a"), "");
    }

    #[test]
    fn test_strip_keeps_leading_zeros_and_repeated_minus() {
        assert_eq!(strip_non_numeric("007"), "007");
        assert_eq!(strip_non_numeric("--3-"), "--3-");
    }

    #[test]
    fn test_block_to_row() {
        let block = [
            "Select Row", "W2024-10", "1500 head", "85%", "$1,200", "110.5", "+2.1", "-3",
            "1.5", "0.8", "trailing",
        ];
        let row = block_to_row(&block);

        assert_eq!(row.sheep_index, "W2024-10");
        assert_eq!(row.total_head_inc_reoffers, "1500");
        assert_eq!(row.clearance_rate_mm, "85");
        assert_eq!(row.amount_over_reserve, "1200");
        assert_eq!(row.arli_ckg_dw, "1105");
        assert_eq!(row.arl_change_sheep_index, "21");
        assert_eq!(row.total_head_change_sheep_index, "-3");
        assert_eq!(row.clearance_rate_change_sheep_index, "15");
        assert_eq!(row.vor_change_sheep_index, "08");
    }

    #[test]
    fn test_short_block_yields_empty_cells() {
        let row = block_to_row(&["Select Row", "W7", "300"]);
        assert_eq!(row.sheep_index, "W7");
        assert_eq!(row.total_head_inc_reoffers, "300");
        assert_eq!(row.clearance_rate_mm, "");
        assert_eq!(row.vor_change_sheep_index, "");
    }
}
