//! Vote grid for auditability: who ranked what.
//!
//! Rows are voters, columns are submission numbers in ascending order,
//! cells hold the 1-based rank that voter gave the submission (blank when
//! unranked). Candidate ordering matches the tabulator's input set so the
//! grid and the tally never disagree.

use crate::domain::RankedChoices;
use std::collections::BTreeSet;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Render the vote grid as a monospace table.
///
/// `ballots` pairs each voter's display name with their ballot;
/// `candidates` is the full submission-number set for the meeting.
pub fn render_vote_table(
    ballots: &[(String, RankedChoices)],
    candidates: &BTreeSet<i64>,
) -> String {
    let mut builder = Builder::default();

    let mut header = vec![String::new()];
    header.extend(candidates.iter().map(|c| c.to_string()));
    builder.push_record(header);

    for (name, choices) in ballots {
        let mut row = vec![name.clone()];
        row.extend(candidates.iter().map(|&candidate| {
            choices
                .rank_of(candidate)
                .map(|rank| rank.to_string())
                .unwrap_or_default()
        }));
        builder.push_record(row);
    }

    builder.build().with(Style::ascii()).to_string()
}

/// Wrap the grid for Telegram HTML parse mode
pub fn render_vote_table_html(
    ballots: &[(String, RankedChoices)],
    candidates: &BTreeSet<i64>,
) -> String {
    format!("<pre>{}</pre>", render_vote_table(ballots, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(first: i64, second: i64, third: i64) -> RankedChoices {
        RankedChoices {
            first,
            second,
            third,
        }
    }

    #[test]
    fn grid_holds_ranks_and_blanks() {
        let candidates: BTreeSet<i64> = [1, 2, 3, 4].into_iter().collect();
        let ballots = vec![
            ("Ana".to_string(), ballot(2, 4, 1)),
            ("Bo".to_string(), ballot(3, 1, 2)),
        ];

        let table = render_vote_table(&ballots, &candidates);
        let lines: Vec<&str> = table.lines().collect();

        // Header row lists candidates in ascending order
        let header = lines[1];
        let h: Vec<&str> = header.split('|').map(str::trim).collect();
        assert_eq!(&h[2..6], &["1", "2", "3", "4"]);

        // Ana ranked 2 first, 4 second, 1 third; 3 left blank
        let ana = lines
            .iter()
            .find(|l| l.contains("Ana"))
            .expect("Ana row present");
        let cells: Vec<&str> = ana.split('|').map(str::trim).collect();
        assert_eq!(&cells[2..6], &["3", "1", "", "2"]);
    }

    #[test]
    fn html_rendering_is_preformatted() {
        let candidates: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
        let ballots = vec![("Cy".to_string(), ballot(1, 2, 3))];
        let html = render_vote_table_html(&ballots, &candidates);
        assert!(html.starts_with("<pre>"));
        assert!(html.ends_with("</pre>"));
    }

    #[test]
    fn one_row_per_voter() {
        let candidates: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
        let ballots = vec![
            ("A".to_string(), ballot(1, 2, 3)),
            ("B".to_string(), ballot(2, 3, 1)),
            ("C".to_string(), ballot(3, 1, 2)),
        ];
        let table = render_vote_table(&ballots, &candidates);
        for name in ["A", "B", "C"] {
            assert!(table.lines().any(|l| l.contains(name)));
        }
    }
}
