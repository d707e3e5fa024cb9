mod table;
mod tabulator;

pub use table::{render_vote_table, render_vote_table_html};
pub use tabulator::{instant_runoff, Round, Tabulation};
