mod ballot;
mod meeting;
mod work;

pub use ballot::{Ballot, RankedChoices};
pub use meeting::{Meeting, MeetingStage, Submission};
pub use work::{format_authors, format_work_list, WorkSummary};
