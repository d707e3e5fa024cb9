//! Command parsing for incoming messages.

/// A parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Instructions,
    Commands,
    Status,
    NewMeeting,
    Search(String),
    Choose(i64),
    FinishSubmissions,
    Vote(i64, i64, i64),
    FinishVoting,
}

/// Why a command-shaped message could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Recognized command, malformed arguments; holds the expected format
    BadArguments(&'static str),
    /// Leading slash but no command we know
    Unknown,
}

impl Command {
    /// Parse a message text. `None` when the message is not a command at
    /// all (no leading slash); commands tolerate a `@botname` suffix.
    pub fn parse(text: &str) -> Option<Result<Command, ParseError>> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or_default();
        let tail = parts.next().unwrap_or("").trim();

        // "/vote@book_club_bot 1 2 3" -> "vote"
        let name = head[1..].split('@').next().unwrap_or_default();

        let parsed = match name {
            "instructions" => Ok(Command::Instructions),
            "commands" => Ok(Command::Commands),
            "status" | "checkStatus" => Ok(Command::Status),
            "new_meeting" | "newMeeting" => Ok(Command::NewMeeting),
            "search" => {
                if tail.is_empty() {
                    Err(ParseError::BadArguments("/search <search query>"))
                } else {
                    Ok(Command::Search(tail.to_string()))
                }
            }
            "choose" => match parse_numbers::<1>(tail) {
                Some([n]) => Ok(Command::Choose(n)),
                None => Err(ParseError::BadArguments("/choose <number>")),
            },
            "finish_submissions" | "finishSubmissions" => Ok(Command::FinishSubmissions),
            "vote" => match parse_numbers::<3>(tail) {
                Some([a, b, c]) => Ok(Command::Vote(a, b, c)),
                None => Err(ParseError::BadArguments(
                    "/vote <first choice number> <second choice number> <third choice number>",
                )),
            },
            "finish_voting" | "finishVoting" => Ok(Command::FinishVoting),
            _ => Err(ParseError::Unknown),
        };

        Some(parsed)
    }
}

/// Parse exactly N whitespace-separated integers
fn parse_numbers<const N: usize>(tail: &str) -> Option<[i64; N]> {
    let mut numbers = [0i64; N];
    let mut parts = tail.split_whitespace();
    for slot in numbers.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(numbers)
}
