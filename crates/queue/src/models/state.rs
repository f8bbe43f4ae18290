use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Lifecycle state of a work item.
///
/// ```text
/// PENDING(-1) --claim--> IN_PROGRESS(0) --success--> DONE(1)
///                              \----------failure--> PENDING(-1)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    InProgress,
    Done,
}

impl State {
    /// The persisted integer code, as also written to `urls.csv`.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            State::Pending => -1,
            State::InProgress => 0,
            State::Done => 1,
        }
    }
}

impl TryFrom<i64> for State {
    type Error = Error;
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(State::Pending),
            0 => Ok(State::InProgress),
            1 => Ok(State::Done),
            _ => exn::bail!(ErrorKind::Corrupt("state")),
        }
    }
}

impl FromStr for State {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().parse::<i64>().or_raise(|| ErrorKind::Corrupt("state"))?;
        State::try_from(code)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            State::Pending => "pending",
            State::InProgress => "in progress",
            State::Done => "done",
        })
    }
}
