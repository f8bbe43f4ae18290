use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("cannot open queue database")]
    Open,
    #[display("cannot upgrade queue schema")]
    Schema,
    #[display("queue query failed")]
    Query,
    /// A stored value doesn't fit the model, such as a negative count.
    #[display("corrupt queue data: {_0}")]
    Corrupt(#[error(not(source))] &'static str),
    /// Completing an item that was never claimed, or was already finished.
    #[display("work item is not in progress: {_0}")]
    NotInProgress(#[error(not(source))] String),
}
