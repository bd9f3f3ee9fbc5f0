use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration couldn't be loaded or didn't validate.
    #[display("invalid configuration")]
    Config,
    #[display("unable to write output")]
    Output,
    #[display("unable to listen for shutdown signal")]
    Signal,
}
