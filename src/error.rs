use std::error::Error as STDError;
use std::fmt;
use std::result::Result as STDResult;

pub type Result<T> = STDResult<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A value outside its declared numeric domain: a float channel outside
    /// `[0.0, 1.0]` or a bitfield value wider than its field
    Range,
    /// A pixel or chip index outside the chain bounds
    Index,
    /// An invalid chain size or an opcode outside the documented command set
    Config,
    /// The spi device failed during a bulk transfer
    Spi,
    /// The serial clock line failed during a command window
    Sclk,
    /// The serial data line failed during a command window
    Mosi,
    /// The latch line failed
    Lat,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Range => write!(f, "Value Out Of Range"),
            Error::Index => write!(f, "Index Out Of Bounds"),
            Error::Config => write!(f, "Invalid Chain Configuration"),
            Error::Spi => write!(f, "SPI Write Error"),
            Error::Sclk => write!(f, "Clock Write Error"),
            Error::Mosi => write!(f, "Data Write Error"),
            Error::Lat => write!(f, "Latch Write Error"),
        }
    }
}

impl STDError for Error {}
