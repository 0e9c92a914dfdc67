//! SMTP reply lines
//!
//! The session works one line at a time. The reply code of a line is the first
//! integer embedded in it, and a line whose fourth character is `-` is a
//! continuation of a multiline reply.

use std::{
    fmt::{Display, Formatter, Result},
    result,
    str::FromStr,
};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::digit1,
    combinator::{all_consuming, map_res, value},
    sequence::preceded,
    IResult, Parser,
};

use crate::transport::smtp::{error, Error};

/// The first digit indicates severity
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// 2yx
    PositiveCompletion = 2,
    /// 3yz
    PositiveIntermediate = 3,
    /// 4yz
    TransientNegativeCompletion = 4,
    /// 5yz
    PermanentNegativeCompletion = 5,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// Second digit
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// x0z
    Syntax = 0,
    /// x1z
    Information = 1,
    /// x2z
    Connections = 2,
    /// x3z
    Unspecified3 = 3,
    /// x4z
    Unspecified4 = 4,
    /// x5z
    MailSystem = 5,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// The detail digit of a response code (third digit)
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Detail {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
}

impl Display for Detail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// Represents a 3 digit SMTP response code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Code {
    /// First digit of the response code
    pub severity: Severity,
    /// Second digit of the response code
    pub category: Category,
    /// Third digit
    pub detail: Detail,
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}{}{}", self.severity, self.category, self.detail)
    }
}

impl Code {
    /// Creates a new `Code` structure
    pub fn new(severity: Severity, category: Category, detail: Detail) -> Code {
        Code {
            severity,
            category,
            detail,
        }
    }

    /// Tells if the response is positive
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity,
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }

    /// 4yz
    pub fn is_transient(self) -> bool {
        self.severity == Severity::TransientNegativeCompletion
    }

    /// 5yz
    pub fn is_permanent(self) -> bool {
        self.severity == Severity::PermanentNegativeCompletion
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        code.detail as u16 + 10 * code.category as u16 + 100 * code.severity as u16
    }
}

impl FromStr for Code {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Code, Error> {
        all_consuming(parse_code)
            .parse(s)
            .map(|(_, code)| code)
            .map_err(|_| error::response(format!("invalid reply code {s:?}")))
    }
}

impl TryFrom<u16> for Code {
    type Error = Error;

    fn try_from(value: u16) -> result::Result<Self, Self::Error> {
        value.to_string().parse()
    }
}

/// One line received from the server
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Reply {
    code: u16,
    continuation: bool,
    line: String,
}

impl Reply {
    /// Parses a line (without its CRLF terminator)
    pub fn parse(line: &str) -> result::Result<Reply, Error> {
        let (_, code) =
            reply_code(line).map_err(|_| error::response(format!("no reply code in {line:?}")))?;
        Ok(Reply {
            code,
            continuation: line.get(3..4) == Some("-"),
            line: line.to_owned(),
        })
    }

    /// Numeric code, the first integer of the line
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Structured code, when the number is a valid 3 digit reply code
    pub fn status(&self) -> Option<Code> {
        Code::try_from(self.code).ok()
    }

    /// Whether more lines of the same reply follow
    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    /// Whether the server rejected the last command
    pub fn is_error(&self) -> bool {
        self.code > 399
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        self.code == code
    }

    /// The raw line
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Text after the code and separator
    pub fn text(&self) -> &str {
        self.line.get(4..).unwrap_or_default()
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.line)
    }
}

// Parsers

fn reply_code(i: &str) -> IResult<&str, u16> {
    map_res(
        preceded(take_till(|c: char| c.is_ascii_digit()), digit1),
        |digits: &str| digits.parse::<u16>(),
    )
    .parse(i)
}

fn parse_code(i: &str) -> IResult<&str, Code> {
    let (i, severity) = parse_severity(i)?;
    let (i, category) = parse_category(i)?;
    let (i, detail) = parse_detail(i)?;
    Ok((
        i,
        Code {
            severity,
            category,
            detail,
        },
    ))
}

fn parse_severity(i: &str) -> IResult<&str, Severity> {
    alt((
        value(Severity::PositiveCompletion, tag("2")),
        value(Severity::PositiveIntermediate, tag("3")),
        value(Severity::TransientNegativeCompletion, tag("4")),
        value(Severity::PermanentNegativeCompletion, tag("5")),
    ))
    .parse(i)
}

fn parse_category(i: &str) -> IResult<&str, Category> {
    alt((
        value(Category::Syntax, tag("0")),
        value(Category::Information, tag("1")),
        value(Category::Connections, tag("2")),
        value(Category::Unspecified3, tag("3")),
        value(Category::Unspecified4, tag("4")),
        value(Category::MailSystem, tag("5")),
    ))
    .parse(i)
}

fn parse_detail(i: &str) -> IResult<&str, Detail> {
    alt((
        value(Detail::Zero, tag("0")),
        value(Detail::One, tag("1")),
        value(Detail::Two, tag("2")),
        value(Detail::Three, tag("3")),
        value(Detail::Four, tag("4")),
        value(Detail::Five, tag("5")),
        value(Detail::Six, tag("6")),
        value(Detail::Seven, tag("7")),
        value(Detail::Eight, tag("8")),
        value(Detail::Nine, tag("9")),
    ))
    .parse(i)
}
