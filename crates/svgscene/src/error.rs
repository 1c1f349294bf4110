// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// List of all errors.
#[derive(Debug)]
pub enum Error {
    /// Failed to allocate memory for a new node.
    NoMemory,

    /// Malformed attribute, style or path data.
    ///
    /// Contains a short description of the offending value.
    ParseError(String),

    /// A value is syntactically valid but not allowed.
    ///
    /// For example, an image with a negative width.
    InvalidValue(String),

    /// A structural precondition was violated.
    ///
    /// Returned when injecting into a non-container node, when cloning with
    /// an already registered ID or when dropping a node that is attached
    /// to a non-container parent. The latter means that the tree is corrupted.
    InvalidCall,

    /// The requested file doesn't exist.
    FileNotFound,

    /// An I/O error.
    IoError(std::io::Error),

    /// A resource lookup failed.
    NoSuchElement,

    /// An element is not a scene node.
    ///
    /// Used internally for elements that are absorbed by their parent,
    /// like filter primitives and gradient stops.
    UnknownElementType,

    /// Only UTF-8 content are supported.
    NotAnUtf8Str,

    /// Compressed SVG must use the GZip algorithm.
    MalformedGZip,

    /// We do not allow SVG with more than 1024 nested elements.
    ElementsLimitReached,

    /// Failed to parse an XML data.
    ParsingFailed(roxmltree::Error),
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::ParsingFailed(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound
        } else {
            Error::IoError(e)
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::NoMemory => {
                write!(f, "out of memory")
            }
            Error::ParseError(ref value) => {
                write!(f, "failed to parse {}", value)
            }
            Error::InvalidValue(ref value) => {
                write!(f, "invalid value {}", value)
            }
            Error::InvalidCall => {
                write!(f, "invalid call")
            }
            Error::FileNotFound => {
                write!(f, "file not found")
            }
            Error::IoError(ref e) => {
                write!(f, "I/O error cause {}", e)
            }
            Error::NoSuchElement => {
                write!(f, "no such element")
            }
            Error::UnknownElementType => {
                write!(f, "unknown element type")
            }
            Error::NotAnUtf8Str => {
                write!(f, "provided data has not an UTF-8 encoding")
            }
            Error::MalformedGZip => {
                write!(f, "provided data has a malformed GZip content")
            }
            Error::ElementsLimitReached => {
                write!(f, "the maximum SVG nesting depth has been reached")
            }
            Error::ParsingFailed(ref e) => {
                write!(f, "SVG data parsing failed cause {}", e)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::IoError(ref e) => Some(e),
            Error::ParsingFailed(ref e) => Some(e),
            _ => None,
        }
    }
}

impl Error {
    pub(crate) fn parse(what: &str, value: &str) -> Self {
        Error::ParseError(format!("{} '{}'", what, value))
    }
}
