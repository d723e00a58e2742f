//! # Queue Message Structures
//!
//! Wire formats for the request and result queues. Requests are JSON
//! integers, with JSON `null` as the shutdown sentinel; results are
//! `[parameter, value]` pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one unit of requested work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameter(i64);

impl Parameter {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for Parameter {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scalar produced by post-processing an artifact
pub type ResultValue = i64;

/// One item dequeued from the request queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Parameter>", into = "Option<Parameter>")]
pub enum Request {
    /// Run the simulation for this parameter
    Parameter(Parameter),
    /// Stop listening; already dispatched work still drains
    Shutdown,
}

impl From<Option<Parameter>> for Request {
    fn from(value: Option<Parameter>) -> Self {
        match value {
            Some(parameter) => Request::Parameter(parameter),
            None => Request::Shutdown,
        }
    }
}

impl From<Request> for Option<Parameter> {
    fn from(request: Request) -> Self {
        match request {
            Request::Parameter(parameter) => Some(parameter),
            Request::Shutdown => None,
        }
    }
}

/// `(parameter, value)` pair published on the result queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPair(pub Parameter, pub ResultValue);

impl ResultPair {
    pub fn parameter(&self) -> Parameter {
        self.0
    }

    pub fn value(&self) -> ResultValue {
        self.1
    }
}

impl fmt::Display for ResultPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.0, self.1)
    }
}
