// src/rpc/xmlrpc.rs

//! The small subset of XML-RPC needed to talk to supervisord: scalar
//! parameters out, a scalar value or a fault back.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Result, StartupError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    /// Arrays and structs, kept as raw XML.
    Other(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn to_xml(&self) -> String {
        match self {
            Value::Str(s) => format!("<string>{}</string>", escape(s)),
            Value::Int(i) => format!("<int>{i}</int>"),
            Value::Bool(b) => format!("<boolean>{}</boolean>", u8::from(*b)),
            Value::Other(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Other(raw) => f.write_str(raw),
        }
    }
}

static FAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<fault>.*?</fault>").expect("fault regex is valid")
});

static FAULT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<name>\s*faultCode\s*</name>\s*<value>\s*<(?:int|i4)>\s*(-?\d+)\s*</(?:int|i4)>")
        .expect("fault code regex is valid")
});

static FAULT_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<name>\s*faultString\s*</name>\s*<value>\s*(?:<string>)?(.*?)(?:</string>)?\s*</value>")
        .expect("fault string regex is valid")
});

static PARAM_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<params>\s*<param>\s*<value>(.*)</value>\s*</param>\s*</params>")
        .expect("param regex is valid")
});

static SCALAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*<(?P<tag>string|int|i4|boolean)>(?P<body>.*)</(?:string|int|i4|boolean)>\s*$")
        .expect("scalar regex is valid")
});

/// Build a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall>\n");
    out.push_str(&format!("<methodName>{}</methodName>\n<params>\n", escape(method)));
    for param in params {
        out.push_str(&format!("<param><value>{}</value></param>\n", param.to_xml()));
    }
    out.push_str("</params>\n</methodCall>\n");
    out
}

/// Parse a `methodResponse` document.
///
/// A `<fault>` becomes [`StartupError::Rpc`].
pub fn decode_response(body: &str) -> Result<Value> {
    if let Some(fault) = FAULT_RE.find(body) {
        let fault = fault.as_str();
        let code = FAULT_CODE_RE
            .captures(fault)
            .and_then(|c| c[1].parse::<i64>().ok())
            .unwrap_or(0);
        let message = FAULT_STRING_RE
            .captures(fault)
            .map(|c| unescape(c[1].trim()))
            .unwrap_or_default();
        return Err(StartupError::Rpc { code, message });
    }

    let inner = PARAM_VALUE_RE
        .captures(body)
        .map(|c| c[1].to_string())
        .ok_or_else(|| {
            StartupError::Transport("XML-RPC response without a value".to_string())
        })?;

    decode_value(&inner)
}

fn decode_value(inner: &str) -> Result<Value> {
    let Some(caps) = SCALAR_RE.captures(inner) else {
        let trimmed = inner.trim();
        // A bare value without a type tag is a string.
        if !trimmed.starts_with('<') {
            return Ok(Value::Str(unescape(inner)));
        }
        return Ok(Value::Other(trimmed.to_string()));
    };

    let body = &caps["body"];
    match &caps["tag"] {
        "string" => Ok(Value::Str(unescape(body))),
        "boolean" => Ok(Value::Bool(body.trim() == "1")),
        _ => body
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| StartupError::Transport(format!("invalid integer '{body}': {e}"))),
    }
}

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
