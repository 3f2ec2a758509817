//! Minimal XML-RPC codec: just the value kinds and call/response shapes
//! the solving service speaks. Responses are schema-checked; anything
//! outside the expected shape surfaces as a malformed-response error
//! instead of a panic.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use quick_xml::escape::escape;
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;

use crate::error::TransportError;

/// A single XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Double(f64),
    String(String),
    Base64(Vec<u8>),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Base64(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Struct member lookup by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(n) => {
                out.push_str("<int>");
                out.push_str(&n.to_string());
                out.push_str("</int>");
            }
            Value::Bool(b) => {
                out.push_str("<boolean>");
                out.push(if *b { '1' } else { '0' });
                out.push_str("</boolean>");
            }
            Value::Double(d) => {
                out.push_str("<double>");
                out.push_str(&d.to_string());
                out.push_str("</double>");
            }
            Value::String(s) => {
                out.push_str("<string>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</string>");
            }
            Value::Base64(bytes) => {
                out.push_str("<base64>");
                out.push_str(&BASE64.encode(bytes));
                out.push_str("</base64>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write_xml(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape(name.as_str()));
                    out.push_str("</name>");
                    value.write_xml(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
        }
        out.push_str("</value>");
    }
}

/// Render one method call document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?>");
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.write_xml(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Decode a method response body into its (single) return value, or the
/// service-reported fault.
pub fn decode_response(body: &str) -> Result<Value, TransportError> {
    let mut reader = Reader::from_reader(body.as_bytes());

    loop {
        match read(&mut reader)? {
            Event::Start(e) if e.name().as_ref() == b"methodResponse" => break,
            Event::Start(e) => {
                return Err(malformed(format!(
                    "expected methodResponse, found <{}>",
                    String::from_utf8_lossy(e.name().as_ref())
                )))
            }
            Event::Eof => return Err(malformed("empty response body")),
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
            Event::Text(t) if is_blank(&t) => continue,
            _ => return Err(malformed("unexpected content before methodResponse")),
        }
    }

    loop {
        match read(&mut reader)? {
            Event::Start(e) if e.name().as_ref() == b"params" => {
                return decode_first_param(&mut reader)
            }
            Event::Start(e) if e.name().as_ref() == b"fault" => {
                return Err(decode_fault(&mut reader))
            }
            Event::Text(t) if is_blank(&t) => continue,
            Event::Comment(_) => continue,
            Event::End(_) | Event::Eof => {
                return Err(malformed("response carries neither params nor fault"))
            }
            _ => return Err(malformed("unexpected content in methodResponse")),
        }
    }
}

fn decode_first_param(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    loop {
        match read(reader)? {
            Event::Start(e) if e.name().as_ref() == b"param" => return decode_value_elem(reader),
            Event::Text(t) if is_blank(&t) => continue,
            Event::End(e) if e.name().as_ref() == b"params" => {
                return Err(malformed("response carries no parameters"))
            }
            Event::Eof => return Err(malformed("truncated response")),
            _ => return Err(malformed("unexpected content in params")),
        }
    }
}

/// Consume a `<value>...</value>` element, including the surrounding
/// whitespace, and return its decoded value.
fn decode_value_elem(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    loop {
        match read(reader)? {
            Event::Start(e) if e.name().as_ref() == b"value" => return decode_value_body(reader),
            Event::Empty(e) if e.name().as_ref() == b"value" => {
                return Ok(Value::String(String::new()))
            }
            Event::Text(t) if is_blank(&t) => continue,
            Event::Eof => return Err(malformed("truncated response")),
            _ => return Err(malformed("expected a value element")),
        }
    }
}

/// Decode the inside of a `<value>` element through its closing tag.
/// Bare text with no type tag is a string, per the protocol convention.
fn decode_value_body(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut text = String::new();
    loop {
        match read(reader)? {
            Event::Text(t) => {
                text.push_str(&unescape_text(&t)?);
            }
            Event::CData(c) => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::Start(e) => {
                let tag = e.name().as_ref().to_vec();
                let value = match tag.as_slice() {
                    b"int" | b"i4" => {
                        let body = read_text(reader, &tag)?;
                        let n = body.trim().parse::<i32>().map_err(|_| {
                            malformed(format!("invalid integer value {:?}", body))
                        })?;
                        Value::Int(n)
                    }
                    b"boolean" => {
                        let body = read_text(reader, &tag)?;
                        match body.trim() {
                            "1" | "true" => Value::Bool(true),
                            "0" | "false" => Value::Bool(false),
                            other => {
                                return Err(malformed(format!(
                                    "invalid boolean value {:?}",
                                    other
                                )))
                            }
                        }
                    }
                    b"double" => {
                        let body = read_text(reader, &tag)?;
                        let d = body.trim().parse::<f64>().map_err(|_| {
                            malformed(format!("invalid double value {:?}", body))
                        })?;
                        Value::Double(d)
                    }
                    b"string" => Value::String(read_text(reader, &tag)?),
                    b"base64" => {
                        let body = read_text(reader, &tag)?;
                        // The service wraps long payloads; strip the line breaks.
                        let compact: String =
                            body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                        let bytes = BASE64.decode(compact.as_bytes()).map_err(|e| {
                            malformed(format!("invalid base64 payload: {}", e))
                        })?;
                        Value::Base64(bytes)
                    }
                    b"array" => decode_array(reader)?,
                    b"struct" => decode_struct(reader)?,
                    other => {
                        return Err(malformed(format!(
                            "unsupported value type <{}>",
                            String::from_utf8_lossy(other)
                        )))
                    }
                };
                consume_end(reader, b"value")?;
                return Ok(value);
            }
            Event::Empty(e) => {
                let value = match e.name().as_ref() {
                    b"string" => Value::String(String::new()),
                    b"base64" => Value::Base64(Vec::new()),
                    b"array" => Value::Array(Vec::new()),
                    b"struct" => Value::Struct(Vec::new()),
                    other => {
                        return Err(malformed(format!(
                            "unsupported empty value type <{}>",
                            String::from_utf8_lossy(other)
                        )))
                    }
                };
                consume_end(reader, b"value")?;
                return Ok(value);
            }
            Event::End(e) if e.name().as_ref() == b"value" => return Ok(Value::String(text)),
            Event::Eof => return Err(malformed("unterminated value")),
            _ => return Err(malformed("unexpected content in value")),
        }
    }
}

fn decode_array(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut items = Vec::new();

    loop {
        match read(reader)? {
            Event::Start(e) if e.name().as_ref() == b"data" => break,
            Event::Empty(e) if e.name().as_ref() == b"data" => {
                consume_end(reader, b"array")?;
                return Ok(Value::Array(items));
            }
            Event::Text(t) if is_blank(&t) => continue,
            Event::Eof => return Err(malformed("unterminated array")),
            _ => return Err(malformed("array without a data element")),
        }
    }

    loop {
        match read(reader)? {
            Event::Start(e) if e.name().as_ref() == b"value" => {
                items.push(decode_value_body(reader)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"value" => {
                items.push(Value::String(String::new()));
            }
            Event::End(e) if e.name().as_ref() == b"data" => break,
            Event::Text(t) if is_blank(&t) => continue,
            Event::Eof => return Err(malformed("unterminated array")),
            _ => return Err(malformed("unexpected content in array")),
        }
    }

    consume_end(reader, b"array")?;
    Ok(Value::Array(items))
}

fn decode_struct(reader: &mut Reader<&[u8]>) -> Result<Value, TransportError> {
    let mut members = Vec::new();

    loop {
        match read(reader)? {
            Event::Start(e) if e.name().as_ref() == b"member" => {
                let mut name: Option<String> = None;
                loop {
                    match read(reader)? {
                        Event::Start(e) if e.name().as_ref() == b"name" => {
                            name = Some(read_text(reader, b"name")?);
                        }
                        Event::Start(e) if e.name().as_ref() == b"value" => {
                            let value = decode_value_body(reader)?;
                            let name = name
                                .take()
                                .ok_or_else(|| malformed("struct member without a name"))?;
                            members.push((name, value));
                        }
                        Event::Empty(e) if e.name().as_ref() == b"value" => {
                            let name = name
                                .take()
                                .ok_or_else(|| malformed("struct member without a name"))?;
                            members.push((name, Value::String(String::new())));
                        }
                        Event::End(e) if e.name().as_ref() == b"member" => break,
                        Event::Text(t) if is_blank(&t) => continue,
                        Event::Eof => return Err(malformed("unterminated struct")),
                        _ => return Err(malformed("unexpected content in struct member")),
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"struct" => return Ok(Value::Struct(members)),
            Event::Text(t) if is_blank(&t) => continue,
            Event::Eof => return Err(malformed("unterminated struct")),
            _ => return Err(malformed("unexpected content in struct")),
        }
    }
}

/// Decode the value inside a `<fault>` element into the fault error.
fn decode_fault(reader: &mut Reader<&[u8]>) -> TransportError {
    match decode_value_elem(reader) {
        Ok(value) => {
            let code = value
                .field("faultCode")
                .and_then(Value::as_i32)
                .unwrap_or_default();
            let message = value
                .field("faultString")
                .and_then(Value::as_str)
                .unwrap_or("unspecified fault")
                .to_string();
            TransportError::Fault { code, message }
        }
        Err(e) => e,
    }
}

/// Accumulate text content up to the closing tag.
fn read_text(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<String, TransportError> {
    let mut out = String::new();
    loop {
        match read(reader)? {
            Event::Text(t) => out.push_str(&unescape_text(&t)?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) if e.name().as_ref() == tag => return Ok(out),
            Event::Eof => {
                return Err(malformed(format!(
                    "missing </{}>",
                    String::from_utf8_lossy(tag)
                )))
            }
            _ => {
                return Err(malformed(format!(
                    "unexpected element inside <{}>",
                    String::from_utf8_lossy(tag)
                )))
            }
        }
    }
}

/// Skip whitespace until the expected closing tag.
fn consume_end(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<(), TransportError> {
    loop {
        match read(reader)? {
            Event::End(e) if e.name().as_ref() == tag => return Ok(()),
            Event::Text(t) if is_blank(&t) => continue,
            Event::Eof => {
                return Err(malformed(format!(
                    "missing </{}>",
                    String::from_utf8_lossy(tag)
                )))
            }
            _ => {
                return Err(malformed(format!(
                    "unexpected content before </{}>",
                    String::from_utf8_lossy(tag)
                )))
            }
        }
    }
}

fn read<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>, TransportError> {
    reader
        .read_event()
        .map_err(|e| malformed(format!("invalid xml: {}", e)))
}

fn unescape_text(t: &BytesText) -> Result<String, TransportError> {
    t.unescape()
        .map(|s| s.into_owned())
        .map_err(|e| malformed(format!("invalid xml text: {}", e)))
}

fn is_blank(t: &BytesText) -> bool {
    t.iter().all(|b| b.is_ascii_whitespace())
}

fn malformed(detail: impl Into<String>) -> TransportError {
    TransportError::MalformedResponse(detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_call_renders_params_in_order() {
        let call = encode_call(
            "getJobStatus",
            &[Value::Int(42), Value::String("tok".to_string())],
        );
        assert!(call.contains("<methodName>getJobStatus</methodName>"));
        let int_pos = call.find("<int>42</int>").unwrap();
        let str_pos = call.find("<string>tok</string>").unwrap();
        assert!(int_pos < str_pos);
    }

    #[test]
    fn encode_call_escapes_string_params() {
        let call = encode_call("submitJob", &[Value::String("<doc>&</doc>".to_string())]);
        assert!(call.contains("&lt;doc&gt;&amp;&lt;/doc&gt;"));
        assert!(!call.contains("<doc>&</doc>"));
    }

    #[test]
    fn decode_string_response() {
        let body = r#"<?xml version="1.0"?>
<methodResponse>
  <params><param><value><string>Running</string></value></param></params>
</methodResponse>"#;
        assert_eq!(
            decode_response(body).unwrap(),
            Value::String("Running".to_string())
        );
    }

    #[test]
    fn decode_untyped_value_is_a_string() {
        let body = "<methodResponse><params><param><value>Done</value></param></params></methodResponse>";
        assert_eq!(
            decode_response(body).unwrap(),
            Value::String("Done".to_string())
        );
    }

    #[test]
    fn decode_array_of_base64_and_int() {
        // The shape getIntermediateResults returns.
        let body = r#"<methodResponse><params><param><value><array><data>
            <value><base64>aGVs
bG8=</base64></value>
            <value><int>5</int></value>
        </data></array></value></param></params></methodResponse>"#;
        let value = decode_response(body).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items[0], Value::Base64(b"hello".to_vec()));
        assert_eq!(items[1], Value::Int(5));
    }

    #[test]
    fn decode_fault_response() {
        let body = r#"<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>2</int></value></member>
            <member><name>faultString</name><value><string>no such method</string></value></member>
        </struct></value></fault></methodResponse>"#;
        match decode_response(body) {
            Err(TransportError::Fault { code, message }) => {
                assert_eq!(code, 2);
                assert_eq!(message, "no such method");
            }
            other => panic!("expected a fault, got {:?}", other),
        }
    }

    #[test]
    fn decode_struct_field_lookup() {
        let body = r#"<methodResponse><params><param><value><struct>
            <member><name>status</name><value><string>ok</string></value></member>
        </struct></value></param></params></methodResponse>"#;
        let value = decode_response(body).unwrap();
        assert_eq!(
            value.field("status").and_then(Value::as_str),
            Some("ok")
        );
        assert_eq!(value.field("missing"), None);
    }

    #[test]
    fn escaped_text_is_unescaped() {
        let body = "<methodResponse><params><param><value><string>a &amp; b &lt;ok&gt;</string></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(body).unwrap(),
            Value::String("a & b <ok>".to_string())
        );
    }

    #[test]
    fn empty_value_elements_decode() {
        let body = "<methodResponse><params><param><value><string/></value></param></params></methodResponse>";
        assert_eq!(decode_response(body).unwrap(), Value::String(String::new()));

        let body = "<methodResponse><params><param><value><base64/></value></param></params></methodResponse>";
        assert_eq!(decode_response(body).unwrap(), Value::Base64(Vec::new()));
    }

    #[test]
    fn response_without_params_or_fault_is_malformed() {
        let body = "<methodResponse></methodResponse>";
        assert!(matches!(
            decode_response(body),
            Err(TransportError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unknown_value_type_is_malformed() {
        let body = "<methodResponse><params><param><value><dateTime.iso8601>x</dateTime.iso8601></value></param></params></methodResponse>";
        assert!(matches!(
            decode_response(body),
            Err(TransportError::MalformedResponse(_))
        ));
    }

    #[test]
    fn truncated_body_is_malformed() {
        let body = "<methodResponse><params><param><value><string>oops";
        assert!(matches!(
            decode_response(body),
            Err(TransportError::MalformedResponse(_))
        ));
    }
}
