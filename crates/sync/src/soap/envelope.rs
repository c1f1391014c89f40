//! SOAP 1.1 envelope construction and response extraction.

use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use secrecy::{ExposeSecret, SecretString};

use super::RemoteFetchError;

/// Name of the stock export operation.
pub const OPERATION: &str = "GetStoneData";

/// Element carrying the export payload in the response.
pub const RESULT_ELEMENT: &str = "GetStoneDataResult";

/// `SOAPAction` header value for the stock export.
#[must_use]
pub fn soap_action(namespace: &str) -> String {
    format!("\"{namespace}{OPERATION}\"")
}

/// Build the `GetStoneData` request envelope.
#[must_use]
pub fn build_request(
    namespace: &str,
    username: &str,
    password: &SecretString,
    api_key: &SecretString,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <{OPERATION} xmlns="{namespace}">
      <userName>{username}</userName>
      <passWord>{password}</passWord>
      <apiKey>{api_key}</apiKey>
    </{OPERATION}>
  </soap:Body>
</soap:Envelope>"#,
        namespace = escape(namespace),
        username = escape(username),
        password = escape(password.expose_secret()),
        api_key = escape(api_key.expose_secret()),
    )
}

/// What a response envelope contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapResponse {
    /// The stock export payload.
    Result(String),
    /// A SOAP fault with its `faultstring`.
    Fault(String),
}

/// Read a response envelope.
///
/// The result payload is returned verbatim when it is inline markup, and
/// unescaped when the service returned it as a string.
///
/// # Errors
///
/// Returns `RemoteFetchError::Envelope` if the envelope is not well-formed XML,
/// or `RemoteFetchError::MissingResult` if it holds neither a result nor a fault.
pub fn parse_response(body: &str) -> Result<SoapResponse, RemoteFetchError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut saw_fault = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"GetStoneDataResult" => {
                    let raw = reader
                        .read_text(e.name())
                        .map_err(|err| RemoteFetchError::Envelope(err.to_string()))?;
                    return Ok(SoapResponse::Result(decode_payload(&raw)?));
                }
                b"Fault" => saw_fault = true,
                b"faultstring" => {
                    let raw = reader
                        .read_text(e.name())
                        .map_err(|err| RemoteFetchError::Envelope(err.to_string()))?;
                    let message = unescape(&raw)
                        .map_err(|err| RemoteFetchError::Envelope(err.to_string()))?;
                    return Ok(SoapResponse::Fault(message.trim().to_string()));
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == RESULT_ELEMENT.as_bytes() => {
                return Ok(SoapResponse::Result(String::new()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(RemoteFetchError::Envelope(err.to_string())),
        }
    }

    if saw_fault {
        return Ok(SoapResponse::Fault("unspecified SOAP fault".to_string()));
    }
    Err(RemoteFetchError::MissingResult(RESULT_ELEMENT))
}

/// Escaped payloads are unescaped; inline markup is kept as-is.
fn decode_payload(raw: &str) -> Result<String, RemoteFetchError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('<') {
        return Ok(trimmed.to_string());
    }
    unescape(trimmed)
        .map(|s| s.trim().to_string())
        .map_err(|err| RemoteFetchError::Envelope(err.to_string()))
}
