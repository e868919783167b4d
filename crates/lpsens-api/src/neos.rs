//! [`JobQueue`] backed by the NEOS server's XML-RPC interface.
//!
//! Only the three calls the polling loop needs are spoken: `submitJob`,
//! `getJobStatus` and `getFinalResults`. The XML-RPC handling covers the
//! scalar replies those calls return and nothing more.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;

use crate::remote::{JobHandle, JobQueue, JobStatus, RemoteError};

pub const DEFAULT_ENDPOINT: &str = "https://neos-server.org:3333";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeosConfig {
    pub endpoint: String,
    pub category: String,
    pub solver: String,
    /// NEOS rejects jobs without a contact address
    pub email: String,
}

impl Default for NeosConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            category: "lp".to_string(),
            solver: "Clp".to_string(),
            email: String::new(),
        }
    }
}

pub struct NeosQueue {
    client: reqwest::Client,
    config: NeosConfig,
}

enum Param<'a> {
    Int(i64),
    Str(&'a str),
}

impl NeosQueue {
    pub fn new(config: NeosConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// The job document NEOS expects, with the model inlined as MPS.
    pub fn job_document(&self, mps: &str) -> String {
        format!(
            "<document>\n<category>{}</category>\n<solver>{}</solver>\n<inputMethod>MPS</inputMethod>\n<email>{}</email>\n<MPS><![CDATA[\n{}]]></MPS>\n</document>\n",
            escape(&self.config.category),
            escape(&self.config.solver),
            escape(&self.config.email),
            mps
        )
    }

    async fn call(&self, method: &str, params: &[Param<'_>]) -> Result<Vec<String>, RemoteError> {
        let body = method_call(method, params);
        debug!("NEOS {} ({} byte request)", method, body.len());
        let reply = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        scalar_values(&reply)
    }
}

impl JobQueue for NeosQueue {
    async fn submit_job(&self, mps: &str) -> Result<JobHandle, RemoteError> {
        let document = self.job_document(mps);
        let values = self.call("submitJob", &[Param::Str(&document)]).await?;
        let [number, password] = values.as_slice() else {
            return Err(RemoteError::Protocol(format!("submitJob returned {} values", values.len())));
        };
        let number: i64 = number
            .trim()
            .parse()
            .map_err(|_| RemoteError::Protocol(format!("job number {:?}", number)))?;
        // A zero job number carries the rejection reason in the password slot
        if number == 0 {
            return Err(RemoteError::Failed(password.clone()));
        }
        Ok(JobHandle {
            number,
            password: password.clone(),
        })
    }

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus, RemoteError> {
        let values = self
            .call("getJobStatus", &[Param::Int(job.number), Param::Str(&job.password)])
            .await?;
        let status = values
            .first()
            .ok_or_else(|| RemoteError::Protocol("getJobStatus returned nothing".to_string()))?;
        Ok(parse_status(status))
    }

    async fn fetch_result(&self, job: &JobHandle) -> Result<String, RemoteError> {
        let values = self
            .call("getFinalResults", &[Param::Int(job.number), Param::Str(&job.password)])
            .await?;
        let encoded = values
            .first()
            .ok_or_else(|| RemoteError::Protocol("getFinalResults returned nothing".to_string()))?;
        decode_result(encoded)
    }
}

fn parse_status(status: &str) -> JobStatus {
    match status.trim() {
        "Done" => JobStatus::Done,
        "Running" => JobStatus::Running,
        "Waiting" => JobStatus::Waiting,
        other => JobStatus::Failed(other.to_string()),
    }
}

fn decode_result(encoded: &str) -> Result<String, RemoteError> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Protocol(format!("result is not base64: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn method_call(method: &str, params: &[Param<'_>]) -> String {
    let mut body = format!("<?xml version=\"1.0\"?>\n<methodCall><methodName>{}</methodName><params>", method);
    for param in params {
        body.push_str("<param><value>");
        match param {
            Param::Int(n) => body.push_str(&format!("<int>{}</int>", n)),
            Param::Str(s) => body.push_str(&format!("<string>{}</string>", escape(s))),
        }
        body.push_str("</value></param>");
    }
    body.push_str("</params></methodCall>\n");
    body
}

/// Scalar values of an XML-RPC reply in document order.
///
/// A `<fault>` reply becomes a protocol error carrying its fault string.
/// A `<value>` without a type element is a string.
fn scalar_values(xml: &str) -> Result<Vec<String>, RemoteError> {
    let mut values = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else { break };
        let tag = &after[..end];
        rest = &after[end + 1..];

        match tag {
            "int" | "i4" | "string" | "base64" => {
                let close = format!("</{}>", tag);
                let stop = rest
                    .find(&close)
                    .ok_or_else(|| RemoteError::Protocol(format!("unterminated <{}>", tag)))?;
                values.push(unescape(&rest[..stop]));
                rest = &rest[stop + close.len()..];
            }
            "value" => {
                if let Some(stop) = rest.find("</value>") {
                    if rest.find('<') == Some(stop) {
                        values.push(unescape(&rest[..stop]));
                        rest = &rest[stop + "</value>".len()..];
                    }
                }
            }
            "string/" | "value/" => values.push(String::new()),
            _ => {}
        }
    }

    if is_fault(xml) {
        let detail = values
            .into_iter()
            .filter(|v| v.parse::<i64>().is_err())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RemoteError::Protocol(format!("fault: {}", detail)));
    }
    Ok(values)
}

/// Whether the reply's payload is a `<fault>` rather than `<params>`.
fn is_fault(xml: &str) -> bool {
    const OPEN: &str = "<methodResponse>";
    xml.find(OPEN)
        .is_some_and(|i| xml[i + OPEN.len()..].trim_start().starts_with("<fault>"))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_document_embeds_mps() {
        let queue = NeosQueue::new(NeosConfig {
            email: "ops@example.com".to_string(),
            ..NeosConfig::default()
        });

        let doc = queue.job_document("NAME T\nENDATA\n");

        assert!(doc.contains("<category>lp</category>"));
        assert!(doc.contains("<solver>Clp</solver>"));
        assert!(doc.contains("<inputMethod>MPS</inputMethod>"));
        assert!(doc.contains("<email>ops@example.com</email>"));
        assert!(doc.contains("<MPS><![CDATA[\nNAME T\nENDATA\n]]></MPS>"));
    }

    #[test]
    fn test_method_call_escapes_string_params() {
        let body = method_call("getJobStatus", &[Param::Int(7), Param::Str("a<b&c")]);

        assert!(body.contains("<methodName>getJobStatus</methodName>"));
        assert!(body.contains("<value><int>7</int></value>"));
        assert!(body.contains("<value><string>a&lt;b&amp;c</string></value>"));
    }

    #[test]
    fn test_submit_reply_values() {
        let reply = "<?xml version='1.0'?>\n<methodResponse><params><param><value><array><data>\n\
                     <value><int>123456</int></value>\n<value><string>pAsS</string></value>\n\
                     </data></array></value></param></params></methodResponse>";

        assert_eq!(scalar_values(reply).unwrap(), vec!["123456", "pAsS"]);
    }

    #[test]
    fn test_fault_reply_is_an_error() {
        let reply = "<methodResponse><fault><value><struct>\
                     <member><name>faultCode</name><value><int>1</int></value></member>\
                     <member><name>faultString</name><value><string>no such method</string></value></member>\
                     </struct></value></fault></methodResponse>";

        match scalar_values(reply) {
            Err(RemoteError::Protocol(msg)) => assert_eq!(msg, "fault: no such method"),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_untyped_values_are_strings() {
        let reply = "<methodResponse>\n  <params><param><value><array><data>\n\
                     <value><int>7</int></value><value>Done</value><value/>\n\
                     </data></array></value></param></params>\n</methodResponse>";

        assert!(!is_fault(reply));
        assert_eq!(scalar_values(reply).unwrap(), vec!["7", "Done", ""]);
    }

    #[test]
    fn test_fault_is_detected_by_structure() {
        let fault = "<?xml version='1.0'?>\n<methodResponse>\n  <fault><value><struct>\
                     <member><name>faultString</name><value>Bad Password</value></member>\
                     </struct></value></fault>\n</methodResponse>";
        match scalar_values(fault) {
            Err(RemoteError::Protocol(msg)) => assert_eq!(msg, "fault: Bad Password"),
            other => panic!("expected fault, got {:?}", other),
        }

        // The word appearing inside a returned string is not a fault
        let ok = "<methodResponse><params><param><value><string>see &lt;fault&gt; docs</string>\
                  </value></param></params></methodResponse>";
        assert_eq!(scalar_values(ok).unwrap(), vec!["see <fault> docs"]);
    }

    #[test]
    fn test_status_and_result_decoding() {
        assert_eq!(parse_status("Done"), JobStatus::Done);
        assert_eq!(parse_status("Waiting"), JobStatus::Waiting);
        assert_eq!(parse_status("Bad Password"), JobStatus::Failed("Bad Password".to_string()));

        // "Optimal objective 36" split across lines as NEOS does
        let decoded = decode_result("T3B0aW1hbCBv\nYmplY3RpdmUgMzY=\n").unwrap();
        assert_eq!(decoded, "Optimal objective 36");
        assert!(matches!(decode_result("%%%"), Err(RemoteError::Protocol(_))));
    }

    #[test]
    fn test_unescape_handles_entities() {
        assert_eq!(unescape("a &lt;= b &amp;&amp; c"), "a <= b && c");
        assert_eq!(unescape(&escape("x < y & z")), "x < y & z");
    }
}
