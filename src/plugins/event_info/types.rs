//! Recognized event shapes. Detection walks [`EVENT_TYPES`] in order and
//! stops at the first match.

use serde_json::Value;

use super::path::{has_key, resolve};

pub const METRIC_PREFIX: &str = "@iopipe/event-info";

/// A key to collect: where to read it and the name it is reported under.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub path: &'static str,
    pub name: &'static str,
}

const fn key(path: &'static str) -> KeySpec {
    KeySpec { path, name: path }
}

const fn renamed(path: &'static str, name: &'static str) -> KeySpec {
    KeySpec { path, name }
}

/// A path whose string value must be one of `allowed`.
#[derive(Debug, Clone, Copy)]
pub struct ValueCheck {
    pub path: &'static str,
    pub allowed: &'static [&'static str],
}

const fn check(path: &'static str, allowed: &'static [&'static str]) -> ValueCheck {
    ValueCheck { path, allowed }
}

#[derive(Debug)]
pub struct EventType {
    /// camelCase type name, e.g. `apiGateway`.
    pub name: &'static str,
    /// Set for variants that share a type name with another shape.
    pub source: Option<&'static str>,
    pub keys: &'static [KeySpec],
    pub required: &'static [&'static str],
    pub checks: &'static [ValueCheck],
    /// Responses are proxy responses whose `statusCode` is collected.
    pub proxy_response: bool,
}

impl EventType {
    pub fn matches(&self, event: &Value) -> bool {
        self.required.iter().all(|path| has_key(event, path))
            && self.checks.iter().all(|c| {
                resolve(event, c.path)
                    .as_ref()
                    .and_then(Value::as_str)
                    .is_some_and(|v| c.allowed.contains(&v))
            })
    }

    /// Kebab-case slug used for labels and the report's event type.
    pub fn slug(&self) -> String {
        slugify(self.name)
    }

    /// Metric name/value pairs for a matching event.
    pub fn collect(&self, event: &Value) -> Vec<(String, Value)> {
        let mut info: Vec<(String, Value)> = self
            .keys
            .iter()
            .filter_map(|k| {
                let value = resolve(event, k.path).filter(|v| !v.is_null())?;
                Some((format!("{METRIC_PREFIX}.{}.{}", self.name, k.name), value))
            })
            .collect();
        info.push((
            format!("{METRIC_PREFIX}.eventType"),
            Value::from(self.name),
        ));
        if let Some(source) = self.source {
            info.push((
                format!("{METRIC_PREFIX}.eventType.source"),
                Value::from(source),
            ));
        }
        info
    }

    /// Metrics taken from the handler's response, for proxy types.
    pub fn collect_response(&self, response: &Value) -> Vec<(String, Value)> {
        if !self.proxy_response {
            return Vec::new();
        }
        resolve(response, "statusCode")
            .filter(|v| !v.is_null())
            .map(|v| {
                vec![(
                    format!("{METRIC_PREFIX}.{}.response.statusCode", self.name),
                    v,
                )]
            })
            .unwrap_or_default()
    }
}

/// `apiGateway` → `api-gateway`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
        } else {
            slug.push(c);
        }
    }
    slug
}

const RECORD_VERSION_SOURCE: &[&str] = &["Records[0].eventVersion", "Records[0].eventSource"];

pub static ALB: EventType = EventType {
    name: "alb",
    source: None,
    keys: &[
        key("headers.host"),
        key(r#"headers.["user-agent"]"#),
        key(r#"headers.["x-amzn-trace-id"]"#),
        key("httpMethod"),
        key("path"),
        key("requestContext.elb.targetGroupArn"),
    ],
    required: &["httpMethod", "requestContext.elb"],
    checks: &[],
    proxy_response: false,
};

pub static API_GATEWAY: EventType = EventType {
    name: "apiGateway",
    source: None,
    keys: &[
        key("httpMethod"),
        key("path"),
        key("requestContext.accountId"),
        key("requestContext.httpMethod"),
        key("requestContext.identity.userAgent"),
        key("requestContext.requestId"),
        key("requestContext.resourcePath"),
        key("requestContext.stage"),
        key("resource"),
    ],
    required: &["headers", "httpMethod", "path", "requestContext", "resource"],
    checks: &[],
    proxy_response: true,
};

pub static CLOUD_FRONT: EventType = EventType {
    name: "cloudFront",
    source: None,
    keys: &[
        key("Records[0].cf.config.distributionId"),
        key("Records[0].cf.request.clientIp"),
        key("Records[0].cf.request.headers.host[0].value"),
        key(r#"Records[0].cf.request.headers.["user-agent"][0].value"#),
        key("Records[0].cf.request.method"),
        key("Records[0].cf.request.uri"),
    ],
    required: &["Records[0].cf"],
    checks: &[],
    proxy_response: false,
};

pub static FIREHOSE: EventType = EventType {
    name: "firehose",
    source: None,
    keys: &[key("deliveryStreamArn"), key("region")],
    required: &[
        "deliveryStreamArn",
        "records[0]",
        "records[0].kinesisRecordMetadata",
    ],
    checks: &[],
    proxy_response: false,
};

pub static KINESIS: EventType = EventType {
    name: "kinesis",
    source: None,
    keys: &[
        key("Records.length"),
        key("Records[0].awsRegion"),
        key("Records[0].eventSourceARN"),
    ],
    required: RECORD_VERSION_SOURCE,
    checks: &[
        check("Records[0].eventVersion", &["1.0"]),
        check("Records[0].eventSource", &["aws:kinesis"]),
    ],
    proxy_response: false,
};

pub static S3: EventType = EventType {
    name: "s3",
    source: None,
    keys: &[
        key("Records[0].awsRegion"),
        key("Records[0].eventName"),
        key("Records[0].eventTime"),
        key("Records[0].requestParameters.sourceIPAddress"),
        key(r#"Records[0].responseElements["x-amz-id-2"]"#),
        key(r#"Records[0].responseElements["x-amz-request-id"]"#),
        key("Records[0].s3.bucket.arn"),
        key("Records[0].s3.bucket.name"),
        key("Records[0].s3.object.key"),
        key("Records[0].s3.object.sequencer"),
        key("Records[0].s3.object.size"),
        key("Records[0].userIdentity.principalId"),
    ],
    required: RECORD_VERSION_SOURCE,
    checks: &[
        check("Records[0].eventVersion", &["2.0", "2.1"]),
        check("Records[0].eventSource", &["aws:s3"]),
    ],
    proxy_response: false,
};

pub static SES: EventType = EventType {
    name: "ses",
    source: None,
    keys: &[
        key("Records[0].ses.mail.commonHeaders.date"),
        key("Records[0].ses.mail.commonHeaders.messageId"),
        key("Records[0].ses.mail.commonHeaders.returnPath"),
        key("Records[0].ses.mail.commonHeaders.subject"),
        key("Records[0].ses.mail.messageId"),
        key("Records[0].ses.mail.source"),
    ],
    required: RECORD_VERSION_SOURCE,
    checks: &[
        check("Records[0].eventVersion", &["1.0"]),
        check("Records[0].eventSource", &["aws:ses"]),
    ],
    proxy_response: false,
};

pub static SNS: EventType = EventType {
    name: "sns",
    source: None,
    keys: &[
        key("Records[0].EventSubscriptionArn"),
        key("Records[0].Sns.MessageId"),
        key("Records[0].Sns.Signature"),
        key("Records[0].Sns.SignatureVersion"),
        key("Records[0].Sns.SigningCertUrl"),
        key("Records[0].Sns.UnsubscribeUrl"),
        key("Records[0].Sns.Subject"),
        key("Records[0].Sns.Timestamp"),
        key("Records[0].Sns.TopicArn"),
        key("Records[0].Sns.Type"),
    ],
    required: &["Records[0].EventVersion", "Records[0].EventSource"],
    checks: &[
        check("Records[0].EventVersion", &["1.0"]),
        check("Records[0].EventSource", &["aws:sns"]),
    ],
    proxy_response: false,
};

pub static SQS: EventType = EventType {
    name: "sqs",
    source: None,
    keys: &[
        key("Records[0].attributes.ApproximateFirstReceiveTimestamp"),
        key("Records[0].attributes.ApproximateReceiveCount"),
        key("Records[0].attributes.SenderId"),
        key("Records[0].attributes.SentTimestamp"),
        key("Records[0].awsRegion"),
        key("Records[0].eventSourceARN"),
        key("Records[0].md5OfBody"),
        key("Records[0].messageId"),
        key("Records[0].receiptHandle"),
    ],
    required: &["Records[0].eventSource"],
    checks: &[check("Records[0].eventSource", &["aws:sqs"])],
    proxy_response: false,
};

pub static SCHEDULED: EventType = EventType {
    name: "scheduled",
    source: None,
    keys: &[
        key("account"),
        key("id"),
        key("region"),
        key("resources[0]"),
        key("time"),
    ],
    required: &["source"],
    checks: &[check("source", &["aws.events"])],
    proxy_response: false,
};

/// API Gateway events as delivered by the Serverless Framework's lambda
/// integration.
pub static SERVERLESS_LAMBDA: EventType = EventType {
    name: "apiGateway",
    source: Some("slsIntegrationLambda"),
    keys: &[
        renamed(r#"headers.["X-Amz-Cf-Id"]"#, "headers.X-Amz-Cf-Id"),
        renamed(r#"headers.["X-Amzn-Trace-Id"]"#, "headers.X-Amzn-Trace-Id"),
        renamed("identity.accountId", "requestContext.accountId"),
        renamed("identity.userAgent", "requestContext.identity.userAgent"),
        renamed("method", "httpMethod"),
        renamed("method", "requestContext.httpMethod"),
        renamed("stage", "requestContext.stage"),
    ],
    required: &[
        "identity.userAgent",
        "identity.sourceIp",
        "identity.accountId",
    ],
    checks: &[],
    proxy_response: true,
};

pub static EVENT_TYPES: &[&EventType] = &[
    &ALB,
    &API_GATEWAY,
    &CLOUD_FRONT,
    &FIREHOSE,
    &KINESIS,
    &S3,
    &SES,
    &SNS,
    &SQS,
    &SCHEDULED,
    &SERVERLESS_LAMBDA,
];

/// First event type whose required keys and value checks match.
pub fn detect(event: &Value) -> Option<&'static EventType> {
    EVENT_TYPES.iter().copied().find(|t| t.matches(event))
}
