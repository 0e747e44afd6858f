//! Success/failure envelope and the failure-detail vocabulary.

use std::fmt;

use serde_json::Map;

use crate::error::ValidationError;
use crate::types::Type;
use crate::value::{BasicType, Literal, Value};

pub type ValidationResult = Result<Success, Failure>;

// -------------------------------- Success -------------------------------- //

#[derive(Clone, Debug)]
pub struct Success {
    pub value: Value,
    /// The pre-parse input, when a parser ran.
    pub parser_input: Option<Value>,
}

impl Success {
    pub fn new(value: Value) -> Self {
        Self { value, parser_input: None }
    }
}

// -------------------------------- Failure -------------------------------- //

/// A failed validation. Always carries the input, the failing type and at
/// least one detail.
#[derive(Clone, Debug)]
pub struct Failure {
    input: Value,
    ty: Type,
    details: Vec<MessageDetail>,
    parser_input: Option<Value>,
}

impl Failure {
    /// Details lacking a type or input inherit the failure's own.
    ///
    /// An empty list is replaced by the single default detail.
    pub fn new(ty: &Type, input: &Value, details: Vec<MessageDetail>) -> Self {
        let mut details: Vec<MessageDetail> = details
            .into_iter()
            .map(|d| d.attributed_to(ty, input))
            .collect();
        if details.is_empty() {
            details.push(MessageDetail::default().attributed_to(ty, input));
        }
        Self { input: input.clone(), ty: ty.clone(), details, parser_input: None }
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn details(&self) -> &[MessageDetail] {
        &self.details
    }

    pub fn parser_input(&self) -> Option<&Value> {
        self.parser_input.as_ref()
    }

    pub fn into_details(self) -> Vec<MessageDetail> {
        self.details
    }

    /// Same failure, re-attributed to another type.
    pub(crate) fn reattributed(self, ty: &Type, input: &Value) -> Self {
        Self { input: input.clone(), ty: ty.clone(), details: self.details, parser_input: None }
    }

    pub(crate) fn with_context(mut self, context: &str) -> Self {
        for d in &mut self.details {
            d.context = Some(match d.context.take() {
                Some(existing) => format!("{context} > {existing}"),
                None => context.to_string(),
            });
        }
        self
    }
}

/// Prefix `segment` onto the path of every detail.
pub(crate) fn prepend_path(failure: Failure, segment: PathSegment) -> Vec<MessageDetail> {
    failure
        .details
        .into_iter()
        .map(|mut d| {
            d.path.insert(0, segment.clone());
            d
        })
        .collect()
}

/// Record the pre-parse input on either outcome.
pub(crate) fn with_parser_input(result: ValidationResult, input: &Value) -> ValidationResult {
    match result {
        Ok(mut s) => {
            s.parser_input = Some(input.clone());
            Ok(s)
        }
        Err(mut f) => {
            f.parser_input = Some(input.clone());
            Err(f)
        }
    }
}

// ----------------------------- MessageDetail ----------------------------- //

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(k: &str) -> Self {
        PathSegment::Key(k.to_string())
    }
}

/// The kinds the core knows about. External types add their own through
/// [`DetailKind::Other`].
#[derive(Clone, Debug, PartialEq)]
pub enum DetailKind {
    InvalidBasicType { expected: BasicType, expected_value: Option<Literal> },
    InvalidLiteral { expected: Literal },
    MissingProperty { property: String },
    UnknownProperty { property: String },
    CustomMessage { message: String, omit_input: bool },
    Other { kind: String, fields: Map<String, serde_json::Value> },
}

impl DetailKind {
    pub fn tag(&self) -> &str {
        match self {
            DetailKind::InvalidBasicType { .. } => "invalid basic type",
            DetailKind::InvalidLiteral { .. } => "invalid literal",
            DetailKind::MissingProperty { .. } => "missing property",
            DetailKind::UnknownProperty { .. } => "unknown property",
            DetailKind::CustomMessage { .. } => "custom message",
            DetailKind::Other { kind, .. } => kind,
        }
    }

    pub fn invalid_basic_type(expected: BasicType) -> Self {
        DetailKind::InvalidBasicType { expected, expected_value: None }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        DetailKind::CustomMessage { message: message.into(), omit_input: false }
    }
}

/// One reason a validation failed.
#[derive(Clone, Debug, Default)]
pub struct MessageDetail {
    /// `None` for a plain `false` verdict.
    pub kind: Option<DetailKind>,
    pub path: Vec<PathSegment>,
    /// e.g. `parser` or `precondition`
    pub context: Option<String>,
    pub ty: Option<Type>,
    pub input: Option<Value>,
}

impl MessageDetail {
    pub fn new(kind: DetailKind) -> Self {
        Self { kind: Some(kind), ..Self::default() }
    }

    pub fn tag(&self) -> Option<&str> {
        self.kind.as_ref().map(DetailKind::tag)
    }

    pub fn with_type(mut self, ty: &Type) -> Self {
        self.ty = Some(ty.clone());
        self
    }

    fn attributed_to(mut self, ty: &Type, input: &Value) -> Self {
        if self.ty.is_none() {
            self.ty = Some(ty.clone());
        }
        if self.input.is_none() {
            self.input = Some(input.clone());
        }
        self
    }
}

impl From<DetailKind> for MessageDetail {
    fn from(kind: DetailKind) -> Self {
        MessageDetail::new(kind)
    }
}

// -------------------------------- Verdict -------------------------------- //

/// Raw validator outcome, before it is turned into a [`ValidationResult`].
#[derive(Clone, Debug)]
pub enum Verdict {
    Pass,
    Fail,
    Reasons(Vec<Reason>),
}

#[derive(Clone, Debug)]
pub enum Reason {
    Message(String),
    Detail(MessageDetail),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        match self {
            Verdict::Pass => true,
            Verdict::Fail => false,
            Verdict::Reasons(r) => r.is_empty(),
        }
    }

    /// The single place where raw outcomes become canonical details.
    pub fn into_details(self) -> Vec<MessageDetail> {
        match self {
            Verdict::Pass => Vec::new(),
            Verdict::Fail => vec![MessageDetail::default()],
            Verdict::Reasons(reasons) => reasons
                .into_iter()
                .map(|r| match r {
                    Reason::Message(m) => MessageDetail::new(DetailKind::custom(m)),
                    Reason::Detail(d) => d,
                })
                .collect(),
        }
    }
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok { Verdict::Pass } else { Verdict::Fail }
    }
}

impl From<&str> for Verdict {
    fn from(m: &str) -> Self {
        Verdict::Reasons(vec![Reason::Message(m.to_string())])
    }
}

impl From<String> for Verdict {
    fn from(m: String) -> Self {
        Verdict::Reasons(vec![Reason::Message(m)])
    }
}

impl From<MessageDetail> for Verdict {
    fn from(d: MessageDetail) -> Self {
        Verdict::Reasons(vec![Reason::Detail(d)])
    }
}

impl From<DetailKind> for Verdict {
    fn from(k: DetailKind) -> Self {
        Verdict::from(MessageDetail::new(k))
    }
}

impl From<Vec<MessageDetail>> for Verdict {
    fn from(ds: Vec<MessageDetail>) -> Self {
        Verdict::Reasons(ds.into_iter().map(Reason::Detail).collect())
    }
}

impl From<Vec<Reason>> for Verdict {
    fn from(rs: Vec<Reason>) -> Self {
        Verdict::Reasons(rs)
    }
}

impl From<Vec<String>> for Verdict {
    fn from(ms: Vec<String>) -> Self {
        Verdict::Reasons(ms.into_iter().map(Reason::Message).collect())
    }
}

/// A callback error becomes a custom message, unless it carries a
/// [`ValidationError`] whose details are reused as-is.
impl<T: Into<Verdict>> From<anyhow::Result<T>> for Verdict {
    fn from(r: anyhow::Result<T>) -> Self {
        match r {
            Ok(v) => v.into(),
            Err(e) => Verdict::from(error_details(e)),
        }
    }
}

pub(crate) fn error_details(e: anyhow::Error) -> Vec<MessageDetail> {
    match e.downcast::<ValidationError>() {
        Ok(ve) => ve.into_failure().into_details(),
        Err(e) => vec![MessageDetail::new(DetailKind::custom(format!("{e:#}")))],
    }
}

/// Build the canonical result: `value` on a passing verdict, a failure
/// attributed to `ty` otherwise.
pub fn create_result(ty: &Type, input: &Value, value: Value, verdict: impl Into<Verdict>) -> ValidationResult {
    let verdict = verdict.into();
    if verdict.is_pass() {
        Ok(Success::new(value))
    } else {
        Err(Failure::new(ty, input, verdict.into_details()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::primitive::number;

    #[test]
    fn test_verdict_pass_forms() {
        assert!(Verdict::from(true).is_pass());
        assert!(Verdict::from(Vec::<MessageDetail>::new()).is_pass());
        assert!(!Verdict::from(false).is_pass());
        assert!(!Verdict::from("nope").is_pass());
    }

    #[test]
    fn test_false_gives_default_detail() {
        let ty = number();
        let input = Value::from(1);
        let failure = create_result(&ty, &input, input.clone(), false).unwrap_err();
        assert_eq!(failure.details().len(), 1);
        let d = &failure.details()[0];
        assert!(d.kind.is_none());
        assert_eq!(d.ty.as_ref(), Some(&ty));
        assert!(d.input.as_ref().unwrap().strict_eq(&input));
    }

    #[test]
    fn test_strings_become_custom_messages() {
        let ty = number();
        let input = Value::from(1);
        let verdict = Verdict::from(vec![
            Reason::Message("first".into()),
            Reason::Detail(MessageDetail::new(DetailKind::MissingProperty { property: "x".into() })),
        ]);
        let failure = create_result(&ty, &input, Value::Undefined, verdict).unwrap_err();
        let tags: Vec<_> = failure.details().iter().map(|d| d.tag().unwrap()).collect();
        assert_eq!(tags, vec!["custom message", "missing property"]);
        assert_eq!(
            failure.details()[0].kind,
            Some(DetailKind::CustomMessage { message: "first".into(), omit_input: false })
        );
    }

    #[test]
    fn test_callback_error_becomes_message() {
        let verdict = Verdict::from(Err::<bool, _>(anyhow::anyhow!("boom")));
        let details = verdict.into_details();
        assert_eq!(details[0].kind, Some(DetailKind::custom("boom")));
    }

    #[test]
    fn test_context_is_prepended() {
        let ty = number();
        let input = Value::from("x");
        let failure = create_result(&ty, &input, input.clone(), "bad")
            .unwrap_err()
            .with_context("parser")
            .with_context("precondition");
        assert_eq!(failure.details()[0].context.as_deref(), Some("precondition > parser"));
    }
}
