//! Builds the XML submission document the service expects. Pure string
//! work, no network interaction.

use quick_xml::escape::escape;

use crate::config::{Priority, SolveConfig, DEFAULT_CATEGORY, DEFAULT_SOLVER};
use crate::error::SubmissionError;
use crate::model::{ModelEncoding, ModelPayload};

/// Input format identifier sent with every submission. The modeling
/// toolchain exports MPS and that is the only format this client speaks.
pub const INPUT_METHOD: &str = "MPS";

/// Encode one submission document.
///
/// Category and solver fall back to the documented defaults when left
/// empty; an empty or binary model body is rejected before anything is
/// built.
pub fn encode_submission(
    model: &ModelPayload,
    config: &SolveConfig,
    email: &str,
    username: Option<&str>,
) -> Result<String, SubmissionError> {
    if model.is_empty() {
        return Err(SubmissionError::EmptyModel);
    }
    let body = match model.encoding() {
        ModelEncoding::Text => model.as_text().ok_or(SubmissionError::BinaryModel)?,
        ModelEncoding::Binary => return Err(SubmissionError::BinaryModel),
    };

    let category = default_if_empty(&config.category, DEFAULT_CATEGORY);
    let solver = default_if_empty(&config.solver, DEFAULT_SOLVER);

    let mut doc = String::with_capacity(body.len() + 512);
    doc.push_str("<document>\n");
    push_field(&mut doc, "category", category);
    push_field(&mut doc, "solver", solver);
    push_field(&mut doc, "inputMethod", INPUT_METHOD);
    push_field(
        &mut doc,
        "priority",
        match config.priority {
            Priority::Short => "short",
            Priority::Long => "long",
        },
    );
    push_field(&mut doc, "email", email);
    if let Some(username) = username {
        push_field(&mut doc, "user", username);
    }
    push_field(&mut doc, "options", &config.options);
    push_field(&mut doc, INPUT_METHOD, body);
    doc.push_str("</document>\n");
    Ok(doc)
}

fn default_if_empty<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

fn push_field(doc: &mut String, tag: &str, value: &str) {
    doc.push('<');
    doc.push_str(tag);
    doc.push('>');
    doc.push_str(&escape(value));
    doc.push_str("</");
    doc.push_str(tag);
    doc.push_str(">\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ModelPayload {
        ModelPayload::text("NAME test\nROWS\nENDATA\n")
    }

    #[test]
    fn encodes_all_fields() {
        let config = SolveConfig::new("lp", "CPLEX")
            .with_options("feastol=1e-6")
            .with_priority(Priority::Short);
        let doc = encode_submission(&model(), &config, "a@b.com", Some("alice")).unwrap();
        assert!(doc.contains("<category>lp</category>"));
        assert!(doc.contains("<solver>CPLEX</solver>"));
        assert!(doc.contains("<inputMethod>MPS</inputMethod>"));
        assert!(doc.contains("<priority>short</priority>"));
        assert!(doc.contains("<email>a@b.com</email>"));
        assert!(doc.contains("<user>alice</user>"));
        assert!(doc.contains("<options>feastol=1e-6</options>"));
        assert!(doc.contains("NAME test"));
    }

    #[test]
    fn empty_category_and_solver_use_defaults() {
        let config = SolveConfig::new("", "  ");
        let doc = encode_submission(&model(), &config, "a@b.com", None).unwrap();
        assert!(doc.contains("<category>milp</category>"));
        assert!(doc.contains("<solver>FICO-Xpress</solver>"));
        assert!(!doc.contains("<user>"));
    }

    #[test]
    fn model_body_is_escaped() {
        let model = ModelPayload::text("RANGES <r> & co\n");
        let doc = encode_submission(&model, &SolveConfig::default(), "a@b.com", None).unwrap();
        assert!(doc.contains("RANGES &lt;r&gt; &amp; co"));
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = encode_submission(&ModelPayload::text(""), &SolveConfig::default(), "a@b.com", None)
            .unwrap_err();
        assert!(matches!(err, SubmissionError::EmptyModel));
    }

    #[test]
    fn binary_model_is_rejected() {
        let model = ModelPayload::binary(vec![0xff, 0x00]);
        let err =
            encode_submission(&model, &SolveConfig::default(), "a@b.com", None).unwrap_err();
        assert!(matches!(err, SubmissionError::BinaryModel));
    }
}
