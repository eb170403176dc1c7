//! Textual pipeline descriptions, e.g. `module(kthook,verify)`.
use chumsky::prelude::*;

use crate::utils::error::{PassError, PassResult};

/// One element of a textual pipeline: a pass name, optionally followed by a
/// parenthesised list of nested elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineElement {
    pub name: String,
    pub inner: Vec<PipelineElement>,
}

impl PipelineElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Vec::new(),
        }
    }
}

fn pipeline_parser<'src>()
-> impl Parser<'src, &'src str, Vec<PipelineElement>, extra::Err<Rich<'src, char>>> {
    let elements = recursive(|elements| {
        let name = any()
            .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '<' | '>' | '='))
            .repeated()
            .at_least(1)
            .to_slice()
            .map(|s: &str| s.to_string())
            .labelled("pass name");

        name.then(elements.delimited_by(just('('), just(')')).or_not())
            .padded()
            .map(|(name, inner): (String, Option<Vec<PipelineElement>>)| PipelineElement {
                name,
                inner: inner.unwrap_or_default(),
            })
            .separated_by(just(','))
            .at_least(1)
            .collect::<Vec<_>>()
    });

    elements.then_ignore(end())
}

/// Parses a pipeline description into its elements. An empty description
/// yields no element.
pub fn parse_pipeline(text: &str) -> PassResult<Vec<PipelineElement>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    pipeline_parser()
        .parse(text)
        .into_result()
        .map_err(|errs| PassError::PipelineSyntax {
            pipeline: text.to_string(),
            message: errs
                .into_iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })
}
