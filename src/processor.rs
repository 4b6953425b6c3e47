use serde::Serialize;

use crate::cleanup::{is_already_processed, Cleaned, RemovedCommands};
use crate::error::{Result, TapError};
use crate::policy::Material;
use crate::report::{annotate, Annotation};
use crate::rewriter::{rewrite, Diagnostic, RewriteOptions, RunStatistics};
use crate::scale::{scale_program, ScaleRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOptions {
    pub strict: bool,
    /// Drop rapids, stale dwells, sequence numbers and feed words before
    /// inserting pauses. An earlier run's header and footer are always dropped.
    pub clean: bool,
    pub scale: Option<ScaleRequest>,
    /// `None` emits the bare rewritten program.
    pub annotation: Option<Annotation>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            strict: false,
            clean: true,
            scale: None,
            annotation: Some(Annotation::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Processed {
    pub lines: Vec<String>,
    pub stats: RunStatistics,
    pub removed: RemovedCommands,
    pub diagnostics: Vec<Diagnostic>,
    /// Input already carried our annotation and dwells; returned unchanged.
    pub already_processed: bool,
}

impl Processed {
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn process(content: &str, material: &Material, opts: &ProcessOptions) -> Result<Processed> {
    material.validate()?;
    let input: Vec<&str> = content.lines().collect();

    if is_already_processed(&input) {
        console_log!("input already processed, returning it unchanged");
        return Ok(Processed {
            lines: input.iter().map(|l| l.to_string()).collect(),
            already_processed: true,
            ..Default::default()
        });
    }

    let mut program = Cleaned::from_lines(&input).without_annotation();
    if opts.clean {
        program = program.clean();
    }

    let scaled;
    let body: &[String] = match opts.scale {
        Some(req) => {
            scaled = scale_program(&program.lines, req.factor()?)?;
            &scaled
        }
        None => &program.lines,
    };

    let mut rw = rewrite(body, &material.pauses, &RewriteOptions { strict: opts.strict })
        .map_err(|e| match e {
            TapError::MalformedCoordinate { line, axis, token } => TapError::MalformedCoordinate {
                line: program.source_line(line),
                axis,
                token,
            },
            other => other,
        })?;
    for d in &mut rw.diagnostics {
        d.line = program.source_line(d.line);
    }

    let lines = match &opts.annotation {
        Some(info) => {
            let info = Annotation { scale: opts.scale, ..info.clone() };
            annotate(&rw, material, &info)
        }
        None => rw.lines,
    };

    Ok(Processed {
        lines,
        stats: rw.stats,
        removed: program.removed,
        diagnostics: rw.diagnostics,
        already_processed: false,
    })
}
