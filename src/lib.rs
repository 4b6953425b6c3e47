use wasm_bindgen::prelude::*;
use serde::Serialize;

// --- LOGGING ---
#[cfg(target_arch = "wasm32")]
fn console_write(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

#[cfg(not(target_arch = "wasm32"))]
fn console_write(s: &str) {
    log::debug!("{s}");
}

macro_rules! console_log {
    ($($t:tt)*) => ($crate::console_write(&format!($($t)*)))
}

pub mod cleanup;
pub mod engine;
pub mod error;
pub mod motion;
pub mod policy;
pub mod processor;
pub mod report;
pub mod rewriter;
pub mod scale;

pub use engine::{chebyshev, MoveOutcome, RunState, TierCounts};
pub use error::{Result, TapError};
pub use motion::{Axis, MoveRecord, Point};
pub use policy::{Material, PausePolicy, PauseTier};
pub use processor::{process, ProcessOptions, Processed};
pub use report::{annotate, dated_filename, output_filename, Annotation, Template};
pub use rewriter::{rewrite, Diagnostic, Rewrite, RewriteOptions, RunStatistics};
pub use scale::{scale_program, ScaleRequest};

fn js_error(e: TapError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[derive(Serialize)]
struct ProcessedView<'a> {
    content: String,
    #[serde(flatten)]
    processed: &'a Processed,
}

/// Browser entry point. Holds the operator's current choices between runs.
#[wasm_bindgen]
pub struct TapProcessor {
    material: Material,
    strict: bool,
    clean: bool,
    annotate: bool,
    scale: Option<ScaleRequest>,
    template: Option<Template>,
}

impl Default for TapProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TapProcessor {
    fn options(&self, project: String, date: String) -> ProcessOptions {
        ProcessOptions {
            strict: self.strict,
            clean: self.clean,
            scale: self.scale,
            annotation: self.annotate.then(|| Annotation {
                project,
                date,
                scale: None,
                template: self.template.clone(),
            }),
        }
    }

    fn run(&self, content: &str, project: String, date: String) -> Result<Processed> {
        process(content, &self.material, &self.options(project, date))
    }
}

#[wasm_bindgen]
impl TapProcessor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_log!("TapProcessor ready");
        Self {
            material: Material::default(),
            strict: false,
            clean: true,
            annotate: true,
            scale: None,
            template: None,
        }
    }

    pub fn set_material(&mut self, id: &str) -> std::result::Result<(), JsValue> {
        self.material = Material::preset(id).map_err(js_error)?;
        Ok(())
    }

    /// Accepts a material object shaped like the built-in presets.
    pub fn set_custom_material(&mut self, material: JsValue) -> std::result::Result<(), JsValue> {
        let material: Material = serde_wasm_bindgen::from_value(material)?;
        material.validate().map_err(js_error)?;
        self.material = material;
        Ok(())
    }

    pub fn material_id(&self) -> String {
        self.material.id.clone()
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn set_clean(&mut self, clean: bool) {
        self.clean = clean;
    }

    pub fn set_annotate(&mut self, annotate: bool) {
        self.annotate = annotate;
    }

    pub fn set_scale(&mut self, current_length: f64, desired_length: f64) -> std::result::Result<(), JsValue> {
        let req = ScaleRequest { current_length, desired_length };
        req.factor().map_err(js_error)?;
        self.scale = Some(req);
        Ok(())
    }

    pub fn clear_scale(&mut self) {
        self.scale = None;
    }

    /// Replaces the header and footer text; see [`Template`] for the slots.
    pub fn set_template(&mut self, header: String, footer: String) {
        self.template = Some(Template { header, footer });
    }

    pub fn clear_template(&mut self) {
        self.template = None;
    }

    pub fn process(&self, content: String, project: String, date: String) -> std::result::Result<JsValue, JsValue> {
        let processed = self.run(&content, project, date).map_err(js_error)?;
        let view = ProcessedView { content: processed.content(), processed: &processed };
        Ok(serde_wasm_bindgen::to_value(&view)?)
    }

    pub fn output_filename(original: &str, year: i32, month: u32, day: u32) -> std::result::Result<String, JsValue> {
        dated_filename(original, year, month, day).map_err(js_error)
    }

    pub fn materials() -> JsValue {
        serde_wasm_bindgen::to_value(&Material::presets()).unwrap_or(JsValue::NULL)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    pub fn approx_eq(a: f64, b: f64) {
        assert!(
            (a - b).abs() <= 1e-9,
            "expected {:.9}, got {:.9} (|diff|={:.9})",
            b,
            a,
            (a - b).abs()
        );
    }
}
