//! Code Synthesizer (C4): a pure, deterministic transform from
//! [`AnimationSpec`] to source text consumed by the renderer (C3) after
//! passing the validator (C1). No LLM involvement; `emit(spec) ==
//! emit(spec)` byte-for-byte for equal specs (spec §4.4, §8).

use animathic_models::{AnimationSpec, Color, ObjectKind, ActionKind, SceneKind};
use std::fmt::Write as _;
use thiserror::Error;

pub type SynthResult<T> = Result<T, SynthError>;

/// The only failure mode a pure transform can have: a spec field naming a
/// token outside the closed allowlist. This must never reach the renderer
/// (spec §4.4, §8 scenario 3).
#[derive(Debug, Error, PartialEq)]
pub enum SynthError {
    #[error("unknown object kind '{0}'")]
    UnknownObjectKind(String),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

impl SynthError {
    pub fn kind(&self) -> animathic_models::ErrorKind {
        animathic_models::ErrorKind::UnknownVocabulary
    }
}

/// Emit the full GeneratedScene source for `spec`.
pub fn emit(spec: &AnimationSpec) -> SynthResult<String> {
    let mut out = String::new();

    write_preamble(&mut out);
    writeln!(out, "class GeneratedScene({}):", spec.scene_kind.scene_base()).unwrap();
    writeln!(out, "    def construct(self):").unwrap();

    if spec.objects.is_empty() && spec.steps.is_empty() {
        writeln!(out, "        pass").unwrap();
    }

    writeln!(out, "        self.camera.background_color = {}", spec.background.as_str()).unwrap();

    if let Some(camera) = &spec.camera {
        write_camera(&mut out, camera, spec.scene_kind);
    }

    for obj in &spec.objects {
        write_object(&mut out, obj)?;
    }

    for step in &spec.steps {
        write_step(&mut out, step)?;
    }

    Ok(out)
}

fn write_preamble(out: &mut String) {
    writeln!(out, "from manim import *").unwrap();
    writeln!(out, "import numpy as np").unwrap();
    writeln!(out).unwrap();
    writeln!(out).unwrap();
}

fn write_camera(out: &mut String, camera: &animathic_models::CameraDecl, scene_kind: SceneKind) {
    if let Some([x, y]) = camera.frame_center {
        writeln!(
            out,
            "        self.camera.frame.move_to(np.array([{}, {}, 0.0]))",
            fmt_float(x),
            fmt_float(y)
        )
        .unwrap();
    }
    if let Some(zoom) = camera.zoom {
        writeln!(out, "        self.camera.frame.scale({})", fmt_float(zoom)).unwrap();
    }
    if scene_kind == SceneKind::ThreeD {
        if let Some([phi, theta, gamma]) = camera.orientation {
            writeln!(
                out,
                "        self.set_camera_orientation(phi={} * DEGREES, theta={} * DEGREES, gamma={} * DEGREES)",
                fmt_float(phi),
                fmt_float(theta),
                fmt_float(gamma)
            )
            .unwrap();
        }
    }
}

fn write_object(out: &mut String, obj: &animathic_models::ObjectDecl) -> SynthResult<()> {
    let kind: ObjectKind = obj
        .kind
        .parse()
        .map_err(|_| SynthError::UnknownObjectKind(obj.kind.clone()))?;

    let args = format_params(&obj.params);
    writeln!(out, "        {} = {}({})", obj.id, kind.as_str(), args).unwrap();

    if let Some(color) = obj.style.color {
        writeln!(out, "        {}.set_color({})", obj.id, color.as_str()).unwrap();
    }
    if let Some(stroke_width) = obj.style.stroke_width {
        writeln!(
            out,
            "        {}.set_stroke(width={})",
            obj.id,
            fmt_float(stroke_width)
        )
        .unwrap();
    }
    if let Some(fill_opacity) = obj.style.fill_opacity {
        writeln!(
            out,
            "        {}.set_fill(opacity={})",
            obj.id,
            fmt_float(fill_opacity)
        )
        .unwrap();
    }
    if let Some(z_index) = obj.style.z_index {
        writeln!(out, "        {}.set_z_index({})", obj.id, z_index).unwrap();
    }

    Ok(())
}

fn write_step(out: &mut String, step: &animathic_models::StepDecl) -> SynthResult<()> {
    let action: ActionKind = step
        .action
        .parse()
        .map_err(|_| SynthError::UnknownAction(step.action.clone()))?;

    let targets = step.target_ids.join(", ");
    let extra = format_params(&step.params);
    let args = if extra.is_empty() {
        targets
    } else {
        format!("{}, {}", targets, extra)
    };

    writeln!(
        out,
        "        self.play({}({}), run_time={})",
        action.as_str(),
        args,
        fmt_float(step.run_time)
    )
    .unwrap();

    if step.wait_after > 0.0 {
        writeln!(out, "        self.wait({})", fmt_float(step.wait_after)).unwrap();
    }

    Ok(())
}

fn format_params(params: &serde_json::Map<String, serde_json::Value>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, format_value(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "None".to_string(),
        serde_json::Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        serde_json::Value::Number(n) => fmt_float(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        serde_json::Value::Array(items) => {
            let inner = items.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{}]", inner)
        }
        serde_json::Value::Object(map) => {
            let inner = map
                .iter()
                .map(|(k, v)| format!("\"{}\": {}", k, format_value(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", inner)
        }
    }
}

/// Fixed six-decimal precision, no language-specific float repr leakage
/// (spec §4.4).
fn fmt_float(value: f64) -> String {
    if !value.is_finite() {
        return "0.000000".to_string();
    }
    format!("{:.6}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use animathic_models::{CameraDecl, ObjectDecl, StepDecl, Style};

    fn sample_spec() -> AnimationSpec {
        AnimationSpec {
            scene_kind: SceneKind::TwoD,
            duration_hint: 2.0,
            background: Color::Black,
            objects: vec![ObjectDecl {
                id: "c".to_string(),
                kind: "Circle".to_string(),
                params: serde_json::Map::new(),
                style: Style {
                    color: Some(Color::Blue),
                    ..Default::default()
                },
            }],
            steps: vec![StepDecl {
                action: "FadeIn".to_string(),
                target_ids: vec!["c".to_string()],
                params: serde_json::Map::new(),
                run_time: 1.0,
                wait_after: 0.5,
            }],
            camera: None,
        }
    }

    #[test]
    fn emission_is_deterministic() {
        let spec = sample_spec();
        assert_eq!(emit(&spec).unwrap(), emit(&spec).unwrap());
    }

    #[test]
    fn emits_expected_shape() {
        let spec = sample_spec();
        let source = emit(&spec).unwrap();
        assert!(source.starts_with("from manim import *\nimport numpy as np\n"));
        assert!(source.contains("class GeneratedScene(Scene):"));
        assert!(source.contains("c = Circle()"));
        assert!(source.contains("c.set_color(BLUE)"));
        assert!(source.contains("self.play(FadeIn(c), run_time=1.000000)"));
        assert!(source.contains("self.wait(0.500000)"));
    }

    #[test]
    fn unknown_object_kind_is_refused() {
        let mut spec = sample_spec();
        spec.objects[0].kind = "os.system".to_string();
        assert_eq!(
            emit(&spec).unwrap_err(),
            SynthError::UnknownObjectKind("os.system".to_string())
        );
    }

    #[test]
    fn unknown_action_is_refused() {
        let mut spec = sample_spec();
        spec.steps[0].action = "ExecuteShell".to_string();
        assert_eq!(
            emit(&spec).unwrap_err(),
            SynthError::UnknownAction("ExecuteShell".to_string())
        );
    }

    #[test]
    fn camera_block_emitted_for_moving_camera_scene() {
        let mut spec = sample_spec();
        spec.scene_kind = SceneKind::MovingCamera;
        spec.camera = Some(CameraDecl {
            frame_center: Some([1.0, 2.0]),
            zoom: Some(0.5),
            orientation: None,
        });
        let source = emit(&spec).unwrap();
        assert!(source.contains("class GeneratedScene(MovingCameraScene):"));
        assert!(source.contains("self.camera.frame.move_to"));
        assert!(source.contains("self.camera.frame.scale(0.500000)"));
    }
}
