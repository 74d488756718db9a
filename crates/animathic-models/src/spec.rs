//! The animation specification: the structured IR that is the sole contract
//! between the LLM layer (C5/C6) and the code synthesizer (C4).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Object identifier pattern: `[a-z][a-z0-9_]{0,31}`.
pub fn is_valid_object_id(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }
    if id.len() > 32 {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Closed vocabulary of object kinds the synthesizer may emit (spec §6).
pub const OBJECT_KINDS: &[&str] = &[
    "Text",
    "Circle",
    "Square",
    "Rectangle",
    "Triangle",
    "Line",
    "Arrow",
    "Dot",
    "VGroup",
    "Axes",
    "ParametricFunction",
    "Polygon",
    "RegularPolygon",
];

/// Closed vocabulary of step actions the synthesizer may emit (spec §6).
pub const ACTIONS: &[&str] = &[
    "Create",
    "Write",
    "FadeIn",
    "FadeOut",
    "Transform",
    "ReplacementTransform",
    "MoveAlongPath",
    "Rotate",
    "Scale",
    "Shift",
];

/// Closed color palette (spec §6).
pub const COLORS: &[&str] = &[
    "WHITE", "BLACK", "RED", "GREEN", "BLUE", "YELLOW", "ORANGE", "PURPLE", "TEAL", "PINK", "GRAY",
];

/// Internal tagged representation of an object kind.
///
/// `ObjectDecl::kind` carries the raw string as it arrived from the LLM
/// layer; the synthesizer looks it up here, refusing with
/// `unknown_vocabulary` on no match (spec §4.4, §8 scenario 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Text,
    Circle,
    Square,
    Rectangle,
    Triangle,
    Line,
    Arrow,
    Dot,
    VGroup,
    Axes,
    ParametricFunction,
    Polygon,
    RegularPolygon,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Text => "Text",
            ObjectKind::Circle => "Circle",
            ObjectKind::Square => "Square",
            ObjectKind::Rectangle => "Rectangle",
            ObjectKind::Triangle => "Triangle",
            ObjectKind::Line => "Line",
            ObjectKind::Arrow => "Arrow",
            ObjectKind::Dot => "Dot",
            ObjectKind::VGroup => "VGroup",
            ObjectKind::Axes => "Axes",
            ObjectKind::ParametricFunction => "ParametricFunction",
            ObjectKind::Polygon => "Polygon",
            ObjectKind::RegularPolygon => "RegularPolygon",
        }
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Text" => ObjectKind::Text,
            "Circle" => ObjectKind::Circle,
            "Square" => ObjectKind::Square,
            "Rectangle" => ObjectKind::Rectangle,
            "Triangle" => ObjectKind::Triangle,
            "Line" => ObjectKind::Line,
            "Arrow" => ObjectKind::Arrow,
            "Dot" => ObjectKind::Dot,
            "VGroup" => ObjectKind::VGroup,
            "Axes" => ObjectKind::Axes,
            "ParametricFunction" => ObjectKind::ParametricFunction,
            "Polygon" => ObjectKind::Polygon,
            "RegularPolygon" => ObjectKind::RegularPolygon,
            _ => return Err(()),
        })
    }
}

/// Internal tagged representation of a step action. See [`ObjectKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Write,
    FadeIn,
    FadeOut,
    Transform,
    ReplacementTransform,
    MoveAlongPath,
    Rotate,
    Scale,
    Shift,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "Create",
            ActionKind::Write => "Write",
            ActionKind::FadeIn => "FadeIn",
            ActionKind::FadeOut => "FadeOut",
            ActionKind::Transform => "Transform",
            ActionKind::ReplacementTransform => "ReplacementTransform",
            ActionKind::MoveAlongPath => "MoveAlongPath",
            ActionKind::Rotate => "Rotate",
            ActionKind::Scale => "Scale",
            ActionKind::Shift => "Shift",
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Create" => ActionKind::Create,
            "Write" => ActionKind::Write,
            "FadeIn" => ActionKind::FadeIn,
            "FadeOut" => ActionKind::FadeOut,
            "Transform" => ActionKind::Transform,
            "ReplacementTransform" => ActionKind::ReplacementTransform,
            "MoveAlongPath" => ActionKind::MoveAlongPath,
            "Rotate" => ActionKind::Rotate,
            "Scale" => ActionKind::Scale,
            "Shift" => ActionKind::Shift,
            _ => return Err(()),
        })
    }
}

/// Closed color palette. Strongly typed at the JSON boundary: an LLM
/// response naming a color outside this set fails to deserialize and is
/// treated as `llm_malformed` by the orchestrator, same as any other
/// schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    White,
    Black,
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
    Teal,
    Pink,
    Gray,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::White => "WHITE",
            Color::Black => "BLACK",
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
            Color::Yellow => "YELLOW",
            Color::Orange => "ORANGE",
            Color::Purple => "PURPLE",
            Color::Teal => "TEAL",
            Color::Pink => "PINK",
            Color::Gray => "GRAY",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Color {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "WHITE" => Color::White,
            "BLACK" => Color::Black,
            "RED" => Color::Red,
            "GREEN" => Color::Green,
            "BLUE" => Color::Blue,
            "YELLOW" => Color::Yellow,
            "ORANGE" => Color::Orange,
            "PURPLE" => Color::Purple,
            "TEAL" => Color::Teal,
            "PINK" => Color::Pink,
            "GRAY" => Color::Gray,
            _ => return Err(()),
        })
    }
}

/// Scene base selected by `scene_kind` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneKind {
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "moving_camera")]
    MovingCamera,
    #[serde(rename = "3d")]
    ThreeD,
}

impl SceneKind {
    /// The scene base class the synthesizer emits for this kind.
    pub fn scene_base(&self) -> &'static str {
        match self {
            SceneKind::TwoD => "Scene",
            SceneKind::MovingCamera => "MovingCameraScene",
            SceneKind::ThreeD => "ThreeDScene",
        }
    }
}

/// Per-object visual style. Every field is optional with a defined default,
/// matching manim's own constructor defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub color: Option<Color>,
    pub stroke_width: Option<f64>,
    pub fill_opacity: Option<f64>,
    pub z_index: Option<i32>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: None,
            stroke_width: None,
            fill_opacity: None,
            z_index: None,
        }
    }
}

impl Style {
    pub fn resolved_color(&self) -> Color {
        self.color.unwrap_or(Color::White)
    }

    pub fn resolved_stroke_width(&self) -> f64 {
        self.stroke_width.unwrap_or(4.0)
    }

    pub fn resolved_fill_opacity(&self) -> f64 {
        self.fill_opacity.unwrap_or(0.0)
    }

    pub fn resolved_z_index(&self) -> i32 {
        self.z_index.unwrap_or(0)
    }
}

/// A declared object. `kind` is the raw string as produced by the LLM layer
/// (see [`ObjectKind`] doc comment for why it isn't parsed eagerly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDecl {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub style: Style,
}

/// A step: one action applied to one or more previously-declared objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDecl {
    pub action: String,
    pub target_ids: Vec<String>,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    pub run_time: f64,
    #[serde(default)]
    pub wait_after: f64,
}

/// Optional camera configuration (moving-camera pan/zoom, or 3D orientation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDecl {
    pub frame_center: Option<[f64; 2]>,
    pub zoom: Option<f64>,
    /// (phi, theta, gamma) in degrees, 3D scenes only.
    pub orientation: Option<[f64; 3]>,
}

impl Default for CameraDecl {
    fn default() -> Self {
        Self {
            frame_center: None,
            zoom: None,
            orientation: None,
        }
    }
}

/// The structured intermediate representation (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    pub scene_kind: SceneKind,
    pub duration_hint: f64,
    pub background: Color,
    pub objects: Vec<ObjectDecl>,
    pub steps: Vec<StepDecl>,
    #[serde(default)]
    pub camera: Option<CameraDecl>,
}

/// Errors surfaced by [`AnimationSpec::validate`]. All coarsen to
/// `ErrorKind::Schema` per spec §7/§8.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpecError {
    #[error("duration_hint {0} out of range 1..30")]
    DurationHintOutOfRange(f64),
    #[error("object id '{0}' does not match [a-z][a-z0-9_]{{0,31}}")]
    InvalidObjectId(String),
    #[error("duplicate object id '{0}'")]
    DuplicateObjectId(String),
    #[error("too many objects: {0} (max 50)")]
    TooManyObjects(usize),
    #[error("too many steps: {0} (max 100)")]
    TooManySteps(usize),
    #[error("step {0} has no target_ids")]
    EmptyTargetIds(usize),
    #[error("step {step} references undeclared or forward-referenced object '{target}'")]
    UnknownTargetId { step: usize, target: String },
    #[error("step {0} run_time out of range 0.1..10")]
    RunTimeOutOfRange(usize),
    #[error("step {0} wait_after out of range 0..5")]
    WaitAfterOutOfRange(usize),
    #[error("total playtime {0:.3}s exceeds 60s cap")]
    PlaytimeExceeded(f64),
}

impl AnimationSpec {
    /// Enforce the invariants of spec §3: object id shape, uniqueness, no
    /// forward references, per-step time bounds, and total playtime cap.
    pub fn validate(&self) -> Result<(), SpecError> {
        if !(1.0..=30.0).contains(&self.duration_hint) {
            return Err(SpecError::DurationHintOutOfRange(self.duration_hint));
        }

        if self.objects.len() > 50 {
            return Err(SpecError::TooManyObjects(self.objects.len()));
        }
        if self.steps.len() > 100 {
            return Err(SpecError::TooManySteps(self.steps.len()));
        }

        let mut declared: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for obj in &self.objects {
            if !is_valid_object_id(&obj.id) {
                return Err(SpecError::InvalidObjectId(obj.id.clone()));
            }
            if !declared.insert(obj.id.as_str()) {
                return Err(SpecError::DuplicateObjectId(obj.id.clone()));
            }
        }

        let mut total_playtime = 0.0f64;
        let mut visible: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if step.target_ids.is_empty() {
                return Err(SpecError::EmptyTargetIds(idx));
            }
            if !(0.1..=10.0).contains(&step.run_time) {
                return Err(SpecError::RunTimeOutOfRange(idx));
            }
            if !(0.0..=5.0).contains(&step.wait_after) {
                return Err(SpecError::WaitAfterOutOfRange(idx));
            }
            for target in &step.target_ids {
                if !declared.contains(target.as_str()) {
                    return Err(SpecError::UnknownTargetId {
                        step: idx,
                        target: target.clone(),
                    });
                }
            }
            visible.extend(step.target_ids.iter().map(String::as_str));
            total_playtime += step.run_time + step.wait_after;
        }

        if total_playtime > 60.0 {
            return Err(SpecError::PlaytimeExceeded(total_playtime));
        }

        Ok(())
    }

    /// Deterministic content hash used for `GenerationAttempt::spec_hash`.
    pub fn content_hash(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_spec() -> AnimationSpec {
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
    fn valid_spec_passes() {
        assert!(base_spec().validate().is_ok());
    }

    #[test]
    fn rejects_invalid_object_id() {
        let mut spec = base_spec();
        spec.objects[0].id = "C".to_string();
        assert_eq!(
            spec.validate(),
            Err(SpecError::InvalidObjectId("C".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_object_ids() {
        let mut spec = base_spec();
        let dup = spec.objects[0].clone();
        spec.objects.push(dup);
        assert!(matches!(
            spec.validate(),
            Err(SpecError::DuplicateObjectId(_))
        ));
    }

    #[test]
    fn rejects_forward_reference() {
        let mut spec = base_spec();
        spec.objects.clear();
        assert!(matches!(
            spec.validate(),
            Err(SpecError::UnknownTargetId { .. })
        ));
    }

    #[test]
    fn rejects_too_many_objects() {
        let mut spec = base_spec();
        spec.objects = (0..51)
            .map(|i| ObjectDecl {
                id: format!("o{i}"),
                kind: "Dot".to_string(),
                params: serde_json::Map::new(),
                style: Style::default(),
            })
            .collect();
        assert!(matches!(spec.validate(), Err(SpecError::TooManyObjects(51))));
    }

    #[test]
    fn accepts_boundary_sixty_second_playtime() {
        let mut spec = base_spec();
        // 4 steps at (10.0 run_time + 5.0 wait_after) = 60.0s exactly.
        spec.steps = (0..4)
            .map(|_| StepDecl {
                action: "FadeIn".to_string(),
                target_ids: vec!["c".to_string()],
                params: serde_json::Map::new(),
                run_time: 10.0,
                wait_after: 5.0,
            })
            .collect();
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn rejects_playtime_over_cap() {
        let mut spec = base_spec();
        // 4 steps at (10.0 + 5.0) = 60.0s plus one more 0.1s step tips over the cap.
        spec.steps = (0..4)
            .map(|_| StepDecl {
                action: "FadeIn".to_string(),
                target_ids: vec!["c".to_string()],
                params: serde_json::Map::new(),
                run_time: 10.0,
                wait_after: 5.0,
            })
            .collect();
        spec.steps.push(StepDecl {
            action: "FadeIn".to_string(),
            target_ids: vec!["c".to_string()],
            params: serde_json::Map::new(),
            run_time: 0.1,
            wait_after: 0.0,
        });
        assert!(matches!(spec.validate(), Err(SpecError::PlaytimeExceeded(_))));
    }

    #[test]
    fn object_id_pattern() {
        assert!(is_valid_object_id("a"));
        assert!(is_valid_object_id("a1_b2"));
        assert!(!is_valid_object_id("A"));
        assert!(!is_valid_object_id("1a"));
        assert!(!is_valid_object_id(""));
        assert!(!is_valid_object_id(&"a".repeat(33)));
    }

    #[test]
    fn object_kind_roundtrip() {
        for kind in OBJECT_KINDS {
            let parsed: ObjectKind = kind.parse().unwrap();
            assert_eq!(parsed.as_str(), *kind);
        }
        assert!("os.system".parse::<ObjectKind>().is_err());
    }

    #[test]
    fn action_kind_roundtrip() {
        for action in ACTIONS {
            let parsed: ActionKind = action.parse().unwrap();
            assert_eq!(parsed.as_str(), *action);
        }
    }
}
