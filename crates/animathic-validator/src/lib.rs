//! Allowlist & Validator (C1).
//!
//! Parses synthesized source into a Python AST and enforces the closed
//! surface it is allowed to use: one scene class, one wildcard import of the
//! animation library, allowlisted constructors and actions, no escape-hatch
//! identifiers. A denylist alone is never sufficient here — every
//! constructor/action identifier must appear in the allowlist, matching the
//! "fail closed" posture of spec §4.1.

pub mod error;
pub mod limits;

use animathic_models::{SceneKind, ACTIONS, OBJECT_KINDS};
use tree_sitter::{Node, Parser, Tree};

pub use error::{Offender, ValidatorError, ValidatorResult};
use limits::*;

/// Validate synthesized source text against the allowlist (spec §4.1).
///
/// `scene_kind` selects the expected base class of `GeneratedScene`; the
/// synthesizer and the validator must agree on this mapping (spec §6).
pub fn validate_source(source: &str, scene_kind: SceneKind) -> ValidatorResult<()> {
    if source.len() > MAX_SOURCE_BYTES {
        return Err(ValidatorError::TooLarge(source.len()));
    }

    if let Some(line) = find_line_continuation(source) {
        return Err(ValidatorError::BannedSymbol(
            "backslash line continuation".to_string(),
            line,
        ));
    }

    let tree = parse(source)?;
    let root = tree.root_node();

    check_imports(root, source)?;
    check_scene_class(root, source, scene_kind)?;
    check_identifiers(root, source)?;
    check_shape(root)?;

    Ok(())
}

fn parse(source: &str) -> ValidatorResult<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_python::language())
        .expect("tree-sitter-python grammar is ABI compatible with the linked tree-sitter runtime");
    parser
        .parse(source, None)
        .filter(|t| !t.root_node().has_error())
        .ok_or(ValidatorError::ParseFailed(1))
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

fn text_of<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Scan for a backslash immediately preceding a newline outside of any
/// string literal. Tracks single/double/triple-quoted strings with a small
/// state machine; this is intentionally conservative rather than a full
/// lexer, matching the narrow rule in spec §4.1.
fn find_line_continuation(source: &str) -> Option<usize> {
    #[derive(PartialEq)]
    enum State {
        Code,
        Single,
        Double,
        TripleSingle,
        TripleDouble,
    }

    let mut state = State::Code;
    let mut line = 1usize;
    let bytes: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match state {
            State::Code => {
                if c == '\'' {
                    state = if bytes[i..].starts_with(&['\'', '\'', '\'']) {
                        i += 2;
                        State::TripleSingle
                    } else {
                        State::Single
                    };
                } else if c == '"' {
                    state = if bytes[i..].starts_with(&['"', '"', '"']) {
                        i += 2;
                        State::TripleDouble
                    } else {
                        State::Double
                    };
                } else if c == '\\' && bytes.get(i + 1) == Some(&'\n') {
                    return Some(line);
                } else if c == '\n' {
                    line += 1;
                }
            }
            State::Single => {
                if c == '\\' {
                    i += 1;
                } else if c == '\'' {
                    state = State::Code;
                } else if c == '\n' {
                    line += 1;
                }
            }
            State::Double => {
                if c == '\\' {
                    i += 1;
                } else if c == '"' {
                    state = State::Code;
                } else if c == '\n' {
                    line += 1;
                }
            }
            State::TripleSingle => {
                if bytes[i..].starts_with(&['\'', '\'', '\'']) {
                    i += 2;
                    state = State::Code;
                } else if c == '\n' {
                    line += 1;
                }
            }
            State::TripleDouble => {
                if bytes[i..].starts_with(&['"', '"', '"']) {
                    i += 2;
                    state = State::Code;
                } else if c == '\n' {
                    line += 1;
                }
            }
        }
        i += 1;
    }

    None
}

/// Exactly one wildcard import of the animation library, exactly one plain
/// import of the numeric helper, nothing else (spec §4.1).
fn check_imports(root: Node, source: &str) -> ValidatorResult<()> {
    let mut wildcard_imports = Vec::new();
    let mut plain_imports = Vec::new();

    walk(root, &mut |node| {
        match node.kind() {
            "import_from_statement" => {
                let module = node
                    .child_by_field_name("module_name")
                    .map(|n| text_of(n, source).to_string())
                    .unwrap_or_default();
                let has_wildcard = node
                    .children(&mut node.walk())
                    .any(|c| c.kind() == "wildcard_import");
                if has_wildcard {
                    wildcard_imports.push((module, line_of(node)));
                } else {
                    plain_imports.push((module, line_of(node)));
                }
            }
            "import_statement" => {
                for child in node.children(&mut node.walk()) {
                    if child.kind() == "dotted_name" || child.kind() == "aliased_import" {
                        plain_imports.push((text_of(child, source).to_string(), line_of(node)));
                    }
                }
            }
            _ => {}
        }
        true
    });

    if wildcard_imports.len() != 1 || wildcard_imports[0].0 != ANIMATION_LIB_MODULE {
        return Err(ValidatorError::Schema(
            format!(
                "expected exactly one wildcard import of '{}'",
                ANIMATION_LIB_MODULE
            ),
            wildcard_imports.first().map(|i| i.1).unwrap_or(1),
        ));
    }

    if plain_imports.len() != 1 || !plain_imports[0].0.starts_with(NUMERIC_HELPER_MODULE) {
        return Err(ValidatorError::Schema(
            format!(
                "expected exactly one import of the numeric helper '{}'",
                NUMERIC_HELPER_MODULE
            ),
            plain_imports.first().map(|i| i.1).unwrap_or(1),
        ));
    }

    Ok(())
}

/// Exactly one public `GeneratedScene` class, inheriting from the expected
/// scene base, exposing exactly one `construct` method with no positional
/// parameters beyond the receiver (spec §4.1).
fn check_scene_class(root: Node, source: &str, scene_kind: SceneKind) -> ValidatorResult<()> {
    let mut classes = Vec::new();

    walk(root, &mut |node| {
        if node.kind() == "class_definition" {
            classes.push(node);
        }
        true
    });

    if classes.len() != 1 {
        return Err(ValidatorError::Shape(
            format!("expected exactly one class definition, found {}", classes.len()),
            classes.first().map(line_of).unwrap_or(1),
        ));
    }

    let class = classes[0];
    let name = class
        .child_by_field_name("name")
        .map(|n| text_of(n, source))
        .unwrap_or_default();
    if name != REQUIRED_SCENE_CLASS {
        return Err(ValidatorError::Schema(
            format!("expected class named '{}', found '{}'", REQUIRED_SCENE_CLASS, name),
            line_of(class),
        ));
    }

    let expected_base = scene_kind.scene_base();
    let bases_ok = class
        .child_by_field_name("superclasses")
        .map(|args| {
            args.children(&mut args.walk())
                .any(|c| c.kind() == "identifier" && text_of(c, source) == expected_base)
        })
        .unwrap_or(false);
    if !bases_ok {
        return Err(ValidatorError::Schema(
            format!("'{}' must inherit from '{}'", REQUIRED_SCENE_CLASS, expected_base),
            line_of(class),
        ));
    }

    let body = class
        .child_by_field_name("body")
        .ok_or_else(|| ValidatorError::Shape("class body missing".to_string(), line_of(class)))?;

    let methods: Vec<Node> = body
        .children(&mut body.walk())
        .filter(|c| c.kind() == "function_definition")
        .collect();

    if methods.len() != 1 {
        return Err(ValidatorError::Shape(
            format!("expected exactly one method in '{}', found {}", REQUIRED_SCENE_CLASS, methods.len()),
            line_of(class),
        ));
    }

    let method = methods[0];
    let method_name = method
        .child_by_field_name("name")
        .map(|n| text_of(n, source))
        .unwrap_or_default();
    if method_name != REQUIRED_METHOD_NAME {
        return Err(ValidatorError::Schema(
            format!("expected method named '{}', found '{}'", REQUIRED_METHOD_NAME, method_name),
            line_of(method),
        ));
    }

    if let Some(params) = method.child_by_field_name("parameters") {
        let positional: Vec<Node> = params
            .children(&mut params.walk())
            .filter(|c| c.kind() == "identifier")
            .collect();
        if positional.len() != 1 {
            return Err(ValidatorError::Shape(
                "construct must take exactly one receiver parameter".to_string(),
                line_of(method),
            ));
        }
    }

    Ok(())
}

/// Every call-by-bare-identifier must name an allowlisted object kind or
/// action; any attribute access on a `__dunder__` name, or reference to a
/// banned identifier, is rejected outright (spec §4.1).
fn check_identifiers(root: Node, source: &str) -> ValidatorResult<()> {
    let mut offense: Option<(String, usize)> = None;

    walk(root, &mut |node| {
        if offense.is_some() {
            return false;
        }

        match node.kind() {
            "call" => {
                if let Some(func) = node.child_by_field_name("function") {
                    if func.kind() == "identifier" {
                        let name = text_of(func, source);
                        if BANNED_IDENTIFIERS.contains(&name) {
                            offense = Some((name.to_string(), line_of(func)));
                            return false;
                        }
                        if !OBJECT_KINDS.contains(&name) && !ACTIONS.contains(&name) {
                            offense = Some((name.to_string(), line_of(func)));
                            return false;
                        }
                    }
                }
            }
            "identifier" => {
                let name = text_of(node, source);
                if BANNED_IDENTIFIERS.contains(&name) {
                    offense = Some((name.to_string(), line_of(node)));
                    return false;
                }
            }
            "attribute" => {
                if let Some(attr) = node.child_by_field_name("attribute") {
                    let name = text_of(attr, source);
                    if name.starts_with("__") && name.ends_with("__") {
                        offense = Some((name.to_string(), line_of(attr)));
                        return false;
                    }
                }
            }
            _ => {}
        }
        true
    });

    if let Some((token, line)) = offense {
        return Err(ValidatorError::BannedSymbol(token, line));
    }

    Ok(())
}

/// Nesting depth and loop count caps (spec §4.1).
fn check_shape(root: Node) -> ValidatorResult<()> {
    const NESTING_KINDS: &[&str] = &[
        "if_statement",
        "for_statement",
        "while_statement",
        "try_statement",
        "with_statement",
    ];
    const LOOP_KINDS: &[&str] = &["for_statement", "while_statement"];

    let mut loop_count = 0usize;
    let mut max_depth = 0usize;

    fn walk_depth(
        node: Node,
        depth: usize,
        max_depth: &mut usize,
        loop_count: &mut usize,
        nesting: &[&str],
        loops: &[&str],
    ) {
        let is_nesting = nesting.contains(&node.kind());
        let next_depth = if is_nesting { depth + 1 } else { depth };
        *max_depth = (*max_depth).max(next_depth);
        if loops.contains(&node.kind()) {
            *loop_count += 1;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk_depth(child, next_depth, max_depth, loop_count, nesting, loops);
        }
    }

    walk_depth(root, 0, &mut max_depth, &mut loop_count, NESTING_KINDS, LOOP_KINDS);

    if max_depth > MAX_NESTING_DEPTH {
        return Err(ValidatorError::NestingTooDeep(max_depth));
    }
    if loop_count > MAX_LOOP_COUNT {
        return Err(ValidatorError::TooManyLoops(loop_count));
    }

    Ok(())
}

/// Depth-first walk; the visitor returns `false` to stop descending into
/// the current node's children (used to short-circuit once an offense is
/// found).
fn walk(node: Node, visit: &mut impl FnMut(Node) -> bool) {
    if !visit(node) {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            "from manim import *\nimport numpy as np\n\n\nclass GeneratedScene(Scene):\n    def construct(self):\n{}\n",
            body
        )
    }

    #[test]
    fn accepts_minimal_valid_source() {
        let source = wrap("        c = Circle()\n        self.play(FadeIn(c))\n");
        assert!(validate_source(&source, SceneKind::TwoD).is_ok());
    }

    #[test]
    fn rejects_missing_wildcard_import() {
        let source = "import numpy as np\n\n\nclass GeneratedScene(Scene):\n    def construct(self):\n        pass\n";
        let err = validate_source(source, SceneKind::TwoD).unwrap_err();
        assert_eq!(err.kind(), animathic_models::ErrorKind::Schema);
    }

    #[test]
    fn rejects_wrong_scene_base() {
        let source = wrap("        pass\n").replace("Scene):", "ThreeDScene):");
        let err = validate_source(&source, SceneKind::TwoD).unwrap_err();
        assert_eq!(err.kind(), animathic_models::ErrorKind::Schema);
    }

    #[test]
    fn rejects_unknown_constructor() {
        let source = wrap("        c = EvilThing()\n");
        let err = validate_source(&source, SceneKind::TwoD).unwrap_err();
        assert_eq!(err.kind(), animathic_models::ErrorKind::BannedSymbol);
    }

    #[test]
    fn rejects_banned_builtin() {
        let source = wrap("        exec('os.system(\"rm -rf /\")')\n");
        let err = validate_source(&source, SceneKind::TwoD).unwrap_err();
        assert_eq!(err.kind(), animathic_models::ErrorKind::BannedSymbol);
    }

    #[test]
    fn rejects_dunder_attribute_access() {
        let source = wrap("        x = c.__class__\n");
        let err = validate_source(&source, SceneKind::TwoD).unwrap_err();
        assert_eq!(err.kind(), animathic_models::ErrorKind::BannedSymbol);
    }

    #[test]
    fn rejects_oversized_source() {
        let source = wrap(&"        pass\n".repeat(3000));
        let err = validate_source(&source, SceneKind::TwoD).unwrap_err();
        assert!(matches!(err, ValidatorError::TooLarge(_)));
    }

    #[test]
    fn rejects_too_many_loops() {
        let body: String = (0..21).map(|_| "        for i in range(1):\n            pass\n").collect();
        let source = wrap(&body);
        let err = validate_source(&source, SceneKind::TwoD).unwrap_err();
        assert_eq!(err.kind(), animathic_models::ErrorKind::Shape);
    }
}
