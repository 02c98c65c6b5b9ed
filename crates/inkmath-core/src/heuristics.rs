//! Local rule-based fallback validation.
//!
//! When the Completion capability is down or unusable, steps are classified
//! by an ordered first-match-wins rule table: mistake detectors, then a
//! fixed list of known-good algebra shapes, then generic acceptance tiers,
//! then a default reject. Confidences are fixed per-rule weights, not a
//! model. Wording for positive verdicts is drawn from small per-category
//! pools through a pluggable picker so production gets variety and tests
//! stay deterministic; the verdict itself never depends on the picker.

use rand::Rng;
use regex::Regex;

use crate::model::ValidationResult;

/// The rule that decided a step's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepCategory {
    /// A term was moved across `=` without flipping its sign.
    SignError,
    /// Two-term arithmetic whose stated result is wrong.
    BadArithmetic,
    /// `a = b` with different numbers on each side.
    FalseEquality,
    /// Isolated variable, `x = N`.
    SolvedVariable,
    /// Coefficient form, `Nx = N`.
    ScaledVariable,
    /// Move-term rearrangement, `<expr> = N ± N`.
    MovedTerm,
    /// Two-term arithmetic with the right result.
    Arithmetic,
    /// `N/N` or `\frac{N}{N}`.
    Division,
    /// Substitution check, `N(N) ± N = N`.
    Substitution,
    /// Self-equality check, `N = N`.
    SelfCheck,
    /// Generic: has `=` and math content.
    Equation,
    /// Generic: math content without `=`.
    Expression,
    /// Generic: bare operator/digit/letter fragment.
    Fragment,
    /// Nothing recognizable.
    Incomplete,
}

/// A classification plus the result handed back to callers.
#[derive(Debug, Clone)]
pub struct HeuristicVerdict {
    pub category: StepCategory,
    pub result: ValidationResult,
}

/// Chooses one wording out of a pool. Implementations must not influence
/// anything but the feedback string.
pub trait WordingPicker: Send + Sync {
    fn pick(&self, pool_len: usize) -> usize;
}

/// Production picker: uniform random wording.
pub struct RandomPicker;

impl WordingPicker for RandomPicker {
    fn pick(&self, pool_len: usize) -> usize {
        if pool_len <= 1 {
            0
        } else {
            rand::thread_rng().gen_range(0..pool_len)
        }
    }
}

/// Test picker: always the same index (modulo pool length).
pub struct FixedPicker(pub usize);

impl WordingPicker for FixedPicker {
    fn pick(&self, pool_len: usize) -> usize {
        if pool_len == 0 {
            0
        } else {
            self.0 % pool_len
        }
    }
}

struct ShapeRule {
    pattern: Regex,
    category: StepCategory,
    confidence: f64,
}

/// The local, network-free step classifier.
pub struct HeuristicValidator {
    sign_move: Regex,
    arithmetic: Regex,
    self_equality: Regex,
    shapes: Vec<ShapeRule>,
    picker: Box<dyn WordingPicker>,
}

impl Default for HeuristicValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicValidator {
    pub fn new() -> Self {
        Self::with_picker(Box::new(RandomPicker))
    }

    pub fn with_picker(picker: Box<dyn WordingPicker>) -> Self {
        let shape = |pattern: &str, category, confidence| ShapeRule {
            pattern: Regex::new(pattern).unwrap(),
            category,
            confidence,
        };

        Self {
            sign_move: Regex::new(
                r"^(-?\d*\s*[a-zA-Z])\s*=\s*(\d+(?:\.\d+)?)\s*\+\s*(\d+(?:\.\d+)?)$",
            )
            .unwrap(),
            arithmetic: Regex::new(
                r"^(-?\d+(?:\.\d+)?)\s*([+-])\s*(\d+(?:\.\d+)?)\s*=\s*(-?\d+(?:\.\d+)?)$",
            )
            .unwrap(),
            self_equality: Regex::new(r"^(-?\d+(?:\.\d+)?)\s*=\s*(-?\d+(?:\.\d+)?)$").unwrap(),
            shapes: vec![
                shape(
                    r"^-?[a-zA-Z]\s*=\s*-?\d+(?:\.\d+)?$",
                    StepCategory::SolvedVariable,
                    0.95,
                ),
                shape(
                    r"^-?\d+\s*[a-zA-Z]\s*=\s*-?\d+(?:\.\d+)?$",
                    StepCategory::ScaledVariable,
                    0.9,
                ),
                shape(r"^-?\d+\s*/\s*\d+$", StepCategory::Division, 0.9),
                shape(
                    r"^\\frac\{\s*-?\d+\s*\}\{\s*\d+\s*\}$",
                    StepCategory::Division,
                    0.9,
                ),
                shape(
                    r"^-?\d*\s*\(\s*-?\d+(?:\.\d+)?\s*\)\s*[-+]\s*\d+(?:\.\d+)?\s*=\s*-?\d+(?:\.\d+)?$",
                    StepCategory::Substitution,
                    0.9,
                ),
                shape(
                    r"^.+=\s*-?\d+(?:\.\d+)?\s*[-+]\s*\d+(?:\.\d+)?$",
                    StepCategory::MovedTerm,
                    0.85,
                ),
            ],
            picker,
        }
    }

    /// Classify a step. Never fails; empty input lands on the default reject.
    pub fn classify(&self, latex: &str) -> HeuristicVerdict {
        let step = tidy(latex);

        // Mistake detectors run first: they catch wrong-but-well-formed
        // patterns that the acceptance rules below would wave through.
        if let Some(caps) = self.sign_move.captures(&step) {
            let (lhs, a, b) = (&caps[1], &caps[2], &caps[3]);
            return HeuristicVerdict {
                category: StepCategory::SignError,
                result: ValidationResult::new(
                    false,
                    "⚠️ Watch the sign when moving that term.",
                    Some(format!(
                        "Moving a term across '=' flips its sign, so this should read {lhs} = {a} - {b}."
                    )),
                    0.85,
                ),
            };
        }

        if let Some(caps) = self.arithmetic.captures(&step) {
            let a: f64 = caps[1].parse().unwrap_or(0.0);
            let b: f64 = caps[3].parse().unwrap_or(0.0);
            let stated: f64 = caps[4].parse().unwrap_or(0.0);
            let op = &caps[2];
            let actual = if op == "+" { a + b } else { a - b };
            if (actual - stated).abs() < 1e-9 {
                return self.accept(StepCategory::Arithmetic, 0.95);
            }
            return HeuristicVerdict {
                category: StepCategory::BadArithmetic,
                result: ValidationResult::new(
                    false,
                    "⚠️ Check that arithmetic again.",
                    Some(format!(
                        "{} {op} {} = {}, not {}.",
                        fmt_num(a),
                        fmt_num(b),
                        fmt_num(actual),
                        fmt_num(stated)
                    )),
                    0.95,
                ),
            };
        }

        if let Some(caps) = self.self_equality.captures(&step) {
            let lhs: f64 = caps[1].parse().unwrap_or(0.0);
            let rhs: f64 = caps[2].parse().unwrap_or(f64::MAX);
            if (lhs - rhs).abs() < 1e-9 {
                return self.accept(StepCategory::SelfCheck, 0.95);
            }
            return HeuristicVerdict {
                category: StepCategory::FalseEquality,
                result: ValidationResult::new(
                    false,
                    "⚠️ The two sides aren't equal.",
                    Some(format!(
                        "{} and {} are different numbers, so this equality doesn't hold.",
                        fmt_num(lhs),
                        fmt_num(rhs)
                    )),
                    0.9,
                ),
            };
        }

        // Known-good algebra shapes, first match wins.
        for rule in &self.shapes {
            if rule.pattern.is_match(&step) {
                return self.accept(rule.category, rule.confidence);
            }
        }

        // Generic acceptance tiers.
        let has_digit = step.chars().any(|c| c.is_ascii_digit());
        let has_letter = step.chars().any(|c| c.is_ascii_alphabetic());
        if step.contains('=') && (has_digit || has_letter) {
            return HeuristicVerdict {
                category: StepCategory::Equation,
                result: ValidationResult::new(true, "✅ That's a valid equation.", None, 0.75),
            };
        }
        if !step.is_empty()
            && (has_digit
                || has_letter
                || step.contains("\\frac")
                || step.contains('/')
                || step.contains("\\sqrt")
                || step.contains('√'))
        {
            return HeuristicVerdict {
                category: StepCategory::Expression,
                result: ValidationResult::new(true, "✅ That's a valid expression.", None, 0.7),
            };
        }
        if step
            .chars()
            .any(|c| matches!(c, '+' | '-' | '*' | '/' | '^' | '(' | ')') || c.is_ascii_alphanumeric())
        {
            return HeuristicVerdict {
                category: StepCategory::Fragment,
                result: ValidationResult::new(true, "📝 Good start — keep building the step.", None, 0.6),
            };
        }

        HeuristicVerdict {
            category: StepCategory::Incomplete,
            result: ValidationResult::new(
                false,
                "📝 Try writing a complete equation, like 2x + 3 = 11.",
                None,
                0.3,
            ),
        }
    }

    /// Classify and return only the result.
    pub fn validate(&self, latex: &str) -> ValidationResult {
        self.classify(latex).result
    }

    fn accept(&self, category: StepCategory, confidence: f64) -> HeuristicVerdict {
        let pool = wording_pool(category);
        let wording = pool[self.picker.pick(pool.len())];
        HeuristicVerdict {
            category,
            result: ValidationResult::new(true, wording, None, confidence),
        }
    }
}

/// Encouragement pools for the known-good shape categories.
pub fn wording_pool(category: StepCategory) -> &'static [&'static str] {
    match category {
        StepCategory::SolvedVariable => &[
            "✅ You found the variable — nice!",
            "✅ Great, the variable is isolated!",
            "✅ That's the solution. Well done!",
        ],
        StepCategory::ScaledVariable => &[
            "✅ Good simplification.",
            "✅ The equation is tidier now.",
            "✅ Nice — one operation away from the answer.",
        ],
        StepCategory::MovedTerm => &[
            "✅ Good move across the equals sign.",
            "✅ Term moved with the right sign.",
            "✅ Nice rearrangement.",
        ],
        StepCategory::Arithmetic => &[
            "✅ The arithmetic checks out.",
            "✅ Correct computation.",
            "✅ The numbers add up!",
        ],
        StepCategory::Division => &[
            "✅ Clean division step.",
            "✅ Dividing through — good.",
            "✅ That division is right.",
        ],
        StepCategory::Substitution => &[
            "✅ Good check by substitution.",
            "✅ Plugging the value back in — great habit.",
            "✅ The substitution looks right.",
        ],
        StepCategory::SelfCheck => &[
            "✅ Both sides match — your answer checks out!",
            "✅ The equality holds. Verified!",
            "✅ Perfect check: both sides agree.",
        ],
        _ => &["✅ Good step."],
    }
}

/// Light cleanup of recognizer output before matching: strip math-mode
/// dollars and size commands, normalize multiplication dots.
fn tidy(latex: &str) -> String {
    latex
        .replace('$', "")
        .replace("\\left", "")
        .replace("\\right", "")
        .replace("\\cdot", "*")
        .replace("\\times", "*")
        .trim()
        .to_string()
}

fn fmt_num(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
