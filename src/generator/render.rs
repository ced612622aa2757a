//! Rendering of [`ProgramIr`] into source text
//!
//! The structured program says nothing about syntax; a [`Renderer`]
//! decides how the capability, implementations and driver are spelled.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ir::{Implementation, ProgramIr, SelectionChain, FAIL_VALUE, PASS_VALUE};

/// Turns a structured program into source text
pub trait Renderer {
    /// Render the complete program
    fn render(&self, ir: &ProgramIr) -> String;

    /// File extension of the rendered program (without the dot)
    fn extension(&self) -> &'static str;
}

/// How the driver obtains the implementation it calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DispatchStyle {
    /// `&StructN {} as &dyn A`
    #[default]
    Reference,
    /// `Box::new(StructN {})` into `Box<dyn A>`
    Boxed,
    /// Monomorphized baseline: each arm calls its concrete type directly
    Static,
}

impl DispatchStyle {
    /// Parse a style name as accepted on the command line
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reference" | "ref" => Some(Self::Reference),
            "boxed" | "box" => Some(Self::Boxed),
            "static" | "mono" | "monomorphized" => Some(Self::Static),
            _ => None,
        }
    }
}

impl fmt::Display for DispatchStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Boxed => write!(f, "boxed"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// Renders programs as Rust source using trait objects
#[derive(Debug, Clone, Copy, Default)]
pub struct RustRenderer {
    style: DispatchStyle,
}

impl RustRenderer {
    /// Create a renderer with the given dispatch style
    #[must_use]
    pub fn new(style: DispatchStyle) -> Self {
        Self { style }
    }

    /// Dispatch style in use
    #[must_use]
    pub fn style(&self) -> DispatchStyle {
        self.style
    }
}

impl Renderer for RustRenderer {
    fn render(&self, ir: &ProgramIr) -> String {
        RustProgram {
            ir,
            style: self.style,
        }
        .to_string()
    }

    fn extension(&self) -> &'static str {
        "rs"
    }
}

struct RustProgram<'a> {
    ir: &'a ProgramIr,
    style: DispatchStyle,
}

const INDENT: &str = "    ";

impl RustProgram<'_> {
    fn write_capability(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cap = &self.ir.capability;
        writeln!(f, "trait {} {{", cap.name)?;
        writeln!(f, "{INDENT}fn {}(&self, x: i32) -> i32;", cap.operation)?;
        writeln!(f, "}}")
    }

    fn write_implementation(&self, f: &mut fmt::Formatter<'_>, imp: &Implementation) -> fmt::Result {
        let cap = &self.ir.capability;
        let name = imp.type_name();
        writeln!(f, "struct {name} {{}}")?;
        writeln!(f)?;
        writeln!(f, "impl {} for {name} {{", cap.name)?;
        writeln!(f, "{INDENT}fn {}(&self, x: i32) -> i32 {{", cap.operation)?;
        writeln!(f, "{INDENT}{INDENT}if x == {} {{", imp.trigger)?;
        writeln!(f, "{INDENT}{INDENT}{INDENT}return {FAIL_VALUE};")?;
        writeln!(f, "{INDENT}{INDENT}}}")?;
        writeln!(f, "{INDENT}{INDENT}return {PASS_VALUE};")?;
        writeln!(f, "{INDENT}}}")?;
        writeln!(f, "}}")
    }

    /// Expression yielding implementation `index` in the current style
    fn object(&self, index: u32) -> String {
        let cap = &self.ir.capability.name;
        match self.style {
            DispatchStyle::Reference => format!("&Struct{index} {{}} as &dyn {cap}"),
            DispatchStyle::Boxed => format!("Box::new(Struct{index} {{}})"),
            DispatchStyle::Static => format!("Struct{index} {{}}"),
        }
    }

    fn object_type(&self) -> String {
        let cap = &self.ir.capability.name;
        match self.style {
            DispatchStyle::Reference => format!("&dyn {cap}"),
            DispatchStyle::Boxed => format!("Box<dyn {cap}>"),
            DispatchStyle::Static => String::new(),
        }
    }

    fn write_assert(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(
            f,
            "{indent}assert!(s.{}(i) == {PASS_VALUE});",
            self.ir.capability.operation
        )
    }

    /// `if i % m == r { ... } else if ... } else { ... }` with one body per branch
    fn write_chain(
        &self,
        f: &mut fmt::Formatter<'_>,
        chain: &SelectionChain,
        indent: &str,
        body: impl Fn(&mut fmt::Formatter<'_>, u32, &str) -> fmt::Result,
    ) -> fmt::Result {
        let inner = format!("{indent}{INDENT}");
        for (n, arm) in chain.arms.iter().enumerate() {
            let keyword = if n == 0 { "if" } else { "} else if" };
            let lead = if n == 0 { "" } else { indent };
            writeln!(
                f,
                "{lead}{keyword} i % {} == {} {{",
                chain.modulus, arm.residue
            )?;
            body(f, arm.implementation, &inner)?;
        }
        writeln!(f, "{indent}}} else {{")?;
        body(f, chain.default, &inner)?;
        write!(f, "{indent}}}")
    }

    fn write_driver(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let driver = &self.ir.driver;
        let chain = &driver.selection;
        let body_indent = format!("{INDENT}{INDENT}");

        writeln!(f, "fn main() {{")?;
        writeln!(f, "{INDENT}for i in 0..{} {{", driver.iterations)?;

        match self.style {
            DispatchStyle::Reference | DispatchStyle::Boxed => {
                let ty = self.object_type();
                if chain.arms.is_empty() {
                    writeln!(f, "{body_indent}let s: {ty} = {};", self.object(chain.default))?;
                } else {
                    write!(f, "{body_indent}let s: {ty} = ")?;
                    self.write_chain(f, chain, &body_indent, |f, index, indent| {
                        writeln!(f, "{indent}{}", self.object(index))
                    })?;
                    writeln!(f, ";")?;
                }
                self.write_assert(f, &body_indent)?;
            }
            DispatchStyle::Static => {
                let call = |f: &mut fmt::Formatter<'_>, index: u32, indent: &str| {
                    writeln!(f, "{indent}let s = {};", self.object(index))?;
                    self.write_assert(f, indent)
                };
                if chain.arms.is_empty() {
                    call(f, chain.default, &body_indent)?;
                } else {
                    write!(f, "{body_indent}")?;
                    self.write_chain(f, chain, &body_indent, call)?;
                    writeln!(f)?;
                }
            }
        }

        writeln!(f, "{INDENT}}}")?;
        writeln!(f, "}}")
    }
}

impl fmt::Display for RustProgram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_capability(f)?;
        for imp in &self.ir.implementations {
            writeln!(f)?;
            self.write_implementation(f, imp)?;
        }
        writeln!(f)?;
        self.write_driver(f)
    }
}
