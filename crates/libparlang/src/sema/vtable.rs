//! Virtual dispatch table construction for the Parlang translator.
//!
//! Sixth pass of the pipeline. For every class and every virtual method name
//! visible through its inheritance chain, the builder records which concrete
//! implementation each member of the inclusive subclass set dispatches to,
//! grouped by implementation symbol, plus an optional inherited fallback used
//! as the emitted dispatcher's default branch.

use indexmap::IndexMap;
use log::debug;

use crate::ast::MethodKind;
use crate::error::CompileError;
use crate::sema::context::{DefnLocation, SemaContext};

/// One dispatch table: everything the emitter needs for one dispatcher
#[derive(Debug, Clone)]
pub struct VirtualMethod {
    /// The method name the dispatcher is emitted under
    pub name: String,
    /// Parameter names from the declaring method's fragment (`self` first)
    pub params: Vec<String>,
    /// Implementation symbol (`Class.method_impl`) → class ids dispatching
    /// to it, in first-encounter order
    pub cases: IndexMap<String, Vec<u32>>,
    /// Inherited fallback symbol for the default branch
    pub default_impl: Option<String>,
}

/// Builds the vtable of every class in the context
pub fn build(context: &mut SemaContext<'_>) -> Result<(), CompileError> {
    for location in context.locations().collect::<Vec<_>>() {
        if !context.get(location).kind.is_class() {
            continue;
        }
        let vtable = build_class_vtable(context, location)?;
        if let Some(class) = context.get_mut(location).as_class_mut() {
            class.vtable = vtable;
        }
    }
    Ok(())
}

/// Builds the dispatch tables of one class
fn build_class_vtable(context: &SemaContext<'_>, location: DefnLocation) -> Result<Vec<VirtualMethod>, CompileError> {
    let base = context.get(location).as_class().and_then(|class| class.base);

    // Virtual method names visible from this class, own declarations first.
    let mut seen: Vec<&str> = Vec::new();
    let mut visible: Vec<(String, bool, Vec<String>)> = Vec::new();
    let mut cursor = Some(location);
    let mut depth = 0usize;
    while let Some(current) = cursor {
        let defn = context.get(current);
        for method in &defn.methods {
            if method.kind != MethodKind::Virtual || method.name == "init" || seen.contains(&method.name) {
                continue;
            }
            seen.push(method.name);
            visible.push((method.name.to_string(), depth > 0, parse_param_names(method.fragment())));
        }
        cursor = defn.as_class().and_then(|class| class.base);
        depth += 1;
    }

    let mut members = Vec::new();
    inclusive_subclasses(context, location, &mut members);

    let mut vtable = Vec::with_capacity(visible.len());
    for (name, inherited, params) in visible {
        let mut cases: IndexMap<String, Vec<u32>> = IndexMap::new();
        for &member in &members {
            let Some(symbol) = nearest_impl(context, member, &name, base) else { continue };
            let class = context
                .get(member)
                .as_class()
                .ok_or_else(|| CompileError::internal(format!("subclass of '{}' is not a class", context.get(location).name)))?;
            cases.entry(symbol).or_default().push(class.class_id);
        }

        let default_impl = match (inherited, base) {
            (true, Some(base)) => Some(nearest_impl(context, base, &name, None).ok_or_else(|| {
                CompileError::internal(format!(
                    "inherited virtual '{name}' has no implementation above '{}'",
                    context.get(location).name
                ))
            })?),
            _ => None,
        };

        debug!("vtable of '{}': '{name}' with {} implementation group(s)", context.get(location).name, cases.len());
        vtable.push(VirtualMethod { name, params, cases, default_impl });
    }
    Ok(vtable)
}

/// Collects a class and all its transitive subclasses, registration order
fn inclusive_subclasses(context: &SemaContext<'_>, location: DefnLocation, out: &mut Vec<DefnLocation>) {
    out.push(location);
    if let Some(class) = context.get(location).as_class() {
        for &subclass in &class.subclasses {
            inclusive_subclasses(context, subclass, out);
        }
    }
}

/// Finds the nearest implementation of `name`, walking from `from` through
/// its ancestors and stopping (exclusive) at `stop`
fn nearest_impl(context: &SemaContext<'_>, from: DefnLocation, name: &str, stop: Option<DefnLocation>) -> Option<String> {
    let mut cursor = Some(from);
    while let Some(current) = cursor {
        if Some(current) == stop {
            return None;
        }
        let defn = context.get(current);
        if defn.has_virtual(name) {
            return Some(format!("{}.{}_impl", defn.name, name));
        }
        cursor = defn.as_class().and_then(|class| class.base);
    }
    None
}

/// Extracts parameter names from a method's parameter-list fragment
///
/// `(self, x, y) {` yields `["self", "x", "y"]`. Default values are dropped;
/// a rest parameter keeps its `...` so the dispatcher can forward it.
pub fn parse_param_names(fragment: &str) -> Vec<String> {
    let Some(open) = fragment.find('(') else {
        return vec!["self".to_string()];
    };

    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in fragment[open..].chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                if depth > 1 {
                    current.push(c);
                }
            }
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    push_param(&mut params, &current);
                    break;
                }
                current.push(c);
            }
            ',' if depth == 1 => {
                push_param(&mut params, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    params
}

fn push_param(params: &mut Vec<String>, raw: &str) {
    let name = raw.split('=').next().unwrap_or(raw).trim();
    if name.is_empty() {
        return;
    }
    if let Some(rest) = name.strip_prefix("...") {
        params.push(format!("...{}", rest.trim()));
        return;
    }
    let ident: String = name
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if !ident.is_empty() {
        params.push(ident);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::file::SourceFile;
    use crate::nom_tools::State;
    use crate::parser;
    use crate::sema::{self, SemaContext};

    use super::parse_param_names;

    #[rstest]
    #[case("(self) {", vec!["self"])]
    #[case("(self, x, y) {", vec!["self", "x", "y"])]
    #[case("(self, n = 4) {", vec!["self", "n"])]
    #[case("(self, ...rest) {", vec!["self", "...rest"])]
    #[case("()", Vec::<&str>::new())]
    fn param_names(#[case] fragment: &str, #[case] expected: Vec<&str>) {
        assert_eq!(parse_param_names(fragment), expected);
    }

    fn build(code: &str) -> SemaContext<'static> {
        let state: &'static State = Box::leak(Box::new(State::new(SourceFile::new(vec!["<memory>".into()], code.to_string()))));
        let file = parser::parse(state).unwrap();
        sema::build(&[file]).unwrap()
    }

    const HIERARCHY: &str = "\
shared class A {
  method init(self) {
  }
  method f(self) {
    return 1
  }
} end
shared class B extends A {
  method f(self) {
    return 2
  }
} end
shared class C extends B {
} end
";

    #[test]
    fn override_routing() {
        let context = build(HIERARCHY);
        let class = |name: &str| context.get(context.lookup(name).unwrap()).as_class().unwrap();

        let a = class("A");
        let f = a.vtable.iter().find(|v| v.name == "f").unwrap();
        assert_eq!(f.cases.get("A.f_impl").unwrap(), &vec![class("A").class_id]);
        assert_eq!(f.cases.get("B.f_impl").unwrap(), &vec![class("B").class_id, class("C").class_id]);
        assert!(f.default_impl.is_none());
    }

    #[test]
    fn init_is_never_virtual() {
        let context = build(HIERARCHY);
        let a = context.get(context.lookup("A").unwrap()).as_class().unwrap();
        assert!(a.vtable.iter().all(|v| v.name != "init"));
        assert_eq!(a.vtable.len(), 1);
    }

    #[test]
    fn inherited_method_gets_a_default() {
        let context = build(HIERARCHY);
        let c = context.get(context.lookup("C").unwrap()).as_class().unwrap();
        let f = c.vtable.iter().find(|v| v.name == "f").unwrap();
        // C declares nothing below B, so every dispatch lands on the default.
        assert!(f.cases.is_empty());
        assert_eq!(f.default_impl.as_deref(), Some("B.f_impl"));
    }

    #[test]
    fn intermediate_class_covers_its_subtree() {
        let context = build(HIERARCHY);
        let class = |name: &str| context.get(context.lookup(name).unwrap()).as_class().unwrap();
        let b = class("B");
        let f = b.vtable.iter().find(|v| v.name == "f").unwrap();
        assert_eq!(f.cases.get("B.f_impl").unwrap(), &vec![class("B").class_id, class("C").class_id]);
        assert!(f.default_impl.is_none());
    }
}
