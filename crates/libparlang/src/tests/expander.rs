//! Macro expander output forms
//!
//! Verifies the exact replacement texts of the accessor, array and allocator
//! families, the literal-awareness of the scanner, and the non-fatal
//! rejection paths that leave source text unchanged.

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::emit::expander::expand_line;
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::sema::SemaContext;

use super::analyzed;

const TYPES: &str = "\
shared class Point {
  x : int32
  y : int32
} end
shared class Counter {
  hits : atomic uint32
  gate : synchronic int32
  rate : float32
} end
shared struct Pair {
  x : float64
  y : int32
  get(self) {
    return 0
  }
  set(self, v) {
  }
} end
shared struct Bare {
  x : int32
} end
shared class PairBox {
  pad1 : float32
  pad2 : float64
  p : Pair
  b : Bare
} end
";

fn expand(context: &SemaContext<'_>, text: &str) -> Result<String, CompileError> {
    let file = SourceFile::new(vec!["<memory>".into()], String::new());
    expand_line(context, &file, 1, text)
}

#[rstest]
// Bare get, suffix and prefix spellings of set and ref.
#[case("Point.x(p)", "(_mem_int32[(p+4)>>2])")]
#[case("Point.y(p)", "(_mem_int32[(p+8)>>2])")]
#[case("Point.x.set(p, 10)", "(_mem_int32[(p+4)>>2] = 10)")]
#[case("Point.set_x(p, 10)", "(_mem_int32[(p+4)>>2] = 10)")]
#[case("Point.x.ref(p)", "(p+4)")]
#[case("Point.ref_x(p)", "(p+4)")]
// Expansion happens in place inside larger expressions.
#[case("var d = Point.x(p) + 1;", "var d = (_mem_int32[(p+4)>>2]) + 1;")]
// Composite entries of an embedded struct are directly accessible.
#[case("PairBox.p_x(b)", "(_mem_float64[(b+16)>>3])")]
#[case("PairBox.p_y.set(b, 3)", "(_mem_int32[(b+24)>>2] = 3)")]
// A struct-typed field goes through the struct's accessor methods.
#[case("PairBox.p(b)", "(Pair._get_impl((b+16)))")]
#[case("PairBox.p.set(b, v)", "(Pair._set_impl((b+16), v))")]
fn accessor_forms(#[case] input: &str, #[case] expected: &str) {
    let context = analyzed(TYPES);
    assert_eq!(expand(&context, input).unwrap(), expected);
}

#[rstest]
#[case("Counter.add_hits(c, 1)", "(Atomics.add(_mem_uint32, (c+4)>>2, 1))")]
#[case("Counter.hits.sub(c, n)", "(Atomics.sub(_mem_uint32, (c+4)>>2, n))")]
#[case("Counter.or_gate(c, 4)", "(Atomics.or(_mem_int32, (c+8)>>2, 4))")]
#[case("Counter.gate.compareExchange(c, 0, 1)", "(Atomics.compareExchange(_mem_int32, (c+8)>>2, 0, 1))")]
#[case("Counter.gate.loadWhenEqual(c, 0)", "(Parlang.loadWhenEqual(_mem_int32, (c+8)>>2, 0))")]
#[case("Counter.loadWhenNotEqual_gate(c, 1)", "(Parlang.loadWhenNotEqual(_mem_int32, (c+8)>>2, 1))")]
#[case("Counter.expectUpdate_gate(c, v, 100)", "(Parlang.expectUpdate(_mem_int32, (c+8)>>2, v, 100))")]
#[case("Counter.notify_gate(c)", "(Parlang.notify(_mem_int32, (c+8)>>2))")]
fn atomic_and_synchronic_forms(#[case] input: &str, #[case] expected: &str) {
    let context = analyzed(TYPES);
    assert_eq!(expand(&context, input).unwrap(), expected);
}

#[rstest]
// Unknown type or field: not our pattern, text stays.
#[case("Math.floor(x)")]
#[case("Point.z(p)")]
#[case("Point.z.set(p, 1)")]
// Wrong arity is non-fatal and leaves the text unchanged.
#[case("Point.x(p, 1)")]
#[case("Point.x.set(p)")]
// Empty argument.
#[case("Point.x.set(p, )")]
// Atomic operations do not apply to float fields.
#[case("Counter.add_rate(c, 1)")]
// A member access of something else is not a type reference.
#[case("obj.Point.x(p)")]
// No call, no rewrite: emitted constants stay untouched.
#[case("var n = Point.SIZE;")]
fn left_unchanged(#[case] input: &str) {
    let context = analyzed(TYPES);
    assert_eq!(expand(&context, input).unwrap(), input);
}

#[test]
fn literals_are_not_rewritten() {
    let context = analyzed(TYPES);
    assert_eq!(expand(&context, "log(\"Point.x(p)\")").unwrap(), "log(\"Point.x(p)\")");
    assert_eq!(expand(&context, "m = /Point.x\\(p\\)/;").unwrap(), "m = /Point.x\\(p\\)/;");
    assert_eq!(expand(&context, "a = 1; // Point.x(p)").unwrap(), "a = 1; // Point.x(p)");
}

#[test]
fn arguments_expand_recursively() {
    let context = analyzed(TYPES);
    assert_eq!(
        expand(&context, "Point.x.set(p, Point.y(q))").unwrap(),
        "(_mem_int32[(p+4)>>2] = (_mem_int32[(q+8)>>2]))"
    );
    assert_eq!(
        expand(&context, "Point.x.set(Point.y(q), 1)").unwrap(),
        "(_mem_int32[((_mem_int32[(q+8)>>2])+4)>>2] = 1)"
    );
}

#[rstest]
// Class elements are 4-byte pointers.
#[case("Point.Array.get(a, i)", "(_mem_int32[(a+4*i)>>2])")]
#[case("Point.Array.set(a, i, v)", "(_mem_int32[(a+4*i)>>2] = v)")]
#[case("Point.Array.ref(a, i)", "(a+4*i)")]
// Primitive elements use their own stride and view.
#[case("float64.Array.get(a, i)", "(_mem_float64[(a+8*i)>>3])")]
#[case("int32.array_set(a, i, v)", "(_mem_int32[(a+4*i)>>2] = v)")]
// Struct elements are inline; a field suffix projects into the element.
#[case("Pair.array_get_x(a, i)", "(_mem_float64[((a+16*i)+0)>>3])")]
#[case("Pair.array_set_y(a, i, v)", "(_mem_int32[((a+16*i)+8)>>2] = v)")]
#[case("Pair.array_ref(a, i)", "(a+16*i)")]
#[case("Pair.Array.get(a, i)", "(Pair._get_impl((a+16*i)))")]
fn array_forms(#[case] input: &str, #[case] expected: &str) {
    let context = analyzed(TYPES);
    assert_eq!(expand(&context, input).unwrap(), expected);
}

#[test]
fn struct_without_accessors_is_left_unchanged() {
    let context = analyzed(TYPES);
    assert_eq!(expand(&context, "PairBox.b(x)").unwrap(), "PairBox.b(x)");
    assert_eq!(expand(&context, "Bare.Array.get(a, i)").unwrap(), "Bare.Array.get(a, i)");
}

#[rstest]
#[case("new Point", "(Point.initInstance(Parlang.alloc(12,4)))")]
#[case("var p = new Point;", "var p = (Point.initInstance(Parlang.alloc(12,4)));")]
#[case("new Pair", "(Parlang.alloc(16,8))")]
#[case("new int32.Array(7)", "(Parlang.alloc(4 * 7, 4))")]
#[case("new array(int32, 7)", "(Parlang.alloc(4 * 7, 4))")]
#[case("new Pair.Array(n)", "(Parlang.alloc(16 * n, 8))")]
#[case("new Point.Array(n + 1)", "(Parlang.alloc(4 * (n + 1), 4))")]
fn allocation_forms(#[case] input: &str, #[case] expected: &str) {
    let context = analyzed(TYPES);
    assert_eq!(expand(&context, input).unwrap(), expected);
}

#[test]
fn allocation_count_expands_recursively() {
    let context = analyzed(TYPES);
    assert_eq!(
        expand(&context, "new int32.Array(Point.x(p))").unwrap(),
        "(Parlang.alloc(4 * (_mem_int32[(p+4)>>2]), 4))"
    );
}

#[test]
fn unknown_new_target_is_a_hard_error() {
    let context = analyzed(TYPES);
    let error = expand(&context, "var d = new Widget;").unwrap_err();
    assert!(matches!(error, CompileError::UnknownNewTarget(_)));

    let error = expand(&context, "new array(Widget, 4)").unwrap_err();
    assert!(matches!(error, CompileError::UnknownNewTarget(_)));
}

#[test]
fn expansion_is_idempotent() {
    let context = analyzed(TYPES);
    for input in [
        "Point.x(p)",
        "Point.x.set(p, 10)",
        "Counter.add_hits(c, 1)",
        "Pair.array_get_x(a, i)",
        "new Point",
        "new int32.Array(7)",
        "PairBox.p(b)",
    ] {
        let once = expand(&context, input).unwrap();
        let twice = expand(&context, &once).unwrap();
        assert_eq!(once, twice, "second expansion of {input:?} changed the text");
    }
}
