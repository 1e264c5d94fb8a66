use crate::codegen::*;
use crate::lowering::lower_unit;
use crate::parser::{ParserConfig, parse_unit};
use crate::semantic::resolve_unit;
use crate::target::*;

/// Parse, resolve, lower and emit a unit with the default rewriter
fn setup_emitted(src: &str) -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ast = parse_unit(src, &ParserConfig::default()).expect("unit should parse");
    resolve_unit(&mut ast);
    let lowered = lower_unit(&ast);
    emit(&lowered.tree, &EmitConfig::default()).expect("tree should emit")
}

fn has_line(text: &str, expected: &str) -> bool {
    text.lines().any(|line| line.trim() == expected)
}

fn assert_lines(text: &str, expected: &[&str]) {
    for line in expected {
        assert!(has_line(text, line), "missing line `{}` in:\n{}", line, text);
    }
}

fn identity() -> EmitConfig {
    EmitConfig::default().with_rewriter(IdentityRewriter)
}

fn codes_text(stmts: &[CsStmt], style: CodesStyle) -> String {
    let tree = CsTree::new();
    let config = identity();
    let mut emitter = Emitter::new(&tree, &config);
    emitter.codes(stmts, style).expect("statements should emit");
    emitter.finish()
}

fn call_stmt(name: &str) -> CsStmt {
    CsStmt::Expr(CsExpr::call(CsExpr::name(name), Vec::new()))
}

fn param(tree: &mut CsTree, name: &str, ty: &str) -> TargetDeclId {
    tree.push(CsDecl::new(
        name,
        CsDeclKind::Param(CsParam {
            mode: ParamMode::Value,
            ty: Some(CsType::named(ty)),
            default: None,
        }),
    ))
}

#[test]
fn test_codes_style_layouts() {
    let one = [call_stmt("Run")];
    assert_eq!(codes_text(&one, CodesStyle::Block), "{\n    Run();\n}\n");
    assert_eq!(codes_text(&one, CodesStyle::BlockOrIndentedLine), "    Run();\n");
    assert_eq!(codes_text(&one, CodesStyle::BlockOrUnindentedLine), "Run();\n");
    assert_eq!(codes_text(&one, CodesStyle::LinesOnly), "Run();\n");

    let two = [call_stmt("Run"), call_stmt("Stop")];
    let braced = "{\n    Run();\n    Stop();\n}\n";
    assert_eq!(codes_text(&two, CodesStyle::Block), braced);
    assert_eq!(codes_text(&two, CodesStyle::BlockOrIndentedLine), braced);
    assert_eq!(codes_text(&two, CodesStyle::BlockOrUnindentedLine), braced);
    assert_eq!(codes_text(&two, CodesStyle::LinesOnly), "Run();\nStop();\n");

    assert_eq!(codes_text(&[], CodesStyle::Block), "{\n}\n");
    assert_eq!(codes_text(&[], CodesStyle::BlockOrIndentedLine), "    ;\n");
    assert_eq!(codes_text(&[], CodesStyle::LinesOnly), ";\n");

    // a lone block is never wrapped twice
    let nested = [CsStmt::Block(vec![call_stmt("Run"), call_stmt("Stop")])];
    assert_eq!(codes_text(&nested, CodesStyle::LinesOnly), braced);
    assert_eq!(codes_text(&nested, CodesStyle::Block), braced);
}

#[test]
fn test_emit_class_tree() {
    let mut tree = CsTree::new();
    let a = tree.push(CsDecl::new("kA", CsDeclKind::EnumConst));
    let b = tree.push(CsDecl::new("kB", CsDeclKind::EnumConst));
    let kind = tree.push(
        CsDecl::new("TKind", CsDeclKind::Enum { consts: vec![a, b] }).with_visibility(CsVisibility::Public),
    );
    let alias = tree.push(CsDecl::new(
        "TName",
        CsDeclKind::Alias {
            target: CsType::named("string"),
        },
    ));
    let field = tree.push(
        CsDecl::new(
            "FSize",
            CsDeclKind::Field(CsField {
                flags: MemberFlags::empty(),
                ty: Some(CsType::named("int")),
                initial: None,
            }),
        )
        .with_visibility(CsVisibility::Private),
    );
    let property = tree.push(
        CsDecl::new(
            "Size",
            CsDeclKind::Property(CsProperty {
                flags: MemberFlags::empty(),
                ty: Some(CsType::named("int")),
                params: Vec::new(),
                getter: Some(CsExpr::name("FSize")),
                setter: Some(Box::new(CsStmt::Assign {
                    target: CsExpr::name("FSize"),
                    value: CsExpr::name("value"),
                })),
            }),
        )
        .with_visibility(CsVisibility::Public),
    );
    let size = param(&mut tree, "ASize", "int");
    let ctor = tree.push(
        CsDecl::new(
            "Create",
            CsDeclKind::Method(CsMethod {
                kind: MethodKind::Constructor,
                flags: MemberFlags::empty(),
                params: vec![size],
                return_type: None,
                base_call: Some(vec![CsExpr::name("ASize")]),
                extern_lib: None,
                body: Some(vec![CsStmt::Assign {
                    target: CsExpr::name("FSize"),
                    value: CsExpr::name("ASize"),
                }]),
            }),
        )
        .with_visibility(CsVisibility::Public),
    );
    let area = tree.push(
        CsDecl::new(
            "Area",
            CsDeclKind::Method(CsMethod {
                kind: MethodKind::Normal,
                flags: MemberFlags::VIRTUAL,
                params: Vec::new(),
                return_type: Some(CsType::named("int")),
                base_call: None,
                extern_lib: None,
                body: Some(vec![CsStmt::Return(Some(CsExpr::Binary {
                    op: CsBinaryOp::Mul,
                    lhs: Box::new(CsExpr::name("FSize")),
                    rhs: Box::new(CsExpr::name("FSize")),
                }))]),
            }),
        )
        .with_visibility(CsVisibility::Public),
    );
    let class = tree.push(
        CsDecl::new(
            "TBox",
            CsDeclKind::Class(CsClass {
                kind: ClassKind::Class,
                bases: vec![CsType::named("TBase")],
                members: vec![field, property, ctor, area],
            }),
        )
        .with_visibility(CsVisibility::Public),
    );
    let root = tree.push(CsDecl::new(
        "Shapes",
        CsDeclKind::Namespace(CsNamespace {
            usings: vec!["System".to_string()],
            members: vec![alias, kind, class],
        }),
    ));
    tree.set_root(root);

    let text = emit(&tree, &identity()).expect("tree should emit");
    insta::assert_snapshot!(text, @r"
    namespace Shapes
    {
        using System;
        using TName = string;

        public enum TKind { kA, kB }

        public class TBox : TBase
        {
            private int FSize;
            public int Size { get { return FSize; } set { FSize = value; } }

            public TBox(int ASize) : base(ASize)
            {
                FSize = ASize;
            }

            public virtual int Area()
            {
                return FSize * FSize;
            }
        }
    }
    ");
}

#[test]
fn test_missing_root_is_an_error() {
    let tree = CsTree::new();
    let err = emit(&tree, &EmitConfig::default()).unwrap_err();
    assert!(matches!(err, EmitError::MissingRoot));
}

#[test]
fn test_misplaced_declaration_is_an_error() {
    let mut tree = CsTree::new();
    let stray = param(&mut tree, "X", "int");
    let root = tree.push(CsDecl::new(
        "Broken",
        CsDeclKind::Namespace(CsNamespace {
            usings: Vec::new(),
            members: vec![stray],
        }),
    ));
    tree.set_root(root);

    let err = emit(&tree, &EmitConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "parameter 'X' cannot appear in a namespace");
}

#[test]
fn test_expression_rendering() {
    let sum = CsExpr::Binary {
        op: CsBinaryOp::Add,
        lhs: Box::new(CsExpr::name("a")),
        rhs: Box::new(CsExpr::name("b")),
    };
    let product = CsExpr::Binary {
        op: CsBinaryOp::Mul,
        lhs: Box::new(sum.clone()),
        rhs: Box::new(CsExpr::Int(2)),
    };
    let difference = CsExpr::Binary {
        op: CsBinaryOp::Sub,
        lhs: Box::new(CsExpr::name("x")),
        rhs: Box::new(sum.clone()),
    };
    let stmts = [
        CsStmt::Expr(product),
        CsStmt::Expr(difference),
        CsStmt::Expr(CsExpr::Unary {
            op: CsUnaryOp::Minus,
            operand: Box::new(CsExpr::Unary {
                op: CsUnaryOp::Minus,
                operand: Box::new(CsExpr::name("y")),
            }),
        }),
        CsStmt::Expr(CsExpr::Str("say \"hi\"\n".to_string())),
        CsStmt::Expr(CsExpr::Hex(255)),
        CsStmt::Expr(CsExpr::Float(2.0)),
        CsStmt::Expr(CsExpr::Float(1e20)),
        CsStmt::Expr(CsExpr::Float(-2.5e16)),
        CsStmt::Expr(CsExpr::Float(0.25)),
        CsStmt::Expr(CsExpr::call(
            CsExpr::member(CsExpr::name("TList"), "Create"),
            vec![CsExpr::Int(4)],
        )),
        CsStmt::Expr(CsExpr::Cast {
            ty: CsType::named("int"),
            value: Box::new(CsExpr::Unary {
                op: CsUnaryOp::Minus,
                operand: Box::new(CsExpr::name("z")),
            }),
        }),
        CsStmt::Expr(CsExpr::Belongs {
            value: Box::new(CsExpr::name("c")),
            set: Box::new(CsExpr::SetOf(vec![CsExpr::Range {
                lo: Box::new(CsExpr::Int(1)),
                hi: Box::new(CsExpr::Int(9)),
            }])),
        }),
    ];
    insta::assert_snapshot!(codes_text(&stmts, CodesStyle::LinesOnly), @r#"
    (a + b) * 2;
    x - (a + b);
    -(-y);
    "say \x0022hi\x0022\x000A";
    0xFF;
    2.0;
    1e20;
    -2.5e16;
    0.25;
    new TList(4);
    (int)(-z);
    Belongs(c, Set(Range(1, 9)));
    "#);
}

#[test]
fn test_control_flow_statements() {
    let text = setup_emitted(
        "unit Flow;
interface
function Grade(N: Integer): string;
implementation
function Grade(N: Integer): string;
var
  I: Integer;
begin
  if N > 90 then
    Grade := 'A'
  else if N > 50 then
    Grade := 'B'
  else
    Grade := 'C';
  for I := 10 downto 1 do
    N := N - 1;
  repeat
    Inc(N);
  until N > 3;
  case N of
    1..3: Exit('low');
    4: N := 0;
  else
    N := 1;
  end;
end;
end.",
    );
    assert_lines(
        &text,
        &[
            "public static string Grade(int N)",
            "string Result = default;",
            "int I;",
            "if (N > 90)",
            "Result = \"A\";",
            "else if (N > 50)",
            "else",
            "for (I = 10; I >= 1; I--)",
            "N = N - 1;",
            "do",
            "N++;",
            "while (!(N > 3));",
            "switch (N)",
            "case >= 1 and <= 3:",
            "return \"low\";",
            "case 4:",
            "N = 0;",
            "break;",
            "default:",
            "return Result;",
        ],
    );
}

#[test]
fn test_break_from_case_jumps_past_the_loop() {
    let text = setup_emitted(
        "unit Loops;
interface
procedure Drain(X: Integer);
implementation
procedure Drain(X: Integer);
begin
  while True do
    case X of
      1: Break;
    else
      X := X - 1;
    end;
end;
end.",
    );
    assert_lines(
        &text,
        &["while (true)", "switch (X)", "case 1:", "goto break1;", "default:", "X = X - 1;", "break1: ;"],
    );
    // the jump ends the case section on its own
    let after_goto = text
        .lines()
        .skip_while(|line| line.trim() != "goto break1;")
        .nth(1)
        .map(str::trim);
    assert_eq!(after_goto, Some("default:"));
}

#[test]
fn test_try_and_nested_routines() {
    let text = setup_emitted(
        "unit Guard;
interface
procedure Run;
implementation
procedure Run;
  function Twice(X: Integer): Integer;
  begin
    Twice := X * 2;
  end;
begin
  try
    Twice(4);
  except
    on E: Exception do
      raise;
  end;
  try
    Twice(5);
  finally
    Twice(6);
  end;
end;
end.",
    );
    assert_lines(
        &text,
        &[
            "Func<int, int> Twice = (int X) =>",
            "int Result = default;",
            "Result = X * 2;",
            "};",
            "try",
            "catch (Exception E)",
            "throw;",
            "finally",
            "Twice(6);",
        ],
    );
}

#[test]
fn test_emission_is_deterministic() {
    let src = "unit Stable;
interface
uses SysUtils;
type
  TColor = (clRed, clGreen);
  TShape = class
  private
    FColor: TColor;
  public
    property Color: TColor read FColor write FColor;
  end;
var
  Count: Integer;
implementation
initialization
  Count := 0;
end.";
    let first = setup_emitted(src);
    let second = setup_emitted(src);
    assert_eq!(first, second);
    assert_lines(
        &first,
        &[
            "namespace Stable",
            "using SysUtils;",
            "public enum TColor { clRed, clGreen }",
            "public class TShape",
            "private TColor FColor;",
            "public TColor Color { get { return FColor; } set { FColor = value; } }",
            "public static class Stable",
            "public static int Count;",
            "static Stable()",
            "Count = 0;",
        ],
    );
}

#[test]
fn test_table_rewriter_rules() {
    let rewriter = TableRewriter::default();
    let cases = [
        ("Length(s)", "s.Length"),
        ("Inc(Count)", "Count++"),
        ("Dec(Count, 2)", "Count -= 2"),
        ("Copy(Name, 2, Length(Name) - 1)", "Name.Substring(2 - 1, Name.Length - 1)"),
        (
            r#"StringReplace(s, ",", ".", Set(rfReplaceAll))"#,
            r#"s.Replace(",", ".")"#,
        ),
        (
            r#"SameText(a, "x")"#,
            r#"a.Equals("x", StringComparison.OrdinalIgnoreCase)"#,
        ),
        ("IfThen(a < b, a, b)", "(a < b ? a : b)"),
        ("Abs(x - y)", "Math.Abs(x - y)"),
        ("FreeAndNil(List)", "List = null"),
        ("List.Free", "List = null"),
        ("GetMem(P, 16)", "P = new byte[16]"),
        ("!!Ready", "Ready"),
        ("Self.Count", "this.Count"),
        ("new TStringList()", "new List<string>()"),
        ("TFileStream", "System.IO.FileStream"),
        // member calls and literals are left alone
        ("s.Copy(1, 2)", "s.Copy(1, 2)"),
        (r#"Log("Length(s)")"#, r#"Log("Length(s)")"#),
        // an arity no rule knows keeps the call
        ("Length(a, b)", "Length(a, b)"),
    ];
    for (input, expected) in cases {
        assert_eq!(rewriter.rewrite(input), expected, "rewriting `{}`", input);
    }
}

#[test]
fn test_first_matching_rule_wins() {
    let rewriter = TableRewriter::empty()
        .with_call("Twice", |args| args.first().map(|x| format!("2 * {}", x)))
        .with_call("Twice", |args| args.first().map(|x| format!("{} + {}", x, x)));
    assert_eq!(rewriter.rewrite("Twice(n)"), "2 * n");
    assert_eq!(IdentityRewriter.rewrite("Length(s)"), "Length(s)");
}

#[test]
fn test_split_params() {
    assert_eq!(
        split_params(r#"a, f(b, c), "x,y", Set(1, 2)"#),
        vec!["a", "f(b, c)", r#""x,y""#, "Set(1, 2)"]
    );
    assert!(split_params("").is_empty());
    assert_eq!(split_params("x"), vec!["x"]);
}
