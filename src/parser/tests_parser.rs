use crate::ast::dumper::{AstDumper, expr_to_string};
use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::parser::{Parser, ParserConfig, parse_unit};

/// Helper function to parse a single expression and render it in prefix form
fn setup_expr(src: &str) -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut parser = Parser::new(src, ParserConfig::default());
    let expr = parser.require_value("value").expect("expression should parse");
    expr_to_string(&expr)
}

fn setup_unit(src: &str) -> Ast {
    let _ = env_logger::builder().is_test(true).try_init();
    parse_unit(src, &ParserConfig::default()).expect("unit should parse")
}

fn setup_unit_error(src: &str) -> ParseError {
    parse_unit(src, &ParserConfig::default()).expect_err("unit should not parse")
}

fn dump(src: &str) -> String {
    AstDumper::new(&setup_unit(src)).dump()
}

#[test]
fn test_precedence() {
    assert_eq!(setup_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
    assert_eq!(setup_expr("a or b and c"), "(or a (and b c))");
    assert_eq!(setup_expr("a = 1 or b < 2"), "(or (= a 1) (< b 2))");
    assert_eq!(setup_expr("x as TFoo is TBar"), "(is (as x TFoo) TBar)");
}

#[test]
fn test_equal_precedence_groups_from_left() {
    assert_eq!(setup_expr("a - b - c"), "(- (- a b) c)");
    assert_eq!(setup_expr("a * b div c mod d"), "(mod (div (* a b) c) d)");
}

#[test]
fn test_unary_operators() {
    assert_eq!(setup_expr("-a * b"), "(* (- a) b)");
    assert_eq!(setup_expr("not a and b"), "(and (not a) b)");
    assert_eq!(setup_expr("@Handler"), "(@ Handler)");
}

#[test]
fn test_suffix_chain() {
    assert_eq!(setup_expr("a.b(c, 1)[i]^.d"), "a.b(c, 1)[i]^.d");
    assert_eq!(setup_expr("TFoo.Create"), "TFoo.Create");
    assert_eq!(setup_expr("f()"), "f()");
}

#[test]
fn test_suffix_chain_owns_its_base() {
    let mut parser = Parser::new("a.b(c)", ParserConfig::default());
    let expr = parser.require_value("value").unwrap();
    let ExprKind::Call { base, args } = &expr.kind else {
        panic!("expected a call, got {:?}", expr.kind);
    };
    assert_eq!(args.len(), 1);
    let ExprKind::Member { base: root, name } = &base.kind else {
        panic!("expected a member access, got {:?}", base.kind);
    };
    assert_eq!(name.name, "b");
    assert!(root.is_name("A"));
}

#[test]
fn test_literals() {
    assert_eq!(setup_expr("'it''s'"), "'it''s'");
    assert_eq!(setup_expr("'a'#13#$0A'b'"), "'a\r\nb'");
    assert_eq!(setup_expr("$FF"), "$FF");
    assert_eq!(setup_expr("1.5e3"), "1500.0");
    assert_eq!(setup_expr("[1, 3..5]"), "[1, (.. 3 5)]");
    assert_eq!(setup_expr("nil"), "nil");
    assert_eq!(setup_expr("(a, b)"), "(paren a, b)");
}

#[test]
fn test_interval_is_not_a_float() {
    assert_eq!(setup_expr("1..10"), "(.. 1 10)");
}

#[test]
fn test_reserved_words_are_not_values() {
    let mut parser = Parser::new("end", ParserConfig::default());
    assert!(parser.value().unwrap().is_none());
    let mut parser = Parser::new("begin", ParserConfig::default());
    assert!(parser.value().unwrap().is_none());
}

#[test]
fn test_missing_operand_is_an_error() {
    let mut parser = Parser::new("1 +", ParserConfig::default());
    let err = parser.value().unwrap_err();
    assert!(err.to_string().contains("binary operand"), "{}", err);
}

#[test]
fn test_minimal_unit() {
    let out = dump("unit Empty;\ninterface\nimplementation\nend.");
    insta::assert_snapshot!(out, @r"
    unit Empty
      interface
      implementation
    ");
}

#[test]
fn test_unit_declarations() {
    let out = dump(
        "unit Shapes;
interface
uses SysUtils, Classes;
type
  TColor = (clRed, clGreen = 5, clBlue);
  TColors = set of TColor;
  PInt = ^Integer;
  TName = string[40];
  TGrid = array[0..9, 0..9] of Integer;
  TPoint = packed record X, Y: Integer; end;
  TNotify = procedure(Sender: TObject) of object;
  TShapeClass = class of TShape;
const
  Max = 10;
var
  Count: Integer = 0;
implementation
end.",
    );
    insta::assert_snapshot!(out, @r"
    unit Shapes
      interface
        uses SysUtils, Classes
        type TColor = (clRed, clGreen, clBlue)
        type TColors = set of TColor
        type PInt = ^Integer
        type TName = string[40]
        type TGrid = array[(.. 0 9), (.. 0 9)] of Integer
        type TPoint = packed record
          var X: Integer
          var Y: Integer
        type TNotify = procedure(Sender: TObject) of object
        type TShapeClass = class of TShape
        const Max = 10
        var Count: Integer = 0
      implementation
    ");
}

#[test]
fn test_class_declaration() {
    let out = dump(
        "unit Shapes;
interface
type
  TShape = class(TObject, IShape)
  private
    FName: string;
    function GetArea: Double; virtual; abstract;
  public
    constructor Create(const AName: string);
    class function Count: Integer;
    property Name: string read FName write FName;
    property Items[Index: Integer]: TShape read GetItem; default;
  end;
implementation
end.",
    );
    insta::assert_snapshot!(out, @r"
    unit Shapes
      interface
        type TShape = class(TObject, IShape)
          var FName: string
          function GetArea(): Double [virtual abstract]
          constructor Create(const AName: string)
          function Count(): Integer [static]
          property Name: string read FName write FName
          property Items[Index: Integer]: TShape read GetItem default
      implementation
    ");
}

#[test]
fn test_member_visibility() {
    let ast = setup_unit(
        "unit A; interface type T = class private F: Integer; public procedure P; end; implementation end.",
    );
    let unit = ast.unit().unwrap();
    let class = ast.get(unit.interface[0]).as_class().unwrap();
    assert_eq!(ast.get(class.members[0]).visibility, Visibility::Private);
    assert_eq!(ast.get(class.members[1]).visibility, Visibility::Public);
}

#[test]
fn test_forward_class_reconciliation() {
    let ast = setup_unit(
        "unit A;
interface
type
  TNode = class;
  TList = class
    First: TNode;
  end;
  TNode = class
    Next: TNode;
  end;
implementation
end.",
    );
    let unit = ast.unit().unwrap();
    let nodes: Vec<_> = unit
        .interface
        .iter()
        .filter(|&&id| ast.name_of(id) == "TNode")
        .collect();
    assert_eq!(nodes.len(), 1);
    assert!(!ast.get(*nodes[0]).is_forward_class());
    assert_eq!(unit.interface.len(), 2);
}

#[test]
fn test_routine_bodies() {
    let out = dump(
        "unit Calc;
interface
function Twice(X: Integer): Integer;
implementation
function Twice(X: Integer): Integer;
var
  Tmp: Integer;
begin
  Tmp := X * 2;
  Result := Tmp;
end;

procedure TCalc.Reset;
begin
  inherited;
  FValue := 0;
end;
end.",
    );
    insta::assert_snapshot!(out, @r"
    unit Calc
      interface
        function Twice(X: Integer): Integer
      implementation
        function Twice(X: Integer): Integer
          var Tmp: Integer
          begin
            Tmp := (* X 2)
            Result := Tmp
        procedure TCalc.Reset()
          begin
            inherited
            FValue := 0
    ");
}

#[test]
fn test_statements() {
    let out = dump(
        "program Demo;
var I: Integer;
begin
  if A then B else if C then D;
  for I := 10 downto 1 do Writeln(I);
  while I < 5 do begin Inc(I); end;
  repeat Dec(I) until I = 0;
  case I of
    1, 2: Foo;
    3..5: Bar;
  else
    Baz;
  end;
  with Obj, Other do Run;
  var X := 5;
  raise Exception.Create('boom');
end.",
    );
    insta::assert_snapshot!(out, @r"
    program Demo
      interface
      implementation
        var I: Integer
      initialization
        if A
          call B
        else
          if C
            call D
        for I := 10 downto 1
          call Writeln(I)
        while (< I 5)
          begin
            call Inc(I)
        repeat
          call Dec(I)
        until (= I 0)
        case I
          1, 2:
            call Foo
          (.. 3 5):
            call Bar
          else
            call Baz
        with Obj, Other
          call Run
        var X = 5
        raise Exception.Create('boom')
    ");
}

#[test]
fn test_try_shapes() {
    let out = dump(
        "program T;
begin
  try
    Work;
  except
    on E: EInOutError do Log(E.Message);
    on EAbort do ;
  else
    Recover;
  end;
  try Work; except Cleanup; end;
  try Work; finally Done; end;
end.",
    );
    insta::assert_snapshot!(out, @r"
    program T
      interface
      implementation
      initialization
        try
          call Work
        on E: EInOutError
          call Log(E.Message)
        on EAbort
        else
          call Recover
        try
          call Work
        except
          call Cleanup
        try
          call Work
        finally
          call Done
    ");
}

#[test]
fn test_empty_statements_are_skipped() {
    let ast = setup_unit("program P; begin ;; A;; ; B; end.");
    assert_eq!(ast.unit().unwrap().initialization.len(), 2);
}

#[test]
fn test_external_and_forward_have_no_body() {
    let ast = setup_unit(
        "unit A; interface implementation
procedure Beep(Freq: Integer); stdcall; external 'kernel32.dll' name 'Beep';
procedure Later; forward;
procedure Later; begin end;
end.",
    );
    let unit = ast.unit().unwrap();
    let beep = ast.get(unit.implementation[0]).as_procedure().unwrap();
    assert!(beep.body.is_none());
    assert_eq!(beep.external_lib.as_deref(), Some("kernel32.dll"));
    assert!(beep.modifiers.contains(ProcModifiers::STDCALL | ProcModifiers::EXTERNAL));
    let later = ast.get(unit.implementation[1]).as_procedure().unwrap();
    assert!(later.body.is_none());
    assert!(ast.get(unit.implementation[2]).as_procedure().unwrap().body.is_some());
}

#[test]
fn test_syntax_error_carries_line_text() {
    let err = setup_unit_error("unit A;\ninterface\nvar X Integer;\nimplementation\nend.");
    let ParseError::Syntax { line_text, location, .. } = &err else {
        panic!("expected a syntax error, got {:?}", err);
    };
    assert_eq!(location.line, 3);
    assert_eq!(line_text, "var X Integer;");
}

#[test]
fn test_missing_unit_header() {
    let err = setup_unit_error("library X;");
    assert!(err.to_string().contains("'unit' or 'program'"), "{}", err);
}

#[test]
fn test_unterminated_comment() {
    let err = setup_unit_error("unit A; { never closed");
    assert!(matches!(err, ParseError::UnterminatedComment { .. }));
}

#[test]
fn test_nesting_limit() {
    let config = ParserConfig { max_depth: 16 };
    let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
    let mut parser = Parser::new(&deep, config);
    let err = parser.value().unwrap_err();
    assert!(matches!(err, ParseError::NestingTooDeep { limit: 16, .. }));

    let shallow = format!("{}1{}", "(".repeat(3), ")".repeat(3));
    let mut parser = Parser::new(&shallow, ParserConfig { max_depth: 16 });
    assert!(parser.value().unwrap().is_some());
}

#[test]
fn test_long_operator_run_hits_nesting_limit() {
    let long = vec!["1"; 10_000].join(" + ");
    let mut parser = Parser::new(&long, ParserConfig::default());
    let err = parser.value().unwrap_err();
    assert!(matches!(err, ParseError::NestingTooDeep { limit: 256, .. }), "{:?}", err);

    let short = vec!["1"; 100].join(" + ");
    let mut parser = Parser::new(&short, ParserConfig::default());
    assert!(parser.value().unwrap().is_some());
}

#[test]
fn test_long_suffix_chain_hits_nesting_limit() {
    let chain = format!("a{}", ".b".repeat(10_000));
    let mut parser = Parser::new(&chain, ParserConfig::default());
    let err = parser.value().unwrap_err();
    assert!(matches!(err, ParseError::NestingTooDeep { .. }), "{:?}", err);
}

#[test]
fn test_operators_stack_on_nested_operands() {
    // each parenthesised operand nests two levels; the run must not restart from zero
    let config = ParserConfig { max_depth: 16 };
    let nested = format!("{}1{} + 2 + 3 + 4 + 5", "(".repeat(5), ")".repeat(5));
    let mut parser = Parser::new(&nested, config.clone());
    assert!(matches!(parser.value().unwrap_err(), ParseError::NestingTooDeep { .. }));

    let mut parser = Parser::new("1 + 2 + 3 + 4 + 5", config.clone());
    assert!(parser.value().unwrap().is_some());

    let mut parser = Parser::new("(1) + 2 + 3", config);
    assert_eq!(
        expr_to_string(&parser.require_value("value").unwrap()),
        "(+ (+ (paren 1) 2) 3)"
    );
}

#[test]
fn test_long_expression_in_unit_is_an_error_not_a_crash() {
    let src = format!(
        "unit P;\ninterface\nimplementation\nprocedure Run;\nvar X: Integer;\nbegin\n  X := {};\nend;\nend.",
        vec!["1"; 10_000].join(" + ")
    );
    let err = setup_unit_error(&src);
    assert!(matches!(err, ParseError::NestingTooDeep { .. }), "{:?}", err);
    assert_eq!(err.location().line, 7);
}
