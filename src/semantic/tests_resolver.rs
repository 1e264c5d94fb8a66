use crate::ast::*;
use crate::parser::{ParserConfig, parse_unit};
use crate::semantic::type_inference::{binary_type, common_numeric, literal_type};
use crate::semantic::{GapKind, ResolveGap, Resolver, resolve_unit};

/// Parse and resolve a unit, returning the tree and the resolution gaps
fn setup_resolved(src: &str) -> (Ast, Vec<ResolveGap>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ast = parse_unit(src, &ParserConfig::default()).expect("unit should parse");
    let gaps = resolve_unit(&mut ast);
    (ast, gaps)
}

fn find_decl(ast: &Ast, name: &str) -> DeclId {
    ast.ids()
        .find(|&id| ast.name_of(id).eq_ignore_ascii_case(name) && !ast.get(id).is_forward_class())
        .unwrap_or_else(|| panic!("no declaration named {}", name))
}

fn body_of<'a>(ast: &'a Ast, routine: &str) -> &'a [Stmt] {
    let unit = ast.unit().unwrap();
    let id = unit
        .implementation
        .iter()
        .copied()
        .find(|&id| ast.name_of(id).eq_ignore_ascii_case(routine) && ast.get(id).as_procedure().is_some())
        .unwrap_or_else(|| panic!("no routine named {}", routine));
    ast.get(id).as_procedure().unwrap().body.as_deref().unwrap()
}

fn assignment(stmt: &Stmt) -> (&Expr, &Expr) {
    match &stmt.kind {
        StmtKind::Assign { target, value } => (target, value),
        other => panic!("expected an assignment, got {:?}", other),
    }
}

#[test]
fn test_names_bind_to_declarations() {
    let (ast, gaps) = setup_resolved(
        "unit A;
interface
var Total: Integer;
function Twice(X: Integer): Integer;
implementation
function Twice(X: Integer): Integer;
var Tmp: Integer;
begin
  Tmp := X * 2;
  Total := Tmp;
  Result := Tmp;
end;
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);

    let body = body_of(&ast, "Twice");
    let (tmp, product) = assignment(&body[0]);
    assert_eq!(ast.name_of(tmp.decl().unwrap()), "Tmp");
    let ExprKind::Binary { lhs, .. } = &product.kind else {
        panic!("expected a product");
    };
    assert!(matches!(ast.get(lhs.decl().unwrap()).kind, DeclKind::Param(_)));
    assert_eq!(product.ty, Some(ExprType::Builtin(BuiltinType::Integer)));

    let (total, _) = assignment(&body[1]);
    assert_eq!(total.decl(), Some(find_decl(&ast, "Total")));

    let (result, _) = assignment(&body[2]);
    assert_eq!(result.decl(), None);
    assert_eq!(result.ty, Some(ExprType::Builtin(BuiltinType::Integer)));
}

#[test]
fn test_member_access_through_declared_type() {
    let (ast, gaps) = setup_resolved(
        "unit A;
interface
type
  TShape = class
  private
    FName: string;
  public
    property Name: string read FName;
  end;
  TCircle = class(TShape)
    Radius: Double;
  end;
implementation
procedure Show(C: TCircle);
var S: string;
begin
  S := C.Name;
  C.Radius := 2;
end;
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);

    let body = body_of(&ast, "Show");
    let (_, name) = assignment(&body[0]);
    let property = name.decl().expect("inherited property should bind");
    assert!(matches!(ast.get(property).kind, DeclKind::Property(_)));
    assert_eq!(name.ty, Some(ExprType::Builtin(BuiltinType::String)));

    let (radius, _) = assignment(&body[1]);
    assert_eq!(radius.decl(), Some(find_decl(&ast, "Radius")));
    assert_eq!(radius.ty, Some(ExprType::Builtin(BuiltinType::Double)));

    // property accessors bind to the fields they name
    let DeclKind::Property(prop) = &ast.get(property).kind else {
        unreachable!()
    };
    assert_eq!(prop.reader.as_ref().and_then(Expr::decl), Some(find_decl(&ast, "FName")));
}

#[test]
fn test_enum_constants_resolve_through_their_enum() {
    let (ast, gaps) = setup_resolved(
        "program P;
type TColor = (clRed, clGreen);
var C: TColor;
begin
  C := clGreen;
  C := TColor.clRed;
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);
    let color = find_decl(&ast, "TColor");
    let stmts = &ast.unit().unwrap().initialization;

    let (target, green) = assignment(&stmts[0]);
    assert_eq!(green.decl(), Some(find_decl(&ast, "clGreen")));
    assert_eq!(green.ty, Some(ExprType::Decl(color)));
    assert_eq!(target.ty, Some(ExprType::Decl(color)));

    let (_, red) = assignment(&stmts[1]);
    assert_eq!(red.decl(), Some(find_decl(&ast, "clRed")));
}

#[test]
fn test_method_body_sees_class_members() {
    let (ast, gaps) = setup_resolved(
        "unit A;
interface
type
  TCounter = class
    FValue: Integer;
    procedure Reset;
  end;
implementation
procedure TCounter.Reset;
begin
  FValue := 0;
  Self.FValue := 1;
end;
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);
    let counter = find_decl(&ast, "TCounter");
    let body = body_of(&ast, "Reset");

    let (field, _) = assignment(&body[0]);
    assert_eq!(field.decl(), Some(find_decl(&ast, "FValue")));

    let (member, _) = assignment(&body[1]);
    let ExprKind::Member { base, .. } = &member.kind else {
        panic!("expected a member access");
    };
    assert_eq!(base.ty, Some(ExprType::Decl(counter)));
    assert_eq!(member.decl(), Some(find_decl(&ast, "FValue")));
}

#[test]
fn test_references_bind_to_full_class_not_forward_stub() {
    let (ast, gaps) = setup_resolved(
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
    assert!(gaps.is_empty(), "{:?}", gaps);
    let node = find_decl(&ast, "TNode");
    assert!(!ast.get(node).is_forward_class());

    let first = find_decl(&ast, "First");
    let DeclKind::Var(var) = &ast.get(first).kind else {
        panic!("expected a field");
    };
    assert_eq!(var.type_ref.decl, Some(node));
}

#[test]
fn test_forward_stub_completed_in_implementation() {
    let (ast, _) = setup_resolved(
        "unit A;
interface
type
  THidden = class;
implementation
type
  THidden = class
    Secret: Integer;
  end;
end.",
    );
    let unit = ast.unit().unwrap();
    let named: Vec<_> = unit
        .interface
        .iter()
        .chain(&unit.implementation)
        .filter(|&&id| ast.name_of(id) == "THidden")
        .collect();
    assert_eq!(named.len(), 1);
    assert!(!ast.get(*named[0]).is_forward_class());
}

#[test]
fn test_unresolved_names_are_gaps_not_errors() {
    let (ast, gaps) = setup_resolved(
        "unit A;
interface
uses SysUtils;
implementation
procedure Run;
var S: TMissing;
begin
  Foo := Bar;
  Writeln(IntToStr(3));
  SysUtils.Beep;
end;
end.",
    );
    let described: Vec<String> = gaps.iter().map(|gap| gap.to_string()).collect();
    assert_eq!(
        described,
        vec![
            "unresolved type 'TMissing'",
            "unresolved name 'Foo'",
            "unresolved name 'Bar'",
        ]
    );
    assert_eq!(gaps[1].kind, GapKind::Name);
    assert_eq!(gaps[1].location.line, 8);

    let body = body_of(&ast, "Run");
    let (foo, _) = assignment(&body[0]);
    assert_eq!(foo.decl(), None);
    assert_eq!(foo.ty, None);
}

#[test]
fn test_unknown_member_of_known_class_is_reported() {
    let (_, gaps) = setup_resolved(
        "program P;
type TBox = class Width: Integer; end;
var B: TBox;
begin
  B.Height := 1;
end.",
    );
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].kind, GapKind::Member);
    assert_eq!(gaps[0].name, "Height");
}

#[test]
fn test_exception_variable_is_bound_in_handler() {
    let (ast, gaps) = setup_resolved(
        "program P;
type EFail = class Code: Integer; end;
var N: Integer;
begin
  try
    N := 1;
  except
    on E: EFail do N := E.Code;
  end;
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);
    let StmtKind::Try { handlers, .. } = &ast.unit().unwrap().initialization[0].kind else {
        panic!("expected a try statement");
    };
    let (_, code) = assignment(&handlers[0].body[0]);
    assert_eq!(code.decl(), Some(find_decl(&ast, "Code")));
    assert_eq!(handlers[0].exception_type.decl, Some(find_decl(&ast, "EFail")));
}

#[test]
fn test_inline_var_is_visible_after_declaration() {
    let (ast, gaps) = setup_resolved(
        "program P;
begin
  var Count := 2.5;
  Count := Count * 2;
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);
    let stmts = &ast.unit().unwrap().initialization;
    let (target, value) = assignment(&stmts[1]);
    assert_eq!(target.decl(), Some(find_decl(&ast, "Count")));
    assert_eq!(value.ty, Some(ExprType::Builtin(BuiltinType::Double)));
}

#[test]
fn test_constructor_call_yields_its_class() {
    let (ast, gaps) = setup_resolved(
        "program P;
type TThing = class constructor Create(N: Integer); end;
var T: TThing;
begin
  T := TThing.Create(1);
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);
    let (_, value) = assignment(&ast.unit().unwrap().initialization[0]);
    assert_eq!(value.ty, Some(ExprType::Decl(find_decl(&ast, "TThing"))));
}

#[test]
fn test_indexing_types() {
    let (ast, gaps) = setup_resolved(
        "program P;
type
  TRow = array[0..3] of Double;
  TTable = class
    function Get(I: Integer): string;
    property Items[I: Integer]: string read Get; default;
  end;
var R: TRow; T: TTable; S: string; C: Char; D: Double;
begin
  D := R[1];
  S := T[0];
  C := S[1];
end.",
    );
    assert!(gaps.is_empty(), "{:?}", gaps);
    let stmts = &ast.unit().unwrap().initialization;
    let types: Vec<_> = stmts.iter().map(|s| assignment(s).1.ty).collect();
    assert_eq!(
        types,
        vec![
            Some(ExprType::Builtin(BuiltinType::Double)),
            Some(ExprType::Builtin(BuiltinType::String)),
            Some(ExprType::Builtin(BuiltinType::Char)),
        ]
    );
}

#[test]
fn test_scope_guard_pops_on_drop() {
    let ast = parse_unit("unit A; interface implementation end.", &ParserConfig::default()).unwrap();
    let root = ast.root().unwrap();
    let mut resolver = Resolver::new();
    {
        let mut outer = resolver.enter(root);
        assert_eq!(outer.depth(), 1);
        {
            let inner = outer.enter(root);
            assert_eq!(inner.depth(), 2);
        }
        assert_eq!(outer.depth(), 1);
    }
    assert_eq!(resolver.depth(), 0);
}

#[test]
fn test_numeric_promotion() {
    let ast = Ast::new();
    let int = Some(ExprType::Builtin(BuiltinType::Integer));
    let int64 = Some(ExprType::Builtin(BuiltinType::Int64));
    let double = Some(ExprType::Builtin(BuiltinType::Double));
    let string = Some(ExprType::Builtin(BuiltinType::String));
    let boolean = Some(ExprType::Builtin(BuiltinType::Boolean));

    assert_eq!(binary_type(&ast, BinaryOp::Add, int, int64), int64);
    assert_eq!(binary_type(&ast, BinaryOp::Multiply, int64, double), double);
    assert_eq!(binary_type(&ast, BinaryOp::Divide, int, int), double);
    assert_eq!(binary_type(&ast, BinaryOp::IntDiv, int64, int), int64);
    assert_eq!(binary_type(&ast, BinaryOp::Add, string, int), string);
    assert_eq!(binary_type(&ast, BinaryOp::Less, double, int), boolean);
    assert_eq!(binary_type(&ast, BinaryOp::And, int, int), int);
    assert_eq!(binary_type(&ast, BinaryOp::And, boolean, boolean), boolean);
    assert_eq!(binary_type(&ast, BinaryOp::Subtract, int, None), None);
    assert_eq!(common_numeric(BuiltinType::String, BuiltinType::Integer), None);

    assert_eq!(literal_type(&ExprKind::Hex(255)), int);
    assert_eq!(literal_type(&ExprKind::Str("ab".into())), string);
    assert_eq!(literal_type(&ExprKind::Symbol(SpecialSymbol::Nil)), None);
}
