use crate::lowering::{Lowered, lower_unit};
use crate::parser::{ParserConfig, parse_unit};
use crate::semantic::resolve_unit;
use crate::target::*;

/// Parse, resolve and lower a unit
fn setup_lowered(src: &str) -> Lowered {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ast = parse_unit(src, &ParserConfig::default()).expect("unit should parse");
    resolve_unit(&mut ast);
    lower_unit(&ast)
}

fn namespace(tree: &CsTree) -> &CsNamespace {
    match &tree.get(tree.root().unwrap()).kind {
        CsDeclKind::Namespace(ns) => ns,
        other => panic!("root is not a namespace: {:?}", other),
    }
}

fn class<'a>(tree: &'a CsTree, name: &str) -> &'a CsClass {
    namespace(tree)
        .members
        .iter()
        .find_map(|&id| {
            let decl = tree.get(id);
            match &decl.kind {
                CsDeclKind::Class(class) if decl.name == name => Some(class),
                _ => None,
            }
        })
        .unwrap_or_else(|| panic!("no class named {}", name))
}

fn method<'a>(tree: &'a CsTree, class_name: &str, name: &str) -> &'a CsMethod {
    class(tree, class_name)
        .members
        .iter()
        .map(|&id| tree.get(id))
        .find(|decl| decl.name == name)
        .and_then(CsDecl::as_method)
        .unwrap_or_else(|| panic!("no method {}.{}", class_name, name))
}

fn body<'a>(tree: &'a CsTree, class_name: &str, name: &str) -> &'a [CsStmt] {
    method(tree, class_name, name).body.as_deref().expect("method has a body")
}

fn is_name(expr: &CsExpr, name: &str) -> bool {
    matches!(expr, CsExpr::Name(n) if n == name)
}

#[test]
fn test_pending_references_are_solved() {
    let lowered = setup_lowered(
        "unit Nodes;
interface
type
  TKind = (kLeaf, kBranch);
  TNode = class;
  TNodeClass = class of TNode;
  TGrid = array[0..3] of Integer;
  TNode = class
    Next: TNode;
    Kind: TKind;
    Meta: TNodeClass;
    Cells: TGrid;
  end;
implementation
end.",
    );
    let tree = &lowered.tree;

    let mut seen = Vec::new();
    for slot in tree.slots() {
        seen.push(slot.hint.as_str());
        match slot.hint.as_str() {
            "TNode" | "TKind" => {
                let target = slot.target.expect("converted declaration is solved");
                assert_eq!(tree.get(target).name, slot.hint);
            }
            "TNodeClass" | "TGrid" => assert_eq!(slot.target, None),
            other => panic!("unexpected slot {}", other),
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, ["TGrid", "TKind", "TNode", "TNodeClass"]);

    let gaps: Vec<String> = lowered.gaps.iter().map(ToString::to_string).collect();
    assert_eq!(
        gaps,
        ["no translation for metaclass TNodeClass", "no translation for array type TGrid"]
    );
}

#[test]
fn test_with_locals_are_unique() {
    let lowered = setup_lowered(
        "unit W;
interface
type
  TPoint = record
    X, Y: Integer;
  end;
procedure Move(var A, B: TPoint);
implementation
procedure Move(var A, B: TPoint);
begin
  with A do
    X := 1;
  with B do
  begin
    with A do
      Y := 2;
  end;
end;
end.",
    );
    let stmts = body(&lowered.tree, "W", "Move");

    let locals: Vec<&str> = stmts
        .iter()
        .filter_map(|stmt| match stmt {
            CsStmt::Local { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(locals, ["with1", "with2", "with3"]);

    // each local is followed by its inlined body
    assert!(matches!(&stmts[0], CsStmt::Local { value: Some(v), ty: Some(_), .. } if is_name(v, "A")));
    assert!(matches!(&stmts[1], CsStmt::Assign { target, .. } if is_name(target, "X")));
    assert!(matches!(&stmts[2], CsStmt::Local { value: Some(v), .. } if is_name(v, "B")));
    assert!(matches!(&stmts[3], CsStmt::Local { value: Some(v), .. } if is_name(v, "A")));
    assert!(matches!(&stmts[4], CsStmt::Assign { target, .. } if is_name(target, "Y")));
    assert_eq!(stmts.len(), 5);
}

#[test]
fn test_function_result_holder() {
    let lowered = setup_lowered(
        "unit F;
interface
function Clamp(V: Integer): Integer;
implementation
function Clamp(V: Integer): Integer;
begin
  if V < 0 then
    Exit;
  Clamp := V;
end;
end.",
    );
    let tree = &lowered.tree;
    let stmts = body(tree, "F", "Clamp");

    let CsStmt::Local { name, ty, .. } = &stmts[0] else {
        panic!("expected the result holder first, got {:?}", stmts[0]);
    };
    assert_eq!(name, "Result");
    assert_eq!(tree.type_name(ty.as_ref().unwrap()), "int");

    let CsStmt::If { then_branch, .. } = &stmts[1] else {
        panic!("expected an if");
    };
    assert!(matches!(&then_branch[..], [CsStmt::Return(Some(v))] if is_name(v, "Result")));
    // assigning to the function's name sets the holder
    assert!(matches!(&stmts[2], CsStmt::Assign { target, .. } if is_name(target, "Result")));
    assert!(matches!(stmts.last(), Some(CsStmt::Return(Some(v))) if is_name(v, "Result")));
}

#[test]
fn test_procedure_exit_returns_nothing() {
    let lowered = setup_lowered(
        "unit P;
interface
procedure Stop(Flag: Boolean);
implementation
procedure Stop(Flag: Boolean);
begin
  while True do
  begin
    if Flag then Break;
    Exit;
  end;
end;
end.",
    );
    let stmts = body(&lowered.tree, "P", "Stop");
    assert_eq!(stmts.len(), 1);
    let CsStmt::While { body, .. } = &stmts[0] else {
        panic!("expected a loop");
    };
    let [CsStmt::Block(inner)] = &body[..] else {
        panic!("expected a block");
    };
    assert!(matches!(&inner[0], CsStmt::If { then_branch, .. } if matches!(then_branch[..], [CsStmt::Break])));
    assert!(matches!(inner[1], CsStmt::Return(None)));
}

#[test]
fn test_inherited_by_routine_kind() {
    let lowered = setup_lowered(
        "unit I;
interface
type
  TBase = class
    constructor Create(A: Integer); virtual;
    destructor Destroy; override;
    procedure Paint(Fast: Boolean); virtual;
  end;
  TChild = class(TBase)
    Size: Integer;
    constructor Create(A: Integer); override;
    destructor Destroy; override;
    procedure Paint(Fast: Boolean); override;
  end;
implementation
constructor TChild.Create(A: Integer);
begin
  inherited Create(A + 1);
  Size := A;
end;
destructor TChild.Destroy;
begin
  inherited;
end;
procedure TChild.Paint(Fast: Boolean);
begin
  inherited;
end;
end.",
    );
    let tree = &lowered.tree;

    let create = method(tree, "TChild", "Create");
    assert_eq!(create.kind, MethodKind::Constructor);
    let base_call = create.base_call.as_ref().expect("inherited becomes the base call");
    assert!(matches!(&base_call[..], [CsExpr::Binary { op: CsBinaryOp::Add, .. }]));
    assert_eq!(create.body.as_ref().unwrap().len(), 1);

    let destroy = method(tree, "TChild", "Destroy");
    assert!(destroy.body.as_ref().unwrap().is_empty());
    assert!(destroy.base_call.is_none());

    let paint = body(tree, "TChild", "Paint");
    let [CsStmt::Expr(CsExpr::Call { callee, args })] = paint else {
        panic!("expected a base call, got {:?}", paint);
    };
    assert!(matches!(&**callee, CsExpr::Member { base, name } if matches!(**base, CsExpr::Base) && name == "Paint"));
    assert!(matches!(&args[..], [arg] if is_name(arg, "Fast")));
}

#[test]
fn test_method_bodies_merge_into_class() {
    let lowered = setup_lowered(
        "unit M;
interface
type
  TCounter = class
  private
    FCount: Integer;
  public
    procedure Bump;
    property Count: Integer read FCount write FCount;
  end;
implementation
procedure TCounter.Bump;
begin
  FCount := FCount + 1;
end;
procedure TMissing.Run;
begin
end;
end.",
    );
    let tree = &lowered.tree;
    let counter = class(tree, "TCounter");
    let names: Vec<&str> = counter.members.iter().map(|&id| tree.get(id).name.as_str()).collect();
    assert_eq!(names, ["FCount", "Bump", "Count"]);
    assert_eq!(tree.get(counter.members[0]).visibility, CsVisibility::Private);
    assert_eq!(tree.get(counter.members[1]).visibility, CsVisibility::Public);
    assert_eq!(body(tree, "TCounter", "Bump").len(), 1);

    assert_eq!(lowered.gaps.len(), 1);
    assert!(lowered.gaps[0].what.contains("TMissing.Run"), "{}", lowered.gaps[0]);
}

#[test]
fn test_unit_members_collect_into_static_class() {
    let lowered = setup_lowered(
        "unit Globals;
interface
uses SysUtils, Classes;
const Limit = 10;
var Count: Integer;
procedure Reset;
implementation
uses sysutils, Math;
procedure Reset;
begin
  Count := 0;
end;
initialization
  Reset;
end.",
    );
    let tree = &lowered.tree;
    let ns = namespace(tree);
    assert_eq!(tree.get(tree.root().unwrap()).name, "Globals");
    assert_eq!(ns.usings, ["SysUtils", "Classes", "Math"]);

    let unit_class = class(tree, "Globals");
    assert_eq!(unit_class.kind, ClassKind::Static);
    let members: Vec<(&str, Option<MemberFlags>)> = unit_class
        .members
        .iter()
        .map(|&id| {
            let decl = tree.get(id);
            let flags = match &decl.kind {
                CsDeclKind::Field(field) => Some(field.flags),
                CsDeclKind::Method(method) => Some(method.flags),
                _ => None,
            };
            (decl.name.as_str(), flags)
        })
        .collect();
    assert_eq!(
        members,
        [
            ("Limit", Some(MemberFlags::CONST)),
            ("Count", Some(MemberFlags::STATIC)),
            ("Reset", Some(MemberFlags::STATIC)),
            ("Globals", Some(MemberFlags::STATIC)),
        ]
    );

    // interface header and implementation share one method
    let reset = body(tree, "Globals", "Reset");
    assert_eq!(reset.len(), 1);
    let ctor = method(tree, "Globals", "Globals");
    assert_eq!(ctor.kind, MethodKind::StaticConstructor);
    // a bare procedure name is a call
    assert!(matches!(
        ctor.body.as_deref(),
        Some([CsStmt::Expr(CsExpr::Call { callee, args })]) if is_name(callee, "Reset") && args.is_empty()
    ));
}

#[test]
fn test_program_body_becomes_main() {
    let lowered = setup_lowered(
        "program Hello;
uses SysUtils;
var N: Integer;
begin
  N := 1;
  Writeln(N);
end.",
    );
    let main = method(&lowered.tree, "Hello", "Main");
    assert_eq!(main.kind, MethodKind::Main);
    assert_eq!(main.body.as_ref().unwrap().len(), 2);
}

#[test]
fn test_operators_follow_operand_types() {
    let lowered = setup_lowered(
        "unit Ops;
interface
type
  TColor = (clRed, clGreen);
function Mask(A, B: Integer; Ok: Boolean): Boolean;
implementation
function Mask(A, B: Integer; Ok: Boolean): Boolean;
var C: TColor;
begin
  A := A and B;
  Ok := Ok and (A > 0);
  C := clGreen;
  Result := A in [1..3];
end;
end.",
    );
    let stmts = body(&lowered.tree, "Ops", "Mask");
    let values: Vec<&CsExpr> = stmts
        .iter()
        .filter_map(|stmt| match stmt {
            CsStmt::Assign { value, .. } => Some(value),
            _ => None,
        })
        .collect();

    assert!(matches!(values[0], CsExpr::Binary { op: CsBinaryOp::BitAnd, .. }));
    assert!(matches!(values[1], CsExpr::Binary { op: CsBinaryOp::And, .. }));
    assert!(
        matches!(values[2], CsExpr::Member { base, name } if is_name(base, "TColor") && name == "clGreen")
    );
    let CsExpr::Belongs { set, .. } = values[3] else {
        panic!("expected a membership test");
    };
    assert!(matches!(&**set, CsExpr::SetOf(items) if matches!(items[..], [CsExpr::Range { .. }])));
}

#[test]
fn test_types_lower_by_kind() {
    let lowered = setup_lowered(
        "unit T;
interface
type
  TName = string[40];
  TSmall = 1..10;
  TFlags = set of Byte;
  TPoint = record X, Y: Double; end;
  TNotify = procedure(Sender: TObject) of object;
  IShape = interface
    function Area: Double;
  end;
  TShape = class(TObject, IShape)
    Owner: TShape;
    Caption: TName;
  end;
implementation
end.",
    );
    let tree = &lowered.tree;
    let ns = namespace(tree);
    let kinds: Vec<(&str, String)> = ns
        .members
        .iter()
        .map(|&id| {
            let decl = tree.get(id);
            let kind = match &decl.kind {
                CsDeclKind::Alias { target } => format!("alias {}", tree.type_name(target)),
                CsDeclKind::Class(class) => format!("{:?}", class.kind),
                CsDeclKind::Delegate { params, .. } => format!("delegate/{}", params.len()),
                other => format!("{:?}", other),
            };
            (decl.name.as_str(), kind)
        })
        .collect();
    assert_eq!(
        kinds,
        [
            ("TName", "alias string".to_string()),
            ("TSmall", "alias int".to_string()),
            ("TFlags", "alias HashSet<byte>".to_string()),
            ("TPoint", "Struct".to_string()),
            ("TNotify", "delegate/1".to_string()),
            ("IShape", "Interface".to_string()),
            ("TShape", "Class".to_string()),
        ]
    );

    let shape = class(tree, "TShape");
    let bases: Vec<String> = shape.bases.iter().map(|b| tree.type_name(b)).collect();
    assert_eq!(bases, ["IShape"]);
    let field_types: Vec<String> = shape
        .members
        .iter()
        .filter_map(|&id| match &tree.get(id).kind {
            CsDeclKind::Field(field) => field.ty.as_ref().map(|ty| tree.type_name(ty)),
            _ => None,
        })
        .collect();
    // string aliases are looked through
    assert_eq!(field_types, ["TShape", "string"]);
}

#[test]
fn test_break_inside_case_leaves_the_loop() {
    let lowered = setup_lowered(
        "unit B;
interface
procedure Scan(X: Integer);
implementation
procedure Scan(X: Integer);
var I: Integer;
begin
  while True do
    case X of
      1: Break;
      2: X := 3;
    else
      Break;
    end;
  for I := 1 to 3 do
  begin
    case I of
      2: begin
           while X > 0 do
             Break;
           Break;
         end;
    end;
    Break;
  end;
end;
end.",
    );
    let stmts = body(&lowered.tree, "B", "Scan");
    // local I, while, its label, for, its label
    assert_eq!(stmts.len(), 5, "{:#?}", stmts);

    let CsStmt::While { body: while_body, .. } = &stmts[1] else {
        panic!("expected a while loop, got {:?}", stmts[1]);
    };
    let [CsStmt::Switch { cases, default, .. }] = &while_body[..] else {
        panic!("expected a switch, got {:?}", while_body);
    };
    assert!(matches!(&cases[0].body[..], [CsStmt::Goto(l)] if l == "break1"));
    assert!(matches!(&default[..], [CsStmt::Goto(l)] if l == "break1"));
    assert!(matches!(&stmts[2], CsStmt::Label(l) if l == "break1"));

    let CsStmt::For { body: for_body, .. } = &stmts[3] else {
        panic!("expected a for loop, got {:?}", stmts[3]);
    };
    let [CsStmt::Block(inner)] = &for_body[..] else {
        panic!("expected a block, got {:?}", for_body);
    };
    let CsStmt::Switch { cases, .. } = &inner[0] else {
        panic!("expected a switch, got {:?}", inner[0]);
    };
    let [CsStmt::Block(arm)] = &cases[0].body[..] else {
        panic!("expected a block arm, got {:?}", cases[0].body);
    };
    // the inner while is the innermost loop of its own break
    assert!(matches!(&arm[0], CsStmt::While { body, .. } if matches!(body[..], [CsStmt::Break])));
    assert!(matches!(&arm[1], CsStmt::Goto(l) if l == "break2"));
    assert!(matches!(inner[1], CsStmt::Break));
    assert!(matches!(&stmts[4], CsStmt::Label(l) if l == "break2"));
}

#[test]
fn test_break_in_loop_without_case_needs_no_label() {
    let lowered = setup_lowered(
        "unit B;
interface
procedure Spin;
implementation
procedure Spin;
begin
  repeat
    Break;
  until False;
end;
end.",
    );
    let stmts = body(&lowered.tree, "B", "Spin");
    assert_eq!(stmts.len(), 1);
    assert!(matches!(&stmts[0], CsStmt::DoWhile { body, .. } if matches!(body[..], [CsStmt::Break])));
}

#[test]
fn test_logical_operators_with_untyped_operand() {
    let lowered = setup_lowered(
        "unit Bits;
interface
procedure Pick(A: Integer; Ok: Boolean);
implementation
procedure Pick(A: Integer; Ok: Boolean);
begin
  A := A and Missing;
  A := Missing or A;
  Ok := Ok and Missing;
  Ok := Ok or A;
end;
end.",
    );
    let stmts = body(&lowered.tree, "Bits", "Pick");
    let ops: Vec<CsBinaryOp> = stmts
        .iter()
        .filter_map(|stmt| match stmt {
            CsStmt::Assign {
                value: CsExpr::Binary { op, .. },
                ..
            } => Some(*op),
            _ => None,
        })
        .collect();
    assert_eq!(ops, [CsBinaryOp::BitAnd, CsBinaryOp::BitOr, CsBinaryOp::And, CsBinaryOp::Or]);
}
