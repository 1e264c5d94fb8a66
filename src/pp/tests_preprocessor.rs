use super::*;

/// Helper function to run the preprocessor with a define list
fn setup_preprocessor_test(src: &str, defines: &str) -> String {
    setup_preprocessor_test_with_error(src, defines).unwrap()
}

fn setup_preprocessor_test_with_error(src: &str, defines: &str) -> Result<String, PPError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = PPConfig::from_define_list(defines);
    let mut preprocessor = Preprocessor::new(&config);
    preprocessor.process(src)
}

#[test]
fn test_text_without_directives_is_unchanged() {
    let src = "unit A;\n{ comment } // line\ninterface\n  s := '{$ifdef X}';\nend.";
    assert_eq!(setup_preprocessor_test(src, "X"), src);
    assert_eq!(setup_preprocessor_test("", ""), "");
}

#[test]
fn test_branch_selection() {
    let src = "A{$ifdef X}B{$else}C{$endif}D";
    assert_eq!(setup_preprocessor_test(src, "X"), "ABD");
    assert_eq!(setup_preprocessor_test(src, ""), "ACD");
}

#[test]
fn test_ifndef_inverts() {
    let src = "A{$IFNDEF X}B{$ELSE}C{$ENDIF}D";
    assert_eq!(setup_preprocessor_test(src, "x"), "ACD");
    assert_eq!(setup_preprocessor_test(src, "Y"), "ABD");
}

#[test]
fn test_define_is_order_dependent() {
    let src = "{$ifdef LATE}1{$endif}{$define Late}{$ifdef late}2{$endif}";
    assert_eq!(setup_preprocessor_test(src, ""), "2");
}

#[test]
fn test_define_inside_inactive_branch_is_ignored() {
    let src = "{$ifdef NOPE}{$define FEATURE}{$endif}{$ifdef FEATURE}on{$else}off{$endif}";
    assert_eq!(setup_preprocessor_test(src, ""), "off");
}

#[test]
fn test_define_made_in_closed_branch_stays_visible() {
    let src = "{$ifdef WIN32}{$define FAST}{$endif}{$ifdef FAST}fast{$endif}";
    assert_eq!(setup_preprocessor_test(src, "WIN32"), "fast");
}

#[test]
fn test_undef_removes_symbol() {
    let src = "{$undef DEBUG}{$ifdef DEBUG}dbg{$else}rel{$endif}";
    assert_eq!(setup_preprocessor_test(src, "DEBUG"), "rel");
}

#[test]
fn test_nested_conditionals() {
    let src = "<{$ifdef A}a{$ifdef B}b{$else}!b{$endif}{$else}!a{$ifdef B}b{$endif}{$endif}>";
    assert_eq!(setup_preprocessor_test(src, "A;B"), "<ab>");
    assert_eq!(setup_preprocessor_test(src, "A"), "<a!b>");
    assert_eq!(setup_preprocessor_test(src, "B"), "<!ab>");
    assert_eq!(setup_preprocessor_test(src, ""), "<!a>");
}

#[test]
fn test_compiler_switches_are_stripped() {
    let src = "unit A;{$R *.res}{$I+}\ninterface";
    assert_eq!(setup_preprocessor_test(src, ""), "unit A;\ninterface");
}

#[test]
fn test_if_defined_forms() {
    let src = "{$IF Defined(X)}x{$ELSE}y{$IFEND}{$if not defined(X)}n{$ifend}";
    assert_eq!(setup_preprocessor_test(src, "X"), "x");
    assert_eq!(setup_preprocessor_test(src, ""), "yn");
}

#[test]
fn test_directive_in_comment_is_inert() {
    let src = "// {$ifdef X}\n(* {$endif} *)ok";
    assert_eq!(setup_preprocessor_test(src, ""), src);
}

#[test]
fn test_else_without_if() {
    let err = setup_preprocessor_test_with_error("a\n{$else}", "").unwrap_err();
    assert!(matches!(err, PPError::ElseWithoutIf { .. }));
    assert_eq!(err.location().line, 2);
}

#[test]
fn test_endif_without_if() {
    let err = setup_preprocessor_test_with_error("{$endif}", "").unwrap_err();
    assert!(matches!(err, PPError::EndifWithoutIf { .. }));
}

#[test]
fn test_unterminated_directive() {
    let err = setup_preprocessor_test_with_error("abc {$ifdef X", "").unwrap_err();
    assert_eq!(err, PPError::UnterminatedDirective {
        location: crate::source::Position::new(4, 1, 5)
    });
}

#[test]
fn test_unclosed_conditional() {
    let err = setup_preprocessor_test_with_error("{$ifdef X} body", "").unwrap_err();
    assert_eq!(err.to_string(), "{$ifdef} is not closed by {$endif}");
}

#[test]
fn test_duplicate_else() {
    let err = setup_preprocessor_test_with_error("{$ifdef X}{$else}{$else}{$endif}", "").unwrap_err();
    assert!(matches!(err, PPError::DuplicateElse { .. }));
}

#[test]
fn test_nesting_limit() {
    let config = PPConfig {
        max_depth: 3,
        ..PPConfig::default()
    };
    let deep = "{$ifdef A}".repeat(4) + &"{$endif}".repeat(4);
    let err = Preprocessor::new(&config).process(&deep).unwrap_err();
    assert!(matches!(err, PPError::NestingTooDeep { limit: 3, .. }));

    let shallow = "{$ifdef A}".repeat(3) + "x" + &"{$endif}".repeat(3);
    assert_eq!(Preprocessor::new(&config).process(&shallow).unwrap(), "");
}

#[test]
fn test_scan_builds_tree() {
    let config = PPConfig::default();
    let tree = Preprocessor::new(&config)
        .scan("{$ifdef A}{$define B}{$else}x{$endif}")
        .unwrap();
    assert_eq!(tree.len(), 1);
    let DirectiveNode::Conditional(cond) = &tree[0] else {
        panic!("expected a conditional, got {:?}", tree[0]);
    };
    assert_eq!(cond.symbol, "a");
    assert!(cond.when_defined);
    assert_eq!(cond.then_branch.len(), 1);
    assert!(cond.else_branch.is_empty());
    assert_eq!(cond.else_marker, Some((21, 28)));
}

#[test]
fn test_convenience_wrapper() {
    assert_eq!(preprocess("{$ifdef Win32}w{$endif}", &["WIN32"]).unwrap(), "w");
}
