use std::{collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    ast::{
        BinaryOperator, Declaration, Definition, Expr, ExprId, ExprKind, FuncDef, Ident, Literal,
        Program, Stmt, StmtKind, UnaryOperator, VarDef,
    },
    token::{Span, Spanned},
    types::{FuncType, ValueType},
    util::intern::{well_known, Symbol},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Checks the types of the whole program, returning the inferred type of
/// every expression.
pub fn check(program: &Program) -> Result<TypeHints> {
    let mut checker = Checker::new(program.expr_count);
    checker.check_program(program)?;
    let hints = TypeHints(checker.hints);
    debug_assert!(hints.0.iter().all(Option::is_some), "unchecked expression");
    debug!("type checked {} expressions", hints.0.len());
    Ok(hints)
}

/// The type of each expression, indexed by [`ExprId`].
#[derive(Debug, Clone, PartialEq)]
pub struct TypeHints(Vec<Option<ValueType>>);

impl TypeHints {
    pub fn get(&self, id: ExprId) -> Option<&ValueType> {
        self.0.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns the type of a checked expression.
    ///
    /// Panics if the expression doesn't belong to the checked program.
    pub fn of(&self, expr: &Expr) -> &ValueType {
        self.get(expr.id).expect("expression wasn't type checked")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone)]
enum Entry {
    Var(ValueType),
    Func(Rc<FuncType>),
}

struct Checker {
    globals: HashMap<Symbol, Entry>,
    /// The environment of the function being checked, if any.
    locals: Option<HashMap<Symbol, Entry>>,
    return_ty: ValueType,
    hints: Vec<Option<ValueType>>,
}

impl Checker {
    fn new(expr_count: u32) -> Checker {
        let mut globals = HashMap::with_capacity(32);
        let builtin = |params: Vec<ValueType>, ret| Entry::Func(Rc::new(FuncType { params, ret }));
        globals.insert(
            well_known::PRINT,
            builtin(vec![ValueType::Object], ValueType::None),
        );
        globals.insert(
            well_known::LEN,
            builtin(vec![ValueType::Object], ValueType::Int),
        );
        globals.insert(well_known::INPUT, builtin(vec![], ValueType::Str));
        Checker {
            globals,
            locals: None,
            return_ty: ValueType::None,
            hints: vec![None; expr_count as usize],
        }
    }

    fn check_program(&mut self, program: &Program) -> Result<()> {
        // Every global signature is known before any body is checked.
        for definition in &program.definitions {
            match definition {
                Definition::Var(var_def) => {
                    let ty = ValueType::from_annotation(&var_def.var.ty);
                    self.globals.insert(var_def.var.name.name, Entry::Var(ty));
                }
                Definition::Func(func_def) => {
                    let ty = Rc::new(signature(func_def));
                    self.globals.insert(func_def.name.name, Entry::Func(ty));
                }
            }
        }

        for definition in &program.definitions {
            match definition {
                Definition::Var(var_def) => self.check_var_def(var_def)?,
                Definition::Func(func_def) => self.check_func_def(func_def)?,
            }
        }
        self.check_stmts(&program.statements)
    }

    fn check_var_def(&mut self, var_def: &VarDef) -> Result<()> {
        let expected = ValueType::from_annotation(&var_def.var.ty);
        let actual = self.check_expr(&var_def.value)?;
        assignable(&actual, &expected, var_def.value.span)
    }

    fn check_func_def(&mut self, func_def: &FuncDef) -> Result<()> {
        let signature = signature(func_def);
        let mut locals = HashMap::with_capacity(func_def.params.len() + 8);
        for (param, ty) in func_def.params.iter().zip(signature.params) {
            locals.insert(param.name.name, Entry::Var(ty));
        }
        for declaration in &func_def.declarations {
            match declaration {
                Declaration::Var(var_def) => {
                    let ty = ValueType::from_annotation(&var_def.var.ty);
                    locals.insert(var_def.var.name.name, Entry::Var(ty));
                }
                Declaration::Global(ident) | Declaration::NonLocal(ident) => {
                    match self.globals.get(&ident.name) {
                        Some(Entry::Var(ty)) => {
                            locals.insert(ident.name, Entry::Var(ty.clone()));
                        }
                        Some(Entry::Func(_)) => {
                            let error = Error::ExpectedVariableIdentifier(ident.name);
                            return Err(ident.span.wrap(error));
                        }
                        None => {
                            let error = Error::UnknownIdentifierUsed(ident.name);
                            return Err(ident.span.wrap(error));
                        }
                    }
                }
            }
        }

        self.locals = Some(locals);
        self.return_ty = signature.ret;
        let result = self.check_func_body(func_def);
        self.locals = None;
        self.return_ty = ValueType::None;
        result
    }

    fn check_func_body(&mut self, func_def: &FuncDef) -> Result<()> {
        for declaration in &func_def.declarations {
            if let Declaration::Var(var_def) = declaration {
                self.check_var_def(var_def)?;
            }
        }
        self.check_stmts(&func_def.body)
    }

    fn check_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.check_type(cond, &ValueType::Bool)?;
                self.check_stmts(then_body)?;
                self.check_stmts(else_body)
            }
            StmtKind::While { cond, body } => {
                self.check_type(cond, &ValueType::Bool)?;
                self.check_stmts(body)
            }
            StmtKind::For { target, iter, body } => {
                let target_ty = self.lookup_var(*target)?;
                let elem = match self.check_expr(iter)? {
                    ValueType::Str => ValueType::Str,
                    ValueType::List(elem) => *elem,
                    other => return Err(iter.span.wrap(Error::ExpectedListType(other))),
                };
                assignable(&elem, &target_ty, target.span)?;
                self.check_stmts(body)
            }
            StmtKind::Pass => Ok(()),
            StmtKind::Return(value) => {
                let (actual, span) = match value {
                    Some(value) => (self.check_expr(value)?, value.span),
                    None => (ValueType::None, stmt.span),
                };
                let expected = self.return_ty.clone();
                assignable(&actual, &expected, span)
            }
            StmtKind::Assign { targets, value } => {
                let value_ty = self.check_expr(value)?;
                if targets.len() > 1 && value_ty == ValueType::list_of(ValueType::None) {
                    return Err(value.span.wrap(Error::ExpectedNonNoneListType));
                }
                for target in targets {
                    let target_ty = self.check_target(target)?;
                    assignable(&value_ty, &target_ty, value.span)?;
                }
                Ok(())
            }
            StmtKind::Expr(expr) => self.check_expr(expr).map(drop),
        }
    }

    /// Checks an assignment target, returning the type it stores.
    fn check_target(&mut self, target: &Expr) -> Result<ValueType> {
        match &target.kind {
            ExprKind::Ident(_) => self.check_expr(target),
            ExprKind::Index { value, .. } => {
                // Strings are immutable.
                let value_ty = self.check_expr(value)?;
                if value_ty == ValueType::Str {
                    return Err(target.span.wrap(Error::AssignTargetInvalid));
                }
                self.check_expr(target)
            }
            _ => Err(target.span.wrap(Error::AssignTargetInvalid)),
        }
    }

    /// Checks the expression, which must have exactly the provided type.
    fn check_type(&mut self, expr: &Expr, expected: &ValueType) -> Result<ValueType> {
        let actual = self.check_expr(expr)?;
        if actual != *expected {
            return Err(expr.span.wrap(Error::UnexpectedType {
                expected: expected.clone(),
                actual,
            }));
        }
        Ok(actual)
    }

    /// Infers the type of the expression and records it as the expression's
    /// hint.
    fn check_expr(&mut self, expr: &Expr) -> Result<ValueType> {
        let ty = self.infer_expr(expr)?;
        self.hints[expr.id.index()] = Some(ty.clone());
        Ok(ty)
    }

    fn infer_expr(&mut self, expr: &Expr) -> Result<ValueType> {
        let ty = match &expr.kind {
            ExprKind::Literal(Literal::None) => ValueType::None,
            ExprKind::Literal(Literal::Bool(_)) => ValueType::Bool,
            ExprKind::Literal(Literal::Int(_)) => ValueType::Int,
            ExprKind::Literal(Literal::Str(_)) => ValueType::Str,
            ExprKind::Ident(ident) => self.lookup_var(*ident)?,
            ExprKind::Unary {
                op: UnaryOperator::Neg,
                expr,
            } => self.check_type(expr, &ValueType::Int)?,
            ExprKind::Unary {
                op: UnaryOperator::Not,
                expr,
            } => self.check_type(expr, &ValueType::Bool)?,
            ExprKind::Binary { op, lhs, rhs } => self.infer_binary(*op, lhs, rhs)?,
            ExprKind::IfExpr {
                cond,
                then_arm,
                else_arm,
            } => {
                self.check_type(cond, &ValueType::Bool)?;
                let then_ty = self.check_expr(then_arm)?;
                let else_ty = self.check_expr(else_arm)?;
                then_ty.join(&else_ty)
            }
            ExprKind::List(elements) => {
                let mut joined: Option<ValueType> = None;
                for element in elements {
                    let ty = self.check_expr(element)?;
                    joined = Some(match joined {
                        Some(joined) => joined.join(&ty),
                        None => ty,
                    });
                }
                match joined {
                    Some(elem) => ValueType::list_of(elem),
                    None => ValueType::Empty,
                }
            }
            ExprKind::Call { func, args } => self.infer_call(*func, args)?,
            ExprKind::Index { value, index } => {
                let value_ty = self.check_expr(value)?;
                self.check_type(index, &ValueType::Int)?;
                match value_ty {
                    ValueType::Str => ValueType::Str,
                    ValueType::List(elem) => *elem,
                    other => return Err(value.span.wrap(Error::ExpectedListType(other))),
                }
            }
        };
        Ok(ty)
    }

    fn infer_binary(&mut self, op: BinaryOperator, lhs: &Expr, rhs: &Expr) -> Result<ValueType> {
        use BinaryOperator::*;
        let ty = match op {
            And | Or => {
                self.check_type(lhs, &ValueType::Bool)?;
                self.check_type(rhs, &ValueType::Bool)?;
                ValueType::Bool
            }
            Is => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                if lhs_ty.is_special() || rhs_ty.is_special() {
                    let span = lhs.span.to(rhs.span);
                    let error = Error::IsBinaryExpectedTwoObjectTypes {
                        lhs: lhs_ty,
                        rhs: rhs_ty,
                    };
                    return Err(span.wrap(error));
                }
                ValueType::Bool
            }
            Add => match self.check_expr(lhs)? {
                ValueType::Str => self.check_type(rhs, &ValueType::Str)?,
                ValueType::List(lhs_elem) => match self.check_expr(rhs)? {
                    ValueType::List(rhs_elem) => ValueType::list_of(lhs_elem.join(&rhs_elem)),
                    other => return Err(rhs.span.wrap(Error::ExpectedListType(other))),
                },
                ValueType::Int => self.check_type(rhs, &ValueType::Int)?,
                actual => {
                    return Err(lhs.span.wrap(Error::UnexpectedType {
                        expected: ValueType::Int,
                        actual,
                    }));
                }
            },
            Sub | Mul | FloorDiv | Mod => {
                self.check_type(lhs, &ValueType::Int)?;
                self.check_type(rhs, &ValueType::Int)?
            }
            Less | LessEq | Greater | GreaterEq => {
                self.check_type(lhs, &ValueType::Int)?;
                self.check_type(rhs, &ValueType::Int)?;
                ValueType::Bool
            }
            Eq | NotEq => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                let comparable = match (&lhs_ty, &rhs_ty) {
                    (ValueType::Int, ValueType::Int)
                    | (ValueType::Bool, ValueType::Bool)
                    | (ValueType::Str, ValueType::Str)
                    | (ValueType::List(_), ValueType::List(_)) => true,
                    _ => false,
                };
                if !comparable {
                    return Err(rhs.span.wrap(Error::UnexpectedType {
                        expected: lhs_ty,
                        actual: rhs_ty,
                    }));
                }
                ValueType::Bool
            }
        };
        Ok(ty)
    }

    fn infer_call(&mut self, func: Ident, args: &[Expr]) -> Result<ValueType> {
        let func_ty = match self.lookup(func.name) {
            Some(Entry::Func(ty)) => ty,
            Some(Entry::Var(_)) => {
                return Err(func.span.wrap(Error::ExpectedFunctionIdentifier(func.name)));
            }
            None => return Err(func.span.wrap(Error::UnknownIdentifierUsed(func.name))),
        };
        if args.len() != func_ty.params.len() {
            let span = args.iter().fold(func.span, |span, arg| span.to(arg.span));
            let error = Error::FunctionCallArgumentMismatch {
                func: func.name,
                expected: func_ty.params.len(),
                actual: args.len(),
            };
            return Err(span.wrap(error));
        }

        for (arg, param_ty) in args.iter().zip(&func_ty.params) {
            let arg_ty = self.check_expr(arg)?;
            if func.name == well_known::LEN {
                if !matches!(arg_ty, ValueType::Str | ValueType::List(_) | ValueType::Empty) {
                    return Err(arg.span.wrap(Error::ExpectedListType(arg_ty)));
                }
            } else {
                assignable(&arg_ty, param_ty, arg.span)?;
            }
        }
        Ok(func_ty.ret.clone())
    }

    fn lookup(&self, name: Symbol) -> Option<Entry> {
        self.locals
            .as_ref()
            .and_then(|locals| locals.get(&name))
            .or_else(|| self.globals.get(&name))
            .cloned()
    }

    fn lookup_var(&self, ident: Ident) -> Result<ValueType> {
        match self.lookup(ident.name) {
            Some(Entry::Var(ty)) => Ok(ty),
            Some(Entry::Func(_)) => {
                Err(ident.span.wrap(Error::ExpectedVariableIdentifier(ident.name)))
            }
            None => Err(ident.span.wrap(Error::UnknownIdentifierUsed(ident.name))),
        }
    }
}

/// The declared type of a function.
pub fn signature(func_def: &FuncDef) -> FuncType {
    FuncType {
        params: (func_def.params.iter())
            .map(|param| ValueType::from_annotation(&param.ty))
            .collect(),
        ret: (func_def.return_ty.as_ref()).map_or(ValueType::None, ValueType::from_annotation),
    }
}

fn assignable(actual: &ValueType, expected: &ValueType, span: Span) -> Result<()> {
    if actual.is_assignable_to(expected) {
        Ok(())
    } else {
        Err(span.wrap(Error::NotAssignmentCompatible {
            expected: expected.clone(),
            actual: actual.clone(),
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    NotAssignmentCompatible {
        expected: ValueType,
        actual: ValueType,
    },
    UnexpectedType {
        expected: ValueType,
        actual: ValueType,
    },
    ExpectedListType(ValueType),
    UnknownIdentifierUsed(Symbol),
    ExpectedVariableIdentifier(Symbol),
    ExpectedFunctionIdentifier(Symbol),
    ExpectedNonNoneListType,
    IsBinaryExpectedTwoObjectTypes {
        lhs: ValueType,
        rhs: ValueType,
    },
    FunctionCallArgumentMismatch {
        func: Symbol,
        expected: usize,
        actual: usize,
    },
    AssignTargetInvalid,
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use checker;

        fn test_literals_and_arithmetic() {
            let program = "x: int = 1\nprint(-x + 2 * 3 // 4 % 5)\n";
            let tree_ok = "
                vardef x: int (0..10)
                  int 1 (9..10) %: int
                expr (11..37)
                  call print (11..37) %: <None>
                    binary Add (17..36) %: int
                      unary Neg (17..19) %: int
                        ident x (18..19) %: int
                      binary Mod (22..36) %: int
                        binary FloorDiv (22..32) %: int
                          binary Mul (22..27) %: int
                            int 2 (22..23) %: int
                            int 3 (26..27) %: int
                          int 4 (31..32) %: int
                        int 5 (35..36) %: int
            ";
        }

        fn test_list_joins() {
            let program = "xs: [object] = None\nxs = [1, None] + [True]\n";
            let tree_ok = "
                vardef xs: [object] (0..19)
                  none (15..19) %: <None>
                assign (20..43)
                  ident xs (20..22) %: [object]
                  binary Add (25..43) %: [object]
                    list (25..34) %: [object]
                      int 1 (26..27) %: int
                      none (29..33) %: <None>
                    list (37..43) %: [bool]
                      bool true (38..42) %: bool
            ";
        }

        fn test_strings_and_indexing() {
            let program = "s: str = \"ab\"\nt: str = \"\"\nt = s[0] + s[1] + input()\n";
            let tree_ok = r#"
                vardef s: str (0..13)
                  string "ab" (9..13) %: str
                vardef t: str (14..25)
                  string "" (23..25) %: str
                assign (26..51)
                  ident t (26..27) %: str
                  binary Add (30..51) %: str
                    binary Add (30..41) %: str
                      index (30..34) %: str
                        ident s (30..31) %: str
                        int 0 (32..33) %: int
                      index (37..41) %: str
                        ident s (37..38) %: str
                        int 1 (39..40) %: int
                    call input (44..51) %: str
            "#;
        }

        fn test_function_and_conditional() {
            let program = indoc::indoc! {"
                def f(a: int, b: bool) -> object:
                    return a if b else None
                print(f(1, len([]) == 0) is None)
            "};
            let tree_ok = "
                funcdef f(a: int, b: bool) -> object (0..61)
                  return (38..61)
                    if_expr (45..61) %: object
                      ident b (50..51) %: bool
                      ident a (45..46) %: int
                      none (57..61) %: <None>
                expr (62..95)
                  call print (62..95) %: <None>
                    binary Is (68..94) %: bool
                      call f (68..86) %: object
                        int 1 (70..71) %: int
                        binary Eq (73..85) %: bool
                          call len (73..80) %: int
                            list (77..79) %: <Empty>
                          int 0 (84..85) %: int
                      none (90..94) %: <None>
            ";
        }

        fn test_error_not_assignment_compatible() {
            let program = "x: int = True\n";
            let expected_errors = &["9..13: expected type int, but got bool"];
        }

        fn test_error_none_to_int() {
            let program = "x: int = None\n";
            let expected_errors = &["9..13: expected type int, but got <None>"];
        }

        fn test_error_unexpected_condition_type() {
            let program = "if 1:\n    pass\n";
            let expected_errors = &["3..4: expected an expression of type bool, but got int"];
        }

        fn test_error_index_non_list() {
            let program = "x: int = 1\nprint(x[0])\n";
            let expected_errors = &["17..18: expected a str or list, but got int"];
        }

        fn test_error_len_of_int() {
            let program = "print(len(1))\n";
            let expected_errors = &["10..11: expected a str or list, but got int"];
        }

        fn test_error_len_of_none() {
            let program = "print(len(None))\n";
            let expected_errors = &["10..14: expected a str or list, but got <None>"];
        }

        fn test_error_call_arity() {
            let program = "def f(a: int) -> int:\n    return a\nf(1, 2)\n";
            let expected_errors = &["35..41: f expects 1 argument(s), but got 2"];
        }

        fn test_error_call_variable() {
            let program = "x: int = 1\nx()\n";
            let expected_errors = &["11..12: x is not a function"];
        }

        fn test_error_function_as_variable() {
            let program = "def f():\n    pass\nprint(f)\n";
            let expected_errors = &["24..25: f is a function, not a variable"];
        }

        fn test_error_is_on_ints() {
            let program = "print(1 is 1)\n";
            let expected_errors = &["6..12: `is` expects two object operands, but got int and int"];
        }

        fn test_error_multiple_targets_for_none_list() {
            let program = "a: [object] = None\nb: [object] = None\na = b = [None]\n";
            let expected_errors = &["46..52: cannot assign a list of None to multiple targets"];
        }

        fn test_error_assign_to_string_index() {
            let program = "s: str = \"a\"\ns[0] = \"b\"\n";
            let expected_errors = &["13..17: cannot assign to an index of a str"];
        }

        fn test_error_return_type() {
            let program = "def f() -> int:\n    return\n";
            let expected_errors = &["20..26: expected type int, but got <None>"];
        }

        fn test_error_for_over_int() {
            let program = "i: int = 0\nfor i in 5:\n    pass\n";
            let expected_errors = &["20..21: expected a str or list, but got int"];
        }

        fn test_error_mismatched_equality() {
            let program = "print(1 == True)\n";
            let expected_errors = &["11..15: expected an expression of type int, but got bool"];
        }
    );

    #[test]
    fn test_every_expression_is_annotated() {
        use crate::parser::test_utils::parse_program;
        let (_, program) = parse_program(include_str!("../demos/lists.py"));
        let hints = super::check(&program).unwrap();
        assert_eq!(hints.len(), program.expr_count as usize);
        for id in 0..program.expr_count {
            assert!(hints.get(crate::ast::ExprId(id)).is_some());
        }
    }
}
